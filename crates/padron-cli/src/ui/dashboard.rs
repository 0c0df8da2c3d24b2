//! Dashboard: counters and the most recent registrations.

use padron_gateway::Dashboard;
use ratatui::{
  Frame,
  layout::{Constraint, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Paragraph, Row, Table},
};

use super::{bordered, loading_or_failed};
use crate::app::Loadable;

pub fn draw(f: &mut Frame, area: Rect, state: &Loadable<Dashboard>) {
  if loading_or_failed(f, area, state) {
    return;
  }
  let Some(dashboard) = state.ready() else { return };

  let rows = Layout::vertical([Constraint::Length(5), Constraint::Min(0)]).split(area);
  let cards = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(rows[0]);
  let stats = &dashboard.personnel;
  for (i, (label, value)) in [
    ("Personal", stats.total),
    ("Activos", stats.active),
    ("Nuevos este mes", stats.new_this_month),
    ("Zonas", dashboard.zone_count),
  ]
  .into_iter()
  .enumerate()
  {
    let block = bordered(label);
    let inner = block.inner(cards[i]);
    f.render_widget(block, cards[i]);
    f.render_widget(
      Paragraph::new(Line::from(Span::styled(
        value.to_string(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
      ))),
      inner,
    );
  }

  let block = bordered(" Registros recientes ");
  if dashboard.recent.is_empty() {
    let inner = block.inner(rows[1]);
    f.render_widget(block, rows[1]);
    f.render_widget(
      Paragraph::new("Aún no hay personal registrado.").style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  let body = dashboard.recent.iter().map(|p| {
    Row::new(vec![
      p.initials(),
      p.full_name(),
      p.zone_name.clone().unwrap_or_else(|| "—".into()),
      p.status.label().to_owned(),
      p.created_at.with_timezone(&chrono::Local).format("%d/%m/%Y").to_string(),
    ])
  });
  let table = Table::new(
    body,
    [
      Constraint::Length(4),
      Constraint::Min(20),
      Constraint::Length(16),
      Constraint::Length(10),
      Constraint::Length(12),
    ],
  )
  .header(
    Row::new(vec!["", "Nombre", "Zona", "Estado", "Registro"])
      .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
  )
  .block(block);
  f.render_widget(table, rows[1]);
}
