//! Zone manager: table plus the create/edit dialog.

use ratatui::{
  Frame,
  layout::{Constraint, Layout, Rect},
  style::{Color, Style},
  text::{Line, Span},
  widgets::{Paragraph, Row, Table, TableState},
};

use super::{
  bordered, centered, draw_confirm, form, highlight, loading_or_failed,
  personnel_list::{filter_bar, header_row},
};
use crate::app::{ZONE_SORT, ZonesScreen};

const HEADERS: [&str; 4] = ["Nombre", "Descripción", "Estado", "Creada"];

pub fn draw(f: &mut Frame, area: Rect, screen: &ZonesScreen) {
  let rows = Layout::vertical([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
    .split(area);
  f.render_widget(filter_bar(&screen.pane, false), rows[0]);

  if loading_or_failed(f, rows[1], &screen.zones) {
    return;
  }
  let Some(zones) = screen.zones.ready() else { return };
  let page = screen.pane.view.render(zones);
  if zones.is_empty() && screen.editor.is_none() {
    return super::draw_message(f, rows[1], "No hay zonas. Pulse n para crear una.");
  }

  let body: Vec<Row> = page
    .rows
    .iter()
    .map(|z| {
      let (label, color) = if z.active { ("Activa", Color::Green) } else { ("Inactiva", Color::DarkGray) };
      Row::new(vec![
        Line::from(z.name.clone()),
        Line::from(z.description.clone().unwrap_or_default()),
        Line::from(Span::styled(label, Style::default().fg(color))),
        Line::from(z.created_at.with_timezone(&chrono::Local).format("%d/%m/%Y").to_string()),
      ])
    })
    .collect();

  let title = format!(" Zonas ({}/{}) ", page.matched, zones.len());
  let table = Table::new(
    body,
    [
      Constraint::Length(20),
      Constraint::Min(20),
      Constraint::Length(10),
      Constraint::Length(11),
    ],
  )
  .header(header_row(&screen.pane, &HEADERS, &ZONE_SORT))
  .row_highlight_style(highlight())
  .block(bordered(&title));

  let mut state = TableState::default();
  state.select((!page.rows.is_empty()).then_some(screen.pane.cursor));
  f.render_stateful_widget(table, rows[1], &mut state);

  f.render_widget(
    Paragraph::new(format!(" Página {} de {}", page.page + 1, page.page_count.max(1)))
      .style(Style::default().fg(Color::DarkGray)),
    rows[2],
  );

  if let Some(editor) = &screen.editor {
    let title = if editor.id.is_some() { " Editar zona " } else { " Nueva zona " };
    form::draw(f, centered(area, 64, 10), &editor.form, title);
  }
  if let Some(confirm) = &screen.confirm {
    draw_confirm(f, area, confirm);
  }
}
