//! Personnel table with filter bar and pager.

use padron_core::{listing::Direction, personnel::PersonnelStatus};
use ratatui::{
  Frame,
  layout::{Constraint, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Paragraph, Row, Table, TableState},
};

use super::{bordered, draw_confirm, highlight, loading_or_failed};
use crate::app::{ListPane, PERSONNEL_SORT, PersonnelListScreen};

const HEADERS: [&str; 7] = ["DNI", "Nombres", "Apellidos", "Celular", "Zona", "Estado", "Registro"];

pub fn draw(f: &mut Frame, area: Rect, list: &PersonnelListScreen) {
  let rows = Layout::vertical([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
    .split(area);
  f.render_widget(filter_bar(&list.pane, true), rows[0]);

  if loading_or_failed(f, rows[1], &list.records) {
    return;
  }
  let Some(records) = list.records.ready() else { return };
  if records.is_empty() {
    return super::draw_message(f, rows[1], "Aún no hay personal registrado. Pulse n para crear uno.");
  }
  let page = list.pane.view.render(records);

  let body: Vec<Row> = page
    .rows
    .iter()
    .map(|p| {
      let mark = if list.pane.view.is_selected(&p.id) { "■ " } else { "□ " };
      let status_style = match p.status {
        PersonnelStatus::Active => Style::default().fg(Color::Green),
        PersonnelStatus::Inactive => Style::default().fg(Color::DarkGray),
      };
      Row::new(vec![
        Line::from(format!("{mark}{}", p.national_id)),
        Line::from(p.given_names.clone()),
        Line::from(p.surnames.clone()),
        Line::from(p.phone.clone()),
        Line::from(p.zone_name.clone().unwrap_or_else(|| "—".into())),
        Line::from(Span::styled(p.status.label(), status_style)),
        Line::from(p.created_at.with_timezone(&chrono::Local).format("%d/%m/%Y").to_string()),
      ])
    })
    .collect();

  let title = format!(
    " Personal ({}/{}) · {} marcado(s) ",
    page.matched,
    records.len(),
    list.pane.view.selected().len()
  );
  let table = Table::new(
    body,
    [
      Constraint::Length(12),
      Constraint::Min(12),
      Constraint::Min(12),
      Constraint::Length(12),
      Constraint::Length(14),
      Constraint::Length(9),
      Constraint::Length(11),
    ],
  )
  .header(header_row(&list.pane, &HEADERS, &PERSONNEL_SORT))
  .row_highlight_style(highlight())
  .block(bordered(&title));

  let mut state = TableState::default();
  state.select((!page.rows.is_empty()).then_some(list.pane.cursor));
  f.render_stateful_widget(table, rows[1], &mut state);

  f.render_widget(
    Paragraph::new(format!(
      " Página {} de {} · {} por página (p)",
      page.page + 1,
      page.page_count.max(1),
      page.page_size
    ))
    .style(Style::default().fg(Color::DarkGray)),
    rows[2],
  );

  if let Some(confirm) = &list.confirm {
    draw_confirm(f, area, confirm);
  }
}

/// Search term, status and (optionally) zone filters on one line.
pub(crate) fn filter_bar(pane: &ListPane, with_zone: bool) -> Paragraph<'static> {
  let filter = &pane.view.filter;
  let term = if pane.typing { format!("/{}_", filter.term) } else { format!("/{}", filter.term) };
  let status = match filter.status.as_str() {
    "active" => "activos",
    "inactive" => "inactivos",
    _ => "todos",
  };
  let mut spans = vec![
    Span::styled(format!(" {term}"), Style::default().fg(Color::Yellow)),
    Span::styled(format!("   estado: {status}"), Style::default().fg(Color::DarkGray)),
  ];
  if with_zone {
    let zone = if filter.zone.is_empty() { "todas" } else { filter.zone.as_str() };
    spans.push(Span::styled(format!("   zona: {zone}"), Style::default().fg(Color::DarkGray)));
  }
  Paragraph::new(Line::from(spans))
}

/// Column headers with the sort arrow on the active column.
pub(crate) fn header_row(pane: &ListPane, headers: &[&str], fields: &[&str]) -> Row<'static> {
  let sort = pane.view.sort();
  let cells: Vec<String> = headers
    .iter()
    .zip(fields)
    .enumerate()
    .map(|(i, (label, field))| {
      let arrow = match sort {
        Some(s) if s.field == *field => match s.direction {
          Direction::Asc => " ▲",
          Direction::Desc => " ▼",
        },
        _ => "",
      };
      format!("{} {label}{arrow}", i + 1)
    })
    .collect();
  Row::new(cells).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
}
