//! Generic form rendering: one row per field, inline errors under it.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph},
};

use crate::form::{FieldKind, Form};

const LABEL_WIDTH: usize = 22;

pub fn lines(form: &Form) -> Vec<Line<'static>> {
  let mut lines = Vec::new();
  for (i, field) in form.fields().iter().enumerate() {
    let focused = i == form.focus() && !form.is_read_only();
    let marker = if focused { "›" } else { " " };
    let value = match (&field.kind, focused) {
      (FieldKind::Text | FieldKind::Secret, true) => format!("{}_", field.display()),
      (FieldKind::Choice(_) | FieldKind::Flag, true) => format!("‹ {} ›", field.display()),
      _ => field.display(),
    };
    let value_style = if focused {
      Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
      Style::default()
    };

    lines.push(Line::from(vec![
      Span::styled(format!("{marker} "), Style::default().fg(Color::Cyan)),
      Span::styled(format!("{:<LABEL_WIDTH$}", field.label), Style::default().fg(Color::Cyan)),
      Span::styled(value, value_style),
    ]));
    if let Some(error) = form.error(field.name) {
      lines.push(Line::from(Span::styled(
        format!("  {:<LABEL_WIDTH$}{error}", ""),
        Style::default().fg(Color::Red),
      )));
    }
  }
  if form.is_submitting() {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Enviando...", Style::default().fg(Color::Yellow))));
  }
  lines
}

/// Draw `form` in its own bordered box, clearing what is underneath.
pub fn draw(f: &mut Frame, area: Rect, form: &Form, title: &str) {
  let block = Block::default()
    .title(title.to_owned())
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  f.render_widget(Clear, area);
  f.render_widget(Paragraph::new(lines(form)).block(block), area);
}
