//! Create / edit / view screen for one personnel record.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Style},
  text::{Line, Span},
  widgets::Paragraph,
};

use super::{bordered, centered, draw_message, form};
use crate::{app::Loadable, form::PersonnelForm};

pub fn draw(f: &mut Frame, area: Rect, state: &Loadable<PersonnelForm>, title: &str) {
  let pf = match state {
    Loadable::Loading => return draw_message(f, area, "Cargando..."),
    Loadable::Failed(message) => {
      return draw_message(f, area, &format!("{message}  (Esc para volver)"));
    }
    Loadable::Ready(pf) => pf,
  };

  let block = bordered(title);
  let inner = block.inner(area);
  f.render_widget(block, area);

  let mut lines = form::lines(&pf.form);
  if !pf.form.is_read_only() && pf.zone_options().is_empty() {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      "No hay zonas activas. Pulse F4 para crear una.",
      Style::default().fg(Color::Yellow),
    )));
  }
  f.render_widget(Paragraph::new(lines), inner);

  if let Some(zone_form) = &pf.zone_form {
    form::draw(f, centered(area, 60, 8), zone_form, " Nueva zona ");
  }
}
