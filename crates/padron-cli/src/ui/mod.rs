//! TUI rendering. Header, side menu, body and status bar.

pub mod dashboard;
pub mod form;
pub mod login;
pub mod personnel_form;
pub mod personnel_list;
pub mod zones;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Flex, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::{
  app::{App, Confirm, Loadable, Screen},
  routes::MENU,
};

// ─── Root draw ───────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<S, I>(f: &mut Frame, app: &App<S, I>) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);

  let body = match &app.banner {
    Some(message) => {
      let split = Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).split(rows[1]);
      draw_banner(f, split[0], message);
      split[1]
    }
    None => rows[1],
  };

  if app.auth.session().is_some() {
    let cols = Layout::horizontal([Constraint::Length(18), Constraint::Min(0)]).split(body);
    draw_menu(f, cols[0], app);
    draw_screen(f, cols[1], app);
  } else {
    draw_screen(f, body, app);
  }

  draw_status(f, rows[2], app);

  if let Some(form) = &app.password {
    let area = centered(f.area(), 60, 11);
    f.render_widget(Clear, area);
    form::draw(f, area, form, " Cambiar contraseña ");
  }
}

fn draw_screen<S, I>(f: &mut Frame, area: Rect, app: &App<S, I>) {
  match &app.screen {
    Screen::Connecting => draw_message(f, area, "Conectando con el servicio de identidad..."),
    Screen::Login(login) => login::draw(f, area, login),
    Screen::Dashboard(state) => dashboard::draw(f, area, state),
    Screen::PersonnelList(list) => personnel_list::draw(f, area, list),
    Screen::PersonnelForm(state) => personnel_form::draw(f, area, state, app.route.title()),
    Screen::Zones(zones) => zones::draw(f, area, zones),
  }
}

// ─── Header ──────────────────────────────────────────────────────────────────

fn draw_header<S, I>(f: &mut Frame, area: Rect, app: &App<S, I>) {
  let date = Local::now().format("%d/%m/%Y").to_string();
  let left = Span::styled(
    format!(" Padrón · {}", app.route.title()),
    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
  );
  let user = app.auth.session().map(|s| format!("{}  ", s.label())).unwrap_or_default();
  let right = Span::styled(format!("{user}{date} "), Style::default().fg(Color::Gray));

  let pad = area
    .width
    .saturating_sub(left.width() as u16)
    .saturating_sub(right.width() as u16);
  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Side menu ───────────────────────────────────────────────────────────────

fn draw_menu<S, I>(f: &mut Frame, area: Rect, app: &App<S, I>) {
  let block = Block::default()
    .title(" Menú ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let items: Vec<ListItem> = MENU
    .iter()
    .enumerate()
    .map(|(i, (label, _))| ListItem::new(format!(" F{} {label}", i + 1)))
    .collect();

  let mut state = ListState::default();
  state.select(app.route.section());
  f.render_stateful_widget(
    List::new(items).block(block).highlight_style(highlight()),
    area,
    &mut state,
  );
}

// ─── Status bar ──────────────────────────────────────────────────────────────

fn draw_status<S, I>(f: &mut Frame, area: Rect, app: &App<S, I>) {
  let (mode, hints) = if app.password.is_some() {
    ("CLAVE", "Tab siguiente  Enter guardar  Esc cancelar")
  } else {
    match &app.screen {
      Screen::Connecting => ("...", "q salir"),
      Screen::Login(l) if l.reset.is_some() => ("CLAVE", "Enter enviar  Esc volver"),
      Screen::Login(_) => ("LOGIN", "Tab siguiente  Enter ingresar  F4 olvidé mi contraseña"),
      Screen::Dashboard(_) => ("INICIO", "r recargar  F9 contraseña  F10 salir  q cerrar"),
      Screen::PersonnelList(l) if l.pane.typing => ("BUSCAR", "Escriba para filtrar  Enter aceptar  Esc limpiar"),
      Screen::PersonnelList(l) if l.confirm.is_some() => ("CONFIRMAR", "y confirmar  cualquier tecla cancela"),
      Screen::PersonnelList(_) => (
        "PERSONAL",
        "/ buscar  z zona  s estado  1-7 ordenar  n nuevo  e editar  v ver  t estado  d eliminar  espacio marcar  D eliminar marcados",
      ),
      Screen::PersonnelForm(Loadable::Ready(pf)) if pf.zone_form.is_some() => {
        ("ZONA", "Enter crear zona  Esc volver")
      }
      Screen::PersonnelForm(Loadable::Ready(pf)) if pf.form.is_read_only() => {
        ("VER", "e editar  Esc volver")
      }
      Screen::PersonnelForm(_) => ("FORM", "Tab siguiente  ←→ opciones  Enter guardar  F4 nueva zona  Esc volver"),
      Screen::Zones(z) if z.editor.is_some() => ("ZONA", "Tab siguiente  Enter guardar  Esc cancelar"),
      Screen::Zones(z) if z.confirm.is_some() => ("CONFIRMAR", "y confirmar  cualquier tecla cancela"),
      Screen::Zones(z) if z.pane.typing => ("BUSCAR", "Escriba para filtrar  Enter aceptar  Esc limpiar"),
      Screen::Zones(_) => ("ZONAS", "/ buscar  s estado  1-4 ordenar  n nueva  e editar  t activar  d eliminar"),
    }
  };

  let (text, color) = match &app.notice {
    Some(notice) => (notice.as_str(), Color::Green),
    None => (hints, Color::DarkGray),
  };

  let line = Line::from(vec![
    Span::styled(
      format!(" {mode} "),
      Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
    ),
    Span::styled(format!("  {text}"), Style::default().fg(color)),
  ]);
  f.render_widget(Paragraph::new(line).style(Style::default().bg(Color::Black)), area);
}

// ─── Shared pieces ───────────────────────────────────────────────────────────

fn draw_banner(f: &mut Frame, area: Rect, message: &str) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Red))
    .title(" Error (Esc para cerrar) ");
  f.render_widget(
    Paragraph::new(message.to_owned())
      .style(Style::default().fg(Color::Red))
      .wrap(Wrap { trim: true })
      .block(block),
    area,
  );
}

pub(crate) fn draw_message(f: &mut Frame, area: Rect, message: &str) {
  let block = bordered(" Padrón ");
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(message.to_owned()).style(Style::default().fg(Color::DarkGray)), inner);
}

pub(crate) fn draw_confirm(f: &mut Frame, area: Rect, confirm: &Confirm) {
  let text = match confirm {
    Confirm::Delete { name, .. } => format!("¿Eliminar a {name}? Esta acción no se puede deshacer."),
    Confirm::BulkDelete(ids) => format!("¿Eliminar {} registro(s) marcado(s)?", ids.len()),
    Confirm::DeleteZone { name, .. } => format!("¿Eliminar la zona \"{name}\"?"),
  };
  let area = centered(area, 60, 5);
  f.render_widget(Clear, area);
  f.render_widget(
    Paragraph::new(vec![
      Line::from(text),
      Line::from(""),
      Line::from(Span::styled("y: confirmar   otra tecla: cancelar", Style::default().fg(Color::DarkGray))),
    ])
    .wrap(Wrap { trim: true })
    .block(
      Block::default()
        .title(" Confirmar ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow)),
    ),
    area,
  );
}

pub(crate) fn bordered(title: &str) -> Block<'_> {
  Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray))
}

pub(crate) fn highlight() -> Style {
  Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
}

/// A `width` x `height` rectangle centred in `area`, clipped to fit.
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
    .flex(Flex::Center)
    .areas(area);
  let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
    .flex(Flex::Center)
    .areas(row);
  cell
}

pub(crate) fn loading_or_failed<T>(f: &mut Frame, area: Rect, state: &Loadable<T>) -> bool {
  match state {
    Loadable::Loading => {
      draw_message(f, area, "Cargando...");
      true
    }
    Loadable::Failed(message) => {
      draw_message(f, area, &format!("No se pudo cargar: {message}  (r para reintentar)"));
      true
    }
    Loadable::Ready(_) => false,
  }
}
