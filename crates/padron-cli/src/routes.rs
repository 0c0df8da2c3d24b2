//! Route table, guarded routing and the side menu.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Login,
  Dashboard,
  Personnel,
  PersonnelNew,
  PersonnelEdit(String),
  PersonnelView(String),
  Zones,
}

impl Route {
  /// Resolve a path. Anything unmatched lands on the dashboard.
  pub fn parse(path: &str) -> Self {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
      ["login"] => Self::Login,
      ["dashboard"] => Self::Dashboard,
      ["personal"] => Self::Personnel,
      ["personal", "nuevo"] => Self::PersonnelNew,
      ["personal", "editar", id] => Self::PersonnelEdit((*id).to_owned()),
      ["personal", "ver", id] => Self::PersonnelView((*id).to_owned()),
      ["zonas"] => Self::Zones,
      _ => Self::Dashboard,
    }
  }

  pub fn path(&self) -> String {
    match self {
      Self::Login => "/login".into(),
      Self::Dashboard => "/dashboard".into(),
      Self::Personnel => "/personal".into(),
      Self::PersonnelNew => "/personal/nuevo".into(),
      Self::PersonnelEdit(id) => format!("/personal/editar/{id}"),
      Self::PersonnelView(id) => format!("/personal/ver/{id}"),
      Self::Zones => "/zonas".into(),
    }
  }

  pub fn requires_session(&self) -> bool { !matches!(self, Self::Login) }

  /// Where navigation actually lands given whether someone is signed in.
  pub fn guard(self, signed_in: bool) -> Self {
    match self {
      Self::Login if signed_in => Self::Dashboard,
      route if route.requires_session() && !signed_in => Self::Login,
      route => route,
    }
  }

  /// The menu entry this route highlights.
  pub fn section(&self) -> Option<usize> {
    match self {
      Self::Dashboard => Some(0),
      Self::Personnel | Self::PersonnelNew | Self::PersonnelEdit(_) | Self::PersonnelView(_) => {
        Some(1)
      }
      Self::Zones => Some(2),
      Self::Login => None,
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      Self::Login => "Iniciar sesión",
      Self::Dashboard => "Inicio",
      Self::Personnel => "Personal",
      Self::PersonnelNew => "Nuevo personal",
      Self::PersonnelEdit(_) => "Editar personal",
      Self::PersonnelView(_) => "Ver personal",
      Self::Zones => "Zonas",
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.path()) }
}

/// Side menu entries, in display order.
pub const MENU: [(&str, &str); 3] = [
  ("Inicio", "/dashboard"),
  ("Personal", "/personal"),
  ("Zonas", "/zonas"),
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn paths_round_trip() {
    for route in [
      Route::Login,
      Route::Dashboard,
      Route::Personnel,
      Route::PersonnelNew,
      Route::PersonnelEdit("abc".into()),
      Route::PersonnelView("abc".into()),
      Route::Zones,
    ] {
      assert_eq!(Route::parse(&route.path()), route);
    }
  }

  #[test]
  fn unmatched_paths_go_to_the_dashboard() {
    assert_eq!(Route::parse("/"), Route::Dashboard);
    assert_eq!(Route::parse("/campañas"), Route::Dashboard);
    assert_eq!(Route::parse("/personal/editar"), Route::Dashboard);
  }

  #[test]
  fn guard_redirects_by_session() {
    assert_eq!(Route::Zones.guard(false), Route::Login);
    assert_eq!(Route::Zones.guard(true), Route::Zones);
    assert_eq!(Route::Login.guard(true), Route::Dashboard);
    assert_eq!(Route::Login.guard(false), Route::Login);
  }

  #[test]
  fn menu_sections_match_routes() {
    for (i, (_, path)) in MENU.iter().enumerate() {
      assert_eq!(Route::parse(path).section(), Some(i));
    }
    assert_eq!(Route::PersonnelEdit("x".into()).section(), Some(1));
  }
}
