//! Login and password-reset screen.

use ratatui::{Frame, layout::Rect};

use super::{centered, form};
use crate::app::LoginScreen;

pub fn draw(f: &mut Frame, area: Rect, login: &LoginScreen) {
  let area = centered(area, 64, 9);
  match &login.reset {
    Some(reset) => form::draw(f, area, reset, " Restablecer contraseña "),
    None => form::draw(f, area, &login.form, " Iniciar sesión "),
  }
}
