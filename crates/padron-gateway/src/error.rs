//! The gateway error taxonomy and the provider-code lookup table.

use padron_core::{
  store::{BackendError, code},
  validate::FieldErrors,
};
use thiserror::Error;

/// Fallback for codes missing from the table and for failures with no code.
pub const GENERIC_MESSAGE: &str = "Ha ocurrido un error inesperado";

/// Classification of a [`GatewayError`], as used by the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  ValidationFailed,
  Unauthenticated,
  NotFound,
  RemoteWriteFailed,
  ZoneInUse,
  Unknown,
}

/// Every way a gateway call can fail. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
  #[error("Hay campos con errores")]
  ValidationFailed(FieldErrors),

  #[error("{0}")]
  Unauthenticated(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  RemoteWriteFailed(String),

  #[error(
    "No se puede eliminar la zona \"{zone}\" porque tiene {count} personal(es) asociado(s)"
  )]
  ZoneInUse { zone: String, count: usize },

  #[error("{0}")]
  Unknown(String),
}

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

impl GatewayError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
      Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::RemoteWriteFailed(_) => ErrorKind::RemoteWriteFailed,
      Self::ZoneInUse { .. } => ErrorKind::ZoneInUse,
      Self::Unknown(_) => ErrorKind::Unknown,
    }
  }

  pub fn not_signed_in() -> Self { Self::Unauthenticated("Usuario no autenticado".to_owned()) }

  fn from_kind(kind: ErrorKind, message: &str) -> Self {
    let message = message.to_owned();
    match kind {
      ErrorKind::Unauthenticated => Self::Unauthenticated(message),
      ErrorKind::NotFound => Self::NotFound(message),
      ErrorKind::RemoteWriteFailed => Self::RemoteWriteFailed(message),
      ErrorKind::ValidationFailed | ErrorKind::ZoneInUse | ErrorKind::Unknown => {
        Self::Unknown(message)
      }
    }
  }
}

impl From<padron_core::Error> for GatewayError {
  fn from(e: padron_core::Error) -> Self {
    tracing::error!(error = %e, "record conversion failed");
    Self::Unknown(GENERIC_MESSAGE.to_owned())
  }
}

// ─── Lookup table ────────────────────────────────────────────────────────────

const TABLE: &[(&str, ErrorKind, &str)] = &[
  (code::NOT_FOUND, ErrorKind::NotFound, "El registro no fue encontrado"),
  (
    code::PERMISSION_DENIED,
    ErrorKind::RemoteWriteFailed,
    "No tienes permisos para realizar esta operación",
  ),
  (code::UNAUTHENTICATED, ErrorKind::Unauthenticated, "Usuario no autenticado"),
  (
    code::UNAVAILABLE,
    ErrorKind::RemoteWriteFailed,
    "Servicio no disponible. Por favor, intenta más tarde",
  ),
  (
    code::FAILED_PRECONDITION,
    ErrorKind::RemoteWriteFailed,
    "Error en la operación. Verifica los datos",
  ),
  (code::INVALID_ARGUMENT, ErrorKind::RemoteWriteFailed, "Datos inválidos proporcionados"),
  (
    code::AUTH_EMAIL_IN_USE,
    ErrorKind::RemoteWriteFailed,
    "Este correo electrónico ya está registrado",
  ),
  (code::AUTH_INVALID_EMAIL, ErrorKind::RemoteWriteFailed, "El correo electrónico no es válido"),
  (
    code::AUTH_WEAK_PASSWORD,
    ErrorKind::RemoteWriteFailed,
    "La contraseña debe tener al menos 6 caracteres",
  ),
  (code::AUTH_USER_DISABLED, ErrorKind::Unauthenticated, "Esta cuenta ha sido deshabilitada"),
  (
    code::AUTH_USER_NOT_FOUND,
    ErrorKind::Unauthenticated,
    "No existe una cuenta con este correo electrónico",
  ),
  (code::AUTH_WRONG_PASSWORD, ErrorKind::Unauthenticated, "Contraseña incorrecta"),
  (code::AUTH_INVALID_CREDENTIAL, ErrorKind::Unauthenticated, "Credenciales inválidas"),
  (
    code::AUTH_REQUIRES_RECENT_LOGIN,
    ErrorKind::Unauthenticated,
    "Por favor, vuelva a iniciar sesión para realizar esta operación",
  ),
  (
    code::AUTH_NETWORK_FAILED,
    ErrorKind::Unknown,
    "Error de conexión. Por favor, verifique su conexión a internet",
  ),
];

/// Look a provider code up in the table.
pub fn lookup(code: &str) -> Option<(ErrorKind, &'static str)> {
  TABLE
    .iter()
    .find(|(c, ..)| *c == code)
    .map(|&(_, kind, message)| (kind, message))
}

/// Translate a backend failure. Unmapped or missing codes become
/// [`GatewayError::Unknown`] with the generic message.
pub fn translate<E: BackendError>(err: E) -> GatewayError {
  let code = err.code().map(str::to_owned);
  tracing::warn!(error = %err, code = ?code, "backend call failed");
  match code.as_deref().and_then(lookup) {
    Some((kind, message)) => GatewayError::from_kind(kind, message),
    None => GatewayError::Unknown(GENERIC_MESSAGE.to_owned()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Error)]
  #[error("backend said {0:?}")]
  struct Coded(Option<&'static str>);

  impl BackendError for Coded {
    fn code(&self) -> Option<&str> { self.0 }
  }

  #[test]
  fn mapped_codes_keep_their_kind() {
    let e = translate(Coded(Some(code::PERMISSION_DENIED)));
    assert_eq!(e.kind(), ErrorKind::RemoteWriteFailed);
    assert_eq!(e.to_string(), "No tienes permisos para realizar esta operación");

    let e = translate(Coded(Some(code::AUTH_WRONG_PASSWORD)));
    assert_eq!(e, GatewayError::Unauthenticated("Contraseña incorrecta".into()));
  }

  #[test]
  fn unmapped_codes_fall_back() {
    for c in [Some("resource-exhausted"), None] {
      assert_eq!(translate(Coded(c)), GatewayError::Unknown(GENERIC_MESSAGE.into()));
    }
  }

  #[test]
  fn zone_in_use_names_the_zone() {
    let e = GatewayError::ZoneInUse { zone: "Zona Sur".into(), count: 2 };
    assert!(e.to_string().contains("\"Zona Sur\""));
    assert!(e.to_string().contains("2 personal(es)"));
  }
}
