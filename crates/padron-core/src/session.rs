//! The authenticated identity of the current user.

use serde::{Deserialize, Serialize};

/// Who is signed in. Owned by the identity provider; clients only mirror it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub uid:          String,
  pub email:        String,
  #[serde(default)]
  pub display_name: Option<String>,
}

impl Session {
  /// Display name, falling back to the email address.
  pub fn label(&self) -> &str {
    self.display_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.email)
  }
}
