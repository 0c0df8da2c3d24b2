//! Declarative validation schemas for every form the registry accepts.
//!
//! A schema is a static table of per-field rules plus cross-field checks.
//! [`Schema::validate`] evaluates it against a raw field map and returns one
//! message per failing field: the first rule that fails, with the required
//! check always first. Malformed input never panics; looking up a schema by
//! an unknown name is the only error.

use std::{collections::BTreeMap, sync::LazyLock};

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Field name → user-facing message.
pub type FieldErrors = BTreeMap<String, String>;

// ─── Patterns ────────────────────────────────────────────────────────────────

static NATIONAL_ID_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[0-9]{8}$").expect("valid regex"));
static MOBILE_PHONE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^9[0-9]{8}$").expect("valid regex"));
static PERSON_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚñÑüÜ\s]+$").expect("valid regex")
});
static EMAIL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));
static LOWER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]").expect("valid regex"));
static UPPER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").expect("valid regex"));
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").expect("valid regex"));

/// Named formats a string field can be required to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
  /// Exactly eight ASCII digits.
  NationalId,
  /// Nine ASCII digits starting with `9`.
  MobilePhone,
  /// Latin letters (accented included) and whitespace.
  PersonName,
  Email,
  /// At least one lowercase letter, one uppercase letter and one digit.
  StrongPassword,
}

impl Pattern {
  pub fn is_match(self, s: &str) -> bool {
    match self {
      Self::NationalId => NATIONAL_ID_RE.is_match(s),
      Self::MobilePhone => MOBILE_PHONE_RE.is_match(s),
      Self::PersonName => PERSON_NAME_RE.is_match(s),
      Self::Email => EMAIL_RE.is_match(s),
      Self::StrongPassword => {
        LOWER_RE.is_match(s) && UPPER_RE.is_match(s) && DIGIT_RE.is_match(s)
      }
    }
  }
}

// ─── Rule tables ─────────────────────────────────────────────────────────────

/// A single check on one field's value. Only evaluated when the value is
/// present and non-empty.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
  MinChars(usize, &'static str),
  MaxChars(usize, &'static str),
  Matches(Pattern, &'static str),
  /// An ISO `YYYY-MM-DD` date (an RFC 3339 timestamp is also accepted).
  Date(&'static str),
  /// A boolean, or the strings `"true"` / `"false"`.
  Boolean(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
  pub field:    &'static str,
  /// Message when the field is missing, null or the empty string. `None`
  /// makes the field optional.
  pub required: Option<&'static str>,
  pub rules:    &'static [Rule],
}

/// A check spanning two fields. The error is blamed on `field`.
#[derive(Debug, Clone, Copy)]
pub enum CrossRule {
  /// `field` must equal `other`.
  SameAs { field: &'static str, other: &'static str, message: &'static str },
  /// The date in `field` must not be earlier than the date in `other`.
  NotBefore { field: &'static str, other: &'static str, message: &'static str },
}

#[derive(Debug)]
pub struct Schema {
  pub name:   &'static str,
  pub fields: &'static [FieldRule],
  pub cross:  &'static [CrossRule],
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Textual view of a raw value; numbers and booleans are read as strings.
fn as_text(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Number(n) => Some(n.to_string()),
    Value::Array(_) | Value::Object(_) => Some(String::new()),
  }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn check_rule(rule: &Rule, value: &Value, text: &str) -> Option<&'static str> {
  match *rule {
    Rule::MinChars(min, msg) => (text.chars().count() < min).then_some(msg),
    Rule::MaxChars(max, msg) => (text.chars().count() > max).then_some(msg),
    Rule::Matches(pattern, msg) => (!pattern.is_match(text)).then_some(msg),
    Rule::Date(msg) => parse_date(text).is_none().then_some(msg),
    Rule::Boolean(msg) => {
      let ok = matches!(value, Value::Bool(_)) || text == "true" || text == "false";
      (!ok).then_some(msg)
    }
  }
}

fn check_field(rule: &FieldRule, data: &Map<String, Value>) -> Option<&'static str> {
  let raw = data.get(rule.field);
  let text = as_text(raw).unwrap_or_default();

  if text.is_empty() && !matches!(raw, Some(Value::Array(_) | Value::Object(_))) {
    return rule.required;
  }
  let value = raw.unwrap_or(&Value::Null);
  rule.rules.iter().find_map(|r| check_rule(r, value, &text))
}

impl Schema {
  /// Validate `data` against this schema.
  pub fn validate(&self, data: &Map<String, Value>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    for rule in self.fields {
      if let Some(message) = check_field(rule, data) {
        errors.insert(rule.field.to_owned(), message.to_owned());
      }
    }

    for cross in self.cross {
      let (field, message, ok) = match *cross {
        CrossRule::SameAs { field, other, message } => {
          let ok = as_text(data.get(field)) == as_text(data.get(other));
          (field, message, ok)
        }
        CrossRule::NotBefore { field, other, message } => {
          let later = as_text(data.get(field)).as_deref().and_then(parse_date);
          let earlier = as_text(data.get(other)).as_deref().and_then(parse_date);
          let ok = match (later, earlier) {
            (Some(l), Some(e)) => l >= e,
            _ => true,
          };
          (field, message, ok)
        }
      };
      if !ok && !errors.contains_key(field) {
        errors.insert(field.to_owned(), message.to_owned());
      }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
  }
}

/// Build a field map from string pairs, as forms produce them.
pub fn string_map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Map<String, Value> {
  pairs
    .into_iter()
    .map(|(k, v)| (k.to_owned(), Value::String(v.to_owned())))
    .collect()
}

// ─── Schemas ─────────────────────────────────────────────────────────────────

const EMAIL_RULES: &[Rule] = &[Rule::Matches(Pattern::Email, "Correo electrónico inválido")];
const EMAIL_FIELD: FieldRule = FieldRule {
  field:    "email",
  required: Some("El correo electrónico es requerido"),
  rules:    EMAIL_RULES,
};
const STRONG_PASSWORD: Rule = Rule::Matches(
  Pattern::StrongPassword,
  "La contraseña debe contener al menos una mayúscula, una minúscula y un número",
);

pub static LOGIN: Schema = Schema {
  name:   "login",
  fields: &[
    EMAIL_FIELD,
    FieldRule {
      field:    "password",
      required: Some("La contraseña es requerida"),
      rules:    &[Rule::MinChars(6, "La contraseña debe tener al menos 6 caracteres")],
    },
  ],
  cross:  &[],
};

pub static REGISTRATION: Schema = Schema {
  name:   "registration",
  fields: &[
    FieldRule {
      field:    "displayName",
      required: Some("El nombre es requerido"),
      rules:    &[
        Rule::MinChars(3, "El nombre debe tener al menos 3 caracteres"),
        Rule::MaxChars(50, "El nombre no puede tener más de 50 caracteres"),
      ],
    },
    EMAIL_FIELD,
    FieldRule {
      field:    "password",
      required: Some("La contraseña es requerida"),
      rules:    &[
        Rule::MinChars(6, "La contraseña debe tener al menos 6 caracteres"),
        STRONG_PASSWORD,
      ],
    },
    FieldRule {
      field:    "confirmPassword",
      required: Some("Confirme su contraseña"),
      rules:    &[],
    },
  ],
  cross:  &[CrossRule::SameAs {
    field:   "confirmPassword",
    other:   "password",
    message: "Las contraseñas no coinciden",
  }],
};

pub static PASSWORD_RESET: Schema = Schema {
  name:   "passwordReset",
  fields: &[EMAIL_FIELD],
  cross:  &[],
};

pub static CHANGE_PASSWORD: Schema = Schema {
  name:   "changePassword",
  fields: &[
    FieldRule {
      field:    "currentPassword",
      required: Some("La contraseña actual es requerida"),
      rules:    &[],
    },
    FieldRule {
      field:    "newPassword",
      required: Some("La nueva contraseña es requerida"),
      rules:    &[
        Rule::MinChars(6, "La nueva contraseña debe tener al menos 6 caracteres"),
        STRONG_PASSWORD,
      ],
    },
    FieldRule {
      field:    "confirmNewPassword",
      required: Some("Confirme su nueva contraseña"),
      rules:    &[],
    },
  ],
  cross:  &[CrossRule::SameAs {
    field:   "confirmNewPassword",
    other:   "newPassword",
    message: "Las contraseñas no coinciden",
  }],
};

pub static PERSONNEL: Schema = Schema {
  name:   "personnel",
  fields: &[
    FieldRule {
      field:    "nationalId",
      required: Some("El DNI es requerido"),
      rules:    &[Rule::Matches(Pattern::NationalId, "El DNI debe tener exactamente 8 dígitos")],
    },
    FieldRule {
      field:    "givenNames",
      required: Some("Los nombres son requeridos"),
      rules:    &[
        Rule::MinChars(2, "Los nombres deben tener al menos 2 caracteres"),
        Rule::MaxChars(50, "Los nombres no pueden tener más de 50 caracteres"),
        Rule::Matches(Pattern::PersonName, "Los nombres solo pueden contener letras"),
      ],
    },
    FieldRule {
      field:    "surnames",
      required: Some("Los apellidos son requeridos"),
      rules:    &[
        Rule::MinChars(2, "Los apellidos deben tener al menos 2 caracteres"),
        Rule::MaxChars(50, "Los apellidos no pueden tener más de 50 caracteres"),
        Rule::Matches(Pattern::PersonName, "Los apellidos solo pueden contener letras"),
      ],
    },
    FieldRule {
      field:    "phone",
      required: Some("El celular es requerido"),
      rules:    &[Rule::Matches(
        Pattern::MobilePhone,
        "El celular debe empezar con 9 y tener 9 dígitos",
      )],
    },
    FieldRule {
      field:    "zoneName",
      required: Some("La zona es requerida"),
      rules:    &[],
    },
  ],
  cross:  &[],
};

pub static ZONE: Schema = Schema {
  name:   "zone",
  fields: &[
    FieldRule {
      field:    "name",
      required: Some("El nombre es requerido"),
      rules:    &[
        Rule::MinChars(3, "El nombre debe tener al menos 3 caracteres"),
        Rule::MaxChars(50, "El nombre no puede tener más de 50 caracteres"),
      ],
    },
    FieldRule {
      field:    "description",
      required: None,
      rules:    &[Rule::MaxChars(200, "La descripción no puede tener más de 200 caracteres")],
    },
  ],
  cross:  &[],
};

pub static CAMPAIGN: Schema = Schema {
  name:   "campaign",
  fields: &[
    FieldRule {
      field:    "name",
      required: Some("El nombre es requerido"),
      rules:    &[
        Rule::MinChars(3, "El nombre debe tener al menos 3 caracteres"),
        Rule::MaxChars(100, "El nombre no puede tener más de 100 caracteres"),
      ],
    },
    FieldRule {
      field:    "description",
      required: None,
      rules:    &[Rule::MaxChars(500, "La descripción no puede tener más de 500 caracteres")],
    },
    FieldRule {
      field:    "startDate",
      required: Some("La fecha de inicio es requerida"),
      rules:    &[Rule::Date("La fecha de inicio no es válida")],
    },
    FieldRule {
      field:    "endDate",
      required: Some("La fecha de fin es requerida"),
      rules:    &[Rule::Date("La fecha de fin no es válida")],
    },
    FieldRule {
      field:    "active",
      required: Some("El estado es requerido"),
      rules:    &[Rule::Boolean("El estado debe ser verdadero o falso")],
    },
  ],
  cross:  &[CrossRule::NotBefore {
    field:   "endDate",
    other:   "startDate",
    message: "La fecha de fin debe ser posterior a la de inicio",
  }],
};

static ALL: [&Schema; 7] = [
  &LOGIN,
  &REGISTRATION,
  &PASSWORD_RESET,
  &CHANGE_PASSWORD,
  &PERSONNEL,
  &ZONE,
  &CAMPAIGN,
];

/// Look a schema up by name.
pub fn schema(name: &str) -> Result<&'static Schema> {
  ALL
    .iter()
    .copied()
    .find(|s| s.name == name)
    .ok_or_else(|| Error::UnknownSchema(name.to_owned()))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn personnel(overrides: &[(&str, &str)]) -> Map<String, Value> {
    let mut data = string_map([
      ("nationalId", "12345678"),
      ("givenNames", "José María"),
      ("surnames", "Núñez Quispe"),
      ("phone", "987654321"),
      ("zoneName", "Zona Norte"),
    ]);
    for (k, v) in overrides {
      data.insert((*k).to_owned(), json!(v));
    }
    data
  }

  fn blamed(result: Result<(), FieldErrors>) -> Vec<String> {
    result.err().map(|e| e.into_keys().collect()).unwrap_or_default()
  }

  #[test]
  fn valid_personnel_passes() {
    assert_eq!(PERSONNEL.validate(&personnel(&[])), Ok(()));
  }

  #[test]
  fn national_id_boundary() {
    for ok in ["00000000", "12345678", "99999999"] {
      assert!(PERSONNEL.validate(&personnel(&[("nationalId", ok)])).is_ok(), "{ok}");
    }
    for bad in ["1234567", "123456789", "1234567a", " 12345678", "١٢٣٤٥٦٧٨", "12 45678"] {
      assert_eq!(
        blamed(PERSONNEL.validate(&personnel(&[("nationalId", bad)]))),
        vec!["nationalId"],
        "{bad}"
      );
    }
  }

  #[test]
  fn phone_boundary() {
    for ok in ["900000000", "987654321"] {
      assert!(PERSONNEL.validate(&personnel(&[("phone", ok)])).is_ok(), "{ok}");
    }
    for bad in ["887654321", "98765432", "9876543210", "9a7654321", "+51987654321"] {
      assert_eq!(blamed(PERSONNEL.validate(&personnel(&[("phone", bad)]))), vec!["phone"]);
    }
  }

  #[test]
  fn names_accept_accents_and_reject_digits() {
    assert!(PERSONNEL.validate(&personnel(&[("givenNames", "Ñuflo Üriel")])).is_ok());
    assert_eq!(
      blamed(PERSONNEL.validate(&personnel(&[("surnames", "Quispe2")]))),
      vec!["surnames"]
    );
    assert_eq!(
      blamed(PERSONNEL.validate(&personnel(&[("givenNames", "A")]))),
      vec!["givenNames"]
    );
  }

  #[test]
  fn missing_fields_are_required() {
    let errors = PERSONNEL.validate(&Map::new()).unwrap_err();
    assert_eq!(errors.len(), 5);
    assert_eq!(errors["nationalId"], "El DNI es requerido");
    assert_eq!(errors["zoneName"], "La zona es requerida");
  }

  #[test]
  fn numbers_are_read_as_text() {
    let mut data = personnel(&[]);
    data.insert("nationalId".into(), json!(12345678));
    assert!(PERSONNEL.validate(&data).is_ok());
  }

  #[test]
  fn zone_lengths_count_characters() {
    assert!(ZONE.validate(&string_map([("name", "Ñoñ")])).is_ok());
    assert_eq!(blamed(ZONE.validate(&string_map([("name", "Zo")]))), vec!["name"]);
    let long = "x".repeat(201);
    assert_eq!(
      blamed(ZONE.validate(&string_map([("name", "Zona"), ("description", &long)]))),
      vec!["description"]
    );
  }

  #[test]
  fn login_needs_six_characters() {
    assert!(LOGIN.validate(&string_map([("email", "a@b.pe"), ("password", "abcdef")])).is_ok());
    assert_eq!(
      blamed(LOGIN.validate(&string_map([("email", "a@b.pe"), ("password", "abc")]))),
      vec!["password"]
    );
    assert_eq!(
      blamed(LOGIN.validate(&string_map([("email", "nope"), ("password", "abcdef")]))),
      vec!["email"]
    );
  }

  #[test]
  fn registration_requires_strength_and_confirmation() {
    let base = [
      ("displayName", "Admin"),
      ("email", "admin@padron.pe"),
      ("password", "Secreto1"),
      ("confirmPassword", "Secreto1"),
    ];
    assert!(REGISTRATION.validate(&string_map(base)).is_ok());

    let mut weak = string_map(base);
    weak.insert("password".into(), json!("secreto1"));
    weak.insert("confirmPassword".into(), json!("secreto1"));
    assert_eq!(blamed(REGISTRATION.validate(&weak)), vec!["password"]);

    let mut mismatch = string_map(base);
    mismatch.insert("confirmPassword".into(), json!("Secreto2"));
    let errors = REGISTRATION.validate(&mismatch).unwrap_err();
    assert_eq!(errors["confirmPassword"], "Las contraseñas no coinciden");
  }

  #[test]
  fn change_password_blames_confirmation() {
    let errors = CHANGE_PASSWORD
      .validate(&string_map([
        ("currentPassword", "old"),
        ("newPassword", "Nuevo123"),
        ("confirmNewPassword", "Nuevo124"),
      ]))
      .unwrap_err();
    assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["confirmNewPassword"]);
  }

  #[test]
  fn campaign_end_must_not_precede_start() {
    let mut data = string_map([
      ("name", "Campaña 2024"),
      ("startDate", "2024-05-01"),
      ("endDate", "2024-05-01"),
    ]);
    data.insert("active".into(), json!(true));
    assert!(CAMPAIGN.validate(&data).is_ok());

    data.insert("endDate".into(), json!("2024-04-30"));
    assert_eq!(blamed(CAMPAIGN.validate(&data)), vec!["endDate"]);

    data.insert("endDate".into(), json!("not a date"));
    assert_eq!(
      CAMPAIGN.validate(&data).unwrap_err()["endDate"],
      "La fecha de fin no es válida"
    );
  }

  #[test]
  fn schemas_are_found_by_name() {
    assert_eq!(schema("zone").unwrap().name, "zone");
    assert!(matches!(schema("socio"), Err(Error::UnknownSchema(n)) if n == "socio"));
  }
}
