//! Record form controller.
//!
//! A [`Form`] binds a list of input fields to a validation schema. Submit
//! validates the whole schema first and only then hands the field map to
//! the caller; while that submit is in flight the form refuses another.
//! The typed forms below wrap it for each screen.

use crossterm::event::{KeyCode, KeyEvent};
use padron_core::{
  personnel::{NewPersonnel, Personnel, PersonnelPatch, PersonnelStatus},
  store::Fields,
  validate::{self, FieldErrors, Schema},
  zone::{NewZone, Zone, ZonePatch},
};
use padron_gateway::GatewayError;
use serde::de::DeserializeOwned;
use serde_json::Value;

// ─── Fields ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  /// Rendered masked.
  Secret,
  /// One of a fixed list of `(value, label)` options.
  Choice(Vec<(String, String)>),
  /// A boolean toggle, stored as `"true"` / `"false"`.
  Flag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
  pub name:  &'static str,
  pub label: &'static str,
  pub kind:  FieldKind,
  pub value: String,
}

impl FormField {
  pub fn text(name: &'static str, label: &'static str) -> Self {
    Self { name, label, kind: FieldKind::Text, value: String::new() }
  }

  pub fn secret(name: &'static str, label: &'static str) -> Self {
    Self { name, label, kind: FieldKind::Secret, value: String::new() }
  }

  pub fn flag(name: &'static str, label: &'static str, on: bool) -> Self {
    Self { name, label, kind: FieldKind::Flag, value: on.to_string() }
  }

  pub fn choice(name: &'static str, label: &'static str, options: Vec<(String, String)>) -> Self {
    let value = options.first().map(|(v, _)| v.clone()).unwrap_or_default();
    Self { name, label, kind: FieldKind::Choice(options), value }
  }

  pub fn with_value(mut self, value: impl Into<String>) -> Self {
    self.value = value.into();
    self
  }

  /// What the UI shows for the current value.
  pub fn display(&self) -> String {
    match &self.kind {
      FieldKind::Secret => "•".repeat(self.value.chars().count()),
      FieldKind::Flag => (if self.value == "true" { "Sí" } else { "No" }).to_owned(),
      FieldKind::Choice(options) => options
        .iter()
        .find(|(v, _)| *v == self.value)
        .map(|(_, label)| label.clone())
        .unwrap_or_else(|| self.value.clone()),
      FieldKind::Text => self.value.clone(),
    }
  }

  fn cycle(&mut self, forward: bool) {
    match &self.kind {
      FieldKind::Flag => {
        self.value = (self.value != "true").to_string();
      }
      FieldKind::Choice(options) if !options.is_empty() => {
        let len = options.len();
        let at = options.iter().position(|(v, _)| *v == self.value);
        let next = match (at, forward) {
          (None, _) => 0,
          (Some(i), true) => (i + 1) % len,
          (Some(i), false) => (i + len - 1) % len,
        };
        self.value = options[next].0.clone();
      }
      _ => {}
    }
  }

  fn typed(&self) -> bool { matches!(self.kind, FieldKind::Text | FieldKind::Secret) }
}

// ─── Form ────────────────────────────────────────────────────────────────────

/// What a key did to a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormInput {
  Edited,
  Moved,
  Submit,
  Cancel,
  Ignored,
}

/// Result of [`Form::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submit {
  /// Valid; the caller should start the gateway call.
  Ready(Fields),
  /// Errors are now shown inline. Nothing should be sent.
  Invalid,
  /// A submit is already in flight.
  Busy,
}

#[derive(Debug, Clone)]
pub struct Form {
  schema:     &'static Schema,
  fields:     Vec<FormField>,
  focus:      usize,
  errors:     FieldErrors,
  submitting: bool,
  read_only:  bool,
}

impl Form {
  pub fn new(schema: &'static Schema, fields: Vec<FormField>) -> Self {
    Self {
      schema,
      fields,
      focus: 0,
      errors: FieldErrors::new(),
      submitting: false,
      read_only: false,
    }
  }

  pub fn read_only(mut self) -> Self {
    self.read_only = true;
    self
  }

  pub fn is_read_only(&self) -> bool { self.read_only }

  pub fn fields(&self) -> &[FormField] { &self.fields }

  pub fn focus(&self) -> usize { self.focus }

  pub fn is_submitting(&self) -> bool { self.submitting }

  pub fn errors(&self) -> &FieldErrors { &self.errors }

  pub fn error(&self, name: &str) -> Option<&str> { self.errors.get(name).map(String::as_str) }

  pub fn value(&self, name: &str) -> &str {
    self
      .fields
      .iter()
      .find(|f| f.name == name)
      .map(|f| f.value.as_str())
      .unwrap_or_default()
  }

  /// Set a field and clear its error.
  pub fn set(&mut self, name: &str, value: impl Into<String>) {
    if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
      field.value = value.into();
      self.errors.remove(name);
    }
  }

  pub fn field_mut(&mut self, name: &str) -> Option<&mut FormField> {
    self.fields.iter_mut().find(|f| f.name == name)
  }

  pub fn focused_name(&self) -> Option<&'static str> { self.fields.get(self.focus).map(|f| f.name) }

  /// The field map the schema sees: flags as booleans, everything else as
  /// strings.
  pub fn data(&self) -> Fields {
    self
      .fields
      .iter()
      .map(|f| {
        let value = match f.kind {
          FieldKind::Flag => Value::Bool(f.value == "true"),
          _ => Value::String(f.value.clone()),
        };
        (f.name.to_owned(), value)
      })
      .collect()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> FormInput {
    let len = self.fields.len().max(1);
    match key.code {
      KeyCode::Esc => FormInput::Cancel,
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % len;
        FormInput::Moved
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = (self.focus + len - 1) % len;
        FormInput::Moved
      }
      _ if self.read_only => FormInput::Ignored,
      KeyCode::Enter => FormInput::Submit,
      code => {
        let Some(field) = self.fields.get_mut(self.focus) else {
          return FormInput::Ignored;
        };
        let edited = match code {
          KeyCode::Char(c) if field.typed() => {
            field.value.push(c);
            true
          }
          KeyCode::Backspace if field.typed() => field.value.pop().is_some(),
          KeyCode::Left => {
            field.cycle(false);
            !field.typed()
          }
          KeyCode::Right | KeyCode::Char(' ') => {
            field.cycle(true);
            !field.typed()
          }
          _ => false,
        };
        if edited {
          let name = field.name;
          self.errors.remove(name);
          FormInput::Edited
        } else {
          FormInput::Ignored
        }
      }
    }
  }

  /// Validate the full schema and, if it passes, mark the form in flight.
  pub fn submit(&mut self) -> Submit {
    if self.submitting {
      return Submit::Busy;
    }
    let data = self.data();
    match self.schema.validate(&data) {
      Ok(()) => {
        self.errors.clear();
        self.submitting = true;
        Submit::Ready(data)
      }
      Err(errors) => {
        self.errors = errors;
        Submit::Invalid
      }
    }
  }

  /// Record how the in-flight submit ended. Validation failures from the
  /// gateway land inline; any other error is returned for the banner.
  pub fn finish<T>(&mut self, result: &Result<T, GatewayError>) -> Option<String> {
    self.submitting = false;
    match result {
      Ok(_) => None,
      Err(GatewayError::ValidationFailed(errors)) => {
        self.errors = errors.clone();
        None
      }
      Err(e) => Some(e.to_string()),
    }
  }
}

fn decode<T: DeserializeOwned>(fields: Fields) -> Result<T, GatewayError> {
  serde_json::from_value(Value::Object(fields))
    .map_err(|e| GatewayError::from(padron_core::Error::from(e)))
}

fn non_empty(s: &str) -> Option<String> {
  let s = s.trim();
  (!s.is_empty()).then(|| s.to_owned())
}

// ─── Login ───────────────────────────────────────────────────────────────────

pub fn login_form() -> Form {
  Form::new(
    &validate::LOGIN,
    vec![
      FormField::text("email", "Correo electrónico"),
      FormField::secret("password", "Contraseña"),
    ],
  )
}

pub fn password_reset_form(email: &str) -> Form {
  Form::new(
    &validate::PASSWORD_RESET,
    vec![FormField::text("email", "Correo electrónico").with_value(email)],
  )
}

pub fn change_password_form() -> Form {
  Form::new(
    &validate::CHANGE_PASSWORD,
    vec![
      FormField::secret("currentPassword", "Contraseña actual"),
      FormField::secret("newPassword", "Nueva contraseña"),
      FormField::secret("confirmNewPassword", "Confirmar contraseña"),
    ],
  )
}

// ─── Zones ───────────────────────────────────────────────────────────────────

fn zone_fields(zone: Option<&Zone>, with_active: bool) -> Vec<FormField> {
  let mut fields = vec![
    FormField::text("name", "Nombre").with_value(zone.map(|z| z.name.clone()).unwrap_or_default()),
    FormField::text("description", "Descripción")
      .with_value(zone.and_then(|z| z.description.clone()).unwrap_or_default()),
  ];
  if with_active {
    fields.push(FormField::flag("active", "Activa", zone.is_none_or(|z| z.active)));
  }
  fields
}

/// The zone manager's create/edit form.
#[derive(Debug, Clone)]
pub struct ZoneForm {
  /// `None` when creating.
  pub id:   Option<String>,
  pub form: Form,
}

impl ZoneForm {
  pub fn create() -> Self { Self { id: None, form: Form::new(&validate::ZONE, zone_fields(None, true)) } }

  pub fn edit(zone: &Zone) -> Self {
    Self {
      id:   Some(zone.id.clone()),
      form: Form::new(&validate::ZONE, zone_fields(Some(zone), true)),
    }
  }

  pub fn draft(fields: &Fields) -> NewZone {
    NewZone {
      name:        text(fields, "name").trim().to_owned(),
      description: non_empty(text(fields, "description")),
      active:      fields.get("active").and_then(Value::as_bool),
    }
  }

  pub fn patch(fields: &Fields) -> ZonePatch {
    let NewZone { name, description, active } = Self::draft(fields);
    ZonePatch {
      name: Some(name),
      description: Some(description),
      active,
    }
  }
}

fn text<'a>(fields: &'a Fields, name: &str) -> &'a str {
  fields.get(name).and_then(Value::as_str).unwrap_or_default()
}

// ─── Personnel ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
  New,
  Edit(String),
  View(String),
}

/// The personnel screen's form, with its inline "new zone" sub-form.
#[derive(Debug, Clone)]
pub struct PersonnelForm {
  pub mode:      FormMode,
  pub form:      Form,
  pub zone_form: Option<Form>,
}

fn status_options() -> Vec<(String, String)> {
  [PersonnelStatus::Active, PersonnelStatus::Inactive]
    .into_iter()
    .map(|s| (s.to_string(), s.label().to_owned()))
    .collect()
}

fn zone_options<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<(String, String)> {
  let mut options = vec![(String::new(), "Seleccione una zona".to_owned())];
  for name in names {
    if !options.iter().any(|(v, _)| v == name) {
      options.push((name.to_owned(), name.to_owned()));
    }
  }
  options
}

impl PersonnelForm {
  fn build(mode: FormMode, record: Option<&Personnel>, zones: &[Zone]) -> Self {
    let get = |value: Option<&String>| value.cloned().unwrap_or_default();
    let current_zone = record.and_then(|r| r.zone_name.as_deref());
    let names = zones
      .iter()
      .filter(|z| z.active)
      .map(|z| z.name.as_str())
      .chain(current_zone);

    let form = Form::new(
      &validate::PERSONNEL,
      vec![
        FormField::text("nationalId", "DNI").with_value(get(record.map(|r| &r.national_id))),
        FormField::text("givenNames", "Nombres").with_value(get(record.map(|r| &r.given_names))),
        FormField::text("surnames", "Apellidos").with_value(get(record.map(|r| &r.surnames))),
        FormField::text("phone", "Celular").with_value(get(record.map(|r| &r.phone))),
        FormField::choice("zoneName", "Zona", zone_options(names))
          .with_value(current_zone.unwrap_or_default()),
        FormField::choice("status", "Estado", status_options())
          .with_value(record.map(|r| r.status).unwrap_or_default().to_string()),
      ],
    );
    let form = if matches!(mode, FormMode::View(_)) { form.read_only() } else { form };
    Self { mode, form, zone_form: None }
  }

  pub fn create(zones: &[Zone]) -> Self { Self::build(FormMode::New, None, zones) }

  pub fn edit(record: &Personnel, zones: &[Zone]) -> Self {
    Self::build(FormMode::Edit(record.id.clone()), Some(record), zones)
  }

  pub fn view(record: &Personnel, zones: &[Zone]) -> Self {
    Self::build(FormMode::View(record.id.clone()), Some(record), zones)
  }

  pub fn open_zone_form(&mut self) {
    if !self.form.is_read_only() {
      self.zone_form = Some(Form::new(&validate::ZONE, zone_fields(None, false)));
    }
  }

  /// Add a just-created zone to the options and select it, without a
  /// round trip for the zone list.
  pub fn zone_created(&mut self, zone: &Zone) {
    self.zone_form = None;
    if let Some(field) = self.form.field_mut("zoneName") {
      if let FieldKind::Choice(options) = &mut field.kind
        && !options.iter().any(|(v, _)| *v == zone.name)
      {
        options.push((zone.name.clone(), zone.name.clone()));
      }
    }
    self.form.set("zoneName", zone.name.clone());
  }

  pub fn zone_options(&self) -> Vec<String> {
    self
      .form
      .fields()
      .iter()
      .find(|f| f.name == "zoneName")
      .and_then(|f| match &f.kind {
        FieldKind::Choice(options) => Some(
          options
            .iter()
            .filter(|(v, _)| !v.is_empty())
            .map(|(v, _)| v.clone())
            .collect(),
        ),
        _ => None,
      })
      .unwrap_or_default()
  }

  pub fn draft(fields: Fields) -> Result<NewPersonnel, GatewayError> { decode(fields) }

  pub fn patch(fields: Fields) -> Result<PersonnelPatch, GatewayError> { decode(fields) }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use crossterm::event::KeyModifiers;

  use super::*;

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  fn type_text(form: &mut Form, text: &str) {
    for c in text.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn zone(name: &str, active: bool) -> Zone {
    Zone {
      id: format!("z-{name}"),
      name: name.into(),
      description: None,
      active,
      created_at: Utc::now(),
      updated_at: Utc::now(),
      created_by: None,
      updated_by: None,
    }
  }

  #[test]
  fn invalid_submit_shows_errors_and_sends_nothing() {
    let mut form = login_form();
    type_text(&mut form, "not-an-email");
    assert_eq!(form.submit(), Submit::Invalid);
    assert!(form.error("email").is_some());
    assert!(form.error("password").is_some());
    assert!(!form.is_submitting());
  }

  #[test]
  fn in_flight_submit_refuses_another() {
    let mut form = login_form();
    type_text(&mut form, "ana@example.com");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "secreto1");

    assert!(matches!(form.submit(), Submit::Ready(_)));
    assert_eq!(form.submit(), Submit::Busy);

    form.finish::<()>(&Ok(()));
    assert!(matches!(form.submit(), Submit::Ready(_)));
  }

  #[test]
  fn gateway_validation_errors_land_inline() {
    let mut form = login_form();
    let mut errors = FieldErrors::new();
    errors.insert("email".into(), "Correo electrónico inválido".into());
    let banner = form.finish::<()>(&Err(GatewayError::ValidationFailed(errors)));
    assert_eq!(banner, None);
    assert_eq!(form.error("email"), Some("Correo electrónico inválido"));

    let banner = form.finish::<()>(&Err(GatewayError::RemoteWriteFailed("x".into())));
    assert_eq!(banner.as_deref(), Some("x"));
  }

  #[test]
  fn typing_clears_that_fields_error() {
    let mut form = login_form();
    form.submit();
    assert!(form.error("email").is_some());
    type_text(&mut form, "a");
    assert!(form.error("email").is_none());
    assert!(form.error("password").is_some());
  }

  #[test]
  fn quick_zone_is_added_and_selected() {
    let mut pf = PersonnelForm::create(&[zone("Zona Norte", true), zone("Zona Vieja", false)]);
    assert_eq!(pf.zone_options(), vec!["Zona Norte".to_owned()]);

    pf.open_zone_form();
    assert!(pf.zone_form.is_some());
    pf.zone_created(&zone("Zona Sur", true));

    assert!(pf.zone_form.is_none());
    assert_eq!(pf.zone_options(), vec!["Zona Norte".to_owned(), "Zona Sur".to_owned()]);
    assert_eq!(pf.form.value("zoneName"), "Zona Sur");
  }

  #[test]
  fn personnel_form_builds_a_draft() {
    let mut pf = PersonnelForm::create(&[zone("Zona Norte", true)]);
    for (name, value) in [
      ("nationalId", "12345678"),
      ("givenNames", "Ana María"),
      ("surnames", "Quispe"),
      ("phone", "912345678"),
      ("zoneName", "Zona Norte"),
    ] {
      pf.form.set(name, value);
    }
    let Submit::Ready(fields) = pf.form.submit() else {
      panic!("form should be valid: {:?}", pf.form.errors());
    };
    let draft = PersonnelForm::draft(fields).unwrap();
    assert_eq!(draft.zone_name, "Zona Norte");
    assert_eq!(draft.status, Some(PersonnelStatus::Active));
  }

  #[test]
  fn view_mode_is_read_only() {
    let record = Personnel {
      id:          "p1".into(),
      national_id: "12345678".into(),
      given_names: "Ana".into(),
      surnames:    "Quispe".into(),
      phone:       "912345678".into(),
      zone_name:   Some("Zona Retirada".into()),
      status:      PersonnelStatus::Inactive,
      created_at:  Utc::now(),
      updated_at:  Utc::now(),
      created_by:  None,
      updated_by:  None,
    };
    let mut pf = PersonnelForm::view(&record, &[]);
    assert_eq!(pf.form.handle_key(key(KeyCode::Char('x'))), FormInput::Ignored);
    assert_eq!(pf.form.handle_key(key(KeyCode::Enter)), FormInput::Ignored);
    assert_eq!(pf.form.value("givenNames"), "Ana");
    // A dangling zone name still shows.
    assert_eq!(pf.zone_options(), vec!["Zona Retirada".to_owned()]);
    pf.open_zone_form();
    assert!(pf.zone_form.is_none());
  }

  #[test]
  fn zone_form_maps_blank_description_to_none() {
    let mut zf = ZoneForm::create();
    zf.form.set("name", "Zona Centro");
    let Submit::Ready(fields) = zf.form.submit() else { panic!("valid") };
    let draft = ZoneForm::draft(&fields);
    assert_eq!(draft.description, None);
    assert_eq!(draft.active, Some(true));
  }

  #[test]
  fn zone_edit_with_blank_description_clears_it() {
    let at = chrono::Utc::now();
    let zone = Zone {
      id:          "z1".into(),
      name:        "Zona Centro".into(),
      description: Some("Plaza de armas".into()),
      active:      true,
      created_at:  at,
      updated_at:  at,
      created_by:  None,
      updated_by:  None,
    };
    let mut zf = ZoneForm::edit(&zone);
    zf.form.set("description", "   ");
    let Submit::Ready(fields) = zf.form.submit() else { panic!("valid") };
    let patch = ZoneForm::patch(&fields);
    assert_eq!(patch.description, Some(None));
    assert_eq!(patch.name.as_deref(), Some("Zona Centro"));
  }

  #[test]
  fn flags_and_choices_cycle() {
    let mut f = FormField::flag("active", "Activa", true);
    f.cycle(true);
    assert_eq!(f.value, "false");
    assert_eq!(f.display(), "No");

    let mut c = FormField::choice("status", "Estado", status_options());
    assert_eq!(c.value, "active");
    c.cycle(false);
    assert_eq!(c.value, "inactive");
    assert_eq!(c.display(), "Inactivo");
  }
}
