//! Application state machine and event dispatcher.
//!
//! The UI task owns the [`App`]. Gateway calls run as spawned tokio tasks
//! and report back over an mpsc channel; every result carries the view
//! generation it was issued from and is dropped if the user has navigated
//! since.

use std::future::Future;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use padron_core::{
  identity::IdentityProvider,
  listing::{ListFilter, ListView, Listable, PAGE_SIZES},
  personnel::{Personnel, PersonnelStatus},
  session::Session,
  store::DocumentStore,
  zone::{Zone, ZonePatch},
};
use padron_gateway::{Dashboard, GatewayError, Gateways, Result};
use tokio::sync::mpsc;

use crate::{
  form::{
    Form, FormInput, FormMode, PersonnelForm, Submit, ZoneForm, change_password_form,
    login_form, password_reset_form,
  },
  routes::{MENU, Route},
  session::{AuthState, SessionHolder},
};

/// Columns the personnel list sorts by, bound to keys `1`..`7`.
pub const PERSONNEL_SORT: [&str; 7] = [
  "givenNames",
  "surnames",
  "nationalId",
  "phone",
  "zoneName",
  "status",
  "createdAt",
];

/// Columns the zone list sorts by, bound to keys `1`..`4`.
pub const ZONE_SORT: [&str; 4] = ["name", "description", "active", "createdAt"];

// ─── Screens ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
  Loading,
  Ready(T),
  Failed(String),
}

impl<T> Loadable<T> {
  pub fn ready(&self) -> Option<&T> {
    match self {
      Self::Ready(v) => Some(v),
      _ => None,
    }
  }

  fn ready_mut(&mut self) -> Option<&mut T> {
    match self {
      Self::Ready(v) => Some(v),
      _ => None,
    }
  }
}

/// A pending destructive action waiting for `y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
  Delete { id: String, name: String },
  BulkDelete(Vec<String>),
  DeleteZone { id: String, name: String },
}

/// Filter, sort, page and cursor state of one list screen.
#[derive(Debug, Default)]
pub struct ListPane {
  pub view:   ListView,
  pub cursor: usize,
  /// The search term is being typed.
  pub typing: bool,
}

impl ListPane {
  pub fn sorted_by(field: &str) -> Self {
    let mut pane = Self::default();
    pane.view.sort_by(field);
    pane
  }

  pub fn current<'a, T: Listable>(&self, records: &'a [T]) -> Option<&'a T> {
    self.view.render(records).rows.get(self.cursor).copied()
  }

  /// Keys shared by every list. Returns `false` if the key was not used.
  fn handle_key<T: Listable>(&mut self, key: KeyEvent, records: &[T], sort: &[&str]) -> bool {
    if self.typing {
      match key.code {
        KeyCode::Esc => {
          self.typing = false;
          self.view.filter.term.clear();
        }
        KeyCode::Enter => self.typing = false,
        KeyCode::Backspace => {
          self.view.filter.term.pop();
        }
        KeyCode::Char(c) => self.view.filter.term.push(c),
        _ => return false,
      }
      self.clamp(records);
      return true;
    }

    let page = self.view.render(records);
    match key.code {
      KeyCode::Down | KeyCode::Char('j') => {
        if self.cursor + 1 < page.rows.len() {
          self.cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
      KeyCode::Right | KeyCode::Char(']') => {
        if self.view.page() + 1 < page.page_count {
          self.view.set_page(self.view.page() + 1);
          self.cursor = 0;
        }
      }
      KeyCode::Left | KeyCode::Char('[') => {
        if self.view.page() > 0 {
          self.view.set_page(self.view.page() - 1);
          self.cursor = 0;
        }
      }
      KeyCode::Char('/') => self.typing = true,
      KeyCode::Char('s') => self.view.filter.status = next_status(&self.view.filter.status),
      KeyCode::Char('p') => {
        let at = PAGE_SIZES.iter().position(|&s| s == self.view.page_size());
        let next = at.map_or(0, |i| (i + 1) % PAGE_SIZES.len());
        self.view.set_page_size(PAGE_SIZES[next]);
      }
      KeyCode::Char('0') => self.view.clear_sort(),
      KeyCode::Char(c @ '1'..='9') => {
        let i = c as usize - '1' as usize;
        match sort.get(i) {
          Some(field) => self.view.sort_by(field),
          None => return false,
        }
      }
      KeyCode::Char(' ') => {
        if let Some(id) = page.rows.get(self.cursor).map(|r| r.list_id().to_owned()) {
          self.view.toggle(&id);
        }
      }
      KeyCode::Char('a') => {
        if self.view.all_selected(records) {
          self.view.clear_selection();
        } else {
          self.view.select_all(records);
        }
      }
      _ => return false,
    }
    self.clamp(records);
    true
  }

  fn clamp<T: Listable>(&mut self, records: &[T]) {
    let len = self.view.render(records).rows.len();
    self.cursor = self.cursor.min(len.saturating_sub(1));
  }
}

fn next_status(status: &str) -> String {
  match status {
    "" => "active",
    "active" => "inactive",
    _ => "",
  }
  .to_owned()
}

pub struct LoginScreen {
  pub form:  Form,
  /// The "forgot password" form, when open.
  pub reset: Option<Form>,
}

pub struct PersonnelListScreen {
  pub records: Loadable<Vec<Personnel>>,
  /// Zone names offered by the zone filter.
  pub zones:   Vec<String>,
  pub pane:    ListPane,
  pub confirm: Option<Confirm>,
}

pub struct ZonesScreen {
  pub zones:   Loadable<Vec<Zone>>,
  pub pane:    ListPane,
  pub editor:  Option<ZoneForm>,
  pub confirm: Option<Confirm>,
}

pub enum Screen {
  /// Waiting for the identity provider.
  Connecting,
  Login(LoginScreen),
  Dashboard(Loadable<Dashboard>),
  PersonnelList(PersonnelListScreen),
  PersonnelForm(Loadable<PersonnelForm>),
  Zones(ZonesScreen),
}

// ─── Task results ────────────────────────────────────────────────────────────

pub enum Outcome {
  SignedIn(Result<Session>),
  ResetSent(Result<()>),
  PasswordChanged(Result<()>),
  Dashboard(Result<Dashboard>),
  PersonnelList(Result<(Vec<Personnel>, Vec<Zone>)>),
  PersonnelRecord(Result<(Option<Personnel>, Vec<Zone>)>),
  PersonnelSaved(Result<Personnel>),
  /// A delete or status change on the list; `Ok` carries the notice.
  PersonnelChanged(Result<String>),
  QuickZone(Result<Zone>),
  Zones(Result<Vec<Zone>>),
  ZoneSaved(Result<Zone>),
  ZoneChanged(Result<String>),
}

pub struct TaskResult {
  pub generation: u64,
  pub outcome:    Outcome,
}

async fn load_personnel<S, I>(g: Gateways<S, I>) -> Result<(Vec<Personnel>, Vec<Zone>)>
where
  S: DocumentStore,
  I: IdentityProvider,
{
  let records = g.personnel.list(&ListFilter::default()).await?;
  let zones = g.zones.list().await?;
  Ok((records, zones))
}

async fn load_record<S, I>(
  g: Gateways<S, I>,
  id: Option<String>,
) -> Result<(Option<Personnel>, Vec<Zone>)>
where
  S: DocumentStore,
  I: IdentityProvider,
{
  let record = match id {
    Some(id) => Some(g.personnel.get_by_id(&id).await?),
    None => None,
  };
  let zones = g.zones.list().await?;
  Ok((record, zones))
}

// ─── App ─────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<S, I> {
  pub route:    Route,
  pub screen:   Screen,
  pub auth:     AuthState,
  /// Dismissible error banner.
  pub banner:   Option<String>,
  /// One-line success message, cleared by the next key.
  pub notice:   Option<String>,
  /// The change-password dialog, when open.
  pub password: Option<Form>,

  generation: u64,
  gateways:   Gateways<S, I>,
  holder:     SessionHolder<I>,
  tx:         mpsc::UnboundedSender<TaskResult>,
  rx:         mpsc::UnboundedReceiver<TaskResult>,
}

impl<S, I> App<S, I>
where
  S: DocumentStore + 'static,
  I: IdentityProvider + 'static,
{
  pub fn new(gateways: Gateways<S, I>, holder: SessionHolder<I>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut app = Self {
      route: Route::Dashboard,
      screen: Screen::Connecting,
      auth: AuthState::Connecting,
      banner: None,
      notice: None,
      password: None,
      generation: 0,
      gateways,
      holder,
      tx,
      rx,
    };
    let state = app.holder.current();
    app.on_auth(state);
    app
  }

  pub fn session(&self) -> Option<&Session> { self.auth.session() }

  #[cfg(test)]
  pub fn generation(&self) -> u64 { self.generation }

  #[cfg(test)]
  pub fn holder(&self) -> &SessionHolder<I> { &self.holder }

  /// Give the holder back for shutdown.
  pub fn into_holder(self) -> SessionHolder<I> { self.holder }

  // ── Navigation ────────────────────────────────────────────────────────────

  /// Follow a session change, redirecting when the guard says so.
  pub fn on_auth(&mut self, state: AuthState) {
    self.auth = state;
    if self.auth.is_connecting() {
      self.screen = Screen::Connecting;
      return;
    }
    let signed_in = self.session().is_some();
    if !signed_in {
      self.password = None;
    }
    let landed = self.route.clone().guard(signed_in);
    if landed != self.route || matches!(self.screen, Screen::Connecting) {
      self.navigate(landed);
    }
  }

  pub fn navigate(&mut self, route: Route) {
    let route = route.guard(self.session().is_some());
    self.generation += 1;
    tracing::debug!(%route, generation = self.generation, "navigate");
    self.route = route;
    self.screen = self.enter();
  }

  fn enter(&mut self) -> Screen {
    match self.route.clone() {
      Route::Login => Screen::Login(LoginScreen { form: login_form(), reset: None }),
      Route::Dashboard => {
        self.load_dashboard();
        Screen::Dashboard(Loadable::Loading)
      }
      Route::Personnel => {
        self.load_personnel();
        Screen::PersonnelList(PersonnelListScreen {
          records: Loadable::Loading,
          zones:   Vec::new(),
          pane:    ListPane::sorted_by("nationalId"),
          confirm: None,
        })
      }
      Route::PersonnelNew => {
        self.load_record(None);
        Screen::PersonnelForm(Loadable::Loading)
      }
      Route::PersonnelEdit(id) | Route::PersonnelView(id) => {
        self.load_record(Some(id));
        Screen::PersonnelForm(Loadable::Loading)
      }
      Route::Zones => {
        self.load_zones();
        Screen::Zones(ZonesScreen {
          zones:   Loadable::Loading,
          pane:    ListPane::default(),
          editor:  None,
          confirm: None,
        })
      }
    }
  }

  /// Reload the current screen's data, keeping its filters and selection
  /// until the new data arrives.
  pub fn refresh(&mut self) {
    self.generation += 1;
    match &mut self.screen {
      Screen::Dashboard(state) => {
        *state = Loadable::Loading;
        self.load_dashboard();
      }
      Screen::PersonnelList(list) => {
        list.records = Loadable::Loading;
        self.load_personnel();
      }
      Screen::Zones(zones) => {
        zones.zones = Loadable::Loading;
        self.load_zones();
      }
      _ => {}
    }
  }

  // ── Tasks ─────────────────────────────────────────────────────────────────

  fn spawn<F>(&self, task: F)
  where
    F: Future<Output = Outcome> + Send + 'static,
  {
    let tx = self.tx.clone();
    let generation = self.generation;
    tokio::spawn(async move {
      let outcome = task.await;
      tx.send(TaskResult { generation, outcome }).ok();
    });
  }

  fn load_dashboard(&self) {
    let g = self.gateways.clone();
    self.spawn(async move { Outcome::Dashboard(g.dashboard().await) });
  }

  fn load_personnel(&self) {
    let g = self.gateways.clone();
    self.spawn(async move { Outcome::PersonnelList(load_personnel(g).await) });
  }

  fn load_record(&self, id: Option<String>) {
    let g = self.gateways.clone();
    self.spawn(async move { Outcome::PersonnelRecord(load_record(g, id).await) });
  }

  fn load_zones(&self) {
    let zones = self.gateways.zones.clone();
    self.spawn(async move { Outcome::Zones(zones.list().await) });
  }

  /// A finished task, if one is waiting.
  pub fn next_result(&mut self) -> Option<TaskResult> { self.rx.try_recv().ok() }

  #[cfg(test)]
  pub async fn wait_result(&mut self) -> Option<TaskResult> { self.rx.recv().await }

  /// Apply a task result. Returns `false` if it was stale and dropped.
  pub fn apply(&mut self, result: TaskResult) -> bool {
    if result.generation != self.generation {
      tracing::debug!(
        issued = result.generation,
        current = self.generation,
        "discarding stale result"
      );
      return false;
    }
    self.apply_outcome(result.outcome);
    true
  }

  fn fail(&mut self, error: &GatewayError) {
    tracing::warn!(error = %error, kind = ?error.kind(), "gateway call failed");
    self.banner = Some(error.to_string());
  }

  fn apply_outcome(&mut self, outcome: Outcome) {
    match outcome {
      Outcome::SignedIn(result) => {
        if let Screen::Login(login) = &mut self.screen
          && let Some(message) = login.form.finish(&result)
        {
          self.banner = Some(message);
        }
      }
      Outcome::ResetSent(result) => {
        if let Screen::Login(login) = &mut self.screen
          && let Some(reset) = &mut login.reset
        {
          match reset.finish(&result) {
            Some(message) => self.banner = Some(message),
            None if result.is_ok() => {
              login.reset = None;
              self.notice = Some("Se registró la solicitud de restablecimiento".into());
            }
            None => {}
          }
        }
      }
      Outcome::PasswordChanged(result) => {
        if let Some(form) = &mut self.password {
          match form.finish(&result) {
            Some(message) => self.banner = Some(message),
            None if result.is_ok() => {
              self.password = None;
              self.notice = Some("Contraseña actualizada".into());
            }
            None => {}
          }
        }
      }
      Outcome::Dashboard(result) => {
        if let Screen::Dashboard(state) = &mut self.screen {
          *state = match result {
            Ok(d) => Loadable::Ready(d),
            Err(e) => Loadable::Failed(e.to_string()),
          };
        }
      }
      Outcome::PersonnelList(result) => {
        if let Screen::PersonnelList(list) = &mut self.screen {
          match result {
            Ok((records, zones)) => {
              list.records = Loadable::Ready(records);
              list.zones = zones.into_iter().map(|z| z.name).collect();
              list.pane.view.clear_selection();
              if let Some(records) = list.records.ready() {
                list.pane.clamp(records);
              }
            }
            Err(e) => list.records = Loadable::Failed(e.to_string()),
          }
        }
      }
      Outcome::PersonnelRecord(result) => {
        if let Screen::PersonnelForm(state) = &mut self.screen {
          *state = match (result, &self.route) {
            (Ok((_, zones)), Route::PersonnelNew) => Loadable::Ready(PersonnelForm::create(&zones)),
            (Ok((Some(record), zones)), Route::PersonnelEdit(_)) => {
              Loadable::Ready(PersonnelForm::edit(&record, &zones))
            }
            (Ok((Some(record), zones)), _) => Loadable::Ready(PersonnelForm::view(&record, &zones)),
            (Ok((None, _)), _) => Loadable::Failed("Personal no encontrado".into()),
            (Err(e), _) => Loadable::Failed(e.to_string()),
          };
        }
      }
      Outcome::PersonnelSaved(result) => {
        let Screen::PersonnelForm(state) = &mut self.screen else { return };
        let Some(pf) = state.ready_mut() else { return };
        if let Some(message) = pf.form.finish(&result) {
          self.banner = Some(message);
        }
        if let Ok(record) = result {
          tracing::info!(id = %record.id, "personnel saved");
          self.navigate(Route::Personnel);
          self.notice = Some(format!("{} guardado", record.full_name()));
        }
      }
      Outcome::QuickZone(result) => {
        let Screen::PersonnelForm(state) = &mut self.screen else { return };
        let Some(pf) = state.ready_mut() else { return };
        match result {
          Ok(zone) => {
            pf.zone_created(&zone);
            self.notice = Some(format!("Zona \"{}\" creada", zone.name));
          }
          Err(e) => {
            let message = match &mut pf.zone_form {
              Some(form) => form.finish::<()>(&Err(e)),
              None => Some(e.to_string()),
            };
            self.banner = message.or(self.banner.take());
          }
        }
      }
      Outcome::PersonnelChanged(result) | Outcome::ZoneChanged(result) => match result {
        Ok(notice) => {
          self.notice = Some(notice);
          self.refresh();
        }
        Err(e) => self.fail(&e),
      },
      Outcome::Zones(result) => {
        if let Screen::Zones(screen) = &mut self.screen {
          match result {
            Ok(zones) => {
              screen.pane.view.clear_selection();
              screen.pane.clamp(&zones);
              screen.zones = Loadable::Ready(zones);
            }
            Err(e) => screen.zones = Loadable::Failed(e.to_string()),
          }
        }
      }
      Outcome::ZoneSaved(result) => {
        let Screen::Zones(screen) = &mut self.screen else { return };
        let Some(editor) = &mut screen.editor else { return };
        if let Some(message) = editor.form.finish(&result) {
          self.banner = Some(message);
        }
        if let Ok(zone) = result {
          screen.editor = None;
          self.notice = Some(format!("Zona \"{}\" guardada", zone.name));
          self.refresh();
        }
      }
    }
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return false;
    }
    self.notice = None;
    if self.banner.is_some() && key.code == KeyCode::Esc {
      self.banner = None;
      return true;
    }

    if self.password.is_some() {
      self.handle_password_key(key);
      return true;
    }

    let signed_in = self.session().is_some();
    match key.code {
      KeyCode::F(n @ 1..=3) if signed_in => {
        let (_, path) = MENU[usize::from(n) - 1];
        self.navigate(Route::parse(path));
        return true;
      }
      KeyCode::F(9) if signed_in => {
        self.password = Some(change_password_form());
        return true;
      }
      KeyCode::F(10) if signed_in => {
        match self.holder.logout().await {
          Ok(()) => tracing::info!("signed out"),
          Err(e) => self.fail(&e),
        }
        return true;
      }
      _ => {}
    }

    match &self.screen {
      Screen::Connecting => key.code != KeyCode::Char('q'),
      Screen::Login(_) => {
        self.handle_login_key(key);
        true
      }
      Screen::Dashboard(_) => match key.code {
        KeyCode::Char('q') => false,
        KeyCode::Char('r') => {
          self.refresh();
          true
        }
        _ => true,
      },
      Screen::PersonnelList(_) => self.handle_personnel_list_key(key),
      Screen::PersonnelForm(_) => {
        self.handle_personnel_form_key(key);
        true
      }
      Screen::Zones(_) => self.handle_zones_key(key),
    }
  }

  fn handle_password_key(&mut self, key: KeyEvent) {
    let Some(form) = &mut self.password else { return };
    match form.handle_key(key) {
      FormInput::Cancel => self.password = None,
      FormInput::Submit => {
        if let Submit::Ready(_) = form.submit() {
          let (current, new, confirm) = (
            form.value("currentPassword").to_owned(),
            form.value("newPassword").to_owned(),
            form.value("confirmNewPassword").to_owned(),
          );
          let auth = self.gateways.auth.clone();
          self.spawn(async move {
            Outcome::PasswordChanged(auth.change_password(&current, &new, &confirm).await)
          });
        }
      }
      _ => {}
    }
  }

  fn handle_login_key(&mut self, key: KeyEvent) {
    let Screen::Login(login) = &mut self.screen else { return };

    if let Some(reset) = &mut login.reset {
      match reset.handle_key(key) {
        FormInput::Cancel => login.reset = None,
        FormInput::Submit => {
          if let Submit::Ready(_) = reset.submit() {
            let email = reset.value("email").to_owned();
            let auth = self.gateways.auth.clone();
            self.spawn(async move { Outcome::ResetSent(auth.send_password_reset(&email).await) });
          }
        }
        _ => {}
      }
      return;
    }

    if key.code == KeyCode::F(4) {
      login.reset = Some(password_reset_form(login.form.value("email")));
      return;
    }

    if login.form.handle_key(key) == FormInput::Submit
      && let Submit::Ready(_) = login.form.submit()
    {
      let email = login.form.value("email").to_owned();
      let password = login.form.value("password").to_owned();
      let auth = self.gateways.auth.clone();
      self.spawn(async move { Outcome::SignedIn(auth.sign_in(&email, &password).await) });
    }
  }

  fn handle_personnel_list_key(&mut self, key: KeyEvent) -> bool {
    let Screen::PersonnelList(list) = &mut self.screen else { return true };

    if let Some(confirm) = list.confirm.take() {
      if key.code == KeyCode::Char('y') {
        let personnel = self.gateways.personnel.clone();
        match confirm {
          Confirm::Delete { id, name } => self.spawn(async move {
            Outcome::PersonnelChanged(
              personnel.delete(&id).await.map(|()| format!("{name} eliminado")),
            )
          }),
          Confirm::BulkDelete(ids) => self.spawn(async move {
            let count = ids.len();
            Outcome::PersonnelChanged(
              personnel
                .bulk_delete(&ids)
                .await
                .map(|()| format!("{count} registro(s) eliminado(s)")),
            )
          }),
          Confirm::DeleteZone { .. } => {}
        }
      }
      return true;
    }

    let Loadable::Ready(records) = &list.records else {
      return match key.code {
        KeyCode::Char('q') => false,
        KeyCode::Char('r') => {
          self.refresh();
          true
        }
        KeyCode::Char('n') => {
          self.navigate(Route::PersonnelNew);
          true
        }
        _ => true,
      };
    };

    if list.pane.handle_key(key, records, &PERSONNEL_SORT) {
      return true;
    }

    let current = list.pane.current(records).cloned();
    match key.code {
      KeyCode::Char('q') => return false,
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('z') => {
        let filter = &mut list.pane.view.filter;
        let at = list.zones.iter().position(|z| *z == filter.zone);
        filter.zone = match at {
          None => list.zones.first().cloned().unwrap_or_default(),
          Some(i) => list.zones.get(i + 1).cloned().unwrap_or_default(),
        };
        list.pane.clamp(records);
      }
      KeyCode::Char('n') => self.navigate(Route::PersonnelNew),
      KeyCode::Enter | KeyCode::Char('e') => {
        if let Some(record) = current {
          self.navigate(Route::PersonnelEdit(record.id));
        }
      }
      KeyCode::Char('v') => {
        if let Some(record) = current {
          self.navigate(Route::PersonnelView(record.id));
        }
      }
      KeyCode::Char('t') => {
        if let Some(record) = current {
          let status = match record.status {
            PersonnelStatus::Active => PersonnelStatus::Inactive,
            PersonnelStatus::Inactive => PersonnelStatus::Active,
          };
          let personnel = self.gateways.personnel.clone();
          self.spawn(async move {
            Outcome::PersonnelChanged(
              personnel
                .update_status(&record.id, status)
                .await
                .map(|r| format!("{} ahora está {}", r.full_name(), r.status.label().to_lowercase())),
            )
          });
        }
      }
      KeyCode::Char('d') => {
        if let Some(record) = current {
          list.confirm = Some(Confirm::Delete { name: record.full_name(), id: record.id });
        }
      }
      KeyCode::Char('D') | KeyCode::Delete => {
        let ids: Vec<String> = list.pane.view.selected().iter().cloned().collect();
        if !ids.is_empty() {
          list.confirm = Some(Confirm::BulkDelete(ids));
        }
      }
      _ => {}
    }
    true
  }

  fn handle_personnel_form_key(&mut self, key: KeyEvent) {
    let Screen::PersonnelForm(state) = &mut self.screen else { return };
    let Some(pf) = state.ready_mut() else {
      if key.code == KeyCode::Esc {
        self.navigate(Route::Personnel);
      }
      return;
    };

    if let Some(zone_form) = &mut pf.zone_form {
      match zone_form.handle_key(key) {
        FormInput::Cancel => pf.zone_form = None,
        FormInput::Submit => {
          if let Submit::Ready(fields) = zone_form.submit() {
            let draft = ZoneForm::draft(&fields);
            let zones = self.gateways.zones.clone();
            self.spawn(async move { Outcome::QuickZone(zones.create(draft).await) });
          }
        }
        _ => {}
      }
      return;
    }

    if let FormMode::View(id) = &pf.mode
      && key.code == KeyCode::Char('e')
    {
      let id = id.clone();
      self.navigate(Route::PersonnelEdit(id));
      return;
    }
    if key.code == KeyCode::F(4) {
      pf.open_zone_form();
      return;
    }

    match pf.form.handle_key(key) {
      FormInput::Cancel => self.navigate(Route::Personnel),
      FormInput::Submit => {
        let Submit::Ready(fields) = pf.form.submit() else { return };
        let personnel = self.gateways.personnel.clone();
        match pf.mode.clone() {
          FormMode::New => match PersonnelForm::draft(fields) {
            Ok(draft) => self.spawn(async move {
              Outcome::PersonnelSaved(personnel.create(draft).await)
            }),
            Err(e) => {
              pf.form.finish::<()>(&Err(e.clone()));
              self.fail(&e);
            }
          },
          FormMode::Edit(id) => match PersonnelForm::patch(fields) {
            Ok(patch) => self.spawn(async move {
              Outcome::PersonnelSaved(personnel.update(&id, patch).await)
            }),
            Err(e) => {
              pf.form.finish::<()>(&Err(e.clone()));
              self.fail(&e);
            }
          },
          FormMode::View(_) => {}
        }
      }
      _ => {}
    }
  }

  fn handle_zones_key(&mut self, key: KeyEvent) -> bool {
    let Screen::Zones(screen) = &mut self.screen else { return true };

    if let Some(editor) = &mut screen.editor {
      match editor.form.handle_key(key) {
        FormInput::Cancel => screen.editor = None,
        FormInput::Submit => {
          if let Submit::Ready(fields) = editor.form.submit() {
            let zones = self.gateways.zones.clone();
            match editor.id.clone() {
              None => {
                let draft = ZoneForm::draft(&fields);
                self.spawn(async move { Outcome::ZoneSaved(zones.create(draft).await) });
              }
              Some(id) => {
                let patch = ZoneForm::patch(&fields);
                self.spawn(async move { Outcome::ZoneSaved(zones.update(&id, patch).await) });
              }
            }
          }
        }
        _ => {}
      }
      return true;
    }

    if let Some(confirm) = screen.confirm.take() {
      if key.code == KeyCode::Char('y')
        && let Confirm::DeleteZone { id, name } = confirm
      {
        let zones = self.gateways.zones.clone();
        self.spawn(async move {
          Outcome::ZoneChanged(zones.delete(&id).await.map(|()| format!("Zona \"{name}\" eliminada")))
        });
      }
      return true;
    }

    let Loadable::Ready(zones) = &screen.zones else {
      return match key.code {
        KeyCode::Char('q') => false,
        KeyCode::Char('r') => {
          self.refresh();
          true
        }
        _ => true,
      };
    };

    if screen.pane.handle_key(key, zones, &ZONE_SORT) {
      return true;
    }

    let current = screen.pane.current(zones).cloned();
    match key.code {
      KeyCode::Char('q') => return false,
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('n') => screen.editor = Some(ZoneForm::create()),
      KeyCode::Enter | KeyCode::Char('e') => {
        if let Some(zone) = current {
          screen.editor = Some(ZoneForm::edit(&zone));
        }
      }
      KeyCode::Char('t') => {
        if let Some(zone) = current {
          let gateway = self.gateways.zones.clone();
          let patch = ZonePatch { active: Some(!zone.active), ..ZonePatch::default() };
          self.spawn(async move {
            Outcome::ZoneChanged(
              gateway
                .update(&zone.id, patch)
                .await
                .map(|z| format!("Zona \"{}\" {}", z.name, if z.active { "activada" } else { "desactivada" })),
            )
          });
        }
      }
      KeyCode::Char('d') => {
        if let Some(zone) = current {
          screen.confirm = Some(Confirm::DeleteZone { id: zone.id, name: zone.name });
        }
      }
      _ => {}
    }
    true
  }
}
