//! End-to-end tests: the remote backends against a live `padron-server`,
//! and the app's task plumbing against an in-memory store.

use std::{path::PathBuf, sync::Arc};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use padron_core::{
  identity::IdentityProvider as _,
  listing::SortState,
  personnel::{NewPersonnel, PersonnelStatus},
  zone::NewZone,
};
use padron_gateway::{ErrorKind, GatewayError, Gateways};
use padron_server::{AppState, ServerConfig};
use padron_store_sqlite::{LocalIdentity, NewAccount, SqliteStore};
use tokio::net::TcpListener;

use crate::{
  app::{App, Loadable, Outcome, Screen, TaskResult},
  client::{ApiClient, RemoteConfig, RemoteIdentity, RemoteStore},
  routes::Route,
  session::{AuthState, SessionHolder},
};

const KEY: &str = "test-key";
const EMAIL: &str = "admin@example.com";
const PASSWORD: &str = "Secreto123";

async fn seeded_store() -> SqliteStore {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .create_account(NewAccount {
      email:        EMAIL.into(),
      password:     PASSWORD.into(),
      display_name: Some("Admin".into()),
    })
    .await
    .unwrap();
  store
}

/// Serve the API on an ephemeral port and return its base URL.
async fn spawn_server() -> String {
  let state = AppState {
    store:  Arc::new(seeded_store().await),
    config: Arc::new(ServerConfig {
      host:            "127.0.0.1".to_string(),
      port:            0,
      project_id:      "demo".to_string(),
      api_key:         KEY.to_string(),
      store_path:      PathBuf::from(":memory:"),
      token_ttl_hours: 12,
    }),
  };
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let address = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, padron_server::router(state)).await.unwrap();
  });
  format!("http://{address}")
}

fn remote(base_url: String, api_key: &str) -> (Arc<RemoteStore>, Arc<RemoteIdentity>) {
  let api = ApiClient::new(RemoteConfig {
    base_url,
    project_id: "demo".into(),
    api_key: api_key.into(),
  })
  .unwrap();
  (Arc::new(RemoteStore::new(api.clone())), Arc::new(RemoteIdentity::new(api)))
}

fn ana() -> NewPersonnel {
  NewPersonnel {
    national_id: "12345678".into(),
    given_names: "Ana".into(),
    surnames:    "Pérez".into(),
    phone:       "912345678".into(),
    zone_name:   "Zona Sur".into(),
    status:      None,
  }
}

// ─── Remote backends ─────────────────────────────────────────────────────────

#[tokio::test]
async fn gateways_run_against_the_server() {
  let (store, identity) = remote(spawn_server().await, KEY);
  let g = Gateways::new(store, identity.clone());

  let err = g.zones.create(NewZone::named("Zona Sur")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unauthenticated);

  let err = g.auth.sign_in(EMAIL, "incorrecta").await.unwrap_err();
  assert_eq!(err, GatewayError::Unauthenticated("Contraseña incorrecta".into()));
  assert!(identity.current_session().is_none());

  let session = g.auth.sign_in(EMAIL, PASSWORD).await.unwrap();
  assert_eq!(session.label(), "Admin");
  assert_eq!(identity.current_session(), Some(session));

  let zone = g.zones.create(NewZone::named("Zona Sur")).await.unwrap();
  assert!(zone.active);
  let record = g.personnel.create(ana()).await.unwrap();
  assert_eq!(record.status, PersonnelStatus::Active);
  assert_eq!(record.zone_name.as_deref(), Some("Zona Sur"));

  let err = g.zones.delete(&zone.id).await.unwrap_err();
  assert_eq!(err, GatewayError::ZoneInUse { zone: "Zona Sur".into(), count: 1 });
  assert_eq!(g.zones.list().await.unwrap().len(), 1);

  let inactive = g.personnel.update_status(&record.id, PersonnelStatus::Inactive).await.unwrap();
  assert_eq!(inactive.status, PersonnelStatus::Inactive);
  assert_eq!(g.dashboard().await.unwrap().personnel.inactive, 1);

  g.personnel.bulk_delete(std::slice::from_ref(&record.id)).await.unwrap();
  let err = g.personnel.get_by_id(&record.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  g.zones.delete(&zone.id).await.unwrap();

  g.auth.sign_out().await.unwrap();
  assert!(identity.current_session().is_none());
}

#[tokio::test]
async fn password_change_keeps_the_remote_session_usable() {
  let (store, identity) = remote(spawn_server().await, KEY);
  let g = Gateways::new(store, identity);
  g.auth.sign_in(EMAIL, PASSWORD).await.unwrap();

  let err = g.auth.change_password(PASSWORD, "Nuevo456", "Otro456").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ValidationFailed);

  g.auth.change_password(PASSWORD, "Nuevo456", "Nuevo456").await.unwrap();
  // The old token was revoked; the swapped-in one still works.
  g.zones.list().await.unwrap();
}

#[tokio::test]
async fn wrong_api_key_is_refused() {
  let (store, identity) = remote(spawn_server().await, "nope");
  let g = Gateways::new(store, identity);
  let err = g.auth.sign_in(EMAIL, PASSWORD).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::RemoteWriteFailed);
}

// ─── App ─────────────────────────────────────────────────────────────────────

async fn signed_in_app() -> App<SqliteStore, LocalIdentity> {
  let store = seeded_store().await;
  let identity = Arc::new(LocalIdentity::new(store.clone()));
  let holder = SessionHolder::start(identity.clone());
  let mut auth = holder.watch();
  let mut app = App::new(Gateways::new(Arc::new(store), identity.clone()), holder);

  identity.sign_in(EMAIL, PASSWORD).await.unwrap();
  while auth.borrow_and_update().session().is_none() {
    auth.changed().await.unwrap();
  }
  app.on_auth(auth.borrow().clone());
  app
}

#[tokio::test]
async fn sign_in_lands_on_the_dashboard() {
  let mut app = signed_in_app().await;
  assert_eq!(app.route, Route::Dashboard);

  let result = app.wait_result().await.unwrap();
  assert!(app.apply(result));
  assert!(matches!(app.screen, Screen::Dashboard(Loadable::Ready(_))));
  app.into_holder().shutdown().await;
}

#[tokio::test]
async fn stale_results_are_discarded() {
  let mut app = signed_in_app().await;
  app.navigate(Route::Personnel);
  app.navigate(Route::Zones);
  let current = app.generation();

  // Dashboard, personnel and zone loads are all in flight.
  let mut applied = 0;
  for _ in 0..3 {
    let result = app.wait_result().await.unwrap();
    let fresh = result.generation == current;
    assert_eq!(app.apply(result), fresh);
    applied += usize::from(fresh);
  }
  assert_eq!(applied, 1);
  assert!(matches!(&app.screen, Screen::Zones(z) if z.zones == Loadable::Ready(Vec::new())));
  app.into_holder().shutdown().await;
}

#[tokio::test]
async fn guarded_routes_follow_the_session() {
  let mut app = signed_in_app().await;
  app.navigate(Route::Login);
  assert_eq!(app.route, Route::Dashboard);

  app.on_auth(AuthState::Anonymous);
  assert_eq!(app.route, Route::Login);
  app.navigate(Route::Zones);
  assert_eq!(app.route, Route::Login);
  app.into_holder().shutdown().await;
}

#[tokio::test]
async fn logout_key_signs_out() {
  let mut app = signed_in_app().await;
  let mut auth = app.holder().watch();
  assert!(app.handle_key(KeyEvent::new(KeyCode::F(10), KeyModifiers::NONE)).await);
  assert_eq!(*auth.borrow_and_update(), AuthState::Anonymous);

  app.on_auth(AuthState::Anonymous);
  assert!(matches!(app.screen, Screen::Login(_)));
  app.into_holder().shutdown().await;
}

fn selection(app: &App<SqliteStore, LocalIdentity>) -> Vec<String> {
  match &app.screen {
    Screen::PersonnelList(list) => list.pane.view.selected().iter().cloned().collect(),
    _ => panic!("not on the personnel list"),
  }
}

/// Wait for the current view's load, skipping stale results.
async fn settle(app: &mut App<SqliteStore, LocalIdentity>) {
  while let Some(result) = app.wait_result().await {
    if app.apply(result) {
      return;
    }
  }
}

async fn personnel_list_with_selection() -> App<SqliteStore, LocalIdentity> {
  let mut app = signed_in_app().await;
  app.navigate(Route::Personnel);
  settle(&mut app).await;
  let Screen::PersonnelList(list) = &mut app.screen else { panic!("not on the personnel list") };
  list.pane.view.toggle("a");
  list.pane.view.toggle("b");
  app
}

#[tokio::test]
async fn personnel_list_opens_sorted_by_national_id() {
  let mut app = signed_in_app().await;
  app.navigate(Route::Personnel);
  let Screen::PersonnelList(list) = &app.screen else { panic!("not on the personnel list") };
  assert_eq!(list.pane.view.sort(), Some(&SortState::asc("nationalId")));
  app.into_holder().shutdown().await;
}

#[tokio::test]
async fn successful_reload_clears_the_selection() {
  let mut app = personnel_list_with_selection().await;

  let failed = TaskResult {
    generation: app.generation(),
    outcome:    Outcome::PersonnelList(Err(GatewayError::Unknown("sin conexión".into()))),
  };
  assert!(app.apply(failed));
  assert_eq!(selection(&app), vec!["a", "b"]);

  let reloaded = TaskResult {
    generation: app.generation(),
    outcome:    Outcome::PersonnelList(Ok((Vec::new(), Vec::new()))),
  };
  assert!(app.apply(reloaded));
  assert!(selection(&app).is_empty());
  app.into_holder().shutdown().await;
}

#[tokio::test]
async fn failed_bulk_delete_keeps_the_selection() {
  let mut app = personnel_list_with_selection().await;
  let before = app.generation();

  let failed = TaskResult {
    generation: before,
    outcome:    Outcome::PersonnelChanged(Err(GatewayError::RemoteWriteFailed(
      "No se pudo eliminar".into(),
    ))),
  };
  assert!(app.apply(failed));
  assert_eq!(app.banner.as_deref(), Some("No se pudo eliminar"));
  assert_eq!(app.generation(), before);
  assert_eq!(selection(&app), vec!["a", "b"]);

  let done = TaskResult {
    generation: before,
    outcome:    Outcome::PersonnelChanged(Ok("2 eliminados".into())),
  };
  assert!(app.apply(done));
  // The refresh it triggers is what clears the marks.
  settle(&mut app).await;
  assert!(selection(&app).is_empty());
  app.into_holder().shutdown().await;
}
