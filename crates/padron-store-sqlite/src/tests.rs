//! Integration tests for `SqliteStore` and `LocalIdentity` against an
//! in-memory database.

use padron_core::{
  identity::IdentityProvider,
  store::{BackendError, BatchOp, Collection, DocumentStore, FieldFilter, Order, Query, code},
};
use serde_json::{Value, json};

use crate::{Error, LocalIdentity, NewAccount, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn fields(v: Value) -> padron_core::store::Fields {
  match v {
    Value::Object(m) => m,
    _ => panic!("expected an object"),
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_document() {
  let s = store().await;

  let doc = s
    .add(Collection::Zones, fields(json!({ "name": "Zona Norte", "active": true })))
    .await
    .unwrap();
  assert_eq!(doc.created_at, doc.updated_at);

  let fetched = s.get(Collection::Zones, &doc.id).await.unwrap().unwrap();
  assert_eq!(fetched, doc);

  // Same id, other collection.
  assert!(s.get(Collection::Personnel, &doc.id).await.unwrap().is_none());
}

#[tokio::test]
async fn store_owned_keys_are_ignored_on_write() {
  let s = store().await;
  let doc = s
    .add(Collection::Zones, fields(json!({ "id": "mine", "createdAt": "x", "name": "Zona" })))
    .await
    .unwrap();
  assert_ne!(doc.id, "mine");
  assert_eq!(doc.fields.len(), 1);
}

#[tokio::test]
async fn update_merges_and_bumps_updated_at() {
  let s = store().await;
  let doc = s
    .add(Collection::Zones, fields(json!({ "name": "Zona Norte", "active": true })))
    .await
    .unwrap();

  let updated = s
    .update(Collection::Zones, &doc.id, fields(json!({ "active": false })))
    .await
    .unwrap();

  assert_eq!(updated.fields["name"], json!("Zona Norte"));
  assert_eq!(updated.fields["active"], json!(false));
  assert_eq!(updated.created_at, doc.created_at);
  assert!(updated.updated_at >= doc.updated_at);
}

#[tokio::test]
async fn update_missing_document_is_not_found() {
  let s = store().await;
  let err = s
    .update(Collection::Zones, "nope", fields(json!({ "active": false })))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DocumentNotFound { .. }));
  assert_eq!(err.code(), Some(code::NOT_FOUND));
}

#[tokio::test]
async fn delete_is_idempotent() {
  let s = store().await;
  let doc = s.add(Collection::Zones, fields(json!({ "name": "Zona" }))).await.unwrap();
  s.delete(Collection::Zones, &doc.id).await.unwrap();
  s.delete(Collection::Zones, &doc.id).await.unwrap();
  assert!(s.get(Collection::Zones, &doc.id).await.unwrap().is_none());
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_defaults_to_newest_first() {
  let s = store().await;
  for i in 0..5 {
    s.add(Collection::Personnel, fields(json!({ "n": i }))).await.unwrap();
  }

  let docs = s.query(Collection::Personnel, &Query::default()).await.unwrap();
  let ns: Vec<_> = docs.iter().map(|d| d.fields["n"].clone()).collect();
  assert_eq!(ns, vec![json!(4), json!(3), json!(2), json!(1), json!(0)]);

  let window = s
    .query(Collection::Personnel, &Query::default().limit(2))
    .await
    .unwrap();
  assert_eq!(window.len(), 2);
  assert_eq!(window[0].fields["n"], json!(4));
}

#[tokio::test]
async fn query_filters_on_strings_and_booleans() {
  let s = store().await;
  s.add(Collection::Zones, fields(json!({ "name": "Zona Sur", "active": true }))).await.unwrap();
  s.add(Collection::Zones, fields(json!({ "name": "Zona Este", "active": false }))).await.unwrap();
  s.add(Collection::Zones, fields(json!({ "name": "Zona Oeste", "active": true }))).await.unwrap();

  let active = s
    .query(Collection::Zones, &Query::default().filter(FieldFilter::eq("active", true)))
    .await
    .unwrap();
  assert_eq!(active.len(), 2);

  let sur = s
    .query(
      Collection::Zones,
      &Query::default()
        .filter(FieldFilter::eq("name", "Zona Sur"))
        .filter(FieldFilter::eq("active", true)),
    )
    .await
    .unwrap();
  assert_eq!(sur.len(), 1);
  assert_eq!(sur[0].fields["name"], json!("Zona Sur"));
}

#[tokio::test]
async fn query_orders_by_field_ascending() {
  let s = store().await;
  for name in ["Zona Sur", "Zona Centro", "Zona Norte"] {
    s.add(Collection::Zones, fields(json!({ "name": name }))).await.unwrap();
  }
  let docs = s
    .query(Collection::Zones, &Query::default().order(Order::FieldAsc("name".into())))
    .await
    .unwrap();
  let names: Vec<_> = docs.iter().map(|d| d.fields["name"].as_str().unwrap()).collect();
  assert_eq!(names, vec!["Zona Centro", "Zona Norte", "Zona Sur"]);
}

#[tokio::test]
async fn query_rejects_odd_field_names() {
  let s = store().await;
  let err = s
    .query(Collection::Zones, &Query::default().filter(FieldFilter::eq("a'b", 1)))
    .await
    .unwrap_err();
  assert_eq!(err.code(), Some(code::INVALID_ARGUMENT));
}

// ─── Batches ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_deletes_everything() {
  let s = store().await;
  let mut ids = vec![];
  for n in 0..3 {
    ids.push(s.add(Collection::Personnel, fields(json!({ "n": n }))).await.unwrap().id);
  }

  let batch = ids
    .iter()
    .map(|id| BatchOp::Delete { collection: Collection::Personnel, id: id.clone() })
    .collect();
  s.commit(batch).await.unwrap();

  assert!(s.query(Collection::Personnel, &Query::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_batch_leaves_everything_in_place() {
  let s = store().await;
  let mut ids = vec![];
  for tag in ["a", "b", "c"] {
    ids.push(s.add(Collection::Personnel, fields(json!({ "tag": tag }))).await.unwrap().id);
  }

  s.execute_batch(
    "CREATE TRIGGER refuse_b BEFORE DELETE ON documents
     WHEN json_extract(OLD.fields, '$.tag') = 'b'
     BEGIN SELECT RAISE(ABORT, 'b is protected'); END;",
  )
  .await
  .unwrap();

  let batch = ids
    .iter()
    .map(|id| BatchOp::Delete { collection: Collection::Personnel, id: id.clone() })
    .collect();
  let err = s.commit(batch).await.unwrap_err();
  assert_eq!(err.code(), Some(code::FAILED_PRECONDITION));

  for id in &ids {
    assert!(s.get(Collection::Personnel, id).await.unwrap().is_some());
  }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

fn admin() -> NewAccount {
  NewAccount {
    email:        "admin@padron.pe".into(),
    password:     "Secreto1".into(),
    display_name: Some("Admin".into()),
  }
}

#[tokio::test]
async fn accounts_authenticate() {
  let s = store().await;
  let account = s.create_account(admin()).await.unwrap();

  let signed_in = s.authenticate("ADMIN@padron.pe", "Secreto1").await.unwrap();
  assert_eq!(signed_in.uid, account.uid);

  let wrong = s.authenticate("admin@padron.pe", "secreto1").await.unwrap_err();
  assert_eq!(wrong.code(), Some(code::AUTH_WRONG_PASSWORD));

  let unknown = s.authenticate("nadie@padron.pe", "Secreto1").await.unwrap_err();
  assert_eq!(unknown.code(), Some(code::AUTH_USER_NOT_FOUND));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  s.create_account(admin()).await.unwrap();
  let err = s.create_account(admin()).await.unwrap_err();
  assert_eq!(err.code(), Some(code::AUTH_EMAIL_IN_USE));
}

#[tokio::test]
async fn disabled_accounts_cannot_sign_in() {
  let s = store().await;
  s.create_account(admin()).await.unwrap();
  s.set_disabled("admin@padron.pe", true).await.unwrap();
  let err = s.authenticate("admin@padron.pe", "Secreto1").await.unwrap_err();
  assert_eq!(err.code(), Some(code::AUTH_USER_DISABLED));
}

#[tokio::test]
async fn tokens_resolve_until_revoked() {
  let s = store().await;
  let account = s.create_account(admin()).await.unwrap();

  let token = s.issue_token(&account.uid).await.unwrap();
  assert_eq!(token.len(), 64);
  assert_eq!(s.session_for_token(&token).await.unwrap().uid, account.uid);

  s.revoke_token(&token).await.unwrap();
  assert!(matches!(s.session_for_token(&token).await, Err(Error::InvalidToken)));
}

async fn token_rows(s: &SqliteStore) -> i64 {
  s.conn
    .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM auth_tokens", [], |r| r.get(0))?))
    .await
    .unwrap()
}

/// Move every token's issue time back by `hours`.
async fn age_tokens(s: &SqliteStore, hours: i64) {
  let issued = crate::encode::encode_dt(chrono::Utc::now() - chrono::Duration::hours(hours));
  s.conn
    .call(move |conn| {
      conn.execute("UPDATE auth_tokens SET created_at = ?1", rusqlite::params![issued])?;
      Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn expired_tokens_are_refused_and_deleted() {
  let s = store().await.with_token_ttl(chrono::Duration::hours(1));
  let account = s.create_account(admin()).await.unwrap();
  let token = s.issue_token(&account.uid).await.unwrap();

  age_tokens(&s, 2).await;
  assert!(matches!(s.session_for_token(&token).await, Err(Error::InvalidToken)));
  assert_eq!(token_rows(&s).await, 0);
}

#[tokio::test]
async fn issuing_a_token_prunes_expired_ones() {
  let s = store().await.with_token_ttl(chrono::Duration::hours(1));
  let account = s.create_account(admin()).await.unwrap();
  s.issue_token(&account.uid).await.unwrap();
  s.issue_token(&account.uid).await.unwrap();
  age_tokens(&s, 2).await;

  let fresh = s.issue_token(&account.uid).await.unwrap();
  assert_eq!(token_rows(&s).await, 1);
  assert_eq!(s.session_for_token(&fresh).await.unwrap().uid, account.uid);
}

#[tokio::test]
async fn password_change_revokes_tokens() {
  let s = store().await;
  let account = s.create_account(admin()).await.unwrap();
  let token = s.issue_token(&account.uid).await.unwrap();

  let err = s.change_password(&account.uid, "wrong", "Nuevo123").await.unwrap_err();
  assert!(matches!(err, Error::WrongPassword));

  s.change_password(&account.uid, "Secreto1", "Nuevo123").await.unwrap();
  assert!(s.session_for_token(&token).await.is_err());
  assert!(s.authenticate("admin@padron.pe", "Nuevo123").await.is_ok());
}

// ─── Local identity ──────────────────────────────────────────────────────────

#[tokio::test]
async fn local_identity_notifies_subscribers() {
  let s = store().await;
  s.create_account(admin()).await.unwrap();
  let identity = LocalIdentity::new(s);

  let mut sub = identity.subscribe();
  assert_eq!(sub.recv().await, Some(None));

  let session = identity.sign_in("admin@padron.pe", "Secreto1").await.unwrap();
  assert_eq!(sub.recv().await, Some(Some(session.clone())));
  assert_eq!(identity.current_session(), Some(session));

  identity.sign_out().await.unwrap();
  assert_eq!(sub.recv().await, Some(None));
  sub.unsubscribe();
}

#[tokio::test]
async fn local_identity_change_password_needs_a_session() {
  let s = store().await;
  s.create_account(admin()).await.unwrap();
  let identity = LocalIdentity::new(s);

  let err = identity.change_password("Secreto1", "Nuevo123").await.unwrap_err();
  assert_eq!(err.code(), Some(code::UNAUTHENTICATED));

  identity.sign_in("admin@padron.pe", "Secreto1").await.unwrap();
  identity.change_password("Secreto1", "Nuevo123").await.unwrap();
}
