//! Accounts and bearer tokens: the identity half of the hosted backend.
//!
//! Passwords are stored as argon2 PHC strings. Tokens are 32 random bytes,
//! hex-encoded for the client; only their SHA-256 digest is written to disk.

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::SaltString,
};
use chrono::{DateTime, Utc};
use padron_core::session::Session;
use rand_core::{OsRng, RngCore as _};
use rusqlite::OptionalExtension as _;
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use crate::{
  Error, Result, SqliteStore,
  encode::{decode_dt, encode_dt},
};

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
  pub uid:          String,
  pub email:        String,
  pub display_name: Option<String>,
  pub disabled:     bool,
  pub created_at:   DateTime<Utc>,
}

impl Account {
  pub fn session(&self) -> Session {
    Session {
      uid:          self.uid.clone(),
      email:        self.email.clone(),
      display_name: self.display_name.clone(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:        String,
  pub password:     String,
  pub display_name: Option<String>,
}

struct RawAccount {
  uid:           String,
  email:         String,
  display_name:  Option<String>,
  password_hash: String,
  disabled:      bool,
  created_at:    String,
}

const ACCOUNT_COLUMNS: &str = "uid, email, display_name, password_hash, disabled, created_at";

impl RawAccount {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:           row.get(0)?,
      email:         row.get(1)?,
      display_name:  row.get(2)?,
      password_hash: row.get(3)?,
      disabled:      row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  fn into_account(self) -> Result<Account> {
    Ok(Account {
      uid:          self.uid,
      email:        self.email,
      display_name: self.display_name,
      disabled:     self.disabled,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

// ─── Secrets ─────────────────────────────────────────────────────────────────

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
  let parsed = PasswordHash::new(hash)?;
  match Argon2::default().verify_password(password.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(e) => Err(e.into()),
  }
}

fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

// ─── Account operations ──────────────────────────────────────────────────────

impl SqliteStore {
  async fn raw_account(&self, column: &'static str, key: &str) -> Result<Option<RawAccount>> {
    let key = key.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = ?1"),
                rusqlite::params![key],
                RawAccount::from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  pub async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
    self
      .raw_account("email", email)
      .await?
      .map(RawAccount::into_account)
      .transpose()
  }

  pub async fn create_account(&self, new: NewAccount) -> Result<Account> {
    if self.raw_account("email", &new.email).await?.is_some() {
      return Err(Error::EmailInUse(new.email));
    }

    let account = Account {
      uid:          Uuid::new_v4().simple().to_string(),
      email:        new.email,
      display_name: new.display_name,
      disabled:     false,
      created_at:   Utc::now(),
    };
    let hash = hash_password(&new.password)?;

    let row = (
      account.uid.clone(),
      account.email.clone(),
      account.display_name.clone(),
      encode_dt(account.created_at),
    );
    self
      .conn
      .call(move |conn| {
        let (uid, email, display_name, at) = row;
        conn.execute(
          "INSERT INTO accounts (uid, email, display_name, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![uid, email, display_name, hash, at],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(uid = %account.uid, email = %account.email, "account created");
    Ok(account)
  }

  /// Check an email/password pair.
  pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account> {
    let raw = self
      .raw_account("email", email)
      .await?
      .ok_or_else(|| Error::UnknownAccount(email.to_owned()))?;

    if !verify_password(password, &raw.password_hash)? {
      tracing::warn!(email, "sign-in with wrong password");
      return Err(Error::WrongPassword);
    }
    if raw.disabled {
      return Err(Error::AccountDisabled(raw.email));
    }
    raw.into_account()
  }

  /// Tokens issued before this instant have expired.
  fn token_cutoff(&self) -> String { encode_dt(Utc::now() - self.token_ttl) }

  /// Mint a bearer token for `uid`, pruning expired ones. The plaintext is
  /// returned once and never stored.
  pub async fn issue_token(&self, uid: &str) -> Result<String> {
    let token  = new_token();
    let digest = token_digest(&token);
    let uid    = uid.to_owned();
    let at     = encode_dt(Utc::now());
    let cutoff = self.token_cutoff();

    let pruned = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let pruned = tx.execute(
          "DELETE FROM auth_tokens WHERE created_at < ?1",
          rusqlite::params![cutoff],
        )?;
        tx.execute(
          "INSERT INTO auth_tokens (token_hash, uid, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![digest, uid, at],
        )?;
        tx.commit()?;
        Ok(pruned)
      })
      .await?;
    if pruned > 0 {
      tracing::debug!(pruned, "expired tokens removed");
    }
    Ok(token)
  }

  /// Resolve a bearer token to the session of an enabled account. An
  /// expired token is deleted and refused.
  pub async fn session_for_token(&self, token: &str) -> Result<Session> {
    let digest = token_digest(token);
    let cutoff = self.token_cutoff();

    let raw: Option<(RawAccount, String)> = self
      .conn
      .call(move |conn| {
        let found = conn
          .query_row(
            "SELECT a.uid, a.email, a.display_name, a.password_hash, a.disabled, a.created_at,
                    t.created_at
             FROM auth_tokens t JOIN accounts a ON a.uid = t.uid
             WHERE t.token_hash = ?1",
            rusqlite::params![digest],
            |row| Ok((RawAccount::from_row(row)?, row.get::<_, String>(6)?)),
          )
          .optional()?;
        if let Some((_, issued)) = &found
          && *issued < cutoff
        {
          conn.execute("DELETE FROM auth_tokens WHERE token_hash = ?1", rusqlite::params![digest])?;
          return Ok(None);
        }
        Ok(found)
      })
      .await?;

    match raw {
      Some((raw, _)) if !raw.disabled => Ok(raw.into_account()?.session()),
      _ => Err(Error::InvalidToken),
    }
  }

  pub async fn revoke_token(&self, token: &str) -> Result<()> {
    let digest = token_digest(token);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM auth_tokens WHERE token_hash = ?1", rusqlite::params![digest])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn write_password(&self, uid: String, password: &str) -> Result<()> {
    let hash = hash_password(password)?;
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE accounts SET password_hash = ?1 WHERE uid = ?2",
          rusqlite::params![hash, uid],
        )?;
        tx.execute("DELETE FROM auth_tokens WHERE uid = ?1", rusqlite::params![uid])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Replace an account's password without checking the old one. Every
  /// outstanding token for the account is revoked.
  pub async fn set_password(&self, email: &str, password: &str) -> Result<()> {
    let raw = self
      .raw_account("email", email)
      .await?
      .ok_or_else(|| Error::UnknownAccount(email.to_owned()))?;
    self.write_password(raw.uid, password).await?;
    tracing::info!(email, "password replaced");
    Ok(())
  }

  /// Change a password after re-checking the current one. Outstanding
  /// tokens are revoked, the caller's included.
  pub async fn change_password(&self, uid: &str, current: &str, new: &str) -> Result<()> {
    let raw = self
      .raw_account("uid", uid)
      .await?
      .ok_or_else(|| Error::UnknownAccount(uid.to_owned()))?;
    if !verify_password(current, &raw.password_hash)? {
      return Err(Error::WrongPassword);
    }
    self.write_password(raw.uid, new).await?;
    tracing::info!(uid, "password changed");
    Ok(())
  }

  pub async fn set_disabled(&self, email: &str, disabled: bool) -> Result<()> {
    let email_owned = email.to_owned();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts SET disabled = ?1 WHERE email = ?2",
          rusqlite::params![disabled, email_owned],
        )?)
      })
      .await?;
    if changed == 0 {
      return Err(Error::UnknownAccount(email.to_owned()));
    }
    Ok(())
  }

  /// Record a password reset request. There is no mail delivery; the
  /// request is logged for an operator to act on with `set-password`.
  pub async fn request_password_reset(&self, email: &str) -> Result<()> {
    if self.raw_account("email", email).await?.is_none() {
      return Err(Error::UnknownAccount(email.to_owned()));
    }
    tracing::warn!(email, "password reset requested");
    Ok(())
  }
}
