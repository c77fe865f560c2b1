//! HTTP Basic-auth middleware and standalone verifier.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::error::Error;

/// The single operator account allowed to use the API.
#[derive(Debug, Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// Argon2 PHC string, as printed by `server hash-password`.
  pub password_hash: String,
}

impl AuthConfig {
  /// Rejects a missing username or a hash that is not a PHC string.
  pub fn new(username: &str, password_hash: &str) -> Result<Self, Error> {
    if username.is_empty() {
      return Err(Error::Config("auth_username is required".into()));
    }
    PasswordHash::new(password_hash)
      .map_err(|e| Error::Config(format!("auth_password_hash is not a PHC string: {e}")))?;
    Ok(Self { username: username.to_owned(), password_hash: password_hash.to_owned() })
  }
}

/// The `user:password` pair carried by an `Authorization: Basic` header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, encoded) = value.split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("basic") {
    return None;
  }
  let decoded = String::from_utf8(B64.decode(encoded.trim()).ok()?).ok()?;
  let (user, password) = decoded.split_once(':')?;
  Some((user.to_owned(), password.to_owned()))
}

/// Check the request's Basic credentials against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let (user, password) = basic_credentials(headers).ok_or(Error::Unauthorized)?;
  let hash = PasswordHash::new(&config.password_hash).map_err(|_| Error::Unauthorized)?;
  let accepted = user == config.username
    && Argon2::default().verify_password(password.as_bytes(), &hash).is_ok();
  if accepted { Ok(()) } else { Err(Error::Unauthorized) }
}

/// Middleware guarding every route it wraps.
pub async fn require_auth(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  if let Err(e) = verify_auth(req.headers(), &auth) {
    tracing::debug!(path = %req.uri().path(), "rejected unauthenticated request");
    return Err(e);
  }
  Ok(next.run(req).await)
}
