use std::fmt;

use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::{
	ClientId, ClientIdBuf, ScopeBuf,
	error::ValidationError,
	hasher::{CredentialHash, constant_time_eq, hash_password, new_salt},
};

/// A registered client application.
///
/// Created by a user registering an app and never mutated by the grant
/// engine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
	pub id: ClientIdBuf,

	/// Display name shown on the approval dialog.
	#[serde(default)]
	pub name: Option<String>,

	pub secret: String,

	/// Regular expression every redirect URI requested for this client must
	/// match in full (case-insensitively).
	///
	/// The pattern is anchored at both ends: a pattern written for substring
	/// matching, such as a bare prefix `https://app.example.com/`, rejects
	/// `https://app.example.com/cb` and needs an explicit `.*` suffix.
	pub redirect_uri_pattern: String,

	/// User who registered the client. Acts as the resource owner for the
	/// client credentials grant.
	#[serde(default)]
	pub owner_user_id: Option<String>,
}

impl Client {
	pub fn new(
		id: ClientIdBuf,
		secret: impl Into<String>,
		redirect_uri_pattern: impl Into<String>,
		owner_user_id: Option<String>,
	) -> Self {
		Self {
			id,
			name: None,
			secret: secret.into(),
			redirect_uri_pattern: redirect_uri_pattern.into(),
			owner_user_id,
		}
	}

	pub fn with_name(self, name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..self
		}
	}

	pub fn id(&self) -> &ClientId {
		&self.id
	}

	/// Checks a requested redirect URI against the registered pattern.
	pub fn redirect_matches(&self, redirect_uri: &str) -> Result<bool, ValidationError> {
		let regex = RegexBuilder::new(&format!("^(?:{})$", self.redirect_uri_pattern))
			.case_insensitive(true)
			.build()
			.map_err(|e| {
				log::warn!("client `{}` has an invalid redirect pattern: {e}", self.id.as_str());
				ValidationError::InvalidRedirectPattern
			})?;

		Ok(regex.is_match(redirect_uri))
	}

	pub fn verify_secret(&self, secret: &str) -> bool {
		constant_time_eq(&self.secret, secret)
	}
}

impl fmt::Debug for Client {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Client")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("redirect_uri_pattern", &self.redirect_uri_pattern)
			.field("owner_user_id", &self.owner_user_id)
			.finish_non_exhaustive()
	}
}

/// A salted, slowly-derived user secret.
///
/// Verification fails closed: a secret without salt or digest never matches.
#[derive(Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
	#[serde(default)]
	pub digest: Option<String>,

	#[serde(default)]
	pub salt: Option<String>,
}

impl Secret {
	/// Derives a fresh secret from its plaintext, with a new salt.
	pub fn derive(plaintext: &str) -> Self {
		let salt = new_salt();
		Self {
			digest: Some(hash_password(plaintext, &salt)),
			salt: Some(salt),
		}
	}

	pub fn is_set(&self) -> bool {
		self.digest.is_some() && self.salt.is_some()
	}

	pub fn verify(&self, plaintext: &str) -> bool {
		match (&self.digest, &self.salt) {
			(Some(digest), Some(salt)) => constant_time_eq(&hash_password(plaintext, salt), digest),
			_ => false,
		}
	}
}

impl fmt::Debug for Secret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Secret")
			.field("set", &self.is_set())
			.finish()
	}
}

/// A resource owner.
///
/// Carries two independent secrets: the password, and an optional
/// passwordless auth code, each with its own salt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: String,

	pub username: String,

	#[serde(default)]
	pub password: Secret,

	#[serde(default)]
	pub auth_code: Secret,
}

impl User {
	pub fn new(id: impl Into<String>, username: impl Into<String>, password: &str) -> Self {
		Self {
			id: id.into(),
			username: username.into(),
			password: Secret::derive(password),
			auth_code: Secret::default(),
		}
	}

	pub fn set_password(&mut self, password: &str) {
		self.password = Secret::derive(password);
	}

	/// Sets the passwordless auth code. The password secret is untouched.
	pub fn set_auth_code(&mut self, code: &str) {
		self.auth_code = Secret::derive(code);
	}

	pub fn verify_password(&self, password: &str) -> bool {
		self.password.verify(password)
	}

	pub fn verify_auth_code(&self, code: &str) -> bool {
		self.auth_code.verify(code)
	}
}

/// A persisted authorization code. Never updated: consumed and deleted on
/// exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeRecord {
	pub code_hash: CredentialHash,

	pub client_id: ClientIdBuf,

	/// The exact URI the code is bound to.
	pub redirect_uri: String,

	pub user_id: String,

	/// Scope approved with the code, carried over to the access token.
	pub scope: Option<ScopeBuf>,

	pub issued_at: DateTime<Utc>,
}

impl AuthorizationCodeRecord {
	pub fn is_expired_at(&self, lifetime: chrono::Duration, now: DateTime<Utc>) -> bool {
		match self.issued_at.checked_add_signed(lifetime) {
			Some(expires_at) => now >= expires_at,
			None => false,
		}
	}
}

/// Key of an access-token row: at most one active token exists per client
/// and user.
pub type AccessTokenKey = (ClientIdBuf, Option<String>);

/// A persisted access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenRecord {
	pub token_hash: CredentialHash,

	pub client_id: ClientIdBuf,

	/// `None` for a client acting on its own behalf.
	pub user_id: Option<String>,

	pub scope: Option<ScopeBuf>,

	pub expires_at: DateTime<Utc>,
}

impl AccessTokenRecord {
	pub fn key(&self) -> AccessTokenKey {
		(self.client_id.clone(), self.user_id.clone())
	}

	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}
}

/// A persisted refresh token. Not time-limited: revoked by deletion only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
	pub refresh_token_hash: CredentialHash,

	pub client_id: ClientIdBuf,

	pub user_id: String,
}
