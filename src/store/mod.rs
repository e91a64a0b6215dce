//! Persistence contract of the grant engine.
//!
//! The engine holds no state between requests: every decision re-reads the
//! store, which is the sole authority over concurrent visibility. Two
//! operations carry atomicity requirements an implementation must honor:
//!
//! - [`CredentialStore::take_authorization_code_by_hash`] removes and returns
//!   the code in one step, so that two concurrent exchanges of the same code
//!   cannot both observe it.
//! - [`TransactionStore::take_transaction`] does the same for pending
//!   authorization transactions, and [`TransactionStore::update_transaction`]
//!   never resurrects a transaction taken in the meantime.
//!
//! Expired rows are only ever skipped by the engine. Removing them is up to
//! the store, through the `purge_expired_*` operations the host calls
//! periodically.
use std::future::Future;

use chrono::{DateTime, Duration, Utc};

use crate::{ClientId, TransactionId, endpoints::authorization::AuthorizationTransaction};

pub mod memory;
mod records;

pub use crate::hasher::CredentialHash;
pub use records::*;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Persistence failure. Safe for the caller to retry.
#[derive(Debug, thiserror::Error)]
#[error("store error: {message}")]
pub struct StoreError {
	message: String,

	#[source]
	source: Option<BoxedError>,
}

impl StoreError {
	pub fn new(message: impl ToString) -> Self {
		let message = message.to_string();
		log::error!("store error: {message}");
		Self {
			message,
			source: None,
		}
	}

	pub fn with_source(message: impl ToString, source: impl Into<BoxedError>) -> Self {
		let message = message.to_string();
		let source = source.into();
		log::error!("store error: {message}: {source}");
		Self {
			message,
			source: Some(source),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Storage of clients, users, authorization codes and tokens.
pub trait CredentialStore: Send + Sync {
	fn find_client_by_id(
		&self,
		id: &ClientId,
	) -> impl Send + Future<Output = Result<Option<Client>, StoreError>>;

	fn find_user_by_username(
		&self,
		username: &str,
	) -> impl Send + Future<Output = Result<Option<User>, StoreError>>;

	/// Checks `password` against the user's password secret.
	///
	/// The default derives the digest in-process, blocking the calling
	/// thread for the duration of the key derivation.
	fn verify_user_password(
		&self,
		user: &User,
		password: &str,
	) -> impl Send + Future<Output = Result<bool, StoreError>> {
		let matched = user.verify_password(password);
		async move { Ok(matched) }
	}

	fn insert_authorization_code(
		&self,
		record: AuthorizationCodeRecord,
	) -> impl Send + Future<Output = Result<(), StoreError>>;

	/// Atomically removes and returns the code stored under `hash`.
	fn take_authorization_code_by_hash(
		&self,
		hash: &CredentialHash,
	) -> impl Send + Future<Output = Result<Option<AuthorizationCodeRecord>, StoreError>>;

	/// Inserts the token, replacing any row with the same
	/// [`AccessTokenRecord::key`].
	fn upsert_access_token(
		&self,
		record: AccessTokenRecord,
	) -> impl Send + Future<Output = Result<(), StoreError>>;

	fn find_access_token_by_hash(
		&self,
		hash: &CredentialHash,
	) -> impl Send + Future<Output = Result<Option<AccessTokenRecord>, StoreError>>;

	fn insert_refresh_token(
		&self,
		record: RefreshTokenRecord,
	) -> impl Send + Future<Output = Result<(), StoreError>>;

	fn find_refresh_token_by_hash(
		&self,
		hash: &CredentialHash,
	) -> impl Send + Future<Output = Result<Option<RefreshTokenRecord>, StoreError>>;

	/// Returns `true` if a token was deleted.
	fn delete_refresh_token_by_hash(
		&self,
		hash: &CredentialHash,
	) -> impl Send + Future<Output = Result<bool, StoreError>>;

	/// Deletes authorization codes issued more than `code_lifetime` before
	/// `now`, and access tokens expired at `now`.
	///
	/// Returns the number of deleted rows.
	fn purge_expired_credentials(
		&self,
		code_lifetime: Duration,
		now: DateTime<Utc>,
	) -> impl Send + Future<Output = Result<usize, StoreError>>;
}

/// Storage of pending authorization transactions, typically wherever the
/// host keeps session state.
pub trait TransactionStore: Send + Sync {
	/// Inserts or replaces the transaction with the same id.
	fn save_transaction(
		&self,
		transaction: AuthorizationTransaction,
	) -> impl Send + Future<Output = Result<(), StoreError>>;

	fn find_transaction(
		&self,
		id: &TransactionId,
	) -> impl Send + Future<Output = Result<Option<AuthorizationTransaction>, StoreError>>;

	/// Replaces the stored transaction with the same id, only if it is still
	/// present. Checking and writing must happen atomically.
	///
	/// Returns `false` if the transaction was taken meanwhile.
	fn update_transaction(
		&self,
		transaction: AuthorizationTransaction,
	) -> impl Send + Future<Output = Result<bool, StoreError>>;

	/// Atomically removes and returns the transaction.
	fn take_transaction(
		&self,
		id: &TransactionId,
	) -> impl Send + Future<Output = Result<Option<AuthorizationTransaction>, StoreError>>;

	/// Deletes the transactions expired at `now`, returning how many were
	/// deleted.
	fn purge_expired_transactions(
		&self,
		now: DateTime<Utc>,
	) -> impl Send + Future<Output = Result<usize, StoreError>>;
}
