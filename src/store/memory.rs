//! In-process store backed by mutex-guarded maps.
//!
//! Every operation runs under a single lock, which gives the atomic
//! take-and-remove semantics the engine relies on. Suitable for tests and
//! single-process deployments.
use std::{
	collections::{HashMap, HashSet},
	sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Duration, Utc};

use crate::{ClientId, TransactionId, endpoints::authorization::AuthorizationTransaction};

use super::{
	AccessTokenKey, AccessTokenRecord, AuthorizationCodeRecord, Client, CredentialHash,
	CredentialStore, RefreshTokenRecord, StoreError, TransactionStore, User,
};

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	InsertAuthorizationCode,
	TakeAuthorizationCode,
	UpsertAccessToken,
	InsertRefreshToken,
	FindRefreshToken,
	SaveTransaction,
}

#[derive(Default)]
struct Tables {
	clients: HashMap<String, Client>,
	users: HashMap<String, User>,
	codes: HashMap<CredentialHash, AuthorizationCodeRecord>,
	access_tokens: HashMap<AccessTokenKey, AccessTokenRecord>,
	refresh_tokens: HashMap<CredentialHash, RefreshTokenRecord>,
	transactions: HashMap<String, AuthorizationTransaction>,
	failing: HashSet<Operation>,
}

impl Tables {
	fn check(&self, op: Operation) -> Result<(), StoreError> {
		if self.failing.contains(&op) {
			Err(StoreError::new(format!("{op:?} unavailable")))
		} else {
			Ok(())
		}
	}
}

#[derive(Default)]
pub struct MemoryStore {
	tables: Mutex<Tables>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
		self.tables
			.lock()
			.map_err(|_| StoreError::new("memory store lock poisoned"))
	}

	/// Registers a client, replacing any client with the same id.
	pub fn insert_client(&self, client: Client) -> Result<(), StoreError> {
		self.lock()?
			.clients
			.insert(client.id.as_str().to_owned(), client);
		Ok(())
	}

	/// Registers a user, replacing any user with the same username.
	pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
		self.lock()?.users.insert(user.username.clone(), user);
		Ok(())
	}

	/// Makes every subsequent call of `op` fail with a [`StoreError`].
	pub fn fail_on(&self, op: Operation) -> Result<(), StoreError> {
		self.lock()?.failing.insert(op);
		Ok(())
	}

	pub fn recover(&self, op: Operation) -> Result<(), StoreError> {
		self.lock()?.failing.remove(&op);
		Ok(())
	}

	pub fn access_token_count(&self) -> Result<usize, StoreError> {
		Ok(self.lock()?.access_tokens.len())
	}

	pub fn refresh_token_count(&self) -> Result<usize, StoreError> {
		Ok(self.lock()?.refresh_tokens.len())
	}

	pub fn authorization_code_count(&self) -> Result<usize, StoreError> {
		Ok(self.lock()?.codes.len())
	}

	pub fn transaction_count(&self) -> Result<usize, StoreError> {
		Ok(self.lock()?.transactions.len())
	}

	/// Returns the access token row of a client and user, if any.
	pub fn access_token_for(
		&self,
		client_id: &ClientId,
		user_id: Option<&str>,
	) -> Result<Option<AccessTokenRecord>, StoreError> {
		Ok(self
			.lock()?
			.access_tokens
			.values()
			.find(|t| t.client_id.as_str() == client_id.as_str() && t.user_id.as_deref() == user_id)
			.cloned())
	}
}

impl CredentialStore for MemoryStore {
	async fn find_client_by_id(&self, id: &ClientId) -> Result<Option<Client>, StoreError> {
		Ok(self.lock()?.clients.get(id.as_str()).cloned())
	}

	async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
		Ok(self.lock()?.users.get(username).cloned())
	}

	async fn insert_authorization_code(
		&self,
		record: AuthorizationCodeRecord,
	) -> Result<(), StoreError> {
		let mut tables = self.lock()?;
		tables.check(Operation::InsertAuthorizationCode)?;
		if tables.codes.contains_key(&record.code_hash) {
			return Err(StoreError::new("duplicate authorization code"));
		}
		tables.codes.insert(record.code_hash.clone(), record);
		Ok(())
	}

	async fn take_authorization_code_by_hash(
		&self,
		hash: &CredentialHash,
	) -> Result<Option<AuthorizationCodeRecord>, StoreError> {
		let mut tables = self.lock()?;
		tables.check(Operation::TakeAuthorizationCode)?;
		Ok(tables.codes.remove(hash))
	}

	async fn upsert_access_token(&self, record: AccessTokenRecord) -> Result<(), StoreError> {
		let mut tables = self.lock()?;
		tables.check(Operation::UpsertAccessToken)?;
		tables.access_tokens.insert(record.key(), record);
		Ok(())
	}

	async fn find_access_token_by_hash(
		&self,
		hash: &CredentialHash,
	) -> Result<Option<AccessTokenRecord>, StoreError> {
		Ok(self
			.lock()?
			.access_tokens
			.values()
			.find(|t| &t.token_hash == hash)
			.cloned())
	}

	async fn insert_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
		let mut tables = self.lock()?;
		tables.check(Operation::InsertRefreshToken)?;
		tables
			.refresh_tokens
			.insert(record.refresh_token_hash.clone(), record);
		Ok(())
	}

	async fn find_refresh_token_by_hash(
		&self,
		hash: &CredentialHash,
	) -> Result<Option<RefreshTokenRecord>, StoreError> {
		let tables = self.lock()?;
		tables.check(Operation::FindRefreshToken)?;
		Ok(tables.refresh_tokens.get(hash).cloned())
	}

	async fn delete_refresh_token_by_hash(&self, hash: &CredentialHash) -> Result<bool, StoreError> {
		Ok(self.lock()?.refresh_tokens.remove(hash).is_some())
	}

	async fn purge_expired_credentials(
		&self,
		code_lifetime: Duration,
		now: DateTime<Utc>,
	) -> Result<usize, StoreError> {
		let mut tables = self.lock()?;

		let before = tables.codes.len();
		tables
			.codes
			.retain(|_, code| !code.is_expired_at(code_lifetime, now));
		let codes = before - tables.codes.len();

		let before = tables.access_tokens.len();
		tables
			.access_tokens
			.retain(|_, token| !token.is_expired_at(now));
		let tokens = before - tables.access_tokens.len();

		if codes + tokens > 0 {
			log::debug!("purged {codes} expired authorization codes and {tokens} access tokens");
		}

		Ok(codes + tokens)
	}
}

impl TransactionStore for MemoryStore {
	async fn save_transaction(&self, transaction: AuthorizationTransaction) -> Result<(), StoreError> {
		let mut tables = self.lock()?;
		tables.check(Operation::SaveTransaction)?;
		tables
			.transactions
			.insert(transaction.id.as_str().to_owned(), transaction);
		Ok(())
	}

	async fn find_transaction(
		&self,
		id: &TransactionId,
	) -> Result<Option<AuthorizationTransaction>, StoreError> {
		Ok(self.lock()?.transactions.get(id.as_str()).cloned())
	}

	async fn update_transaction(
		&self,
		transaction: AuthorizationTransaction,
	) -> Result<bool, StoreError> {
		let mut tables = self.lock()?;
		tables.check(Operation::SaveTransaction)?;
		match tables.transactions.get_mut(transaction.id.as_str()) {
			Some(stored) => {
				*stored = transaction;
				Ok(true)
			}
			None => Ok(false),
		}
	}

	async fn take_transaction(
		&self,
		id: &TransactionId,
	) -> Result<Option<AuthorizationTransaction>, StoreError> {
		Ok(self.lock()?.transactions.remove(id.as_str()))
	}

	async fn purge_expired_transactions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
		let mut tables = self.lock()?;
		let before = tables.transactions.len();
		tables.transactions.retain(|_, t| !t.is_expired_at(now));
		let purged = before - tables.transactions.len();
		if purged > 0 {
			log::debug!("purged {purged} expired authorization transactions");
		}
		Ok(purged)
	}
}
