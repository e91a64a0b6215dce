//! OAuth 2.0 grant type implementations.
//!
//! Each submodule implements one grant as a free function over a
//! [`GrantContext`] (store, hasher, configuration), so a grant type can be
//! exercised in isolation. [`GrantEngine`] bundles the dependencies and
//! exposes every grant as a method.
//!
//! - [`authorization_code`]: Authorization Code Grant
//!   ([RFC 6749 Section 4.1](https://datatracker.ietf.org/doc/html/rfc6749#section-4.1)).
//! - [`password`]: Resource Owner Password Credentials Grant
//!   ([RFC 6749 Section 4.3](https://datatracker.ietf.org/doc/html/rfc6749#section-4.3)).
//! - [`client_credentials`]: Client Credentials Grant
//!   ([RFC 6749 Section 4.4](https://datatracker.ietf.org/doc/html/rfc6749#section-4.4)).
//! - [`refresh`]: Refreshing an Access Token
//!   ([RFC 6749 Section 6](https://datatracker.ietf.org/doc/html/rfc6749#section-6)).
use chrono::{DateTime, Utc};

use crate::{
	AccessToken, AccessTokenBuf, ClientId, ClientIdBuf, Code, CodeBuf, RefreshToken,
	RefreshTokenBuf, Scope, ScopeBuf,
	config::GrantConfig,
	endpoints::token::TokenResponse,
	error::{GrantError, ValidationError},
	hasher::{CredentialHasher, Sha256Hasher},
	store::{AccessTokenRecord, Client, CredentialStore, RefreshTokenRecord, StoreError, User},
};

pub mod authorization_code;
pub mod client_credentials;
pub mod password;
pub mod refresh;

/// Credentials minted by a successful exchange.
///
/// Holds the only plaintext copies of the tokens: the store keeps hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
	pub access_token: AccessTokenBuf,

	pub refresh_token: Option<RefreshTokenBuf>,

	/// Lifetime of the access token in seconds.
	pub expires_in: u64,

	pub scope: Option<ScopeBuf>,
}

impl TokenGrant {
	/// Builds the RFC 6749 §5.1 response body.
	pub fn to_response(&self) -> TokenResponse {
		TokenResponse {
			access_token: self.access_token.clone(),
			token_type: TokenResponse::BEARER.to_owned(),
			expires_in: Some(self.expires_in),
			refresh_token: self.refresh_token.clone(),
			scope: self.scope.clone(),
		}
	}
}

/// Result of a well-formed exchange request.
///
/// `Denied` is the neutral "not granted" outcome: the credential presented was
/// absent, mismatched or expired. It deliberately does not say which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
	Granted(TokenGrant),
	Denied,
}

impl ExchangeOutcome {
	pub fn is_granted(&self) -> bool {
		matches!(self, Self::Granted(_))
	}

	pub fn granted(&self) -> Option<&TokenGrant> {
		match self {
			Self::Granted(grant) => Some(grant),
			Self::Denied => None,
		}
	}

	pub fn into_granted(self) -> Option<TokenGrant> {
		match self {
			Self::Granted(grant) => Some(grant),
			Self::Denied => None,
		}
	}
}

/// Dependencies shared by every grant handler.
pub struct GrantContext<'a, S, H> {
	pub store: &'a S,
	pub hasher: &'a H,
	pub config: &'a GrantConfig,
}

impl<'a, S, H> Clone for GrantContext<'a, S, H> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<'a, S, H> Copy for GrantContext<'a, S, H> {}

impl<'a, S, H> GrantContext<'a, S, H>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	pub fn new(store: &'a S, hasher: &'a H, config: &'a GrantConfig) -> Self {
		Self {
			store,
			hasher,
			config,
		}
	}

	fn access_token_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
		now.checked_add_signed(self.config.access_token_lifetime())
			.unwrap_or(DateTime::<Utc>::MAX_UTC)
	}

	/// Generates and persists a new access token, replacing the current one
	/// of `(client_id, user_id)`.
	async fn store_access_token(
		&self,
		client_id: &ClientId,
		user_id: Option<&str>,
		scope: Option<&Scope>,
	) -> Result<AccessTokenBuf, StoreError> {
		let access_token = AccessTokenBuf::generate(self.hasher, self.config.token_bytes);
		self.store
			.upsert_access_token(AccessTokenRecord {
				token_hash: self.hasher.hash(access_token.as_str()),
				client_id: client_id.to_owned(),
				user_id: user_id.map(ToOwned::to_owned),
				scope: scope.map(ToOwned::to_owned),
				expires_at: self.access_token_expiry(Utc::now()),
			})
			.await?;
		Ok(access_token)
	}

	/// Mints an access token and, when `user_id` is given and
	/// `issue_refresh_token` is set, a refresh token.
	///
	/// The refresh token is persisted first. If the access token cannot be
	/// stored, the refresh token is deleted again and the error is returned:
	/// a caller never receives half a pair.
	async fn mint(
		&self,
		client_id: &ClientId,
		user_id: Option<&str>,
		scope: Option<&Scope>,
		issue_refresh_token: bool,
	) -> Result<TokenGrant, StoreError> {
		let refresh = match user_id {
			Some(user_id) if issue_refresh_token => {
				let refresh_token = RefreshTokenBuf::generate(self.hasher, self.config.token_bytes);
				let refresh_token_hash = self.hasher.hash(refresh_token.as_str());
				self.store
					.insert_refresh_token(RefreshTokenRecord {
						refresh_token_hash: refresh_token_hash.clone(),
						client_id: client_id.to_owned(),
						user_id: user_id.to_owned(),
					})
					.await?;
				Some((refresh_token, refresh_token_hash))
			}
			_ => None,
		};

		let access_token = match self.store_access_token(client_id, user_id, scope).await {
			Ok(access_token) => access_token,
			Err(e) => {
				if let Some((_, hash)) = &refresh {
					if let Err(cleanup) = self.store.delete_refresh_token_by_hash(hash).await {
						log::warn!("orphaned refresh token left behind: {cleanup}");
					}
				}
				return Err(e);
			}
		};

		log::debug!(
			"minted access token for client `{}` (refresh token: {})",
			client_id.as_str(),
			refresh.is_some()
		);

		Ok(TokenGrant {
			access_token,
			refresh_token: refresh.map(|(token, _)| token),
			expires_in: self.config.access_token_lifetime_secs,
			scope: scope.map(ToOwned::to_owned),
		})
	}
}

/// The grant engine.
///
/// Stateless between calls: every decision re-reads the store.
pub struct GrantEngine<S, H = Sha256Hasher> {
	store: S,
	hasher: H,
	config: GrantConfig,
}

impl<S: CredentialStore> GrantEngine<S> {
	pub fn new(store: S, config: GrantConfig) -> Self {
		Self::with_hasher(store, Sha256Hasher, config)
	}
}

impl<S, H> GrantEngine<S, H>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	pub fn with_hasher(store: S, hasher: H, config: GrantConfig) -> Self {
		Self {
			store,
			hasher,
			config,
		}
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn hasher(&self) -> &H {
		&self.hasher
	}

	pub fn config(&self) -> &GrantConfig {
		&self.config
	}

	pub fn context(&self) -> GrantContext<'_, S, H> {
		GrantContext::new(&self.store, &self.hasher, &self.config)
	}

	/// Resolves a client by id.
	pub async fn find_client(&self, client_id: &ClientId) -> Result<Client, GrantError> {
		self.store
			.find_client_by_id(client_id)
			.await?
			.ok_or(GrantError::Validation(ValidationError::UnknownClient))
	}

	/// Authenticates a confidential client by id and secret.
	///
	/// An unknown client and a wrong secret both yield `None`.
	pub async fn authenticate_client(
		&self,
		client_id: &ClientId,
		secret: &str,
	) -> Result<Option<Client>, GrantError> {
		let client = self.store.find_client_by_id(client_id).await?;
		Ok(client.filter(|c| c.verify_secret(secret)))
	}

	/// Issues an authorization code for an approved request.
	pub async fn issue_code(
		&self,
		client_id: &ClientId,
		redirect_uri: &str,
		user: &User,
		scope: Option<&Scope>,
	) -> Result<CodeBuf, GrantError> {
		authorization_code::issue(self.context(), client_id, redirect_uri, user, scope).await
	}

	pub async fn exchange_code(
		&self,
		client: &Client,
		code: &Code,
		redirect_uri: &str,
	) -> Result<ExchangeOutcome, GrantError> {
		authorization_code::exchange(self.context(), client, code, redirect_uri).await
	}

	pub async fn exchange_password(
		&self,
		client: &Client,
		username: &str,
		password: &str,
		scope: Option<&Scope>,
	) -> Result<ExchangeOutcome, GrantError> {
		password::exchange(self.context(), client, username, password, scope).await
	}

	pub async fn exchange_client_credentials(
		&self,
		client: &Client,
		scope: Option<&Scope>,
	) -> Result<ExchangeOutcome, GrantError> {
		client_credentials::exchange(self.context(), client, scope).await
	}

	pub async fn exchange_refresh_token(
		&self,
		client: &Client,
		refresh_token: &RefreshToken,
		scope: Option<&Scope>,
	) -> Result<ExchangeOutcome, GrantError> {
		refresh::exchange(self.context(), client, refresh_token, scope).await
	}

	/// Deletes a refresh token, if it exists and belongs to `client`.
	pub async fn revoke_refresh_token(
		&self,
		client: &Client,
		refresh_token: &RefreshToken,
	) -> Result<bool, GrantError> {
		refresh::revoke(self.context(), client, refresh_token).await
	}

	/// Looks up an access token presented to a resource server.
	///
	/// Returns `None` for unknown and expired tokens alike.
	pub async fn validate_access_token(
		&self,
		access_token: &AccessToken,
	) -> Result<Option<AccessTokenRecord>, GrantError> {
		let hash = self.hasher.hash(access_token.as_str());
		let record = self.store.find_access_token_by_hash(&hash).await?;
		Ok(record.filter(|r| !r.is_expired_at(Utc::now())))
	}

	/// Deletes expired authorization codes and access tokens.
	///
	/// Meant to be called periodically by the host.
	pub async fn purge_expired(&self) -> Result<usize, GrantError> {
		Ok(self
			.store
			.purge_expired_credentials(self.config.authorization_code_lifetime(), Utc::now())
			.await?)
	}
}

/// Identifier of the client a record is bound to, for comparisons.
fn same_client(a: &ClientIdBuf, b: &ClientId) -> bool {
	a.as_str() == b.as_str()
}
