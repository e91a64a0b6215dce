//! Authorization endpoint: the "user approves client" handshake.
//!
//! An authorization request opens a transaction, the approval dialog is
//! rendered from it, and the user's decision closes it. Transactions move
//! through [`TransactionStatus`] states:
//!
//! ```text
//! Started -> AwaitingDecision -> Decided(Allow | Deny)
//! ```
//!
//! A transaction only references its client by id, and is discarded once a
//! decision is reached or its lifetime has elapsed.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.1>
use chrono::{DateTime, Duration, Utc};
use iref::UriBuf;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
	ClientId, ClientIdBuf, CodeBuf, Scope, ScopeBuf, TransactionId, TransactionIdBuf,
	config::GrantConfig,
	error::{GrantError, ValidationError},
	grant::GrantEngine,
	hasher::CredentialHasher,
	store::{Client, CredentialStore, StoreError, TransactionStore, User},
	util::{extend_uri_query, parse_redirect_uri},
};

/// Decision of the resource owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
	Allow,
	Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
	Started,
	AwaitingDecision,
	Decided(Decision),
}

impl TransactionStatus {
	/// Checks that the state machine allows moving to `next`.
	///
	/// Re-entering `AwaitingDecision` is allowed so the dialog can be
	/// rendered again.
	pub fn can_advance_to(self, next: Self) -> bool {
		matches!(
			(self, next),
			(Self::Started, Self::AwaitingDecision)
				| (Self::AwaitingDecision, Self::AwaitingDecision)
				| (Self::AwaitingDecision, Self::Decided(_))
		)
	}
}

/// A pending authorization request.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationTransaction {
	pub id: TransactionIdBuf,

	pub client_id: ClientIdBuf,

	pub redirect_uri: String,

	pub scope: Option<ScopeBuf>,

	/// Opaque value of the client, echoed back in the callback.
	///
	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-10.12>
	pub state: Option<String>,

	pub status: TransactionStatus,

	pub created_at: DateTime<Utc>,

	pub expires_at: DateTime<Utc>,
}

impl AuthorizationTransaction {
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}

	fn advance(&mut self, next: TransactionStatus) -> Result<(), ValidationError> {
		if self.status.can_advance_to(next) {
			log::debug!(
				"authorization transaction {:?} -> {next:?}",
				self.status
			);
			self.status = next;
			Ok(())
		} else {
			Err(ValidationError::InvalidTransactionState)
		}
	}
}

/// What the approval dialog is rendered from.
#[derive(Debug, Clone)]
pub struct AuthorizationPrompt {
	pub transaction_id: TransactionIdBuf,

	pub client: Client,

	pub scope: Option<ScopeBuf>,
}

/// Successful authorization response.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
	pub code: CodeBuf,

	pub redirect_uri: String,

	pub state: Option<String>,
}

impl AuthorizationResponse {
	/// Client callback URI carrying the code.
	pub fn redirect_uri(&self) -> Result<UriBuf, ValidationError> {
		#[skip_serializing_none]
		#[derive(Serialize)]
		struct Params<'a> {
			code: &'a str,
			state: Option<&'a str>,
		}

		let mut uri = parse_redirect_uri(&self.redirect_uri)?;
		extend_uri_query(
			&mut uri,
			Params {
				code: self.code.as_str(),
				state: self.state.as_deref(),
			},
		)?;
		Ok(uri)
	}
}

/// The resource owner refused the request.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDenial {
	pub redirect_uri: String,

	pub state: Option<String>,
}

impl AuthorizationDenial {
	/// Client callback URI carrying `error=access_denied`.
	pub fn redirect_uri(&self) -> Result<UriBuf, ValidationError> {
		#[skip_serializing_none]
		#[derive(Serialize)]
		struct Params<'a> {
			error: AuthorizationErrorCode,
			state: Option<&'a str>,
		}

		let mut uri = parse_redirect_uri(&self.redirect_uri)?;
		extend_uri_query(
			&mut uri,
			Params {
				error: AuthorizationErrorCode::AccessDenied,
				state: self.state.as_deref(),
			},
		)?;
		Ok(uri)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
	Issued(AuthorizationResponse),
	Denied(AuthorizationDenial),
}

impl AuthorizationOutcome {
	pub fn redirect_uri(&self) -> Result<UriBuf, ValidationError> {
		match self {
			Self::Issued(response) => response.redirect_uri(),
			Self::Denied(denial) => denial.redirect_uri(),
		}
	}
}

/// Error codes of the authorization endpoint, returned to the client through
/// its redirect URI.
///
/// Invalid requests are never redirected, so the only error a client receives
/// this way is the resource owner's refusal.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1>
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
	/// The resource owner or authorization server denied the request.
	AccessDenied,
}

/// Drives authorization transactions over a [`TransactionStore`].
pub struct AuthorizationFlow<T> {
	transactions: T,
	lifetime: Duration,
}

impl<T: TransactionStore> AuthorizationFlow<T> {
	pub fn new(transactions: T, config: &GrantConfig) -> Self {
		Self {
			transactions,
			lifetime: config.transaction_lifetime(),
		}
	}

	pub fn transactions(&self) -> &T {
		&self.transactions
	}

	/// Opens a transaction for an authorization request.
	///
	/// The redirect URI must be well-formed and match the client's registered
	/// pattern, so that no error is ever redirected to an unverified URI.
	pub async fn start<S, H>(
		&self,
		engine: &GrantEngine<S, H>,
		client_id: &ClientId,
		redirect_uri: &str,
		scope: Option<&Scope>,
		state: Option<String>,
	) -> Result<AuthorizationPrompt, GrantError>
	where
		S: CredentialStore,
		H: CredentialHasher,
	{
		parse_redirect_uri(redirect_uri)?;
		let client = engine.find_client(client_id).await?;
		if !client.redirect_matches(redirect_uri)? {
			log::warn!(
				"authorization request with unregistered redirect URI for `{}`",
				client_id.as_str()
			);
			return Err(ValidationError::RedirectMismatch.into());
		}

		let now = Utc::now();
		let transaction = AuthorizationTransaction {
			id: TransactionIdBuf::new_random(engine.hasher()),
			client_id: client.id.clone(),
			redirect_uri: redirect_uri.to_owned(),
			scope: scope.map(ToOwned::to_owned),
			state,
			status: TransactionStatus::Started,
			created_at: now,
			expires_at: now.checked_add_signed(self.lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC),
		};

		let prompt = AuthorizationPrompt {
			transaction_id: transaction.id.clone(),
			client,
			scope: transaction.scope.clone(),
		};

		self.transactions.save_transaction(transaction).await?;
		log::debug!("authorization transaction started for `{}`", client_id.as_str());
		Ok(prompt)
	}

	/// Loads a transaction for rendering the approval dialog.
	///
	/// The client is resolved again from its stored id. A transaction decided
	/// while the dialog is being prepared stays closed.
	pub async fn prompt<S, H>(
		&self,
		engine: &GrantEngine<S, H>,
		transaction_id: &TransactionId,
	) -> Result<AuthorizationPrompt, GrantError>
	where
		S: CredentialStore,
		H: CredentialHasher,
	{
		let mut transaction = self
			.transactions
			.find_transaction(transaction_id)
			.await?
			.ok_or(ValidationError::UnknownTransaction)?;

		if transaction.is_expired_at(Utc::now()) {
			self.transactions.take_transaction(transaction_id).await?;
			return Err(ValidationError::TransactionExpired.into());
		}

		transaction.advance(TransactionStatus::AwaitingDecision)?;
		let client = engine.find_client(&transaction.client_id).await?;

		let prompt = AuthorizationPrompt {
			transaction_id: transaction.id.clone(),
			client,
			scope: transaction.scope.clone(),
		};

		if !self.transactions.update_transaction(transaction).await? {
			log::debug!("authorization transaction closed while rendering its prompt");
			return Err(ValidationError::UnknownTransaction.into());
		}

		Ok(prompt)
	}

	/// Discards the transactions whose lifetime has elapsed.
	pub async fn purge_expired(&self) -> Result<usize, StoreError> {
		self.transactions.purge_expired_transactions(Utc::now()).await
	}

	/// Applies the resource owner's decision.
	///
	/// The transaction is removed before anything else, so it can be decided
	/// at most once, whatever the outcome.
	pub async fn decide<S, H>(
		&self,
		engine: &GrantEngine<S, H>,
		transaction_id: &TransactionId,
		user: &User,
		decision: Decision,
	) -> Result<AuthorizationOutcome, GrantError>
	where
		S: CredentialStore,
		H: CredentialHasher,
	{
		let mut transaction = self
			.transactions
			.take_transaction(transaction_id)
			.await?
			.ok_or(ValidationError::UnknownTransaction)?;

		if transaction.is_expired_at(Utc::now()) {
			return Err(ValidationError::TransactionExpired.into());
		}

		transaction.advance(TransactionStatus::Decided(decision))?;

		match decision {
			Decision::Deny => {
				log::debug!(
					"authorization denied by user for `{}`",
					transaction.client_id.as_str()
				);
				Ok(AuthorizationOutcome::Denied(AuthorizationDenial {
					redirect_uri: transaction.redirect_uri,
					state: transaction.state,
				}))
			}
			Decision::Allow => {
				let code = engine
					.issue_code(
						&transaction.client_id,
						&transaction.redirect_uri,
						user,
						transaction.scope.as_deref(),
					)
					.await?;

				Ok(AuthorizationOutcome::Issued(AuthorizationResponse {
					code,
					redirect_uri: transaction.redirect_uri,
					state: transaction.state,
				}))
			}
		}
	}
}
