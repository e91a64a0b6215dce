//! Authorization Code Grant.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1>
use chrono::Utc;

use crate::{
	ClientId, Code, CodeBuf, Scope,
	error::{GrantError, ValidationError},
	hasher::CredentialHasher,
	store::{AuthorizationCodeRecord, Client, CredentialStore, User},
};

use super::{ExchangeOutcome, GrantContext, same_client};

/// Issues a code bound to `client_id`, `redirect_uri` and `user`.
///
/// The client record is re-read from the store rather than trusted from the
/// caller, and the redirect URI must match its registered pattern. Only the
/// hash of the returned code is persisted.
pub async fn issue<S, H>(
	cx: GrantContext<'_, S, H>,
	client_id: &ClientId,
	redirect_uri: &str,
	user: &User,
	scope: Option<&Scope>,
) -> Result<CodeBuf, GrantError>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	let client = cx
		.store
		.find_client_by_id(client_id)
		.await?
		.ok_or(ValidationError::UnknownClient)?;

	if !client.redirect_matches(redirect_uri)? {
		log::warn!(
			"redirect URI rejected for client `{}`",
			client_id.as_str()
		);
		return Err(ValidationError::RedirectMismatch.into());
	}

	let code = CodeBuf::generate(cx.hasher, cx.config.code_bytes);
	cx.store
		.insert_authorization_code(AuthorizationCodeRecord {
			code_hash: cx.hasher.hash(code.as_str()),
			client_id: client.id,
			redirect_uri: redirect_uri.to_owned(),
			user_id: user.id.clone(),
			scope: scope.map(ToOwned::to_owned),
			issued_at: Utc::now(),
		})
		.await?;

	log::debug!("issued authorization code for client `{}`", client_id.as_str());
	Ok(code)
}

/// Exchanges a code for an access token and refresh token.
///
/// The code is taken out of the store before anything is checked, so it is
/// consumed by any presentation, even a rejected one. Every rejection yields
/// the same [`ExchangeOutcome::Denied`].
pub async fn exchange<S, H>(
	cx: GrantContext<'_, S, H>,
	client: &Client,
	code: &Code,
	redirect_uri: &str,
) -> Result<ExchangeOutcome, GrantError>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	let hash = cx.hasher.hash(code.as_str());
	let Some(record) = cx.store.take_authorization_code_by_hash(&hash).await? else {
		log::debug!(
			"unknown or already used authorization code presented by `{}`",
			client.id.as_str()
		);
		return Ok(ExchangeOutcome::Denied);
	};

	if !same_client(&record.client_id, client.id()) {
		log::warn!(
			"authorization code of `{}` presented by `{}`",
			record.client_id.as_str(),
			client.id.as_str()
		);
		return Ok(ExchangeOutcome::Denied);
	}

	if record.redirect_uri != redirect_uri {
		log::warn!(
			"authorization code presented with a different redirect URI by `{}`",
			client.id.as_str()
		);
		return Ok(ExchangeOutcome::Denied);
	}

	if record.is_expired_at(cx.config.authorization_code_lifetime(), Utc::now()) {
		log::debug!("expired authorization code presented by `{}`", client.id.as_str());
		return Ok(ExchangeOutcome::Denied);
	}

	let grant = cx
		.mint(
			&record.client_id,
			Some(record.user_id.as_str()),
			record.scope.as_deref(),
			true,
		)
		.await?;

	Ok(ExchangeOutcome::Granted(grant))
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::{
		config::GrantConfig,
		grant::{
			GrantEngine,
			tests::{REDIRECT_URI, alice, client, client_id, engine},
		},
		store::memory::{MemoryStore, Operation},
	};

	#[tokio::test]
	async fn issue_then_exchange_once() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;

		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();

		let outcome = engine.exchange_code(&c1, &code, REDIRECT_URI).await.unwrap();
		let grant = outcome.into_granted().unwrap();
		assert_eq!(grant.expires_in, GrantConfig::default().access_token_lifetime_secs);
		assert!(grant.refresh_token.is_some());
		assert_eq!(engine.store().access_token_count().unwrap(), 1);
		assert_eq!(engine.store().refresh_token_count().unwrap(), 1);

		// Single use.
		let replay = engine.exchange_code(&c1, &code, REDIRECT_URI).await.unwrap();
		assert_eq!(replay, ExchangeOutcome::Denied);
	}

	#[tokio::test]
	async fn only_the_hash_is_persisted() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;
		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();

		let plain = crate::hasher::CredentialHash::from_stored(code.as_str().to_owned());
		assert!(
			engine
				.store()
				.take_authorization_code_by_hash(&plain)
				.await
				.unwrap()
				.is_none()
		);
		assert_eq!(engine.store().authorization_code_count().unwrap(), 1);
	}

	#[tokio::test]
	async fn issuance_rejects_unregistered_redirect() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;

		let result = engine
			.issue_code(c1.id(), "https://evil.example.com/cb", &user, None)
			.await;
		assert!(matches!(
			result,
			Err(GrantError::Validation(ValidationError::RedirectMismatch))
		));
		assert_eq!(engine.store().authorization_code_count().unwrap(), 0);
	}

	#[tokio::test]
	async fn issuance_rereads_the_client() {
		let engine = engine();
		let user = alice(&engine).await;
		let result = engine
			.issue_code(&client_id("ghost"), REDIRECT_URI, &user, None)
			.await;
		assert!(matches!(
			result,
			Err(GrantError::Validation(ValidationError::UnknownClient))
		));
	}

	#[tokio::test]
	async fn issuance_surfaces_store_errors() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;
		engine
			.store()
			.fail_on(Operation::InsertAuthorizationCode)
			.unwrap();

		let result = engine.issue_code(c1.id(), REDIRECT_URI, &user, None).await;
		assert!(matches!(result, Err(GrantError::Store(_))));
	}

	#[tokio::test]
	async fn different_redirect_uri_is_denied() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;
		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();

		// Matches the pattern case-insensitively, but is not the bound URI.
		let outcome = engine
			.exchange_code(&c1, &code, "HTTPS://APP.EXAMPLE.COM/cb")
			.await
			.unwrap();
		assert_eq!(outcome, ExchangeOutcome::Denied);
		assert_eq!(engine.store().access_token_count().unwrap(), 0);
	}

	#[tokio::test]
	async fn other_client_is_denied() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let c2 = client(&engine, "c2").await;
		let user = alice(&engine).await;
		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();

		let outcome = engine.exchange_code(&c2, &code, REDIRECT_URI).await.unwrap();
		assert_eq!(outcome, ExchangeOutcome::Denied);
	}

	#[tokio::test]
	async fn unknown_code_is_denied() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let outcome = engine
			.exchange_code(&c1, Code::new("made-up").unwrap(), REDIRECT_URI)
			.await
			.unwrap();
		assert_eq!(outcome, ExchangeOutcome::Denied);
	}

	#[tokio::test]
	async fn expired_code_is_denied() {
		let store = MemoryStore::new();
		store
			.insert_client(Client::new(client_id("c1"), "s", REDIRECT_URI, None))
			.unwrap();
		let engine = GrantEngine::new(
			store,
			GrantConfig {
				authorization_code_lifetime_secs: 0,
				..Default::default()
			},
		);
		let c1 = client(&engine, "c1").await;
		let user = User::new("u1", "alice", "pw");
		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();

		let outcome = engine.exchange_code(&c1, &code, REDIRECT_URI).await.unwrap();
		assert_eq!(outcome, ExchangeOutcome::Denied);
	}

	#[tokio::test]
	async fn approved_scope_is_carried_to_the_token() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;
		let scope = Scope::new("read write").unwrap();
		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, Some(scope))
			.await
			.unwrap();

		let grant = engine
			.exchange_code(&c1, &code, REDIRECT_URI)
			.await
			.unwrap()
			.into_granted()
			.unwrap();
		assert_eq!(grant.scope.as_deref().map(Scope::as_str), Some("read write"));
	}

	#[tokio::test]
	async fn failed_delete_mints_nothing() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;
		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();
		engine
			.store()
			.fail_on(Operation::TakeAuthorizationCode)
			.unwrap();

		let result = engine.exchange_code(&c1, &code, REDIRECT_URI).await;
		assert!(matches!(result, Err(GrantError::Store(_))));
		assert_eq!(engine.store().access_token_count().unwrap(), 0);
	}

	#[tokio::test]
	async fn failed_refresh_token_write_returns_no_credential() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;
		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();
		engine
			.store()
			.fail_on(Operation::InsertRefreshToken)
			.unwrap();

		let result = engine.exchange_code(&c1, &code, REDIRECT_URI).await;
		assert!(matches!(result, Err(GrantError::Store(_))));
		assert_eq!(engine.store().access_token_count().unwrap(), 0);
		assert_eq!(engine.store().refresh_token_count().unwrap(), 0);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_exchanges_grant_at_most_once() {
		let engine = Arc::new(engine());
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;
		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();

		let tasks: Vec<_> = (0..8)
			.map(|_| {
				let engine = engine.clone();
				let client = c1.clone();
				let code = code.clone();
				tokio::spawn(async move {
					engine
						.exchange_code(&client, &code, REDIRECT_URI)
						.await
						.unwrap()
				})
			})
			.collect();

		let mut granted = 0;
		for task in tasks {
			if task.await.unwrap().is_granted() {
				granted += 1;
			}
		}
		assert_eq!(granted, 1);
	}
}
