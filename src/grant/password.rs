//! Resource Owner Password Credentials Grant.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.3>
use crate::{
	Scope,
	error::GrantError,
	hasher::{CredentialHasher, hash_password, new_salt},
	store::{Client, CredentialStore},
};

use super::{ExchangeOutcome, GrantContext};

/// Exchanges a username and password for an access token.
///
/// A refresh token is only issued when the requested scope contains the
/// configured offline-access token. An unknown username and a wrong password
/// are indistinguishable to the caller.
pub async fn exchange<S, H>(
	cx: GrantContext<'_, S, H>,
	client: &Client,
	username: &str,
	password: &str,
	scope: Option<&Scope>,
) -> Result<ExchangeOutcome, GrantError>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	let Some(user) = cx.store.find_user_by_username(username).await? else {
		// Spend the same derivation cost as a real check.
		std::hint::black_box(hash_password(password, &new_salt()));
		log::debug!("password grant for unknown user via `{}`", client.id.as_str());
		return Ok(ExchangeOutcome::Denied);
	};

	if !cx.store.verify_user_password(&user, password).await? {
		log::debug!(
			"password grant with bad credentials via `{}`",
			client.id.as_str()
		);
		return Ok(ExchangeOutcome::Denied);
	}

	let offline = scope.is_some_and(|s| s.contains(&cx.config.offline_access_scope));
	let grant = cx.mint(client.id(), Some(user.id.as_str()), scope, offline).await?;
	Ok(ExchangeOutcome::Granted(grant))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		grant::tests::{client, engine},
		store::User,
	};

	#[tokio::test]
	async fn correct_password_without_offline_scope() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;

		let grant = engine
			.exchange_password(&c1, "alice", "wonderland", Some(Scope::new("read").unwrap()))
			.await
			.unwrap()
			.into_granted()
			.unwrap();
		assert!(grant.refresh_token.is_none());
		assert_eq!(engine.store().refresh_token_count().unwrap(), 0);

		let record = engine
			.validate_access_token(&grant.access_token)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(record.user_id.as_deref(), Some("u1"));
	}

	#[tokio::test]
	async fn offline_access_scope_adds_refresh_token() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;

		let grant = engine
			.exchange_password(
				&c1,
				"alice",
				"wonderland",
				Some(Scope::new("read offline_access").unwrap()),
			)
			.await
			.unwrap()
			.into_granted()
			.unwrap();
		assert!(grant.refresh_token.is_some());
		assert_eq!(engine.store().refresh_token_count().unwrap(), 1);
	}

	#[tokio::test]
	async fn offline_access_must_be_a_whole_token() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;

		let grant = engine
			.exchange_password(
				&c1,
				"alice",
				"wonderland",
				Some(Scope::new("offline_access_extra").unwrap()),
			)
			.await
			.unwrap()
			.into_granted()
			.unwrap();
		assert!(grant.refresh_token.is_none());
	}

	#[tokio::test]
	async fn wrong_password_is_denied() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let outcome = engine
			.exchange_password(&c1, "alice", "looking-glass", None)
			.await
			.unwrap();
		assert_eq!(outcome, ExchangeOutcome::Denied);
		assert_eq!(engine.store().access_token_count().unwrap(), 0);
	}

	#[tokio::test]
	async fn unknown_user_is_denied() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let outcome = engine
			.exchange_password(&c1, "mallory", "wonderland", None)
			.await
			.unwrap();
		assert_eq!(outcome, ExchangeOutcome::Denied);
	}

	#[tokio::test]
	async fn user_without_salt_is_denied() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let mut bob = User::new("u2", "bob", "builder");
		bob.password.salt = None;
		engine.store().insert_user(bob).unwrap();

		let outcome = engine
			.exchange_password(&c1, "bob", "builder", None)
			.await
			.unwrap();
		assert_eq!(outcome, ExchangeOutcome::Denied);
	}

	#[tokio::test]
	async fn auth_code_slot_is_not_a_password() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let mut carol = User::new("u3", "carol", "pw");
		carol.set_auth_code("424242");
		engine.store().insert_user(carol).unwrap();

		let outcome = engine
			.exchange_password(&c1, "carol", "424242", None)
			.await
			.unwrap();
		assert_eq!(outcome, ExchangeOutcome::Denied);
	}
}
