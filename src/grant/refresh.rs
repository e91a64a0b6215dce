//! Refreshing an Access Token.
//!
//! Refresh tokens are not rotated: a successful refresh returns the very same
//! refresh token alongside a new access token.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-6>
use crate::{
	RefreshToken, Scope,
	error::GrantError,
	hasher::CredentialHasher,
	store::{Client, CredentialStore},
};

use super::{ExchangeOutcome, GrantContext, TokenGrant, same_client};

pub async fn exchange<S, H>(
	cx: GrantContext<'_, S, H>,
	client: &Client,
	refresh_token: &RefreshToken,
	scope: Option<&Scope>,
) -> Result<ExchangeOutcome, GrantError>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	let hash = cx.hasher.hash(refresh_token.as_str());
	let Some(record) = cx.store.find_refresh_token_by_hash(&hash).await? else {
		log::debug!("unknown refresh token presented by `{}`", client.id.as_str());
		return Ok(ExchangeOutcome::Denied);
	};

	if !same_client(&record.client_id, client.id()) {
		log::warn!(
			"refresh token of `{}` presented by `{}`",
			record.client_id.as_str(),
			client.id.as_str()
		);
		return Ok(ExchangeOutcome::Denied);
	}

	let access_token = cx
		.store_access_token(&record.client_id, Some(record.user_id.as_str()), scope)
		.await?;

	Ok(ExchangeOutcome::Granted(TokenGrant {
		access_token,
		refresh_token: Some(refresh_token.to_owned()),
		expires_in: cx.config.access_token_lifetime_secs,
		scope: scope.map(ToOwned::to_owned),
	}))
}

/// Deletes a refresh token of `client`.
///
/// Returns `false` if the token is unknown or belongs to another client.
pub async fn revoke<S, H>(
	cx: GrantContext<'_, S, H>,
	client: &Client,
	refresh_token: &RefreshToken,
) -> Result<bool, GrantError>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	let hash = cx.hasher.hash(refresh_token.as_str());
	match cx.store.find_refresh_token_by_hash(&hash).await? {
		Some(record) if same_client(&record.client_id, client.id()) => {
			Ok(cx.store.delete_refresh_token_by_hash(&hash).await?)
		}
		_ => Ok(false),
	}
}
