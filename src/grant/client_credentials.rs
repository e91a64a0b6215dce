//! Client Credentials Grant.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.4>
use crate::{
	Scope,
	error::GrantError,
	hasher::CredentialHasher,
	store::{Client, CredentialStore},
};

use super::{ExchangeOutcome, GrantContext};

/// Issues an access token to an already authenticated client.
///
/// The token is bound to the client's owner, if any. No refresh token is
/// issued.
pub async fn exchange<S, H>(
	cx: GrantContext<'_, S, H>,
	client: &Client,
	scope: Option<&Scope>,
) -> Result<ExchangeOutcome, GrantError>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	let grant = cx
		.mint(client.id(), client.owner_user_id.as_deref(), scope, false)
		.await?;
	Ok(ExchangeOutcome::Granted(grant))
}
