//! Client authentication at the token endpoint.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-2.3.1>
use base64::{Engine, prelude::BASE64_STANDARD};
use http::{HeaderMap, header::AUTHORIZATION};

use crate::{ClientIdBuf, endpoints::token::TokenRequestForm, error::ValidationError};

/// Client id and secret presented with a token request.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
	pub client_id: ClientIdBuf,
	pub client_secret: String,
}

impl ClientCredentials {
	/// Reads the credentials of an `Authorization: Basic` header, if any.
	pub fn from_basic(headers: &HeaderMap) -> Result<Option<Self>, ValidationError> {
		let Some(value) = headers.get(AUTHORIZATION) else {
			return Ok(None);
		};

		let value = value.to_str().map_err(|_| invalid_basic())?;
		let encoded = match value.split_once(' ') {
			Some((scheme, encoded)) if scheme.eq_ignore_ascii_case("basic") => encoded.trim(),
			_ => return Ok(None),
		};

		let decoded = BASE64_STANDARD
			.decode(encoded)
			.map_err(|_| invalid_basic())?;
		let decoded = String::from_utf8(decoded).map_err(|_| invalid_basic())?;
		let (client_id, client_secret) = decoded.split_once(':').ok_or_else(invalid_basic)?;

		Ok(Some(Self {
			client_id: ClientIdBuf::new(client_id.to_owned()).map_err(|_| invalid_basic())?,
			client_secret: client_secret.to_owned(),
		}))
	}

	/// Reads the credentials of a token request, taking them out of the form
	/// when the client uses `client_secret_post`.
	///
	/// Using both methods at once is rejected. Missing credentials fail
	/// client authentication.
	pub fn from_request(
		headers: &HeaderMap,
		form: &mut TokenRequestForm,
	) -> Result<Self, ValidationError> {
		let basic = Self::from_basic(headers)?;
		let post = match (form.client_id.take(), form.client_secret.take()) {
			(Some(client_id), Some(client_secret)) => Some(Self {
				client_id,
				client_secret,
			}),
			_ => None,
		};

		match (basic, post) {
			(Some(_), Some(_)) => Err(ValidationError::MalformedRequest(
				"multiple client authentication methods".to_owned(),
			)),
			(Some(credentials), None) | (None, Some(credentials)) => Ok(credentials),
			(None, None) => Err(ValidationError::UnknownClient),
		}
	}
}

impl std::fmt::Debug for ClientCredentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.finish_non_exhaustive()
	}
}

fn invalid_basic() -> ValidationError {
	ValidationError::MalformedRequest("invalid basic authorization header".to_owned())
}
