//! Server-side OAuth 2.0 wire format.
//!
//! Builds the `http` responses of the token endpoint from engine outcomes, so
//! any HTTP framework can serve them as-is.
use http::{
	HeaderMap, HeaderValue, StatusCode,
	header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA, WWW_AUTHENTICATE},
};
use iref::UriBuf;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
	endpoints::token::TokenRequestForm,
	error::{GrantError, ValidationError},
	grant::{ExchangeOutcome, GrantEngine, TokenGrant},
	hasher::CredentialHasher,
	store::CredentialStore,
};

mod client_auth;
#[cfg(feature = "axum")]
mod router;

pub use client_auth::*;
#[cfg(feature = "axum")]
pub use router::*;

/// `Content-Type: application/json` header value.
pub const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// `Content-Type: application/x-www-form-urlencoded` header value.
pub const APPLICATION_X_WWW_FORM_URLENCODED: HeaderValue =
	HeaderValue::from_static("application/x-www-form-urlencoded");

/// Error codes of the token endpoint.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-5.2>
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
	InvalidRequest,
	InvalidClient,
	InvalidGrant,
	UnsupportedGrantType,
	InvalidScope,
	ServerError,
}

/// An OAuth 2.0 error response.
///
/// This is the standard error format returned by the authorization server
/// when a request fails, as defined in
/// [RFC 6749 Section 5.2](https://datatracker.ietf.org/doc/html/rfc6749#section-5.2).
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorResponse<T = ErrorCode> {
	/// A single error code.
	pub error: T,

	/// Human-readable text providing additional information about the error.
	pub error_description: Option<String>,

	/// A URI identifying a human-readable web page with information about
	/// the error.
	pub error_uri: Option<UriBuf>,
}

impl<T> ErrorResponse<T> {
	pub fn new(error: T, error_description: Option<String>, error_uri: Option<UriBuf>) -> Self {
		Self {
			error,
			error_description,
			error_uri,
		}
	}
}

impl From<&GrantError> for ErrorResponse {
	fn from(value: &GrantError) -> Self {
		// Store failures are not described to the client.
		let description = match value {
			GrantError::Validation(e) => Some(e.to_string()),
			GrantError::Store(_) => None,
		};

		Self::new(value.error_code(), description, None)
	}
}

/// Checks the `Content-Type` of a request, ignoring parameters such as
/// `charset`.
pub fn expect_content_type(
	headers: &HeaderMap,
	expected_value: &HeaderValue,
) -> Result<(), ValidationError> {
	let content_type = headers
		.get(CONTENT_TYPE)
		.ok_or_else(|| ValidationError::MalformedRequest("missing content type".to_owned()))?;

	if content_type
		.as_bytes()
		.starts_with(expected_value.as_bytes())
	{
		Ok(())
	} else {
		Err(ValidationError::MalformedRequest(
			"unexpected content type".to_owned(),
		))
	}
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> http::Response<Vec<u8>> {
	let mut response = http::Response::new(Vec::new());

	match serde_json::to_vec(body) {
		Ok(bytes) => {
			*response.status_mut() = status;
			*response.body_mut() = bytes;
			response.headers_mut().insert(CONTENT_TYPE, APPLICATION_JSON);
		}
		Err(e) => {
			log::error!("unable to serialize response body: {e}");
			*response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
		}
	}

	// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-5.1>
	let headers = response.headers_mut();
	headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
	headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
	response
}

/// `200 OK` response carrying the minted tokens.
pub fn token_response(grant: &TokenGrant) -> http::Response<Vec<u8>> {
	json_response(StatusCode::OK, &grant.to_response())
}

/// Response to an exchange that was not granted.
pub fn denied_response() -> http::Response<Vec<u8>> {
	json_response(
		StatusCode::BAD_REQUEST,
		&ErrorResponse::new(ErrorCode::InvalidGrant, None, None),
	)
}

pub fn error_response(error: &GrantError) -> http::Response<Vec<u8>> {
	let status = error.status();
	let body: ErrorResponse = error.into();
	let mut response = json_response(status, &body);

	if status == StatusCode::UNAUTHORIZED {
		response
			.headers_mut()
			.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
	}

	response
}

pub fn outcome_response(result: &Result<ExchangeOutcome, GrantError>) -> http::Response<Vec<u8>> {
	match result {
		Ok(ExchangeOutcome::Granted(grant)) => token_response(grant),
		Ok(ExchangeOutcome::Denied) => denied_response(),
		Err(e) => error_response(e),
	}
}

/// Serves a token endpoint request.
///
/// Expects a form-encoded body, authenticates the client (HTTP Basic or
/// `client_secret_post`), then dispatches the grant.
pub async fn token_endpoint<S, H>(
	engine: &GrantEngine<S, H>,
	request: &http::Request<Vec<u8>>,
) -> http::Response<Vec<u8>>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	outcome_response(&handle_token_request(engine, request).await)
}

async fn handle_token_request<S, H>(
	engine: &GrantEngine<S, H>,
	request: &http::Request<Vec<u8>>,
) -> Result<ExchangeOutcome, GrantError>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	expect_content_type(request.headers(), &APPLICATION_X_WWW_FORM_URLENCODED)?;
	let mut form = TokenRequestForm::from_body(request.body())?;

	let credentials = ClientCredentials::from_request(request.headers(), &mut form)?;
	let client = engine
		.authenticate_client(&credentials.client_id, &credentials.client_secret)
		.await?
		.ok_or_else(|| {
			log::warn!(
				"client authentication failed for `{}`",
				credentials.client_id.as_str()
			);
			ValidationError::UnknownClient
		})?;

	engine.token(&client, form.into_request()?).await
}

#[cfg(test)]
mod tests {
	use base64::{Engine, prelude::BASE64_STANDARD};
	use http::header::AUTHORIZATION;

	use super::*;
	use crate::{
		grant::tests::{REDIRECT_URI, alice, client, engine},
		store::memory::Operation,
	};

	fn form_request(body: &str, basic: Option<&str>) -> http::Request<Vec<u8>> {
		let mut builder = http::Request::post("/token").header(CONTENT_TYPE, &APPLICATION_X_WWW_FORM_URLENCODED);
		if let Some(credentials) = basic {
			builder = builder.header(
				AUTHORIZATION,
				format!("Basic {}", BASE64_STANDARD.encode(credentials)),
			);
		}
		builder.body(body.as_bytes().to_vec()).unwrap()
	}

	fn json(response: &http::Response<Vec<u8>>) -> serde_json::Value {
		serde_json::from_slice(response.body()).unwrap()
	}

	#[tokio::test]
	async fn authorization_code_over_http() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;
		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();

		let body = format!(
			"grant_type=authorization_code&code={}&redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb",
			code.as_str()
		);
		let response = token_endpoint(&engine, &form_request(&body, Some("c1:secret-1"))).await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.headers()[CONTENT_TYPE], APPLICATION_JSON);
		assert_eq!(response.headers()[CACHE_CONTROL], "no-store");

		let body = json(&response);
		assert_eq!(body["token_type"], "Bearer");
		assert_eq!(body["expires_in"], 3600);
		assert!(body["access_token"].is_string());
		assert!(body["refresh_token"].is_string());

		// Replay.
		let body = format!(
			"grant_type=authorization_code&code={}&redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb",
			code.as_str()
		);
		let response = token_endpoint(&engine, &form_request(&body, Some("c1:secret-1"))).await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(json(&response)["error"], "invalid_grant");
	}

	#[tokio::test]
	async fn client_secret_post() {
		let engine = engine();
		let response = token_endpoint(
			&engine,
			&form_request(
				"grant_type=client_credentials&client_id=c2&client_secret=secret-2",
				None,
			),
		)
		.await;
		assert_eq!(response.status(), StatusCode::OK);
		assert!(json(&response).get("refresh_token").is_none());
	}

	#[tokio::test]
	async fn bad_client_secret_is_unauthorized() {
		let engine = engine();
		let response = token_endpoint(
			&engine,
			&form_request("grant_type=client_credentials", Some("c1:wrong")),
		)
		.await;
		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(response.headers()[WWW_AUTHENTICATE], "Basic");
		assert_eq!(json(&response)["error"], "invalid_client");
	}

	#[tokio::test]
	async fn unsupported_grant_type() {
		let engine = engine();
		let response = token_endpoint(
			&engine,
			&form_request("grant_type=implicit", Some("c1:secret-1")),
		)
		.await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(json(&response)["error"], "unsupported_grant_type");
	}

	#[tokio::test]
	async fn wrong_content_type_is_invalid_request() {
		let engine = engine();
		let request = http::Request::post("/token")
			.header(CONTENT_TYPE, &APPLICATION_JSON)
			.body(b"{}".to_vec())
			.unwrap();
		let response = token_endpoint(&engine, &request).await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(json(&response)["error"], "invalid_request");
	}

	#[tokio::test]
	async fn store_failure_is_an_undescribed_server_error() {
		let engine = engine();
		engine
			.store()
			.fail_on(Operation::UpsertAccessToken)
			.unwrap();
		let response = token_endpoint(
			&engine,
			&form_request("grant_type=client_credentials", Some("c1:secret-1")),
		)
		.await;
		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
		let body = json(&response);
		assert_eq!(body["error"], "server_error");
		assert!(body.get("error_description").is_none());
	}

	#[test]
	fn content_type_parameters_are_ignored() {
		let mut headers = HeaderMap::new();
		headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
		);
		assert!(expect_content_type(&headers, &APPLICATION_X_WWW_FORM_URLENCODED).is_ok());
		assert!(expect_content_type(&HeaderMap::new(), &APPLICATION_JSON).is_err());
	}
}
