//! Token endpoint: request decoding, grant dispatch and response body.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-3.2>
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
	AccessTokenBuf, ClientIdBuf, CodeBuf, RefreshTokenBuf, ScopeBuf,
	error::{GrantError, ValidationError},
	grant::{ExchangeOutcome, GrantEngine},
	hasher::CredentialHasher,
	store::{Client, CredentialStore},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	AuthorizationCode,
	Password,
	ClientCredentials,
	RefreshToken,
	#[serde(untagged)]
	Extension(String),
}

impl From<String> for GrantType {
	fn from(value: String) -> Self {
		match value.as_str() {
			"authorization_code" => Self::AuthorizationCode,
			"password" => Self::Password,
			"client_credentials" => Self::ClientCredentials,
			"refresh_token" => Self::RefreshToken,
			_ => Self::Extension(value),
		}
	}
}

/// A decoded token request, one variant per supported grant type.
#[derive(Clone, PartialEq, Eq)]
pub enum TokenRequest {
	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.3>
	AuthorizationCode { code: CodeBuf, redirect_uri: String },

	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.3.2>
	Password {
		username: String,
		password: String,
		scope: Option<ScopeBuf>,
	},

	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.4.2>
	ClientCredentials { scope: Option<ScopeBuf> },

	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-6>
	RefreshToken {
		refresh_token: RefreshTokenBuf,
		scope: Option<ScopeBuf>,
	},
}

impl TokenRequest {
	/// Decodes an `application/x-www-form-urlencoded` request body.
	pub fn from_form(body: &[u8]) -> Result<Self, ValidationError> {
		TokenRequestForm::from_body(body)?.into_request()
	}

	pub fn grant_type(&self) -> GrantType {
		match self {
			Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
			Self::Password { .. } => GrantType::Password,
			Self::ClientCredentials { .. } => GrantType::ClientCredentials,
			Self::RefreshToken { .. } => GrantType::RefreshToken,
		}
	}
}

impl std::fmt::Debug for TokenRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		// Credentials are left out.
		f.debug_struct("TokenRequest")
			.field("grant_type", &self.grant_type())
			.finish_non_exhaustive()
	}
}

/// Raw token request form, as posted by the client.
///
/// Also carries the client credentials when the client authenticates with
/// `client_secret_post`.
#[derive(Default, Deserialize)]
pub struct TokenRequestForm {
	pub grant_type: Option<String>,
	pub code: Option<String>,
	pub redirect_uri: Option<String>,
	pub username: Option<String>,
	pub password: Option<String>,
	pub refresh_token: Option<String>,
	pub scope: Option<String>,
	pub client_id: Option<ClientIdBuf>,
	pub client_secret: Option<String>,
}

impl TokenRequestForm {
	pub fn from_body(body: &[u8]) -> Result<Self, ValidationError> {
		serde_html_form::from_bytes(body).map_err(|e| {
			log::debug!("undecodable token request: {e}");
			ValidationError::MalformedRequest(e.to_string())
		})
	}

	pub fn into_request(self) -> Result<TokenRequest, ValidationError> {
		let scope = self
			.scope
			.map(ScopeBuf::new)
			.transpose()
			.map_err(|_| ValidationError::InvalidScope)?;

		match self.grant_type.map(GrantType::from) {
			Some(GrantType::AuthorizationCode) => Ok(TokenRequest::AuthorizationCode {
				code: CodeBuf::new(required(self.code, "code")?)
					.map_err(|_| malformed("code"))?,
				redirect_uri: required(self.redirect_uri, "redirect_uri")?,
			}),
			Some(GrantType::Password) => Ok(TokenRequest::Password {
				username: required(self.username, "username")?,
				password: required(self.password, "password")?,
				scope,
			}),
			Some(GrantType::ClientCredentials) => Ok(TokenRequest::ClientCredentials { scope }),
			Some(GrantType::RefreshToken) => Ok(TokenRequest::RefreshToken {
				refresh_token: RefreshTokenBuf::new(required(self.refresh_token, "refresh_token")?)
					.map_err(|_| malformed("refresh_token"))?,
				scope,
			}),
			Some(GrantType::Extension(name)) => {
				log::debug!("unsupported grant type `{name}`");
				Err(ValidationError::UnsupportedGrantType)
			}
			None => Err(malformed("grant_type")),
		}
	}
}

fn required(value: Option<String>, name: &str) -> Result<String, ValidationError> {
	value.ok_or_else(|| ValidationError::MalformedRequest(format!("missing `{name}`")))
}

fn malformed(name: &str) -> ValidationError {
	ValidationError::MalformedRequest(format!("invalid `{name}`"))
}

/// Successful token response.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-5.1>
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// access token issued by the authorization server.
	pub access_token: AccessTokenBuf,

	/// The type of the token issued. Value is case insensitive.
	pub token_type: String,

	/// Lifetime in seconds of the access token.
	///
	/// For example, the value "3600" denotes that the access token will expire
	/// in one hour from the time the response was generated.
	pub expires_in: Option<u64>,

	/// The refresh token, which can be used to obtain new access tokens using
	/// the same authorization grant.
	pub refresh_token: Option<RefreshTokenBuf>,

	/// Scope of the access token.
	pub scope: Option<ScopeBuf>,
}

impl TokenResponse {
	/// Bearer token type.
	///
	/// See: <https://datatracker.ietf.org/doc/html/rfc6750>
	pub const BEARER: &str = "Bearer";
}

impl<S, H> GrantEngine<S, H>
where
	S: CredentialStore,
	H: CredentialHasher,
{
	/// Dispatches a token request of an authenticated client to its grant.
	pub async fn token(
		&self,
		client: &Client,
		request: TokenRequest,
	) -> Result<ExchangeOutcome, GrantError> {
		log::debug!(
			"token request ({:?}) from `{}`",
			request.grant_type(),
			client.id.as_str()
		);

		match request {
			TokenRequest::AuthorizationCode { code, redirect_uri } => {
				self.exchange_code(client, &code, &redirect_uri).await
			}
			TokenRequest::Password {
				username,
				password,
				scope,
			} => {
				self.exchange_password(client, &username, &password, scope.as_deref())
					.await
			}
			TokenRequest::ClientCredentials { scope } => {
				self.exchange_client_credentials(client, scope.as_deref())
					.await
			}
			TokenRequest::RefreshToken {
				refresh_token,
				scope,
			} => {
				self.exchange_refresh_token(client, &refresh_token, scope.as_deref())
					.await
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::grant::tests::{REDIRECT_URI, alice, client, engine};

	#[test]
	fn decode_authorization_code_request() {
		let request = TokenRequest::from_form(
			b"grant_type=authorization_code&code=abc&redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb",
		)
		.unwrap();
		assert_eq!(
			request,
			TokenRequest::AuthorizationCode {
				code: CodeBuf::new("abc".to_owned()).unwrap(),
				redirect_uri: REDIRECT_URI.to_owned(),
			}
		);
	}

	#[test]
	fn decode_password_request_with_scope() {
		let request =
			TokenRequest::from_form(b"grant_type=password&username=alice&password=pw&scope=read+offline_access")
				.unwrap();
		let TokenRequest::Password { scope, .. } = request else {
			panic!("expected a password request")
		};
		assert_eq!(scope.as_deref().map(|s| s.as_str()), Some("read offline_access"));
	}

	#[test]
	fn unknown_grant_type_is_unsupported() {
		assert_eq!(
			TokenRequest::from_form(b"grant_type=implicit"),
			Err(ValidationError::UnsupportedGrantType)
		);
	}

	#[test]
	fn missing_fields_are_malformed() {
		assert!(matches!(
			TokenRequest::from_form(b"grant_type=authorization_code&code=abc"),
			Err(ValidationError::MalformedRequest(_))
		));
		assert!(matches!(
			TokenRequest::from_form(b"code=abc"),
			Err(ValidationError::MalformedRequest(_))
		));
	}

	#[test]
	fn invalid_scope() {
		assert_eq!(
			TokenRequest::from_form(b"grant_type=client_credentials&scope=a++b"),
			Err(ValidationError::InvalidScope)
		);
	}

	#[test]
	fn debug_hides_credentials() {
		let request = TokenRequest::Password {
			username: "alice".into(),
			password: "wonderland".into(),
			scope: None,
		};
		assert!(!format!("{request:?}").contains("wonderland"));
	}

	#[test]
	fn bearer_response_omits_absent_fields() {
		let response = TokenResponse {
			access_token: AccessTokenBuf::new("at".to_owned()).unwrap(),
			token_type: TokenResponse::BEARER.to_owned(),
			expires_in: Some(3600),
			refresh_token: None,
			scope: None,
		};
		assert_eq!(
			serde_json::to_value(&response).unwrap(),
			serde_json::json!({
				"access_token": "at",
				"token_type": "Bearer",
				"expires_in": 3600,
			})
		);
	}

	#[tokio::test]
	async fn dispatches_each_grant() {
		let engine = engine();
		let c1 = client(&engine, "c1").await;
		let user = alice(&engine).await;

		let code = engine
			.issue_code(c1.id(), REDIRECT_URI, &user, None)
			.await
			.unwrap();
		let grant = engine
			.token(
				&c1,
				TokenRequest::AuthorizationCode {
					code,
					redirect_uri: REDIRECT_URI.to_owned(),
				},
			)
			.await
			.unwrap()
			.into_granted()
			.unwrap();
		let refresh_token = grant.refresh_token.unwrap();

		assert!(
			engine
				.token(
					&c1,
					TokenRequest::RefreshToken {
						refresh_token,
						scope: None
					}
				)
				.await
				.unwrap()
				.is_granted()
		);
		assert!(
			engine
				.token(
					&c1,
					TokenRequest::Password {
						username: "alice".into(),
						password: "wonderland".into(),
						scope: None,
					}
				)
				.await
				.unwrap()
				.is_granted()
		);
		assert!(
			engine
				.token(&c1, TokenRequest::ClientCredentials { scope: None })
				.await
				.unwrap()
				.is_granted()
		);
	}
}
