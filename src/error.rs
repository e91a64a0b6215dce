//! Error taxonomy of the grant engine.
//!
//! A request that is well-formed but not authorized is *not* an error: it is
//! reported as [`ExchangeOutcome::Denied`](crate::grant::ExchangeOutcome).
//! Errors are reserved for malformed requests ([`ValidationError`]) and
//! persistence failures ([`StoreError`]).
use http::StatusCode;

use crate::server::ErrorCode;

pub use crate::store::StoreError;

/// Request validation failure. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("unknown client")]
	UnknownClient,

	#[error("malformed redirect URI")]
	MalformedRedirectUri,

	#[error("client redirect URI pattern is not a valid expression")]
	InvalidRedirectPattern,

	#[error("redirect mismatch")]
	RedirectMismatch,

	#[error("malformed scope")]
	InvalidScope,

	#[error("unknown authorization transaction")]
	UnknownTransaction,

	#[error("authorization transaction expired")]
	TransactionExpired,

	#[error("authorization transaction is not awaiting a decision")]
	InvalidTransactionState,

	#[error("unsupported grant type")]
	UnsupportedGrantType,

	#[error("malformed request: {0}")]
	MalformedRequest(String),
}

/// Any failure of a grant engine operation.
#[derive(Debug, thiserror::Error)]
pub enum GrantError {
	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error(transparent)]
	Store(#[from] StoreError),
}

impl GrantError {
	/// OAuth 2.0 error code reported to the client.
	pub fn error_code(&self) -> ErrorCode {
		match self {
			Self::Validation(e) => match e {
				ValidationError::UnknownClient => ErrorCode::InvalidClient,
				ValidationError::RedirectMismatch => ErrorCode::InvalidGrant,
				ValidationError::InvalidScope => ErrorCode::InvalidScope,
				ValidationError::UnsupportedGrantType => ErrorCode::UnsupportedGrantType,
				ValidationError::MalformedRedirectUri
				| ValidationError::InvalidRedirectPattern
				| ValidationError::UnknownTransaction
				| ValidationError::TransactionExpired
				| ValidationError::InvalidTransactionState
				| ValidationError::MalformedRequest(_) => ErrorCode::InvalidRequest,
			},
			Self::Store(_) => ErrorCode::ServerError,
		}
	}

	/// HTTP status the transport should answer with.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(ValidationError::UnknownClient) => StatusCode::UNAUTHORIZED,
			Self::Validation(_) => StatusCode::BAD_REQUEST,
			Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Whether the caller may retry the same request.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Store(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn validation_errors_are_client_errors() {
		let err = GrantError::from(ValidationError::RedirectMismatch);
		assert_eq!(err.error_code(), ErrorCode::InvalidGrant);
		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
		assert!(!err.is_retryable());

		let err = GrantError::from(ValidationError::TransactionExpired);
		assert_eq!(err.error_code(), ErrorCode::InvalidRequest);
	}

	#[test]
	fn unknown_client_is_invalid_client() {
		let err = GrantError::from(ValidationError::UnknownClient);
		assert_eq!(err.error_code(), ErrorCode::InvalidClient);
		assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
	}

	#[test]
	fn store_errors_are_retryable_server_errors() {
		let err = GrantError::from(StoreError::new("connection reset"));
		assert_eq!(err.error_code(), ErrorCode::ServerError);
		assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert!(err.is_retryable());
		assert_eq!(err.to_string(), "store error: connection reset");
	}
}
