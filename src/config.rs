//! Grant engine configuration.
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tunables of the grant engine.
///
/// Loading is left to the host application; every field has a default so a
/// partial document deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantConfig {
	/// Access token lifetime in seconds, reported to clients as `expires_in`
	/// (default: 3600 = 1 hour).
	pub access_token_lifetime_secs: u64,

	/// Validity window of an authorization code in seconds (default: 600).
	pub authorization_code_lifetime_secs: u64,

	/// Lifetime of a pending authorization transaction in seconds
	/// (default: 300).
	pub transaction_lifetime_secs: u64,

	/// Random bytes behind each access and refresh token (default: 32).
	pub token_bytes: usize,

	/// Random bytes behind each authorization code (default: 16).
	pub code_bytes: usize,

	/// Scope token that makes the password grant also issue a refresh token.
	pub offline_access_scope: String,
}

impl GrantConfig {
	pub fn access_token_lifetime(&self) -> Duration {
		seconds(self.access_token_lifetime_secs)
	}

	pub fn authorization_code_lifetime(&self) -> Duration {
		seconds(self.authorization_code_lifetime_secs)
	}

	pub fn transaction_lifetime(&self) -> Duration {
		seconds(self.transaction_lifetime_secs)
	}
}

impl Default for GrantConfig {
	fn default() -> Self {
		Self {
			access_token_lifetime_secs: 3600,
			authorization_code_lifetime_secs: 600,
			transaction_lifetime_secs: 300,
			token_bytes: 32,
			code_bytes: 16,
			offline_access_scope: "offline_access".into(),
		}
	}
}

fn seconds(secs: u64) -> Duration {
	Duration::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_document_keeps_defaults() {
		let config: GrantConfig =
			serde_json::from_str(r#"{ "access_token_lifetime_secs": 60 }"#).unwrap();
		assert_eq!(config.access_token_lifetime_secs, 60);
		assert_eq!(config.code_bytes, 16);
		assert_eq!(config.offline_access_scope, "offline_access");
	}

	#[test]
	fn lifetimes_as_durations() {
		let config = GrantConfig::default();
		assert_eq!(config.access_token_lifetime(), Duration::hours(1));
		assert_eq!(config.authorization_code_lifetime(), Duration::minutes(10));
		assert_eq!(config.transaction_lifetime(), Duration::minutes(5));
	}

	#[test]
	fn huge_lifetime_does_not_overflow() {
		let config = GrantConfig {
			access_token_lifetime_secs: u64::MAX,
			..Default::default()
		};
		assert!(config.access_token_lifetime() > Duration::days(365));
	}
}
