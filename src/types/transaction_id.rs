use str_newtype::StrNewType;

use crate::hasher::CredentialHasher;

use super::is_non_empty_vschars;

/// Identifier of an authorization transaction (borrowed).
///
/// Generated by the server when a client redirects a user to the
/// authorization endpoint, and echoed back by the approval form so the
/// decision can be matched to the pending request.
///
/// # Grammar
///
/// ```abnf
/// transaction-id = 1*VSCHAR
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, StrNewType)]
#[newtype(
	serde,
	owned(TransactionIdBuf, derive(PartialEq, Eq, PartialOrd, Ord, Hash))
)]
pub struct TransactionId(str);

impl TransactionId {
	/// Validates that the given string is a well-formed transaction id.
	pub const fn validate_str(s: &str) -> bool {
		Self::validate_bytes(s.as_bytes())
	}

	/// Validates that the given byte slice is a well-formed transaction id.
	pub const fn validate_bytes(bytes: &[u8]) -> bool {
		is_non_empty_vschars(bytes)
	}
}

impl TransactionIdBuf {
	/// Generates a new random, base64url-encoded 128-bit transaction id.
	pub fn new_random(hasher: &impl CredentialHasher) -> Self {
		// SAFETY: `CredentialHasher` guarantees non-empty VSCHARs for `len > 0`.
		unsafe { Self::new_unchecked(hasher.generate_id(16)) }
	}
}
