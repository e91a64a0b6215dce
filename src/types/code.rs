use str_newtype::StrNewType;

use crate::hasher::CredentialHasher;

use super::is_non_empty_vschars;

/// An OAuth 2.0 authorization code (borrowed).
///
/// Authorization codes are short-lived, single-use credentials returned by the
/// authorization endpoint and exchanged at the token endpoint, as defined in
/// [RFC 6749 Section 4.1.2](https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2).
///
/// Only the hash of a code is ever persisted.
///
/// # Grammar
///
/// ```abnf
/// code = 1*VSCHAR
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, StrNewType)]
#[newtype(serde, owned(CodeBuf, derive(PartialEq, Eq, PartialOrd, Ord, Hash)))]
pub struct Code(str);

impl Code {
	/// Validates that the given string is a well-formed authorization code.
	pub const fn validate_str(s: &str) -> bool {
		Self::validate_bytes(s.as_bytes())
	}

	/// Validates that the given byte slice is a well-formed authorization code.
	pub const fn validate_bytes(bytes: &[u8]) -> bool {
		is_non_empty_vschars(bytes)
	}
}

impl CodeBuf {
	/// Generates a fresh random code from `len` random bytes.
	pub fn generate(hasher: &impl CredentialHasher, len: usize) -> Self {
		// SAFETY: `CredentialHasher` guarantees non-empty VSCHARs for `len > 0`.
		unsafe { Self::new_unchecked(hasher.generate_id(len.max(1))) }
	}
}
