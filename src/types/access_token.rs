use str_newtype::StrNewType;

use crate::hasher::CredentialHasher;

use super::is_non_empty_vschars;

/// Access Token.
///
/// Returned to the client in plaintext exactly once; the server keeps only
/// its hash.
///
/// # Grammar
///
/// ```abnf
/// access-token = 1*VSCHAR
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, StrNewType)]
#[newtype(
	serde,
	owned(AccessTokenBuf, derive(PartialEq, Eq, PartialOrd, Ord, Hash))
)]
pub struct AccessToken(str);

impl AccessToken {
	pub const fn validate_str(s: &str) -> bool {
		Self::validate_bytes(s.as_bytes())
	}

	pub const fn validate_bytes(bytes: &[u8]) -> bool {
		is_non_empty_vschars(bytes)
	}
}

impl AccessTokenBuf {
	/// Generates a fresh random access token from `len` random bytes.
	pub fn generate(hasher: &impl CredentialHasher, len: usize) -> Self {
		// SAFETY: `CredentialHasher` guarantees non-empty VSCHARs for `len > 0`.
		unsafe { Self::new_unchecked(hasher.generate_id(len.max(1))) }
	}
}
