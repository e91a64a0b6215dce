use str_newtype::StrNewType;

use crate::hasher::CredentialHasher;

use super::is_non_empty_vschars;

/// Refresh Token.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-1.5>
///
/// # Grammar
///
/// ```abnf
/// refresh-token = 1*VSCHAR
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, StrNewType)]
#[newtype(
	serde,
	owned(RefreshTokenBuf, derive(PartialEq, Eq, PartialOrd, Ord, Hash))
)]
pub struct RefreshToken(str);

impl RefreshToken {
	pub const fn validate_str(s: &str) -> bool {
		Self::validate_bytes(s.as_bytes())
	}

	pub const fn validate_bytes(bytes: &[u8]) -> bool {
		is_non_empty_vschars(bytes)
	}
}

impl RefreshTokenBuf {
	/// Generates a fresh random refresh token from `len` random bytes.
	pub fn generate(hasher: &impl CredentialHasher, len: usize) -> Self {
		// SAFETY: `CredentialHasher` guarantees non-empty VSCHARs for `len > 0`.
		unsafe { Self::new_unchecked(hasher.generate_id(len.max(1))) }
	}
}
