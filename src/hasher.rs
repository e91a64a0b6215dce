//! Credential hashing and random identifier generation.
//!
//! Two distinct families of one-way functions live here:
//!
//! - [`CredentialHasher::hash`] is a fast, deterministic digest used for
//!   high-entropy server-generated values (authorization codes, access
//!   tokens, refresh tokens). Being deterministic, the digest doubles as the
//!   storage lookup key.
//! - [`hash_password`] is a deliberately slow key derivation (PBKDF2-HMAC-SHA256)
//!   with a per-secret salt, used for user-chosen secrets. Its parameters are
//!   fixed: changing them would invalidate every stored digest.
use std::fmt;

use base64::{
	Engine,
	prelude::{BASE64_STANDARD, BASE64_URL_SAFE_NO_PAD},
};
use rand::{RngExt, rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// PBKDF2 iteration count.
pub const PASSWORD_ROUNDS: u32 = 4096;

/// Length in bytes of a derived password digest.
pub const PASSWORD_DIGEST_LEN: usize = 64;

/// Length in bytes of a freshly generated salt.
pub const SALT_LEN: usize = 128;

/// Digest of a credential, as persisted by the store.
///
/// The plaintext credential is never stored: records are keyed by this value.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(String);

impl CredentialHash {
	/// Wraps a digest previously produced by a [`CredentialHasher`], e.g. when
	/// reading it back from storage.
	pub fn from_stored(digest: String) -> Self {
		Self(digest)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl fmt::Debug for CredentialHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("CredentialHash(..)")
	}
}

/// Source of random identifiers and deterministic credential digests.
///
/// Injected into the grant engine so the token format can be swapped without
/// touching grant logic.
///
/// # Safety
///
/// For any `len > 0`, [`generate_id`](Self::generate_id) must return a
/// non-empty string of visible ASCII characters (`1*VSCHAR`). Generated codes,
/// tokens and transaction ids are built from it without validation.
pub unsafe trait CredentialHasher: Send + Sync {
	/// Generates an opaque random identifier from `len` bytes of
	/// cryptographically secure randomness, encoded for transport.
	fn generate_id(&self, len: usize) -> String;

	/// Computes the deterministic one-way digest of a code or token.
	///
	/// Not suitable for passwords, see [`hash_password`].
	fn hash(&self, value: &str) -> CredentialHash;
}

/// Default hasher: base64url-encoded random bytes, base64url-encoded SHA-256
/// digests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sha256Hasher;

// SAFETY: base64url output of at least one byte is non-empty and only uses
// `A-Z a-z 0-9 - _`.
unsafe impl CredentialHasher for Sha256Hasher {
	fn generate_id(&self, len: usize) -> String {
		BASE64_URL_SAFE_NO_PAD.encode(random_bytes(len))
	}

	fn hash(&self, value: &str) -> CredentialHash {
		CredentialHash(BASE64_URL_SAFE_NO_PAD.encode(Sha256::digest(value.as_bytes())))
	}
}

fn random_bytes(len: usize) -> Vec<u8> {
	(0..len).map(|_| rng().random::<u8>()).collect()
}

/// Generates a new random salt for [`hash_password`].
pub fn new_salt() -> String {
	BASE64_STANDARD.encode(random_bytes(SALT_LEN))
}

/// Derives the digest of a user secret with the given salt.
///
/// This is CPU-bound and intentionally slow.
pub fn hash_password(password: &str, salt: &str) -> String {
	let mut out = [0u8; PASSWORD_DIGEST_LEN];
	pbkdf2::pbkdf2_hmac::<Sha256>(
		password.as_bytes(),
		salt.as_bytes(),
		PASSWORD_ROUNDS,
		&mut out,
	);
	BASE64_STANDARD.encode(out)
}

/// Compares two strings without short-circuiting on the first difference.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
	a.as_bytes().ct_eq(b.as_bytes()).into()
}
