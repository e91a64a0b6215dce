//! Core OAuth 2.0 types.
//!
//! This module defines the string types that cross the grant engine boundary,
//! each validated against the grammar specified in
//! [RFC 6749](https://datatracker.ietf.org/doc/html/rfc6749).
//!
//! All types come in borrowed/owned pairs (e.g. [`AccessToken`] /
//! [`AccessTokenBuf`]) following the same pattern as [`str`] / [`String`].
mod access_token;
mod client_id;
mod code;
mod refresh_token;
mod scope;
mod transaction_id;

pub use access_token::*;
pub use client_id::*;
pub use code::*;
pub use refresh_token::*;
pub use scope::*;
pub use transaction_id::*;

/// Returns `true` if the byte is a VSCHAR (visible ASCII character plus
/// space), i.e. in the range `0x20..=0x7E`.
const fn is_vschar(c: u8) -> bool {
	c >= 0x20 && c <= 0x7e
}

/// Returns `true` if the byte is a NQCHAR, i.e. a VSCHAR other than space,
/// double quote or backslash.
const fn is_nqchar(c: u8) -> bool {
	c == 0x21 || (c >= 0x23 && c <= 0x5b) || (c >= 0x5d && c <= 0x7e)
}

/// Returns `true` if every byte is a VSCHAR and there is at least one.
const fn is_non_empty_vschars(bytes: &[u8]) -> bool {
	let mut i = 0;

	while i < bytes.len() {
		if !is_vschar(bytes[i]) {
			return false;
		}

		i += 1
	}

	i > 0
}
