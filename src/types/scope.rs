use str_newtype::StrNewType;

use super::is_nqchar;

/// A single OAuth 2.0 scope token (borrowed).
///
/// Scope tokens are the individual components of a [`Scope`] value, separated
/// by spaces.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-3.3>
///
/// # Grammar
///
/// ```abnf
/// scope-token = 1*( %x21 / %x23-5B / %x5D-7E )
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, StrNewType)]
#[newtype(
	serde,
	owned(ScopeTokenBuf, derive(PartialEq, Eq, PartialOrd, Ord, Hash))
)]
pub struct ScopeToken(str);

impl ScopeToken {
	/// Validates that the given string is a well-formed scope token.
	pub const fn validate_str(s: &str) -> bool {
		Self::validate_bytes(s.as_bytes())
	}

	/// Validates that the given byte slice is a well-formed scope token.
	pub const fn validate_bytes(bytes: &[u8]) -> bool {
		let mut i = 0;

		while i < bytes.len() {
			if !is_nqchar(bytes[i]) {
				return false;
			}

			i += 1;
		}

		i > 0
	}
}

/// An OAuth 2.0 scope value (borrowed).
///
/// A scope is a space-separated list of [`ScopeToken`]s. The grant engine
/// treats it as opaque apart from looking for the offline-access marker.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-3.3>
///
/// # Grammar
///
/// ```abnf
/// scope       = scope-token *( SP scope-token )
/// scope-token = 1*NQCHAR
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, StrNewType)]
#[newtype(serde, owned(ScopeBuf, derive(PartialEq, Eq, PartialOrd, Ord, Hash)))]
pub struct Scope(str);

impl Scope {
	/// Validates that the given string is a well-formed scope.
	pub const fn validate_str(s: &str) -> bool {
		Self::validate_bytes(s.as_bytes())
	}

	/// Validates that the given byte slice is a well-formed scope.
	pub const fn validate_bytes(bytes: &[u8]) -> bool {
		let mut i = 0;

		let mut expect_token = true;
		while expect_token {
			expect_token = false;
			let mut scope_token_empty = true;

			while i < bytes.len() {
				match bytes[i] {
					c if is_nqchar(c) => {
						scope_token_empty = false;
						i += 1;
					}
					b' ' => {
						expect_token = true;
						i += 1;
						break;
					}
					_ => return false,
				}
			}

			if scope_token_empty {
				return false;
			}
		}

		true
	}

	/// Returns `true` if this scope contains the given token.
	pub fn contains(&self, token: &str) -> bool {
		self.iter().any(|t| t.as_str() == token)
	}

	/// Returns an iterator over the individual scope tokens.
	pub fn iter(&self) -> ScopeIter<'_> {
		ScopeIter(self.as_str().split(' '))
	}
}

impl<'a> IntoIterator for &'a Scope {
	type IntoIter = ScopeIter<'a>;
	type Item = &'a ScopeToken;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Iterator over the individual [`ScopeToken`]s in a [`Scope`].
pub struct ScopeIter<'a>(std::str::Split<'a, char>);

impl<'a> Iterator for ScopeIter<'a> {
	type Item = &'a ScopeToken;

	fn next(&mut self) -> Option<Self::Item> {
		self.0
			.next()
			// SAFETY: a valid scope only splits into valid tokens.
			.map(|t| unsafe { ScopeToken::new_unchecked(t) })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn valid_scope_token() {
		assert!(ScopeToken::new("offline_access").is_ok());
		assert!(ScopeToken::new("read:user").is_ok());
		assert!(ScopeToken::new("!").is_ok());
	}

	#[test]
	fn scope_token_rejects_delimiters_and_quotes() {
		assert!(ScopeToken::new("").is_err());
		assert!(ScopeToken::new("read write").is_err());
		assert!(ScopeToken::new("ab\\cd").is_err());
		assert!(ScopeToken::new("ab\"cd").is_err());
	}

	#[test]
	fn scope_rejects_bad_spacing() {
		assert!(Scope::new("").is_err());
		assert!(Scope::new(" openid").is_err());
		assert!(Scope::new("openid ").is_err());
		assert!(Scope::new("openid  profile").is_err());
	}

	#[test]
	fn scope_iter() {
		let scope = Scope::new("read write offline_access").unwrap();
		let tokens: Vec<&str> = scope.iter().map(|t| t.as_str()).collect();
		assert_eq!(tokens, vec!["read", "write", "offline_access"]);
	}

	#[test]
	fn scope_contains_whole_tokens_only() {
		let scope = Scope::new("read offline_access").unwrap();
		assert!(scope.contains("offline_access"));
		assert!(!scope.contains("offline"));
		assert!(!Scope::new("offline_access_v2").unwrap().contains("offline_access"));
	}
}
