//! Strongly typed identifiers enforced across the device flow domain.
//!
//! Client identifiers follow the `client-id = *VSCHAR` grammar of RFC 6749 Appendix A.1, minus
//! the space character so identifiers survive form and log encoding unchanged. Subject and session
//! identifiers are opaque tokens from the host's account system and only forbid whitespace and
//! control characters.

// std
use std::borrow::Borrow;
// self
use crate::_prelude::*;

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (client, subject, session).
		kind: &'static str,
	},
	/// The identifier contains a character its kind does not allow.
	#[error("{kind} identifier contains disallowed character {character:?}.")]
	InvalidCharacter {
		/// Kind of identifier (client, subject, session).
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The identifier exceeded the allowed byte length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier (client, subject, session).
		kind: &'static str,
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

macro_rules! def_id {
	($name:ident, $kind:literal, $allowed:path, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				validate($kind, &value, $allowed)?;

				Ok(Self(value))
			}

			/// Borrows the identifier text.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

def_id! {
	ClientId,
	"Client",
	is_client_char,
	"Identifier of the OAuth client that started a device flow."
}
def_id! {
	SubjectId,
	"Subject",
	is_token_char,
	"Identifier of the end-user who authorizes a device."
}
def_id! {
	SessionId,
	"Session",
	is_token_char,
	"Identifier of the end-user's authentication session."
}

fn is_client_char(c: char) -> bool {
	c.is_ascii_graphic()
}

fn is_token_char(c: char) -> bool {
	!c.is_whitespace() && !c.is_control()
}

fn validate(
	kind: &'static str,
	value: &str,
	allowed: fn(char) -> bool,
) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}
	if let Some(character) = value.chars().find(|&c| !allowed(c)) {
		return Err(IdentifierError::InvalidCharacter { kind, character });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn client_ids_are_visible_ascii() {
		let client = ClientId::new("device_flow").expect("Client fixture should be valid.");

		assert_eq!(client.as_str(), "device_flow");
		assert_eq!(
			ClientId::new(" device_flow").expect_err("Padding must be rejected."),
			IdentifierError::InvalidCharacter { kind: "Client", character: ' ' }
		);
		assert!(ClientId::new("caf\u{e9}").is_err(), "Non-ASCII client ids must be rejected.");
	}

	#[test]
	fn subjects_accept_unicode_but_not_whitespace() {
		SubjectId::new("j\u{f6}rg").expect("Unicode subjects should be accepted.");

		assert!(SubjectId::new("").is_err());
		assert!(SubjectId::new("tab\tbed").is_err());
		assert!(SessionId::new(format!("nb{}sp", '\u{a0}')).is_err());
	}

	#[test]
	fn serde_enforces_validation() {
		let client: ClientId =
			serde_json::from_str("\"codeclient\"").expect("Client should deserialize.");

		assert_eq!(client.as_str(), "codeclient");
		assert!(serde_json::from_str::<SubjectId>("\"with space\"").is_err());
	}

	#[test]
	fn length_limit_is_inclusive() {
		SubjectId::new("a".repeat(IDENTIFIER_MAX_LEN)).expect("Exact length should succeed.");

		let err = SubjectId::new("a".repeat(IDENTIFIER_MAX_LEN + 1))
			.expect_err("Overlong identifiers must be rejected.");

		assert_eq!(err, IdentifierError::TooLong { kind: "Subject", max: IDENTIFIER_MAX_LEN });
	}

	#[test]
	fn debug_names_the_identifier_kind() {
		let subject = SubjectId::new("bob").expect("Subject fixture should be valid.");

		assert_eq!(format!("{subject:?}"), "Subject(bob)");
		assert_eq!(subject.to_string(), "bob");
	}
}
