//! Redacted wrappers for the device code and user code handed out during issuance.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Opaque device code the client polls the token endpoint with.
///
/// The raw handle is a bearer secret; stores index it by [`fingerprint`](Self::fingerprint) and
/// formatters redact it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceCodeHandle(String);
impl DeviceCodeHandle {
	/// Wraps a device code string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner handle. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Base64 (no padding) SHA-256 digest of the handle, used as the storage and lock key.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.0.as_bytes());

		STANDARD_NO_PAD.encode(hasher.finalize())
	}

	/// Returns true when the caller supplied an empty handle.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<str> for DeviceCodeHandle {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for DeviceCodeHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("DeviceCodeHandle").field(&"<redacted>").finish()
	}
}
impl Display for DeviceCodeHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Short, human-typable code the end-user enters on a secondary device.
///
/// Codes are kept in canonical form: ASCII letters upper-cased, separators (`-`) and whitespace
/// removed. [`UserCode::display`] restores grouping for presentation.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct UserCode(String);
impl UserCode {
	/// Canonicalizes user input into a lookup key.
	pub fn new(value: impl AsRef<str>) -> Self {
		let canonical = value
			.as_ref()
			.chars()
			.filter(|c| *c != '-' && !c.is_whitespace())
			.map(|c| c.to_ascii_uppercase())
			.collect();

		Self(canonical)
	}

	/// Returns the canonical code. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns true when no characters survived canonicalization.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Formats the code in groups of four separated by `-` for display to the end-user.
	pub fn display(&self) -> String {
		let mut out = String::with_capacity(self.0.len() + self.0.len() / 4);

		for (idx, c) in self.0.chars().enumerate() {
			if idx > 0 && idx % 4 == 0 {
				out.push('-');
			}

			out.push(c);
		}

		out
	}
}
impl From<String> for UserCode {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl From<UserCode> for String {
	fn from(value: UserCode) -> Self {
		value.0
	}
}
impl Debug for UserCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("UserCode").field(&"<redacted>").finish()
	}
}
impl Display for UserCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatters_redact() {
		let handle = DeviceCodeHandle::new("super-secret");
		let code = UserCode::new("BCDF-GHJK");

		assert_eq!(format!("{handle:?}"), "DeviceCodeHandle(\"<redacted>\")");
		assert_eq!(format!("{handle}"), "<redacted>");
		assert_eq!(format!("{code:?}"), "UserCode(\"<redacted>\")");
	}

	#[test]
	fn fingerprint_is_stable_and_hides_the_handle() {
		let a = DeviceCodeHandle::new("handle-1");
		let b = DeviceCodeHandle::new("handle-1");
		let c = DeviceCodeHandle::new("handle-2");

		assert_eq!(a.fingerprint(), b.fingerprint());
		assert_ne!(a.fingerprint(), c.fingerprint());
		assert!(!a.fingerprint().contains("handle-1"));
		assert_eq!(a.fingerprint().len(), 43);
	}

	#[test]
	fn user_codes_canonicalize_user_input() {
		let typed = UserCode::new(" bcdf-ghjk ");
		let issued = UserCode::new("BCDFGHJK");

		assert_eq!(typed, issued);
		assert_eq!(issued.display(), "BCDF-GHJK");
		assert_eq!(UserCode::new("123456789").display(), "1234-5678-9");
		assert!(UserCode::new(" - ").is_empty());
	}

	#[test]
	fn user_code_serde_canonicalizes() {
		let code: UserCode =
			serde_json::from_str("\"wxyz-bcdf\"").expect("User code should deserialize.");

		assert_eq!(code.expose(), "WXYZBCDF");
		assert_eq!(
			serde_json::to_string(&code).expect("User code should serialize."),
			"\"WXYZBCDF\""
		);
	}
}
