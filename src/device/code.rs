//! Random device code and user code generation.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, RngCore};
// self
use crate::{
	_prelude::*,
	auth::{DeviceCodeHandle, UserCode},
};

const DEVICE_CODE_BYTES: usize = 32;
const NUMERIC_LEN: usize = 9;
const CONSONANT_LEN: usize = 8;
// No vowels, no look-alikes; 20^8 ≈ 43 bits.
const CONSONANT_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ";

/// Character set and length of generated user codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserCodeStyle {
	/// Nine decimal digits, easy to type on numeric keypads.
	#[default]
	Numeric,
	/// Eight consonants rendered as `XXXX-XXXX`.
	Consonants,
}
impl UserCodeStyle {
	/// Generates a fresh user code in this style.
	pub fn generate(self) -> UserCode {
		let mut rng = rand::rng();
		let code: String = match self {
			UserCodeStyle::Numeric =>
				(0..NUMERIC_LEN).map(|_| char::from(b'0' + rng.random_range(0..10_u8))).collect(),
			UserCodeStyle::Consonants => (0..CONSONANT_LEN)
				.map(|_| char::from(CONSONANT_ALPHABET[rng.random_range(0..CONSONANT_ALPHABET.len())]))
				.collect(),
		};

		UserCode::new(code)
	}
}

/// Generates a 256-bit URL-safe device code.
pub fn generate_device_code() -> DeviceCodeHandle {
	let mut bytes = [0_u8; DEVICE_CODE_BYTES];

	rand::rng().fill_bytes(&mut bytes);

	DeviceCodeHandle::new(URL_SAFE_NO_PAD.encode(bytes))
}
