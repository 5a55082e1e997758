//! Engine-wide device flow options and their validating builder.

// self
use crate::{_prelude::*, device::UserCodeStyle};

/// Errors raised while constructing or validating [`DeviceFlowOptions`].
#[derive(Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum DeviceFlowOptionsError {
	/// A duration that must be positive was zero or negative.
	#[error("The {field} option must be positive.")]
	NonPositiveDuration {
		/// Which option failed validation.
		field: &'static str,
	},
	/// The slow-down increment cannot be negative.
	#[error("The slow_down_increment option cannot be negative.")]
	NegativeSlowDownIncrement,
	/// At least one user code attempt is required.
	#[error("The user_code_attempts option must be at least 1.")]
	NoUserCodeAttempts,
	/// Verification URIs must be HTTPS.
	#[error("The verification URI must use HTTPS: {url}.")]
	InsecureVerificationUri {
		/// URI that failed validation.
		url: String,
	},
}

/// Validated options shared by issuance, throttling, and redemption.
///
/// Deserialization fills missing fields with the defaults and runs the same validation as
/// [`DeviceFlowOptionsBuilder::build`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedOptions")]
pub struct DeviceFlowOptions {
	/// Device code lifetime when the client does not override it.
	pub default_lifetime: Duration,
	/// Minimum polling interval when the client does not override it.
	pub default_interval: Duration,
	/// Added to a device code's interval every time it is told to slow down.
	pub slow_down_increment: Duration,
	/// Upper bound on waiting for a device code lock.
	pub lock_timeout: Duration,
	/// Shape of generated user codes.
	pub user_code_style: UserCodeStyle,
	/// How many user codes to try before giving up on a collision streak.
	pub user_code_attempts: u8,
	/// Page where the user enters the user code.
	pub verification_uri: Option<Url>,
}
impl DeviceFlowOptions {
	/// Creates a builder seeded with the defaults.
	pub fn builder() -> DeviceFlowOptionsBuilder {
		DeviceFlowOptionsBuilder { options: Self::default() }
	}

	/// Builds `verification_uri_complete` by appending the display form of the user code.
	pub fn verification_uri_complete(&self, user_code: &crate::auth::UserCode) -> Option<Url> {
		let mut url = self.verification_uri.clone()?;

		url.query_pairs_mut().append_pair("user_code", &user_code.display());

		Some(url)
	}

	fn validate(&self) -> Result<(), DeviceFlowOptionsError> {
		ensure_positive("default_lifetime", self.default_lifetime)?;
		ensure_positive("default_interval", self.default_interval)?;
		ensure_positive("lock_timeout", self.lock_timeout)?;

		if self.slow_down_increment.is_negative() {
			return Err(DeviceFlowOptionsError::NegativeSlowDownIncrement);
		}
		if self.user_code_attempts == 0 {
			return Err(DeviceFlowOptionsError::NoUserCodeAttempts);
		}
		if let Some(url) = self.verification_uri.as_ref().filter(|url| url.scheme() != "https") {
			return Err(DeviceFlowOptionsError::InsecureVerificationUri { url: url.to_string() });
		}

		Ok(())
	}
}
impl Default for DeviceFlowOptions {
	fn default() -> Self {
		Self {
			default_lifetime: Duration::seconds(300),
			default_interval: Duration::seconds(5),
			slow_down_increment: Duration::ZERO,
			lock_timeout: Duration::seconds(10),
			user_code_style: UserCodeStyle::default(),
			user_code_attempts: 5,
			verification_uri: None,
		}
	}
}

// Wire shape of the options before validation.
#[derive(Deserialize)]
#[serde(default)]
struct UncheckedOptions {
	default_lifetime: Duration,
	default_interval: Duration,
	slow_down_increment: Duration,
	lock_timeout: Duration,
	user_code_style: UserCodeStyle,
	user_code_attempts: u8,
	verification_uri: Option<Url>,
}
impl Default for UncheckedOptions {
	fn default() -> Self {
		let DeviceFlowOptions {
			default_lifetime,
			default_interval,
			slow_down_increment,
			lock_timeout,
			user_code_style,
			user_code_attempts,
			verification_uri,
		} = DeviceFlowOptions::default();

		Self {
			default_lifetime,
			default_interval,
			slow_down_increment,
			lock_timeout,
			user_code_style,
			user_code_attempts,
			verification_uri,
		}
	}
}
impl TryFrom<UncheckedOptions> for DeviceFlowOptions {
	type Error = DeviceFlowOptionsError;

	fn try_from(raw: UncheckedOptions) -> Result<Self, Self::Error> {
		let UncheckedOptions {
			default_lifetime,
			default_interval,
			slow_down_increment,
			lock_timeout,
			user_code_style,
			user_code_attempts,
			verification_uri,
		} = raw;
		let options = Self {
			default_lifetime,
			default_interval,
			slow_down_increment,
			lock_timeout,
			user_code_style,
			user_code_attempts,
			verification_uri,
		};

		options.validate()?;

		Ok(options)
	}
}

/// Builder for [`DeviceFlowOptions`].
#[derive(Debug)]
pub struct DeviceFlowOptionsBuilder {
	options: DeviceFlowOptions,
}
impl DeviceFlowOptionsBuilder {
	/// Sets the default device code lifetime.
	pub fn default_lifetime(mut self, lifetime: Duration) -> Self {
		self.options.default_lifetime = lifetime;

		self
	}

	/// Sets the default minimum polling interval.
	pub fn default_interval(mut self, interval: Duration) -> Self {
		self.options.default_interval = interval;

		self
	}

	/// Sets how much the interval grows after each `slow_down` (RFC 8628 suggests 5 seconds).
	pub fn slow_down_increment(mut self, increment: Duration) -> Self {
		self.options.slow_down_increment = increment;

		self
	}

	/// Sets the lock acquisition timeout.
	pub fn lock_timeout(mut self, timeout: Duration) -> Self {
		self.options.lock_timeout = timeout;

		self
	}

	/// Sets the user code style.
	pub fn user_code_style(mut self, style: UserCodeStyle) -> Self {
		self.options.user_code_style = style;

		self
	}

	/// Sets how many user codes are tried before issuance fails.
	pub fn user_code_attempts(mut self, attempts: u8) -> Self {
		self.options.user_code_attempts = attempts;

		self
	}

	/// Sets the verification URI returned to devices.
	pub fn verification_uri(mut self, url: Url) -> Self {
		self.options.verification_uri = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting options.
	pub fn build(self) -> Result<DeviceFlowOptions, DeviceFlowOptionsError> {
		self.options.validate()?;

		Ok(self.options)
	}
}

fn ensure_positive(field: &'static str, value: Duration) -> Result<(), DeviceFlowOptionsError> {
	if value.is_positive() {
		Ok(())
	} else {
		Err(DeviceFlowOptionsError::NonPositiveDuration { field })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::UserCode;

	#[test]
	fn defaults_follow_rfc_8628() {
		let options = DeviceFlowOptions::builder().build().expect("Defaults should validate.");

		assert_eq!(options.default_interval, Duration::seconds(5));
		assert_eq!(options.default_lifetime, Duration::seconds(300));
		assert_eq!(options.slow_down_increment, Duration::ZERO);
	}

	#[test]
	fn builder_rejects_invalid_values() {
		let err = DeviceFlowOptions::builder()
			.default_interval(Duration::ZERO)
			.build()
			.expect_err("Zero intervals must be rejected.");

		assert_eq!(err, DeviceFlowOptionsError::NonPositiveDuration { field: "default_interval" });
		assert_eq!(
			DeviceFlowOptions::builder().user_code_attempts(0).build(),
			Err(DeviceFlowOptionsError::NoUserCodeAttempts)
		);
		assert_eq!(
			DeviceFlowOptions::builder().slow_down_increment(Duration::seconds(-1)).build(),
			Err(DeviceFlowOptionsError::NegativeSlowDownIncrement)
		);

		let insecure = Url::parse("http://id.example.com/device").expect("URL should parse.");

		assert!(matches!(
			DeviceFlowOptions::builder().verification_uri(insecure).build(),
			Err(DeviceFlowOptionsError::InsecureVerificationUri { .. })
		));
	}

	#[test]
	fn verification_uri_complete_embeds_user_code() {
		let options = DeviceFlowOptions::builder()
			.verification_uri(
				Url::parse("https://id.example.com/device").expect("URL should parse."),
			)
			.build()
			.expect("Options should validate.");
		let complete = options
			.verification_uri_complete(&UserCode::new("BCDFGHJK"))
			.expect("Complete URI should be produced when a verification URI is set.");

		assert_eq!(complete.as_str(), "https://id.example.com/device?user_code=BCDF-GHJK");
		assert!(DeviceFlowOptions::default().verification_uri_complete(&UserCode::new("1")).is_none());
	}

	#[test]
	fn deserialization_validates_like_the_builder() {
		let options: DeviceFlowOptions = serde_json::from_value(serde_json::json!({
			"user_code_attempts": 3
		}))
		.expect("Partial options should fill in defaults.");

		assert_eq!(options.user_code_attempts, 3);
		assert_eq!(options.default_interval, Duration::seconds(5));

		let defaults = serde_json::to_value(DeviceFlowOptions::default())
			.expect("Default options should serialize.");
		let mut zero_interval = defaults.clone();

		zero_interval["default_interval"] = serde_json::to_value(Duration::ZERO)
			.expect("Zero duration should serialize.");

		let err = serde_json::from_value::<DeviceFlowOptions>(zero_interval)
			.expect_err("Zero intervals must be rejected on load.");

		assert!(err.to_string().contains("default_interval"), "Unexpected error: {err}.");

		let mut zero_timeout = defaults;

		zero_timeout["lock_timeout"] =
			serde_json::to_value(Duration::ZERO).expect("Zero duration should serialize.");

		assert!(serde_json::from_value::<DeviceFlowOptions>(zero_timeout).is_err());
	}
}
