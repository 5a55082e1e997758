//! Device code validation performed on every token-endpoint poll.
//!
//! The validator short-circuits at the first failing check, in this order:
//!
//! 1. lookup (`invalid_grant`)
//! 2. throttle (`slow_down`)
//! 3. client binding (`invalid_grant`)
//! 4. expiry (`expired_token`)
//! 5. authorization state (`authorization_pending`)
//! 6. subject presence (`authorization_pending`)
//! 7. granted scopes (`access_denied`)
//! 8. subject activity (`invalid_grant`)
//!
//! Throttling runs before anything that reveals record state, and client binding runs before
//! expiry so a foreign client cannot probe another client's code. Collaborator faults surface as
//! [`Error`], never as one of the wire codes above. Validation never deletes the record;
//! redemption does that.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, DeviceCodeHandle, ScopeSet, SessionId, Subject},
	device::DeviceAuthorization,
	obs,
	profile::{IsActiveContext, ProfileCaller, ProfileService},
	store::DeviceCodeStore,
	throttle::ThrottlingPolicy,
};

/// OAuth 2.0 error codes a poll can be rejected with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
	/// Unknown code, client mismatch, or inactive subject.
	InvalidGrant,
	/// The device code outlived its lifetime.
	ExpiredToken,
	/// The user has not finished the approval step.
	AuthorizationPending,
	/// The user completed the approval step without granting any scope.
	AccessDenied,
	/// The client polled faster than its interval allows.
	SlowDown,
}
impl TokenErrorCode {
	/// Literal wire value.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenErrorCode::InvalidGrant => "invalid_grant",
			TokenErrorCode::ExpiredToken => "expired_token",
			TokenErrorCode::AuthorizationPending => "authorization_pending",
			TokenErrorCode::AccessDenied => "access_denied",
			TokenErrorCode::SlowDown => "slow_down",
		}
	}
}
impl Display for TokenErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Rejected poll: a wire code plus a short server-side description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrantRejection {
	/// Error code returned to the client.
	pub code: TokenErrorCode,
	/// Description suitable for logs or `error_description`.
	pub description: &'static str,
}
impl GrantRejection {
	const fn new(code: TokenErrorCode, description: &'static str) -> Self {
		Self { code, description }
	}
}

/// Grant data resolved from an approved device authorization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedDeviceCode {
	/// Client the tokens are issued to.
	pub client_id: ClientId,
	/// User who approved the device.
	pub subject: Subject,
	/// Scopes the user granted.
	pub scopes: ScopeSet,
	/// Whether an ID token is expected.
	pub is_open_id: bool,
	/// Session the approval happened in.
	pub session_id: Option<SessionId>,
	/// Device description captured during approval.
	pub description: Option<String>,
}

/// Outcome of validating one poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceCodeValidation {
	/// Every check passed.
	Valid(ValidatedDeviceCode),
	/// A check failed with a protocol error.
	Rejected(GrantRejection),
}
impl DeviceCodeValidation {
	/// Returns `true` for [`DeviceCodeValidation::Valid`].
	pub fn is_valid(&self) -> bool {
		matches!(self, DeviceCodeValidation::Valid(_))
	}

	/// Wire code of a rejection, if any.
	pub fn error_code(&self) -> Option<TokenErrorCode> {
		match self {
			DeviceCodeValidation::Valid(_) => None,
			DeviceCodeValidation::Rejected(rejection) => Some(rejection.code),
		}
	}

	/// Grant data of a successful validation, if any.
	pub fn grant(&self) -> Option<&ValidatedDeviceCode> {
		match self {
			DeviceCodeValidation::Valid(grant) => Some(grant),
			DeviceCodeValidation::Rejected(_) => None,
		}
	}

	pub(crate) fn reject(code: TokenErrorCode, description: &'static str) -> Self {
		DeviceCodeValidation::Rejected(GrantRejection::new(code, description))
	}
}

/// Token-endpoint poll for the device grant.
#[derive(Clone, Debug)]
pub struct DeviceCodeRequest {
	/// Handle sent by the device; `None` when the parameter was missing.
	pub device_code: Option<DeviceCodeHandle>,
	/// Authenticated client making the poll.
	pub client_id: ClientId,
}
impl DeviceCodeRequest {
	/// Creates a poll carrying a device code.
	pub fn new(device_code: DeviceCodeHandle, client_id: ClientId) -> Self {
		Self { device_code: Some(device_code), client_id }
	}
}

/// Runs the ordered device code checks against the injected collaborators.
#[derive(Clone)]
pub struct DeviceCodeValidator {
	store: Arc<dyn DeviceCodeStore>,
	throttle: Arc<dyn ThrottlingPolicy>,
	profile: Arc<dyn ProfileService>,
}
impl DeviceCodeValidator {
	/// Creates a validator over the provided collaborators.
	pub fn new(
		store: Arc<dyn DeviceCodeStore>,
		throttle: Arc<dyn ThrottlingPolicy>,
		profile: Arc<dyn ProfileService>,
	) -> Self {
		Self { store, throttle, profile }
	}

	/// Validates a poll at the current UTC instant.
	pub async fn validate(&self, request: &DeviceCodeRequest) -> Result<DeviceCodeValidation> {
		self.validate_at(request, OffsetDateTime::now_utc()).await
	}

	/// Validates a poll as if it arrived at `now`.
	pub async fn validate_at(
		&self,
		request: &DeviceCodeRequest,
		now: OffsetDateTime,
	) -> Result<DeviceCodeValidation> {
		let validation = self.run_checks(request, now).await?;

		if let DeviceCodeValidation::Rejected(rejection) = &validation {
			#[cfg(feature = "tracing")]
			tracing::debug!(
				error = rejection.code.as_str(),
				client_id = %request.client_id,
				"{}",
				rejection.description
			);

			obs::record_rejection(rejection.code);
		}

		Ok(validation)
	}

	async fn run_checks(
		&self,
		request: &DeviceCodeRequest,
		now: OffsetDateTime,
	) -> Result<DeviceCodeValidation> {
		let Some(device_code) = request.device_code.as_ref().filter(|code| !code.is_empty()) else {
			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::InvalidGrant,
				"Device code is missing.",
			));
		};
		let Some(record) = self.store.find_by_device_code(device_code).await? else {
			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::InvalidGrant,
				"Device code is unknown.",
			));
		};

		if self.throttle.should_slow_down(device_code, &record, now).await? {
			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::SlowDown,
				"Polling faster than the allowed interval.",
			));
		}
		if record.client_id != request.client_id {
			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::InvalidGrant,
				"Device code was issued to another client.",
			));
		}
		if record.is_expired_at(now) {
			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::ExpiredToken,
				"Device code has expired.",
			));
		}
		if !record.is_authorized {
			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::AuthorizationPending,
				"User has not approved the device yet.",
			));
		}

		let DeviceAuthorization {
			client_id,
			subject,
			authorized_scopes,
			is_open_id,
			session_id,
			description,
			..
		} = record;
		let Some(subject) = subject else {
			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::AuthorizationPending,
				"Approval is not fully recorded yet.",
			));
		};

		if authorized_scopes.is_empty() {
			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::AccessDenied,
				"User denied the device access.",
			));
		}

		let context = IsActiveContext {
			subject: &subject,
			client_id: &client_id,
			caller: ProfileCaller::DeviceCodeValidation,
		};

		if !self.profile.is_active(context).await? {
			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::InvalidGrant,
				"Subject is no longer active.",
			));
		}

		Ok(DeviceCodeValidation::Valid(ValidatedDeviceCode {
			client_id,
			subject,
			scopes: authorized_scopes,
			is_open_id,
			session_id,
			description,
		}))
	}
}
impl Debug for DeviceCodeValidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("DeviceCodeValidator(..)")
	}
}
