//! Engine-level error types shared across flows, stores, locks, and collaborators.
//!
//! Polling outcomes (`authorization_pending`, `slow_down`, …) are not errors; they are reported
//! through [`DeviceCodeValidation`](crate::validation::DeviceCodeValidation). The variants below
//! cover infrastructure faults and the caller-facing failures of issuance and approval.

// self
use crate::_prelude::*;

/// Engine-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical engine error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Device code store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Concurrency lock failure (including acquisition timeouts).
	#[error(transparent)]
	Lock(#[from] crate::lock::LockError),
	/// Profile collaborator failure.
	#[error(transparent)]
	Profile(#[from] crate::profile::ProfileError),
	/// Session or consent collaborator failure.
	#[error(transparent)]
	Session(#[from] crate::session::SessionError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The client is unknown, disabled, or not allowed to start a device flow.
	#[error("Client is not allowed to use the device flow: {reason}.")]
	InvalidClient {
		/// Engine-supplied reason string.
		reason: String,
	},
	/// Requested scopes are malformed or exceed what the client may request.
	#[error("Requested scopes are invalid: {reason}.")]
	InvalidScope {
		/// Engine-supplied reason string.
		reason: String,
	},
	/// No live device authorization matches the supplied user code.
	#[error("User code is invalid.")]
	InvalidUserCode,
	/// The device authorization behind the user code has expired.
	#[error("User code has expired.")]
	ExpiredUserCode,
	/// The device authorization has already been approved or denied.
	#[error("Device authorization has already been completed.")]
	AlreadyAuthorized,
	/// Approval was attempted without a signed-in user.
	#[error("No authenticated user is present in the session.")]
	NoAuthenticatedUser,
}

/// Configuration and validation failures raised by the engine.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Device flow options failed validation.
	#[error(transparent)]
	Options(#[from] crate::device::DeviceFlowOptionsError),
	/// Device authorization record builder validation failed.
	#[error("Unable to build device authorization record.")]
	RecordBuild(#[from] crate::device::DeviceAuthorizationBuilderError),
	/// Every generated user code collided with a live one.
	#[error("Unable to allocate a unique user code after {attempts} attempts.")]
	UserCodeExhausted {
		/// Number of generation attempts made.
		attempts: u8,
	},
	/// Every generated device code collided with a live one.
	#[error("Unable to allocate a unique device code.")]
	DeviceCodeExhausted,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::lock::LockError;

	#[test]
	fn lock_timeout_stays_an_infrastructure_error() {
		let err: Error =
			LockError::Timeout { key: "device_code:abc".into(), timeout: Duration::seconds(1) }
				.into();

		assert!(matches!(err, Error::Lock(LockError::Timeout { .. })));
		assert!(err.to_string().contains("device_code:abc"));
	}

	#[test]
	fn config_error_exposes_attempt_count() {
		let err: Error = ConfigError::UserCodeExhausted { attempts: 5 }.into();

		assert_eq!(err.to_string(), "Unable to allocate a unique user code after 5 attempts.");
	}
}
