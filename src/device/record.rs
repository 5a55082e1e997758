//! Persisted device authorization record, lifecycle helpers, and builder.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, DeviceCodeHandle, ScopeSet, SessionId, Subject, UserCode},
};

/// Lifecycle status of a device authorization at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAuthorizationStatus {
	/// Waiting for the user to approve or deny (also covers a partially written approval).
	Pending,
	/// Approved with at least one scope.
	Authorized,
	/// The user completed the approval step but granted no scopes.
	Denied,
	/// The record outlived its lifetime.
	Expired,
}

/// Errors produced by [`DeviceAuthorizationBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DeviceAuthorizationBuilderError {
	/// Issued when the device code is empty.
	#[error("Device code is required.")]
	MissingDeviceCode,
	/// Issued when the user code is empty.
	#[error("User code is required.")]
	MissingUserCode,
	/// Issued when no lifetime was configured.
	#[error("Lifetime must be supplied.")]
	MissingLifetime,
	/// Issued when the lifetime is zero or negative.
	#[error("Lifetime must be positive.")]
	NonPositiveLifetime,
	/// Issued when an explicit polling interval is zero or negative.
	#[error("Polling interval must be positive.")]
	NonPositiveInterval,
}

/// Device authorization persisted between issuance, approval, polling, and redemption.
///
/// `client_id`, `user_code`, `requested_scopes`, `is_open_id`, `creation_time`, and `lifetime`
/// never change after issuance. The approval step writes `is_authorized`, `subject`,
/// `authorized_scopes`, `session_id`, and `description` together through
/// [`mark_authorized`](Self::mark_authorized).
#[derive(Clone, Serialize, Deserialize)]
pub struct DeviceAuthorization {
	/// Opaque polling handle.
	pub device_code: DeviceCodeHandle,
	/// Code entered by the user on the secondary device.
	pub user_code: UserCode,
	/// Client that started the flow.
	pub client_id: ClientId,
	/// Scopes the client asked for.
	pub requested_scopes: ScopeSet,
	/// Whether `openid` was requested.
	pub is_open_id: bool,
	/// Set once the approval step has completed, whether scopes were granted or not.
	pub is_authorized: bool,
	/// User who completed the approval step.
	pub subject: Option<Subject>,
	/// Scopes the user consented to; empty means access was denied.
	pub authorized_scopes: ScopeSet,
	/// Session the approval happened in.
	pub session_id: Option<SessionId>,
	/// Optional device description supplied during approval.
	pub description: Option<String>,
	/// Issuance instant (UTC).
	pub creation_time: OffsetDateTime,
	/// Time until the record expires.
	pub lifetime: Duration,
	/// Minimum polling interval for this device code; falls back to the engine default.
	pub interval: Option<Duration>,
}
impl DeviceAuthorization {
	/// Returns a builder for a pending device authorization.
	pub fn builder(
		device_code: DeviceCodeHandle,
		user_code: UserCode,
		client_id: ClientId,
	) -> DeviceAuthorizationBuilder {
		DeviceAuthorizationBuilder::new(device_code, user_code, client_id)
	}

	/// Instant at which the record stops validating.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.creation_time.saturating_add(self.lifetime)
	}

	/// Returns `true` when `instant` is at or past [`expires_at`](Self::expires_at).
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at()
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> DeviceAuthorizationStatus {
		if self.is_expired_at(instant) {
			return DeviceAuthorizationStatus::Expired;
		}
		if !self.is_authorized || self.subject.is_none() {
			return DeviceAuthorizationStatus::Pending;
		}
		if self.authorized_scopes.is_empty() {
			return DeviceAuthorizationStatus::Denied;
		}

		DeviceAuthorizationStatus::Authorized
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> DeviceAuthorizationStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Records the outcome of the approval step in a single transition.
	///
	/// An empty `scopes` set records a denial. Fails with [`Error::AlreadyAuthorized`] when the
	/// record was approved or denied before.
	pub fn mark_authorized(
		&mut self,
		subject: Subject,
		scopes: ScopeSet,
		session_id: Option<SessionId>,
		description: Option<String>,
	) -> Result<()> {
		if self.is_authorized {
			return Err(Error::AlreadyAuthorized);
		}

		self.is_authorized = true;
		self.subject = Some(subject);
		self.authorized_scopes = scopes;
		self.session_id = session_id;
		self.description = description;

		Ok(())
	}
}
impl Debug for DeviceAuthorization {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DeviceAuthorization")
			.field("device_code", &self.device_code)
			.field("user_code", &self.user_code)
			.field("client_id", &self.client_id)
			.field("requested_scopes", &self.requested_scopes)
			.field("is_open_id", &self.is_open_id)
			.field("is_authorized", &self.is_authorized)
			.field("subject", &self.subject.as_ref().map(|subject| &subject.id))
			.field("authorized_scopes", &self.authorized_scopes)
			.field("creation_time", &self.creation_time)
			.field("lifetime", &self.lifetime)
			.field("interval", &self.interval)
			.finish()
	}
}

/// Builder for pending [`DeviceAuthorization`] records.
#[derive(Clone, Debug)]
pub struct DeviceAuthorizationBuilder {
	device_code: DeviceCodeHandle,
	user_code: UserCode,
	client_id: ClientId,
	requested_scopes: ScopeSet,
	creation_time: Option<OffsetDateTime>,
	lifetime: Option<Duration>,
	interval: Option<Duration>,
}
impl DeviceAuthorizationBuilder {
	fn new(device_code: DeviceCodeHandle, user_code: UserCode, client_id: ClientId) -> Self {
		Self {
			device_code,
			user_code,
			client_id,
			requested_scopes: ScopeSet::default(),
			creation_time: None,
			lifetime: None,
			interval: None,
		}
	}

	/// Sets the scopes the client requested.
	pub fn requested_scopes(mut self, scopes: ScopeSet) -> Self {
		self.requested_scopes = scopes;

		self
	}

	/// Sets the issuance instant.
	pub fn created_at(mut self, instant: OffsetDateTime) -> Self {
		self.creation_time = Some(instant);

		self
	}

	/// Sets the record lifetime.
	pub fn lifetime(mut self, lifetime: Duration) -> Self {
		self.lifetime = Some(lifetime);

		self
	}

	/// Sets a per-record polling interval.
	pub fn interval(mut self, interval: Duration) -> Self {
		self.interval = Some(interval);

		self
	}

	/// Consumes the builder and produces a pending [`DeviceAuthorization`].
	pub fn build(self) -> Result<DeviceAuthorization, DeviceAuthorizationBuilderError> {
		if self.device_code.is_empty() {
			return Err(DeviceAuthorizationBuilderError::MissingDeviceCode);
		}
		if self.user_code.is_empty() {
			return Err(DeviceAuthorizationBuilderError::MissingUserCode);
		}

		let lifetime = self.lifetime.ok_or(DeviceAuthorizationBuilderError::MissingLifetime)?;

		if !lifetime.is_positive() {
			return Err(DeviceAuthorizationBuilderError::NonPositiveLifetime);
		}
		if self.interval.is_some_and(|interval| !interval.is_positive()) {
			return Err(DeviceAuthorizationBuilderError::NonPositiveInterval);
		}

		Ok(DeviceAuthorization {
			device_code: self.device_code,
			user_code: self.user_code,
			client_id: self.client_id,
			is_open_id: self.requested_scopes.is_open_id(),
			requested_scopes: self.requested_scopes,
			is_authorized: false,
			subject: None,
			authorized_scopes: ScopeSet::default(),
			session_id: None,
			description: None,
			creation_time: self.creation_time.unwrap_or_else(OffsetDateTime::now_utc),
			lifetime,
			interval: self.interval,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::SubjectId;

	fn pending(created: OffsetDateTime) -> DeviceAuthorization {
		DeviceAuthorization::builder(
			DeviceCodeHandle::new("device-code"),
			UserCode::new("BCDF-GHJK"),
			ClientId::new("device_flow").expect("Client fixture should be valid."),
		)
		.requested_scopes(
			ScopeSet::new(["openid", "profile"]).expect("Scope fixture should be valid."),
		)
		.created_at(created)
		.lifetime(Duration::seconds(300))
		.build()
		.expect("Pending record fixture should build.")
	}

	fn bob() -> Subject {
		Subject::new(SubjectId::new("bob").expect("Subject fixture should be valid."))
	}

	#[test]
	fn status_transitions_cover_all_states() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let mut record = pending(created);

		assert!(record.is_open_id);
		assert_eq!(record.expires_at(), macros::datetime!(2025-01-01 00:05 UTC));
		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:01 UTC)),
			DeviceAuthorizationStatus::Pending
		);

		record
			.mark_authorized(bob(), record.requested_scopes.clone(), None, None)
			.expect("First approval should succeed.");

		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:01 UTC)),
			DeviceAuthorizationStatus::Authorized
		);
		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:05 UTC)),
			DeviceAuthorizationStatus::Expired
		);
	}

	#[test]
	fn empty_consent_reads_as_denied_and_cannot_be_overwritten() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let mut record = pending(created);

		record
			.mark_authorized(bob(), ScopeSet::default(), None, Some("TV".into()))
			.expect("Denial should be recorded.");

		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:01 UTC)),
			DeviceAuthorizationStatus::Denied
		);

		let err = record
			.mark_authorized(bob(), record.requested_scopes.clone(), None, None)
			.expect_err("A second approval must be refused.");

		assert!(matches!(err, Error::AlreadyAuthorized));
		assert!(record.authorized_scopes.is_empty());
	}

	#[test]
	fn authorized_without_subject_reads_as_pending() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let mut record = pending(created);

		record.is_authorized = true;

		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:01 UTC)),
			DeviceAuthorizationStatus::Pending
		);
	}

	#[test]
	fn builder_validates_inputs() {
		let client = ClientId::new("device_flow").expect("Client fixture should be valid.");
		let missing_lifetime = DeviceAuthorization::builder(
			DeviceCodeHandle::new("device-code"),
			UserCode::new("BCDFGHJK"),
			client.clone(),
		)
		.build()
		.expect_err("Lifetime is mandatory.");

		assert_eq!(missing_lifetime, DeviceAuthorizationBuilderError::MissingLifetime);

		let bad_interval = DeviceAuthorization::builder(
			DeviceCodeHandle::new("device-code"),
			UserCode::new("BCDFGHJK"),
			client.clone(),
		)
		.lifetime(Duration::minutes(5))
		.interval(Duration::ZERO)
		.build()
		.expect_err("Zero intervals must be rejected.");

		assert_eq!(bad_interval, DeviceAuthorizationBuilderError::NonPositiveInterval);

		let empty_code =
			DeviceAuthorization::builder(DeviceCodeHandle::new(""), UserCode::new("X"), client)
				.lifetime(Duration::minutes(5))
				.build()
				.expect_err("Empty device codes must be rejected.");

		assert_eq!(empty_code, DeviceAuthorizationBuilderError::MissingDeviceCode);
	}

	#[test]
	fn debug_redacts_codes() {
		let record = pending(OffsetDateTime::now_utc());
		let rendered = format!("{record:?}");

		assert!(!rendered.contains("device-code"));
		assert!(!rendered.contains("BCDFGHJK"));
	}
}
