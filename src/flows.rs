//! Device flow orchestration on top of the store, lock, throttle, and collaborator contracts.

mod authorize;
mod interaction;
mod metrics;
mod redeem;

pub use authorize::*;
pub use interaction::*;
pub use metrics::DeviceFlowMetrics;

// self
use crate::{
	_prelude::*,
	client::ClientStore,
	device::DeviceFlowOptions,
	lock::ConcurrencyLock,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	profile::ProfileService,
	session::{MemoryConsentStore, UserConsentStore},
	store::DeviceCodeStore,
	throttle::{PollingThrottle, ThrottlingPolicy},
	validation::{DeviceCodeValidation, DeviceCodeValidator},
};

/// Coordinates the device authorization grant for one authorization server.
///
/// The facade owns every collaborator as a shared trait object so hosts can swap the in-memory
/// implementations for their own backends. Issuance, approval, polling, and redemption all run
/// through it; approval and redemption mutate a record only while holding that record's
/// device code lock.
#[derive(Clone)]
pub struct DeviceFlow {
	/// Device authorization persistence.
	pub store: Arc<dyn DeviceCodeStore>,
	/// Registered client lookup.
	pub clients: Arc<dyn ClientStore>,
	/// Polling-rate policy.
	pub throttle: Arc<dyn ThrottlingPolicy>,
	/// Keyed lock serializing record mutations.
	pub lock: Arc<dyn ConcurrencyLock>,
	/// Subject activity checks.
	pub profile: Arc<dyn ProfileService>,
	/// Remembered consent.
	pub consents: Arc<dyn UserConsentStore>,
	/// Engine options.
	pub options: DeviceFlowOptions,
	/// Shared in-process counters.
	pub metrics: Arc<DeviceFlowMetrics>,
}
impl DeviceFlow {
	/// Creates a flow with a [`PollingThrottle`] derived from `options` and an in-memory consent
	/// store.
	pub fn new(
		store: Arc<dyn DeviceCodeStore>,
		clients: Arc<dyn ClientStore>,
		lock: Arc<dyn ConcurrencyLock>,
		profile: Arc<dyn ProfileService>,
		options: DeviceFlowOptions,
	) -> Self {
		Self {
			throttle: Arc::new(PollingThrottle::from_options(&options)),
			consents: Arc::new(MemoryConsentStore::default()),
			store,
			clients,
			lock,
			profile,
			options,
			metrics: Default::default(),
		}
	}

	/// Replaces the throttling policy.
	pub fn with_throttle(mut self, throttle: Arc<dyn ThrottlingPolicy>) -> Self {
		self.throttle = throttle;

		self
	}

	/// Replaces the consent store.
	pub fn with_consent_store(mut self, consents: Arc<dyn UserConsentStore>) -> Self {
		self.consents = consents;

		self
	}

	/// Validator wired to this flow's store, throttle, and profile service.
	pub fn validator(&self) -> DeviceCodeValidator {
		DeviceCodeValidator::new(self.store.clone(), self.throttle.clone(), self.profile.clone())
	}

	/// Removes records and throttle bookkeeping expired at `now`; returns the removed record count.
	pub async fn purge_expired(&self, now: OffsetDateTime) -> Result<usize> {
		let removed = self.store.remove_expired(now).await?;
		let forgotten = self.throttle.purge_expired(now);

		#[cfg(feature = "tracing")]
		tracing::debug!(removed, forgotten, "Purged expired device authorizations.");
		#[cfg(not(feature = "tracing"))]
		let _ = forgotten;

		Ok(removed)
	}
}
impl Debug for DeviceFlow {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DeviceFlow")
			.field("options", &self.options)
			.field("metrics", &self.metrics)
			.finish()
	}
}

fn record_result<T>(kind: FlowKind, span: &FlowSpan, result: &Result<T>) {
	let outcome = match result {
		Ok(_) => FlowOutcome::Success,
		Err(_) => FlowOutcome::Failure,
	};

	span.record_outcome(outcome);
	obs::record_flow_outcome(kind, outcome);
}

fn record_validation(kind: FlowKind, span: &FlowSpan, result: &Result<DeviceCodeValidation>) {
	let outcome = match result {
		Ok(DeviceCodeValidation::Valid(_)) => FlowOutcome::Success,
		Ok(DeviceCodeValidation::Rejected(_)) => FlowOutcome::Rejected,
		Err(_) => FlowOutcome::Failure,
	};

	span.record_outcome(outcome);
	obs::record_flow_outcome(kind, outcome);
}
