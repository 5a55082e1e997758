//! Polling-rate enforcement for device codes.
//!
//! A throttle decides whether a poll arrived before the device code's minimum interval elapsed
//! and records the poll as a side effect. The decision and the bookkeeping happen in one critical
//! section so two simultaneous polls for the same handle can never both pass.

// self
use crate::{
	_prelude::*,
	auth::DeviceCodeHandle,
	device::{DeviceAuthorization, DeviceFlowOptions},
	store::StoreError,
};

/// Boxed future returned by [`ThrottlingPolicy::should_slow_down`].
pub type ThrottleFuture<'a> = Pin<Box<dyn Future<Output = Result<bool, StoreError>> + 'a + Send>>;

/// Decides whether a poller must back off.
pub trait ThrottlingPolicy
where
	Self: Send + Sync,
{
	/// Returns `true` when `device_code` was polled again before its interval elapsed.
	///
	/// Every call records the poll, so the policy sees the full call frequency even for polls
	/// that later fail validation. `record` supplies the per-issuance interval and expiry.
	fn should_slow_down<'a>(
		&'a self,
		device_code: &'a DeviceCodeHandle,
		record: &'a DeviceAuthorization,
		now: OffsetDateTime,
	) -> ThrottleFuture<'a>;

	/// Drops bookkeeping for device codes expired at `now`, returning how many entries went away.
	fn purge_expired(&self, now: OffsetDateTime) -> usize {
		let _ = now;

		0
	}
}

#[derive(Clone, Copy, Debug)]
struct PollState {
	last_poll: OffsetDateTime,
	interval: Duration,
	expires_at: OffsetDateTime,
}

/// In-process throttle keyed by device code fingerprint.
///
/// A poll passes when at least the current interval has elapsed since the last accepted poll.
/// A rejected poll leaves the last accepted poll untouched, so a caller that waits one full
/// interval after its previous accepted poll always proceeds. When `slow_down_increment` is
/// positive, each rejection stretches that device code's interval by the increment.
#[derive(Debug)]
pub struct PollingThrottle {
	polls: Mutex<HashMap<String, PollState>>,
	default_interval: Duration,
	slow_down_increment: Duration,
}
impl PollingThrottle {
	/// Creates a throttle with a fixed default interval and no back-off growth.
	pub fn new(default_interval: Duration) -> Self {
		Self {
			polls: Mutex::default(),
			default_interval,
			slow_down_increment: Duration::ZERO,
		}
	}

	/// Creates a throttle from engine options.
	pub fn from_options(options: &DeviceFlowOptions) -> Self {
		Self::new(options.default_interval).with_slow_down_increment(options.slow_down_increment)
	}

	/// Sets how much each rejected poll stretches the interval.
	pub fn with_slow_down_increment(mut self, increment: Duration) -> Self {
		self.slow_down_increment = increment;

		self
	}

	/// Current interval tracked for `device_code`, if it has been polled.
	pub fn interval_of(&self, device_code: &DeviceCodeHandle) -> Option<Duration> {
		self.polls.lock().get(&device_code.fingerprint()).map(|state| state.interval)
	}

	/// Number of device codes with poll bookkeeping.
	pub fn tracked(&self) -> usize {
		self.polls.lock().len()
	}

	/// Forgets a device code, typically after redemption.
	pub fn forget(&self, device_code: &DeviceCodeHandle) {
		self.polls.lock().remove(&device_code.fingerprint());
	}

	fn check(&self, fingerprint: String, record: &DeviceAuthorization, now: OffsetDateTime) -> bool {
		let mut polls = self.polls.lock();
		let Some(state) = polls.get_mut(&fingerprint) else {
			polls.insert(
				fingerprint,
				PollState {
					last_poll: now,
					interval: record.interval.unwrap_or(self.default_interval),
					expires_at: record.expires_at(),
				},
			);

			return false;
		};

		if now < state.last_poll.saturating_add(state.interval) {
			state.interval = state.interval.saturating_add(self.slow_down_increment);

			return true;
		}

		state.last_poll = now;

		false
	}
}
impl Default for PollingThrottle {
	fn default() -> Self {
		Self::from_options(&DeviceFlowOptions::default())
	}
}
impl ThrottlingPolicy for PollingThrottle {
	fn should_slow_down<'a>(
		&'a self,
		device_code: &'a DeviceCodeHandle,
		record: &'a DeviceAuthorization,
		now: OffsetDateTime,
	) -> ThrottleFuture<'a> {
		let fingerprint = device_code.fingerprint();

		Box::pin(async move { Ok(self.check(fingerprint, record, now)) })
	}

	fn purge_expired(&self, now: OffsetDateTime) -> usize {
		let mut polls = self.polls.lock();
		let before = polls.len();

		polls.retain(|_, state| state.expires_at > now);

		before - polls.len()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::auth::{ClientId, UserCode};

	fn record(interval: Option<Duration>) -> DeviceAuthorization {
		let builder = DeviceAuthorization::builder(
			DeviceCodeHandle::new("throttled"),
			UserCode::new("123456789"),
			ClientId::new("device_flow").expect("Client fixture should be valid."),
		)
		.created_at(datetime!(2025-01-01 00:00 UTC))
		.lifetime(Duration::minutes(5));
		let builder = match interval {
			Some(interval) => builder.interval(interval),
			None => builder,
		};

		builder.build().expect("Record fixture should build.")
	}

	#[tokio::test]
	async fn second_poll_inside_interval_slows_down() {
		let throttle = PollingThrottle::new(Duration::seconds(5));
		let record = record(None);
		let t0 = datetime!(2025-01-01 00:00:10 UTC);

		assert!(!throttle.should_slow_down(&record.device_code, &record, t0).await.expect("poll"));
		assert!(
			throttle
				.should_slow_down(&record.device_code, &record, t0 + Duration::seconds(2))
				.await
				.expect("poll")
		);
		// Measured from the last accepted poll, not the rejected one.
		assert!(
			!throttle
				.should_slow_down(&record.device_code, &record, t0 + Duration::seconds(5))
				.await
				.expect("poll")
		);
	}

	#[tokio::test]
	async fn increment_stretches_interval_after_rejection() {
		let throttle =
			PollingThrottle::new(Duration::seconds(5)).with_slow_down_increment(Duration::seconds(5));
		let record = record(None);
		let t0 = datetime!(2025-01-01 00:00:10 UTC);

		assert!(!throttle.should_slow_down(&record.device_code, &record, t0).await.expect("poll"));
		assert!(
			throttle
				.should_slow_down(&record.device_code, &record, t0 + Duration::seconds(1))
				.await
				.expect("poll")
		);
		assert_eq!(throttle.interval_of(&record.device_code), Some(Duration::seconds(10)));
		assert!(
			throttle
				.should_slow_down(&record.device_code, &record, t0 + Duration::seconds(6))
				.await
				.expect("poll")
		);
	}

	#[tokio::test]
	async fn record_interval_overrides_default() {
		let throttle = PollingThrottle::new(Duration::seconds(5));
		let record = record(Some(Duration::seconds(1)));
		let t0 = datetime!(2025-01-01 00:00:10 UTC);

		assert!(!throttle.should_slow_down(&record.device_code, &record, t0).await.expect("poll"));
		assert!(
			!throttle
				.should_slow_down(&record.device_code, &record, t0 + Duration::seconds(1))
				.await
				.expect("poll")
		);
	}

	#[tokio::test]
	async fn purge_drops_expired_bookkeeping() {
		let throttle = PollingThrottle::default();
		let record = record(None);

		throttle
			.should_slow_down(&record.device_code, &record, datetime!(2025-01-01 00:01 UTC))
			.await
			.expect("poll");

		assert_eq!(throttle.purge_expired(datetime!(2025-01-01 00:04 UTC)), 0);
		assert_eq!(throttle.purge_expired(datetime!(2025-01-01 00:05 UTC)), 1);
		assert_eq!(throttle.tracked(), 0);
	}

	#[tokio::test]
	async fn forgotten_code_starts_over() {
		let throttle = PollingThrottle::new(Duration::seconds(5));
		let record = record(None);
		let t0 = datetime!(2025-01-01 00:00:10 UTC);

		assert!(!throttle.should_slow_down(&record.device_code, &record, t0).await.expect("poll"));

		throttle.forget(&record.device_code);

		assert_eq!(throttle.interval_of(&record.device_code), None);
		assert!(!throttle.should_slow_down(&record.device_code, &record, t0).await.expect("poll"));
	}
}
