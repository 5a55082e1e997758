// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for device flow activity.
#[derive(Debug, Default)]
pub struct DeviceFlowMetrics {
	issued: AtomicU64,
	polls: AtomicU64,
	slow_downs: AtomicU64,
	approvals: AtomicU64,
	denials: AtomicU64,
	redemptions: AtomicU64,
}
impl DeviceFlowMetrics {
	/// Returns the number of device codes issued.
	pub fn issued(&self) -> u64 {
		self.issued.load(Ordering::Relaxed)
	}

	/// Returns the number of validated polls, redemption attempts included.
	pub fn polls(&self) -> u64 {
		self.polls.load(Ordering::Relaxed)
	}

	/// Returns the number of polls answered with `slow_down`.
	pub fn slow_downs(&self) -> u64 {
		self.slow_downs.load(Ordering::Relaxed)
	}

	/// Returns the number of approvals that granted at least one scope.
	pub fn approvals(&self) -> u64 {
		self.approvals.load(Ordering::Relaxed)
	}

	/// Returns the number of approvals that granted nothing.
	pub fn denials(&self) -> u64 {
		self.denials.load(Ordering::Relaxed)
	}

	/// Returns the number of device codes redeemed.
	pub fn redemptions(&self) -> u64 {
		self.redemptions.load(Ordering::Relaxed)
	}

	pub(crate) fn record_issued(&self) {
		self.issued.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_poll(&self) {
		self.polls.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_slow_down(&self) {
		self.slow_downs.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_approval(&self) {
		self.approvals.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_denial(&self) {
		self.denials.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_redemption(&self) {
		self.redemptions.fetch_add(1, Ordering::Relaxed);
	}
}
