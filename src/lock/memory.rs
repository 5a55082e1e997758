//! In-process [`ConcurrencyLock`] backed by one async mutex per key.

// crates.io
use async_lock::MutexGuardArc;
use tokio::time::{self, Instant};
// self
use crate::{
	_prelude::*,
	lock::{ConcurrencyLock, LockFuture},
};

const DEFAULT_LEASE: Duration = Duration::seconds(30);

struct Held {
	_guard: MutexGuardArc<()>,
	acquired_at: Instant,
}

struct Slot {
	mutex: Arc<AsyncMutex<()>>,
	held: Option<Held>,
	// Releases still owed by holders whose lease was reclaimed.
	reclaimed: usize,
}
impl Slot {
	fn new() -> Self {
		Self { mutex: Arc::new(AsyncMutex::new(())), held: None, reclaimed: 0 }
	}

	fn is_idle(&self) -> bool {
		self.held.is_none() && self.reclaimed == 0 && Arc::strong_count(&self.mutex) == 1
	}
}

/// Keyed lock for a single process.
///
/// Each key owns an [`AsyncMutex`]; waiters suspend instead of spinning and give up at their
/// deadline. Ownership is leased: once a holder exceeds the lease, the next waiter reclaims the
/// key, so a leaked holder cannot wedge it. Releases are counted, not attributed: after a
/// reclaim the next release pays off the reclaimed holder's debt and leaves the current holder in
/// place, so a late release never frees someone else's critical section. The cost is that the
/// current holder may keep the key for up to one extra lease. Idle keys are pruned on release.
pub struct MemoryLock {
	slots: Mutex<HashMap<String, Slot>>,
	lease: Option<Duration>,
}
impl MemoryLock {
	/// Creates a lock whose holders are reclaimed after `lease`.
	pub fn with_lease(lease: Duration) -> Self {
		Self { slots: Mutex::default(), lease: Some(lease) }
	}

	/// Creates a lock whose holders are never reclaimed.
	pub fn without_lease() -> Self {
		Self { slots: Mutex::default(), lease: None }
	}

	/// Returns true if `key` currently has a holder.
	pub fn is_locked(&self, key: &str) -> bool {
		self.slots.lock().get(key).is_some_and(|slot| slot.held.is_some())
	}

	/// Number of keys with live bookkeeping (holders, waiters, or owed releases).
	pub fn tracked_keys(&self) -> usize {
		self.slots.lock().len()
	}

	fn slot_mutex(&self, key: &str) -> Arc<AsyncMutex<()>> {
		self.slots.lock().entry(key.to_owned()).or_insert_with(Slot::new).mutex.clone()
	}

	fn install(&self, key: &str, guard: MutexGuardArc<()>) {
		let mut slots = self.slots.lock();
		let slot = slots.entry(key.to_owned()).or_insert_with(Slot::new);

		slot.held = Some(Held { _guard: guard, acquired_at: Instant::now() });
	}

	fn lease_deadline(&self, key: &str) -> Option<Instant> {
		let lease = to_std(self.lease?);
		let slots = self.slots.lock();

		slots.get(key)?.held.as_ref().map(|held| held.acquired_at + lease)
	}

	fn reclaim_expired(&self, key: &str) {
		let Some(lease) = self.lease.map(to_std) else {
			return;
		};
		let mut slots = self.slots.lock();
		let Some(slot) = slots.get_mut(key) else {
			return;
		};

		if slot.held.as_ref().is_some_and(|held| held.acquired_at.elapsed() >= lease) {
			slot.held = None;
			slot.reclaimed += 1;

			#[cfg(feature = "tracing")]
			tracing::warn!(key, "Reclaimed a lock whose holder outlived its lease.");
		}
	}

	fn prune(&self, key: &str) {
		let mut slots = self.slots.lock();

		if slots.get(key).is_some_and(Slot::is_idle) {
			slots.remove(key);
		}
	}
}
impl Default for MemoryLock {
	fn default() -> Self {
		Self::with_lease(DEFAULT_LEASE)
	}
}
impl Debug for MemoryLock {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryLock")
			.field("tracked_keys", &self.tracked_keys())
			.field("lease", &self.lease)
			.finish()
	}
}
impl ConcurrencyLock for MemoryLock {
	fn lock<'a>(&'a self, key: &'a str, timeout: Duration) -> LockFuture<'a> {
		Box::pin(async move {
			let deadline = Instant::now() + to_std(timeout);
			let mutex = self.slot_mutex(key);

			loop {
				if let Some(guard) = mutex.try_lock_arc() {
					self.install(key, guard);

					return Ok(true);
				}
				if Instant::now() >= deadline {
					break;
				}

				let wake_at = self.lease_deadline(key).map_or(deadline, |end| end.min(deadline));

				if let Ok(guard) = time::timeout_at(wake_at, mutex.lock_arc()).await {
					self.install(key, guard);

					return Ok(true);
				}

				self.reclaim_expired(key);
			}

			drop(mutex);
			self.prune(key);

			Ok(false)
		})
	}

	fn unlock(&self, key: &str) {
		let mut slots = self.slots.lock();
		let Some(slot) = slots.get_mut(key) else {
			drop(slots);
			report_misuse(key);

			return;
		};

		// A release is ambiguous while reclaimed holders still owe one, so it settles a debt
		// before it frees the current holder.
		if slot.reclaimed > 0 {
			slot.reclaimed -= 1;
		} else if slot.held.take().is_none() {
			drop(slots);
			report_misuse(key);

			return;
		}
		if slot.is_idle() {
			slots.remove(key);
		}
	}
}

fn report_misuse(key: &str) {
	#[cfg(feature = "tracing")]
	tracing::error!(key, "Released a lock key that is not held.");

	debug_assert!(false, "Released lock key `{key}` that is not held.");
}

fn to_std(duration: Duration) -> std::time::Duration {
	std::time::Duration::try_from(duration).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn second_caller_waits_for_release() {
		let lock = Arc::new(MemoryLock::without_lease());

		assert!(lock.lock("k", Duration::ZERO).await.expect("Lock should not fail."));
		assert!(!lock.lock("k", Duration::milliseconds(20)).await.expect("Lock should not fail."));

		let waiter = {
			let lock = lock.clone();

			tokio::spawn(async move { lock.lock("k", Duration::seconds(5)).await })
		};

		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		lock.unlock("k");

		assert!(
			waiter.await.expect("Waiter should not panic.").expect("Lock should not fail."),
			"Waiter should acquire the key after release."
		);
		assert!(lock.is_locked("k"));

		lock.unlock("k");

		assert!(!lock.is_locked("k"));
		assert_eq!(lock.tracked_keys(), 0, "Idle keys should be pruned.");
	}

	#[tokio::test]
	async fn expired_lease_is_reclaimed() {
		let lock = MemoryLock::with_lease(Duration::milliseconds(30));

		assert!(lock.lock("k", Duration::ZERO).await.expect("Lock should not fail."));
		assert!(
			lock.lock("k", Duration::seconds(2)).await.expect("Lock should not fail."),
			"A waiter should reclaim the key once the lease runs out."
		);

		// The reclaimed holder's late release settles its debt without freeing the new holder.
		lock.unlock("k");

		assert!(lock.is_locked("k"));

		lock.unlock("k");

		assert!(!lock.is_locked("k"));
		assert_eq!(lock.tracked_keys(), 0);
	}

	#[tokio::test]
	async fn timed_out_waiters_leave_no_bookkeeping() {
		let lock = MemoryLock::without_lease();

		assert!(lock.lock("a", Duration::ZERO).await.expect("Lock should not fail."));
		assert!(!lock.lock("a", Duration::milliseconds(10)).await.expect("Lock should not fail."));
		assert!(lock.lock("b", Duration::ZERO).await.expect("Lock should not fail."));

		lock.unlock("a");
		lock.unlock("b");

		assert_eq!(lock.tracked_keys(), 0);
	}

	#[cfg(debug_assertions)]
	#[test]
	#[should_panic(expected = "that is not held")]
	fn unlock_without_lock_panics_in_debug() {
		MemoryLock::default().unlock("never-locked");
	}

	#[cfg(debug_assertions)]
	#[tokio::test]
	#[should_panic(expected = "that is not held")]
	async fn double_unlock_panics_in_debug() {
		let lock = MemoryLock::default();

		assert!(lock.lock("k", Duration::ZERO).await.expect("Lock should not fail."));

		lock.unlock("k");
		lock.unlock("k");
	}
}
