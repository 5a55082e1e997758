//! Keyed, timeout-bounded advisory locks used to serialize device code mutations.
//!
//! Locks are per key: holders of different keys never contend. [`ConcurrencyLock::lock`] always
//! resolves to a definite `true`/`false` within its timeout; [`LockGuard`] pairs every successful
//! acquisition with exactly one release, including when the owning future is dropped.

pub mod memory;

pub use memory::MemoryLock;

// self
use crate::_prelude::*;

/// Boxed future returned by [`ConcurrencyLock::lock`].
pub type LockFuture<'a> = Pin<Box<dyn Future<Output = Result<bool, LockError>> + 'a + Send>>;

/// Advisory mutual exclusion keyed by string.
pub trait ConcurrencyLock
where
	Self: Send + Sync,
{
	/// Tries to take exclusive ownership of `key`, giving up after `timeout`.
	///
	/// Resolves to `Ok(false)` when the timeout elapses first; `Err` is reserved for backend
	/// failures.
	fn lock<'a>(&'a self, key: &'a str, timeout: Duration) -> LockFuture<'a>;

	/// Releases ownership of `key`.
	///
	/// Releasing a key that is not held is a programming error: implementations panic in debug
	/// builds and log in release builds.
	fn unlock(&self, key: &str);
}

/// Failures raised while acquiring a lock.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LockError {
	/// The key stayed held for the whole timeout.
	#[error("Timed out after {timeout} waiting for lock `{key}`.")]
	Timeout {
		/// Key that could not be acquired.
		key: String,
		/// Timeout that elapsed.
		timeout: Duration,
	},
	/// The lock backend failed.
	#[error("Lock backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// RAII handle for a held key; dropping it calls [`ConcurrencyLock::unlock`] once.
pub struct LockGuard {
	lock: Arc<dyn ConcurrencyLock>,
	key: String,
}
impl LockGuard {
	/// Acquires `key` on `lock`, mapping a timeout to [`LockError::Timeout`].
	pub async fn acquire(
		lock: Arc<dyn ConcurrencyLock>,
		key: impl Into<String>,
		timeout: Duration,
	) -> Result<Self, LockError> {
		let key = key.into();

		if lock.lock(&key, timeout).await? {
			Ok(Self { lock, key })
		} else {
			Err(LockError::Timeout { key, timeout })
		}
	}

	/// Key held by this guard.
	pub fn key(&self) -> &str {
		&self.key
	}
}
impl Drop for LockGuard {
	fn drop(&mut self) {
		self.lock.unlock(&self.key);
	}
}
impl Debug for LockGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LockGuard").field("key", &self.key).finish()
	}
}

/// Lock key for mutations of one device authorization.
pub fn device_code_key(device_code: &crate::auth::DeviceCodeHandle) -> String {
	format!("device_code:{}", device_code.fingerprint())
}
