//! Storage contract and built-in store implementations for device authorizations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{DeviceCodeHandle, UserCode},
	device::DeviceAuthorization,
};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Keyed persistence for device authorizations.
///
/// Records are reachable by device code (polling, redemption) and by user code (approval). The
/// two keyspaces are independent and both must stay unique while a record is live.
pub trait DeviceCodeStore
where
	Self: Send + Sync,
{
	/// Persists a new record unless its device code or user code is already taken.
	fn create(&self, record: DeviceAuthorization) -> StoreFuture<'_, CreateOutcome>;

	/// Fetches the record behind a device code.
	fn find_by_device_code<'a>(
		&'a self,
		device_code: &'a DeviceCodeHandle,
	) -> StoreFuture<'a, Option<DeviceAuthorization>>;

	/// Fetches the record behind a user code.
	fn find_by_user_code<'a>(
		&'a self,
		user_code: &'a UserCode,
	) -> StoreFuture<'a, Option<DeviceAuthorization>>;

	/// Replaces the record behind a user code in one write; returns `false` if it is gone.
	fn update_by_user_code<'a>(
		&'a self,
		user_code: &'a UserCode,
		record: DeviceAuthorization,
	) -> StoreFuture<'a, bool>;

	/// Removes and returns the record behind a device code; at most one caller receives it.
	fn remove_by_device_code<'a>(
		&'a self,
		device_code: &'a DeviceCodeHandle,
	) -> StoreFuture<'a, Option<DeviceAuthorization>>;

	/// Deletes every record expired at `now`, returning how many were removed.
	fn remove_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize>;
}

/// Result of [`DeviceCodeStore::create`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateOutcome {
	/// The record was stored.
	Created,
	/// Another live record already uses the device code.
	DeviceCodeConflict,
	/// Another live record already uses the user code.
	UserCodeConflict,
}

/// Error type produced by [`DeviceCodeStore`] implementations and other keyed backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Index shared by the built-in stores: records by device code fingerprint, user codes to
/// fingerprints.
#[derive(Clone, Debug, Default)]
pub(crate) struct DeviceIndex {
	by_device_code: HashMap<String, DeviceAuthorization>,
	by_user_code: HashMap<UserCode, String>,
}
impl DeviceIndex {
	pub(crate) fn from_records(records: Vec<DeviceAuthorization>) -> Self {
		let mut index = Self::default();

		for record in records {
			index.create(record);
		}

		index
	}

	pub(crate) fn records(&self) -> Vec<&DeviceAuthorization> {
		self.by_device_code.values().collect()
	}

	pub(crate) fn create(&mut self, record: DeviceAuthorization) -> CreateOutcome {
		let fingerprint = record.device_code.fingerprint();

		if self.by_device_code.contains_key(&fingerprint) {
			return CreateOutcome::DeviceCodeConflict;
		}
		if self.by_user_code.contains_key(&record.user_code) {
			return CreateOutcome::UserCodeConflict;
		}

		self.by_user_code.insert(record.user_code.clone(), fingerprint.clone());
		self.by_device_code.insert(fingerprint, record);

		CreateOutcome::Created
	}

	pub(crate) fn find_by_device_code(
		&self,
		device_code: &DeviceCodeHandle,
	) -> Option<DeviceAuthorization> {
		self.by_device_code.get(&device_code.fingerprint()).cloned()
	}

	pub(crate) fn find_by_user_code(&self, user_code: &UserCode) -> Option<DeviceAuthorization> {
		self.by_user_code.get(user_code).and_then(|fp| self.by_device_code.get(fp)).cloned()
	}

	pub(crate) fn update_by_user_code(
		&mut self,
		user_code: &UserCode,
		record: DeviceAuthorization,
	) -> bool {
		let Some(fingerprint) = self.by_user_code.get(user_code) else {
			return false;
		};

		match self.by_device_code.get_mut(fingerprint) {
			Some(slot) => {
				*slot = record;

				true
			},
			None => false,
		}
	}

	pub(crate) fn remove_by_device_code(
		&mut self,
		device_code: &DeviceCodeHandle,
	) -> Option<DeviceAuthorization> {
		let removed = self.by_device_code.remove(&device_code.fingerprint())?;

		self.by_user_code.remove(&removed.user_code);

		Some(removed)
	}

	pub(crate) fn remove_expired(&mut self, now: OffsetDateTime) -> usize {
		let before = self.by_device_code.len();
		let by_user_code = &mut self.by_user_code;

		self.by_device_code.retain(|_, record| {
			let keep = !record.is_expired_at(now);

			if !keep {
				by_user_code.remove(&record.user_code);
			}

			keep
		});

		before - self.by_device_code.len()
	}
}
