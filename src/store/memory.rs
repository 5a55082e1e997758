//! Thread-safe in-memory [`DeviceCodeStore`] implementation for single-node servers and tests.

// self
use crate::{
	_prelude::*,
	auth::{DeviceCodeHandle, UserCode},
	device::DeviceAuthorization,
	store::{CreateOutcome, DeviceCodeStore, DeviceIndex, StoreFuture},
};

type StoreMap = Arc<RwLock<DeviceIndex>>;

/// Thread-safe storage backend that keeps device authorizations in-process.
///
/// Every operation runs under one write or read lock, so the approval write and the redemption
/// removal are each atomic with respect to concurrent pollers.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of records currently held, expired ones included.
	pub fn len(&self) -> usize {
		self.0.read().records().len()
	}

	/// Returns true when the store holds no records.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn update_now(map: StoreMap, user_code: UserCode, record: DeviceAuthorization) -> bool {
		map.write().update_by_user_code(&user_code, record)
	}

	fn remove_now(map: StoreMap, device_code: DeviceCodeHandle) -> Option<DeviceAuthorization> {
		map.write().remove_by_device_code(&device_code)
	}
}
impl DeviceCodeStore for MemoryStore {
	fn create(&self, record: DeviceAuthorization) -> StoreFuture<'_, CreateOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().create(record)) })
	}

	fn find_by_device_code<'a>(
		&'a self,
		device_code: &'a DeviceCodeHandle,
	) -> StoreFuture<'a, Option<DeviceAuthorization>> {
		let map = self.0.clone();
		let device_code = device_code.to_owned();

		Box::pin(async move { Ok(map.read().find_by_device_code(&device_code)) })
	}

	fn find_by_user_code<'a>(
		&'a self,
		user_code: &'a UserCode,
	) -> StoreFuture<'a, Option<DeviceAuthorization>> {
		let map = self.0.clone();
		let user_code = user_code.to_owned();

		Box::pin(async move { Ok(map.read().find_by_user_code(&user_code)) })
	}

	fn update_by_user_code<'a>(
		&'a self,
		user_code: &'a UserCode,
		record: DeviceAuthorization,
	) -> StoreFuture<'a, bool> {
		let map = self.0.clone();
		let user_code = user_code.to_owned();

		Box::pin(async move { Ok(Self::update_now(map, user_code, record)) })
	}

	fn remove_by_device_code<'a>(
		&'a self,
		device_code: &'a DeviceCodeHandle,
	) -> StoreFuture<'a, Option<DeviceAuthorization>> {
		let map = self.0.clone();
		let device_code = device_code.to_owned();

		Box::pin(async move { Ok(Self::remove_now(map, device_code)) })
	}

	fn remove_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove_expired(now)) })
	}
}
