//! File-backed [`DeviceCodeStore`] for single-process deployments that must survive restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{DeviceCodeHandle, UserCode},
	device::DeviceAuthorization,
	store::{CreateOutcome, DeviceCodeStore, DeviceIndex, StoreError, StoreFuture},
};

/// Persists device authorizations to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<DeviceIndex>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { Vec::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(DeviceIndex::from_records(snapshot))) })
	}

	fn load_snapshot(path: &Path) -> Result<Vec<DeviceAuthorization>, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(Vec::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			StoreError::Serialization {
				message: format!(
					"Failed to parse {} at `{}`: {}",
					path.display(),
					e.path(),
					e.inner()
				),
			}
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &DeviceIndex) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(&contents.records()).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	/// Applies `apply` to a staged copy of the index and publishes it only once the snapshot is
	/// on disk. Readers never observe a change the file does not hold.
	fn commit<T>(
		&self,
		apply: impl FnOnce(&mut DeviceIndex) -> T,
		changed: impl FnOnce(&T) -> bool,
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let mut staged = guard.clone();
		let outcome = apply(&mut staged);

		if changed(&outcome) {
			self.persist_locked(&staged)?;

			*guard = staged;
		}

		Ok(outcome)
	}
}
impl DeviceCodeStore for FileStore {
	fn create(&self, record: DeviceAuthorization) -> StoreFuture<'_, CreateOutcome> {
		Box::pin(async move {
			self.commit(|index| index.create(record), |outcome| *outcome == CreateOutcome::Created)
		})
	}

	fn find_by_device_code<'a>(
		&'a self,
		device_code: &'a DeviceCodeHandle,
	) -> StoreFuture<'a, Option<DeviceAuthorization>> {
		Box::pin(async move { Ok(self.inner.read().find_by_device_code(device_code)) })
	}

	fn find_by_user_code<'a>(
		&'a self,
		user_code: &'a UserCode,
	) -> StoreFuture<'a, Option<DeviceAuthorization>> {
		Box::pin(async move { Ok(self.inner.read().find_by_user_code(user_code)) })
	}

	fn update_by_user_code<'a>(
		&'a self,
		user_code: &'a UserCode,
		record: DeviceAuthorization,
	) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			self.commit(|index| index.update_by_user_code(user_code, record), |updated| *updated)
		})
	}

	fn remove_by_device_code<'a>(
		&'a self,
		device_code: &'a DeviceCodeHandle,
	) -> StoreFuture<'a, Option<DeviceAuthorization>> {
		Box::pin(async move {
			self.commit(|index| index.remove_by_device_code(device_code), Option::is_some)
		})
	}

	fn remove_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			self.commit(|index| index.remove_expired(now), |removed| *removed > 0)
		})
	}
}
