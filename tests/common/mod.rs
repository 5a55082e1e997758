#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};
// crates.io
use time::{Duration, OffsetDateTime, macros::datetime};
// self
use oauth2_device_flow::{
	auth::{ClientId, DeviceCodeHandle, ScopeSet, Subject, SubjectId, UserCode},
	client::{Client, MemoryClientStore},
	device::{DeviceAuthorization, DeviceFlowOptions},
	flows::DeviceFlow,
	lock::MemoryLock,
	profile::MemoryProfileService,
	session::MemoryConsentStore,
	store::{CreateOutcome, DeviceCodeStore, MemoryStore, StoreError, StoreFuture},
	throttle::{ThrottleFuture, ThrottlingPolicy},
	url::Url,
};

pub const NOW: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);
pub const DEVICE_CLIENT: &str = "device_flow";

pub fn client_id(id: &str) -> ClientId {
	ClientId::new(id).expect("Client identifier fixture should be valid.")
}

pub fn subject(id: &str) -> Subject {
	Subject::new(SubjectId::new(id).expect("Subject identifier fixture should be valid."))
}

pub fn scopes(values: &[&str]) -> ScopeSet {
	ScopeSet::new(values.iter().copied()).expect("Scope fixture should be valid.")
}

/// Pending record for `device_flow` created at `created`, living five minutes.
pub fn pending_record(
	device_code: &str,
	user_code: &str,
	created: OffsetDateTime,
) -> DeviceAuthorization {
	DeviceAuthorization::builder(
		DeviceCodeHandle::new(device_code),
		UserCode::new(user_code),
		client_id(DEVICE_CLIENT),
	)
	.requested_scopes(scopes(&["openid", "profile", "resource"]))
	.created_at(created)
	.lifetime(Duration::seconds(300))
	.build()
	.expect("Pending record fixture should build.")
}

/// Record approved by `bob` with the provided scopes.
pub fn approved_record(
	device_code: &str,
	user_code: &str,
	created: OffsetDateTime,
	granted: &[&str],
) -> DeviceAuthorization {
	let mut record = pending_record(device_code, user_code, created);

	record
		.mark_authorized(subject("bob"), scopes(granted), None, None)
		.expect("Pending record fixture should accept approval.");

	record
}

/// Throttle whose answer is set by the test; counts every consultation.
#[derive(Debug, Default)]
pub struct ScriptedThrottle {
	slow_down: AtomicBool,
	calls: AtomicUsize,
}
impl ScriptedThrottle {
	pub fn set_slow_down(&self, value: bool) {
		self.slow_down.store(value, Ordering::SeqCst);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl ThrottlingPolicy for ScriptedThrottle {
	fn should_slow_down<'a>(
		&'a self,
		_device_code: &'a DeviceCodeHandle,
		_record: &'a DeviceAuthorization,
		_now: OffsetDateTime,
	) -> ThrottleFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let slow_down = self.slow_down.load(Ordering::SeqCst);

		Box::pin(async move { Ok(slow_down) })
	}
}

/// Store whose every call fails, for infrastructure error paths.
#[derive(Debug, Default)]
pub struct UnreachableStore;
impl UnreachableStore {
	fn fail<'a, T: Send + 'a>() -> StoreFuture<'a, T> {
		Box::pin(async { Err(StoreError::Backend { message: "store unreachable".into() }) })
	}
}
impl DeviceCodeStore for UnreachableStore {
	fn create(&self, _record: DeviceAuthorization) -> StoreFuture<'_, CreateOutcome> {
		Self::fail()
	}

	fn find_by_device_code<'a>(
		&'a self,
		_device_code: &'a DeviceCodeHandle,
	) -> StoreFuture<'a, Option<DeviceAuthorization>> {
		Self::fail()
	}

	fn find_by_user_code<'a>(
		&'a self,
		_user_code: &'a UserCode,
	) -> StoreFuture<'a, Option<DeviceAuthorization>> {
		Self::fail()
	}

	fn update_by_user_code<'a>(
		&'a self,
		_user_code: &'a UserCode,
		_record: DeviceAuthorization,
	) -> StoreFuture<'a, bool> {
		Self::fail()
	}

	fn remove_by_device_code<'a>(
		&'a self,
		_device_code: &'a DeviceCodeHandle,
	) -> StoreFuture<'a, Option<DeviceAuthorization>> {
		Self::fail()
	}

	fn remove_expired(&self, _now: OffsetDateTime) -> StoreFuture<'_, usize> {
		Self::fail()
	}
}

/// Fully wired in-memory flow plus handles to its collaborators.
pub struct Harness {
	pub flow: DeviceFlow,
	pub store: MemoryStore,
	pub clients: MemoryClientStore,
	pub lock: Arc<MemoryLock>,
	pub profile: MemoryProfileService,
	pub consents: MemoryConsentStore,
}

pub fn options() -> DeviceFlowOptions {
	DeviceFlowOptions::builder()
		.verification_uri(
			Url::parse("https://id.example.com/device").expect("Verification URI should parse."),
		)
		.lock_timeout(Duration::milliseconds(200))
		.build()
		.expect("Option fixture should validate.")
}

pub fn harness() -> Harness {
	harness_with(options())
}

pub fn harness_with(options: DeviceFlowOptions) -> Harness {
	let store = MemoryStore::default();
	let clients = MemoryClientStore::with_clients([
		Client::new(client_id(DEVICE_CLIENT), scopes(&["openid", "profile", "resource"])),
		Client::new(client_id("retired"), scopes(&["openid"])).with_enabled(false),
	]);
	let lock = Arc::new(MemoryLock::default());
	let profile = MemoryProfileService::default();
	let consents = MemoryConsentStore::default();
	let flow = DeviceFlow::new(
		Arc::new(store.clone()),
		Arc::new(clients.clone()),
		lock.clone(),
		Arc::new(profile.clone()),
		options,
	)
	.with_consent_store(Arc::new(consents.clone()));

	Harness { flow, store, clients, lock, profile, consents }
}
