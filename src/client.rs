//! Client registry contract consulted when a device flow is started.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet},
	store::{StoreError, StoreFuture},
};

/// Registered OAuth client as seen by the device flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
	/// Client identifier.
	pub client_id: ClientId,
	/// Disabled clients cannot start new device flows.
	pub enabled: bool,
	/// Scopes the client may request.
	pub allowed_scopes: ScopeSet,
	/// Overrides the engine-wide device code lifetime.
	pub device_code_lifetime: Option<Duration>,
	/// Overrides the engine-wide minimum polling interval.
	pub polling_interval: Option<Duration>,
}
impl Client {
	/// Creates an enabled client allowed to request the provided scopes.
	pub fn new(client_id: ClientId, allowed_scopes: ScopeSet) -> Self {
		Self {
			client_id,
			enabled: true,
			allowed_scopes,
			device_code_lifetime: None,
			polling_interval: None,
		}
	}

	/// Overrides the device code lifetime for this client.
	pub fn with_device_code_lifetime(mut self, lifetime: Duration) -> Self {
		self.device_code_lifetime = Some(lifetime);

		self
	}

	/// Overrides the polling interval for this client.
	pub fn with_polling_interval(mut self, interval: Duration) -> Self {
		self.polling_interval = Some(interval);

		self
	}

	/// Toggles whether the client is enabled.
	pub fn with_enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;

		self
	}
}

/// Lookup contract for registered clients.
pub trait ClientStore
where
	Self: Send + Sync,
{
	/// Returns the client registered under `client_id`, if any.
	fn find_client<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, Option<Client>>;
}

/// In-process client registry for tests and single-node deployments.
#[derive(Clone, Debug, Default)]
pub struct MemoryClientStore(Arc<RwLock<HashMap<ClientId, Client>>>);
impl MemoryClientStore {
	/// Builds a registry seeded with the provided clients.
	pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
		let map = clients.into_iter().map(|client| (client.client_id.clone(), client)).collect();

		Self(Arc::new(RwLock::new(map)))
	}

	/// Registers or replaces a client.
	pub fn insert(&self, client: Client) {
		self.0.write().insert(client.client_id.clone(), client);
	}
}
impl ClientStore for MemoryClientStore {
	fn find_client<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, Option<Client>> {
		let found = self.0.read().get(client_id).cloned();

		Box::pin(async move { Ok::<_, StoreError>(found) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn registry_returns_registered_clients_only() {
		let id = ClientId::new("device_flow").expect("Client fixture should be valid.");
		let scopes = ScopeSet::new(["openid", "profile"]).expect("Scope fixture should be valid.");
		let store = MemoryClientStore::with_clients([
			Client::new(id.clone(), scopes).with_polling_interval(Duration::seconds(10))
		]);
		let found = store
			.find_client(&id)
			.await
			.expect("Lookup should not fail.")
			.expect("Registered client should be found.");

		assert_eq!(found.polling_interval, Some(Duration::seconds(10)));

		let missing = ClientId::new("codeclient").expect("Client fixture should be valid.");

		assert!(store.find_client(&missing).await.expect("Lookup should not fail.").is_none());
	}
}
