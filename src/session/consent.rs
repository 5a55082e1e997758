//! Remembered user consent, keyed by subject and client.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, SubjectId},
	session::SessionFuture,
};

/// Scopes a user agreed to grant a client, remembered across flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
	/// User who consented.
	pub subject_id: SubjectId,
	/// Client the consent applies to.
	pub client_id: ClientId,
	/// Granted scopes.
	pub scopes: ScopeSet,
	/// When the consent was given.
	pub creation_time: OffsetDateTime,
	/// When the consent lapses; `None` keeps it until removed.
	pub expiration: Option<OffsetDateTime>,
}
impl Consent {
	/// Returns `true` when the consent has lapsed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expiration.is_some_and(|expiration| instant >= expiration)
	}
}

/// Persistence for remembered consent.
pub trait UserConsentStore
where
	Self: Send + Sync,
{
	/// Stores or replaces the consent for its `(subject_id, client_id)` pair.
	fn store_user_consent(&self, consent: Consent) -> SessionFuture<'_, ()>;

	/// Fetches the consent for a subject and client.
	fn user_consent<'a>(
		&'a self,
		subject_id: &'a SubjectId,
		client_id: &'a ClientId,
	) -> SessionFuture<'a, Option<Consent>>;

	/// Forgets the consent for a subject and client.
	fn remove_user_consent<'a>(
		&'a self,
		subject_id: &'a SubjectId,
		client_id: &'a ClientId,
	) -> SessionFuture<'a, ()>;
}

type ConsentKey = (SubjectId, ClientId);

/// In-process [`UserConsentStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryConsentStore(Arc<RwLock<HashMap<ConsentKey, Consent>>>);
impl MemoryConsentStore {
	/// Number of remembered consents.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when nothing is remembered.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl UserConsentStore for MemoryConsentStore {
	fn store_user_consent(&self, consent: Consent) -> SessionFuture<'_, ()> {
		Box::pin(async move {
			let key = (consent.subject_id.clone(), consent.client_id.clone());

			self.0.write().insert(key, consent);

			Ok(())
		})
	}

	fn user_consent<'a>(
		&'a self,
		subject_id: &'a SubjectId,
		client_id: &'a ClientId,
	) -> SessionFuture<'a, Option<Consent>> {
		Box::pin(async move {
			Ok(self.0.read().get(&(subject_id.clone(), client_id.clone())).cloned())
		})
	}

	fn remove_user_consent<'a>(
		&'a self,
		subject_id: &'a SubjectId,
		client_id: &'a ClientId,
	) -> SessionFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().remove(&(subject_id.clone(), client_id.clone()));

			Ok(())
		})
	}
}
