//! Subject activity checks supplied by the host's account service.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, Subject, SubjectId},
};

/// Boxed future returned by [`ProfileService`] operations.
pub type ProfileFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProfileError>> + 'a + Send>>;

/// Failure raised by a profile backend.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProfileError {
	/// The account service could not answer.
	#[error("Profile backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Call site asking whether a subject is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProfileCaller {
	/// Device code redemption at the token endpoint.
	DeviceCodeValidation,
}
impl ProfileCaller {
	/// Stable label for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProfileCaller::DeviceCodeValidation => "device_code_validation",
		}
	}
}

/// Input to [`ProfileService::is_active`].
#[derive(Clone, Copy, Debug)]
pub struct IsActiveContext<'a> {
	/// Subject whose account is checked.
	pub subject: &'a Subject,
	/// Client the tokens would be issued to.
	pub client_id: &'a ClientId,
	/// Which engine step is asking.
	pub caller: ProfileCaller,
}

/// Account service deciding whether a subject may still receive tokens.
pub trait ProfileService
where
	Self: Send + Sync,
{
	/// Resolves to `true` when the subject's account is enabled.
	fn is_active<'a>(&'a self, context: IsActiveContext<'a>) -> ProfileFuture<'a, bool>;
}

/// Profile service that treats every subject as active unless explicitly disabled.
#[derive(Clone, Debug, Default)]
pub struct MemoryProfileService(Arc<RwLock<HashSet<SubjectId>>>);
impl MemoryProfileService {
	/// Marks a subject as inactive.
	pub fn disable(&self, subject: SubjectId) {
		self.0.write().insert(subject);
	}

	/// Re-enables a previously disabled subject.
	pub fn enable(&self, subject: &SubjectId) {
		self.0.write().remove(subject);
	}
}
impl ProfileService for MemoryProfileService {
	fn is_active<'a>(&'a self, context: IsActiveContext<'a>) -> ProfileFuture<'a, bool> {
		Box::pin(async move { Ok(!self.0.read().contains(&context.subject.id)) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn disabled_subjects_are_inactive() {
		let service = MemoryProfileService::default();
		let bob = Subject::new(SubjectId::new("bob").expect("Subject fixture should be valid."));
		let client = ClientId::new("device_flow").expect("Client fixture should be valid.");
		let context =
			IsActiveContext { subject: &bob, client_id: &client, caller: ProfileCaller::DeviceCodeValidation };

		assert!(service.is_active(context).await.expect("Lookup should succeed."));

		service.disable(bob.id.clone());

		assert!(!service.is_active(context).await.expect("Lookup should succeed."));

		service.enable(&bob.id);

		assert!(service.is_active(context).await.expect("Lookup should succeed."));
	}
}
