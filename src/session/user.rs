//! Signed-in user session contract.

// crates.io
use rand::RngCore;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, SessionId, Subject},
	session::{SessionError, SessionFuture},
};

/// Session of the user completing the approval step on the secondary device.
pub trait UserSession
where
	Self: Send + Sync,
{
	/// Signs `subject` in and issues a fresh session id.
	fn create_session_id<'a>(&'a self, subject: &'a Subject) -> SessionFuture<'a, SessionId>;

	/// Signed-in user, if any.
	fn user(&self) -> SessionFuture<'_, Option<Subject>>;

	/// Current session id, if any.
	fn session_id(&self) -> SessionFuture<'_, Option<SessionId>>;

	/// Records that `client_id` received tokens within this session.
	fn add_client_id<'a>(&'a self, client_id: &'a ClientId) -> SessionFuture<'a, ()>;

	/// Clients recorded for this session, in insertion order.
	fn client_list(&self) -> SessionFuture<'_, Vec<ClientId>>;
}

#[derive(Debug, Default)]
struct SessionState {
	user: Option<Subject>,
	session_id: Option<SessionId>,
	clients: Vec<ClientId>,
}

/// In-process [`UserSession`] for tests and embedded hosts.
#[derive(Clone, Debug, Default)]
pub struct MemorySession(Arc<Mutex<SessionState>>);
impl MemorySession {
	/// Creates a session already signed in as `subject`.
	pub fn signed_in(subject: Subject) -> Self {
		let session = Self::default();

		session.0.lock().user = Some(subject);

		session
	}

	/// Signs the user out and clears the session id and client list.
	pub fn sign_out(&self) {
		*self.0.lock() = SessionState::default();
	}
}
impl UserSession for MemorySession {
	fn create_session_id<'a>(&'a self, subject: &'a Subject) -> SessionFuture<'a, SessionId> {
		Box::pin(async move {
			let mut bytes = [0_u8; 16];

			rand::rng().fill_bytes(&mut bytes);

			let encoded = bytes.iter().map(|byte| format!("{byte:02X}")).collect::<String>();
			let id = SessionId::new(encoded)
				.map_err(|e| SessionError::Backend { message: e.to_string() })?;
			let mut state = self.0.lock();

			state.user = Some(subject.clone());
			state.session_id = Some(id.clone());
			state.clients.clear();

			Ok(id)
		})
	}

	fn user(&self) -> SessionFuture<'_, Option<Subject>> {
		Box::pin(async move { Ok(self.0.lock().user.clone()) })
	}

	fn session_id(&self) -> SessionFuture<'_, Option<SessionId>> {
		Box::pin(async move { Ok(self.0.lock().session_id.clone()) })
	}

	fn add_client_id<'a>(&'a self, client_id: &'a ClientId) -> SessionFuture<'a, ()> {
		Box::pin(async move {
			let mut state = self.0.lock();

			if state.session_id.is_none() {
				return Err(SessionError::MissingSessionId);
			}
			if !state.clients.contains(client_id) {
				state.clients.push(client_id.clone());
			}

			Ok(())
		})
	}

	fn client_list(&self) -> SessionFuture<'_, Vec<ClientId>> {
		Box::pin(async move { Ok(self.0.lock().clients.clone()) })
	}
}
