//! Host-supplied session and consent collaborators used by the approval step.

pub mod consent;
pub mod user;

pub use consent::*;
pub use user::*;

// self
use crate::_prelude::*;

/// Boxed future returned by session and consent operations.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + 'a + Send>>;

/// Failure raised by a session or consent backend.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SessionError {
	/// The backend could not complete the operation.
	#[error("Session backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The session has no session id yet.
	#[error("Session has no session id.")]
	MissingSessionId,
}
