//! Authenticated end-user identity attached to an approved device authorization.

// self
use crate::{_prelude::*, auth::SubjectId};

/// Identity of the user who approved a device, plus the authentication facts token issuance needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
	/// Stable subject identifier (`sub`).
	pub id: SubjectId,
	/// Instant the user authenticated, if known.
	pub auth_time: Option<OffsetDateTime>,
	/// Authentication method references (`amr`), e.g. `pwd` or `hwk`.
	#[serde(default)]
	pub amr: Vec<String>,
	/// Authentication context class reference (`acr`).
	pub acr: Option<String>,
	/// Identity provider that authenticated the user.
	pub idp: Option<String>,
}
impl Subject {
	/// Creates a subject with no authentication metadata.
	pub fn new(id: SubjectId) -> Self {
		Self { id, auth_time: None, amr: Vec::new(), acr: None, idp: None }
	}

	/// Records the authentication instant.
	pub fn with_auth_time(mut self, instant: OffsetDateTime) -> Self {
		self.auth_time = Some(instant);

		self
	}

	/// Appends an authentication method reference.
	pub fn with_amr(mut self, method: impl Into<String>) -> Self {
		self.amr.push(method.into());

		self
	}

	/// Sets the authentication context class reference.
	pub fn with_acr(mut self, acr: impl Into<String>) -> Self {
		self.acr = Some(acr.into());

		self
	}

	/// Sets the identity provider.
	pub fn with_idp(mut self, idp: impl Into<String>) -> Self {
		self.idp = Some(idp.into());

		self
	}
}
