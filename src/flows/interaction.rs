//! User-facing approval step: look up a user code and record the user's decision.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, UserCode},
	flows::{DeviceFlow, record_result},
	lock::{self, LockGuard},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{Consent, UserSession},
};

/// What the verification page shows before the user decides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationContext {
	/// Normalized user code.
	pub user_code: UserCode,
	/// Client asking for access.
	pub client_id: ClientId,
	/// Scopes the client asked for.
	pub requested_scopes: ScopeSet,
	/// Whether `openid` was requested.
	pub is_open_id: bool,
	/// When the user code stops working.
	pub expires_at: OffsetDateTime,
}

/// The user's decision on the verification page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsentResponse {
	/// Scopes the user ticked; anything not requested is ignored.
	pub scopes: ScopeSet,
	/// Remember the grant for later flows of the same client.
	pub remember_consent: bool,
	/// Optional device label shown in the user's grant list.
	pub description: Option<String>,
}
impl ConsentResponse {
	/// Grants the provided scopes.
	pub fn grant(scopes: ScopeSet) -> Self {
		Self { scopes, ..Default::default() }
	}

	/// Denies every scope.
	pub fn deny() -> Self {
		Self::default()
	}

	/// Asks for the grant to be remembered.
	pub fn remembered(mut self) -> Self {
		self.remember_consent = true;

		self
	}

	/// Attaches a device description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());

		self
	}
}

/// Result of [`DeviceFlow::handle_consent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionOutcome {
	/// The device will receive tokens for these scopes.
	Authorized {
		/// Scopes recorded on the device authorization.
		scopes: ScopeSet,
	},
	/// The user declined; the device will see `access_denied`.
	Denied,
}

impl DeviceFlow {
	/// Context for rendering the verification page at the current UTC instant.
	pub async fn authorization_context(
		&self,
		user_code: &UserCode,
	) -> Result<Option<AuthorizationContext>> {
		self.authorization_context_at(user_code, OffsetDateTime::now_utc()).await
	}

	/// Returns `Some` only for live records that are still waiting for a decision.
	pub async fn authorization_context_at(
		&self,
		user_code: &UserCode,
		now: OffsetDateTime,
	) -> Result<Option<AuthorizationContext>> {
		let Some(record) = self.store.find_by_user_code(user_code).await? else {
			return Ok(None);
		};

		if record.is_authorized || record.is_expired_at(now) {
			return Ok(None);
		}

		Ok(Some(AuthorizationContext {
			expires_at: record.expires_at(),
			user_code: record.user_code,
			client_id: record.client_id,
			requested_scopes: record.requested_scopes,
			is_open_id: record.is_open_id,
		}))
	}

	/// Records the signed-in user's decision at the current UTC instant.
	pub async fn handle_consent(
		&self,
		user_code: &UserCode,
		session: &dyn UserSession,
		response: ConsentResponse,
	) -> Result<InteractionOutcome> {
		self.handle_consent_at(user_code, session, response, OffsetDateTime::now_utc()).await
	}

	/// Records the signed-in user's decision as of `now`.
	///
	/// The authorization is written in one update while holding the device code lock, so pollers
	/// see either the pending record or the complete decision. Consent is remembered and the
	/// client is added to the session only after the lock is released.
	pub async fn handle_consent_at(
		&self,
		user_code: &UserCode,
		session: &dyn UserSession,
		response: ConsentResponse,
		now: OffsetDateTime,
	) -> Result<InteractionOutcome> {
		const KIND: FlowKind = FlowKind::Approval;

		let span = FlowSpan::new(KIND, "handle_consent");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.decide(user_code, session, response, now)).await;

		record_result(KIND, &span, &result);

		result
	}

	async fn decide(
		&self,
		user_code: &UserCode,
		session: &dyn UserSession,
		response: ConsentResponse,
		now: OffsetDateTime,
	) -> Result<InteractionOutcome> {
		let subject = session.user().await?.ok_or(Error::NoAuthenticatedUser)?;
		let session_id = session.session_id().await?;
		let pending =
			self.store.find_by_user_code(user_code).await?.ok_or(Error::InvalidUserCode)?;
		let guard = LockGuard::acquire(
			self.lock.clone(),
			lock::device_code_key(&pending.device_code),
			self.options.lock_timeout,
		)
		.await?;
		let mut record =
			self.store.find_by_user_code(user_code).await?.ok_or(Error::InvalidUserCode)?;

		if record.is_expired_at(now) {
			return Err(Error::ExpiredUserCode);
		}

		let granted = response.scopes.intersection(&record.requested_scopes);

		record.mark_authorized(
			subject.clone(),
			granted.clone(),
			session_id.clone(),
			response.description,
		)?;

		if !self.store.update_by_user_code(user_code, record.clone()).await? {
			return Err(Error::InvalidUserCode);
		}

		drop(guard);

		if granted.is_empty() {
			self.metrics.record_denial();

			#[cfg(feature = "tracing")]
			tracing::debug!(client_id = %record.client_id, subject = %subject.id, "User denied device.");

			return Ok(InteractionOutcome::Denied);
		}
		if response.remember_consent {
			self.consents
				.store_user_consent(Consent {
					subject_id: subject.id.clone(),
					client_id: record.client_id.clone(),
					scopes: granted.clone(),
					creation_time: now,
					expiration: None,
				})
				.await?;
		}
		if session_id.is_some() {
			session.add_client_id(&record.client_id).await?;
		}

		self.metrics.record_approval();

		#[cfg(feature = "tracing")]
		tracing::debug!(client_id = %record.client_id, subject = %subject.id, "User approved device.");

		Ok(InteractionOutcome::Authorized { scopes: granted })
	}
}
