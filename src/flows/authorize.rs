//! Device authorization endpoint: issue a device code and user code pair.

// crates.io
use serde::Serializer;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, DeviceCodeHandle, ScopeSet},
	device::{self, DeviceAuthorization},
	error::ConfigError,
	flows::{DeviceFlow, record_result},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::CreateOutcome,
};

/// Request received at the device authorization endpoint.
#[derive(Clone, Debug)]
pub struct DeviceAuthorizationRequest {
	/// Authenticated client starting the flow.
	pub client_id: ClientId,
	/// Requested scopes; empty means every scope the client is allowed.
	pub scope: ScopeSet,
}
impl DeviceAuthorizationRequest {
	/// Creates a request for the client's default scopes.
	pub fn new(client_id: ClientId) -> Self {
		Self { client_id, scope: ScopeSet::default() }
	}

	/// Sets the requested scopes.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}
}

/// Data returned to the device after issuance.
///
/// Serializes to the RFC 8628 §3.2 response body: durations as whole seconds, absent URIs
/// omitted.
#[derive(Clone, Debug, Serialize)]
pub struct DeviceAuthorizationResponse {
	/// Handle the device polls with.
	pub device_code: DeviceCodeHandle,
	/// Code the user types on the secondary device, in its grouped display form.
	pub user_code: String,
	/// Page where the user enters the code.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub verification_uri: Option<Url>,
	/// Verification page with the user code prefilled.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub verification_uri_complete: Option<Url>,
	/// Lifetime of both codes.
	#[serde(serialize_with = "whole_seconds")]
	pub expires_in: Duration,
	/// Minimum wait between polls.
	#[serde(serialize_with = "whole_seconds")]
	pub interval: Duration,
}
impl DeviceAuthorizationResponse {
	/// `expires_in` in whole seconds, as sent on the wire.
	pub fn expires_in_secs(&self) -> i64 {
		self.expires_in.whole_seconds()
	}

	/// `interval` in whole seconds, as sent on the wire.
	pub fn interval_secs(&self) -> i64 {
		self.interval.whole_seconds()
	}
}

impl DeviceFlow {
	/// Issues a device code pair at the current UTC instant.
	pub async fn authorize_device(
		&self,
		request: DeviceAuthorizationRequest,
	) -> Result<DeviceAuthorizationResponse> {
		self.authorize_device_at(request, OffsetDateTime::now_utc()).await
	}

	/// Issues a device code pair stamped with `now`.
	///
	/// User code collisions are retried up to `user_code_attempts` times.
	pub async fn authorize_device_at(
		&self,
		request: DeviceAuthorizationRequest,
		now: OffsetDateTime,
	) -> Result<DeviceAuthorizationResponse> {
		const KIND: FlowKind = FlowKind::DeviceAuthorization;

		let span = FlowSpan::new(KIND, "authorize_device");

		span.record_client(&request.client_id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.issue(request, now)).await;

		record_result(KIND, &span, &result);

		result
	}

	async fn issue(
		&self,
		request: DeviceAuthorizationRequest,
		now: OffsetDateTime,
	) -> Result<DeviceAuthorizationResponse> {
		let client = self.clients.find_client(&request.client_id).await?.ok_or_else(|| {
			Error::InvalidClient { reason: format!("client `{}` is not registered", request.client_id) }
		})?;

		if !client.enabled {
			return Err(Error::InvalidClient {
				reason: format!("client `{}` is disabled", client.client_id),
			});
		}

		let scopes = if request.scope.is_empty() {
			client.allowed_scopes.clone()
		} else {
			let rejected = request.scope.difference(&client.allowed_scopes);

			if !rejected.is_empty() {
				return Err(Error::InvalidScope {
					reason: format!("not allowed for this client: {}", rejected.join(" ")),
				});
			}

			request.scope
		};

		if scopes.is_empty() {
			return Err(Error::InvalidScope { reason: "no scopes could be granted".into() });
		}

		let lifetime = client.device_code_lifetime.unwrap_or(self.options.default_lifetime);
		let interval = client.polling_interval.unwrap_or(self.options.default_interval);
		let attempts = self.options.user_code_attempts;
		let mut last_conflict = CreateOutcome::UserCodeConflict;

		for _ in 0..attempts {
			let record = DeviceAuthorization::builder(
				device::generate_device_code(),
				self.options.user_code_style.generate(),
				client.client_id.clone(),
			)
			.requested_scopes(scopes.clone())
			.created_at(now)
			.lifetime(lifetime)
			.interval(interval)
			.build()
			.map_err(ConfigError::from)?;

			match self.store.create(record.clone()).await? {
				CreateOutcome::Created => {
					self.metrics.record_issued();

					#[cfg(feature = "tracing")]
					tracing::debug!(
						client_id = %record.client_id,
						device_code = %record.device_code.fingerprint(),
						"Issued device authorization."
					);

					return Ok(self.response_for(record));
				},
				conflict => last_conflict = conflict,
			}
		}

		Err(match last_conflict {
			CreateOutcome::DeviceCodeConflict => ConfigError::DeviceCodeExhausted,
			_ => ConfigError::UserCodeExhausted { attempts },
		}
		.into())
	}

	fn response_for(&self, record: DeviceAuthorization) -> DeviceAuthorizationResponse {
		let DeviceAuthorization { device_code, user_code, lifetime, interval, .. } = record;

		DeviceAuthorizationResponse {
			verification_uri: self.options.verification_uri.clone(),
			verification_uri_complete: self.options.verification_uri_complete(&user_code),
			user_code: user_code.display(),
			device_code,
			expires_in: lifetime,
			interval: interval.unwrap_or(self.options.default_interval),
		}
	}
}

fn whole_seconds<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_i64(duration.whole_seconds())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn response_uses_rfc_8628_wire_shape() {
		let response = DeviceAuthorizationResponse {
			device_code: DeviceCodeHandle::new("dc-1"),
			user_code: "BCDF-GHJK".into(),
			verification_uri: Some(
				Url::parse("https://id.example.com/device").expect("URL should parse."),
			),
			verification_uri_complete: None,
			expires_in: Duration::minutes(5),
			interval: Duration::seconds(5),
		};
		let body = serde_json::to_value(&response).expect("Response should serialize.");

		assert_eq!(
			body,
			serde_json::json!({
				"device_code": "dc-1",
				"user_code": "BCDF-GHJK",
				"verification_uri": "https://id.example.com/device",
				"expires_in": 300,
				"interval": 5,
			})
		);
	}
}
