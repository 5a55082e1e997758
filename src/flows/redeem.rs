//! Token-endpoint side of the flow: polling and at-most-once redemption.

// self
use crate::{
	_prelude::*,
	flows::{DeviceFlow, record_validation},
	lock::{self, LockGuard},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	validation::{DeviceCodeRequest, DeviceCodeValidation, TokenErrorCode},
};

impl DeviceFlow {
	/// Validates a poll at the current UTC instant without consuming the record.
	pub async fn poll(&self, request: &DeviceCodeRequest) -> Result<DeviceCodeValidation> {
		self.poll_at(request, OffsetDateTime::now_utc()).await
	}

	/// Validates a poll as of `now` without consuming the record.
	pub async fn poll_at(
		&self,
		request: &DeviceCodeRequest,
		now: OffsetDateTime,
	) -> Result<DeviceCodeValidation> {
		const KIND: FlowKind = FlowKind::Polling;

		let span = FlowSpan::new(KIND, "poll");

		span.record_client(&request.client_id);

		if let Some(device_code) = &request.device_code {
			span.record_device_code(device_code);
		}

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.validate_counted(request, now)).await;

		record_validation(KIND, &span, &result);

		result
	}

	/// Redeems an approved device code at the current UTC instant.
	pub async fn redeem(&self, request: &DeviceCodeRequest) -> Result<DeviceCodeValidation> {
		self.redeem_at(request, OffsetDateTime::now_utc()).await
	}

	/// Validates the poll and, when it passes, removes the record under its device code lock.
	///
	/// Only the caller that actually removes the record receives
	/// [`DeviceCodeValidation::Valid`]; a concurrent or repeated redemption of the same code is
	/// rejected with `invalid_grant`.
	pub async fn redeem_at(
		&self,
		request: &DeviceCodeRequest,
		now: OffsetDateTime,
	) -> Result<DeviceCodeValidation> {
		const KIND: FlowKind = FlowKind::Redemption;

		let span = FlowSpan::new(KIND, "redeem");

		span.record_client(&request.client_id);

		if let Some(device_code) = &request.device_code {
			span.record_device_code(device_code);
		}

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.consume(request, now)).await;

		record_validation(KIND, &span, &result);

		result
	}

	async fn validate_counted(
		&self,
		request: &DeviceCodeRequest,
		now: OffsetDateTime,
	) -> Result<DeviceCodeValidation> {
		self.metrics.record_poll();

		let validation = self.validator().validate_at(request, now).await?;

		if validation.error_code() == Some(TokenErrorCode::SlowDown) {
			self.metrics.record_slow_down();
		}

		Ok(validation)
	}

	async fn consume(
		&self,
		request: &DeviceCodeRequest,
		now: OffsetDateTime,
	) -> Result<DeviceCodeValidation> {
		let validation = self.validate_counted(request, now).await?;
		if !validation.is_valid() {
			return Ok(validation);
		}

		let Some(device_code) = request.device_code.as_ref() else {
			return Ok(validation);
		};
		let guard = LockGuard::acquire(
			self.lock.clone(),
			lock::device_code_key(device_code),
			self.options.lock_timeout,
		)
		.await?;
		let removed = self.store.remove_by_device_code(device_code).await?;

		drop(guard);

		if removed.is_none() {
			obs::record_rejection(TokenErrorCode::InvalidGrant);

			#[cfg(feature = "tracing")]
			tracing::debug!(client_id = %request.client_id, "Device code was already redeemed.");

			return Ok(DeviceCodeValidation::reject(
				TokenErrorCode::InvalidGrant,
				"Device code was already redeemed.",
			));
		}

		self.metrics.record_redemption();

		Ok(validation)
	}
}
