// self
use crate::{
	_prelude::*,
	auth::{ClientId, DeviceCodeHandle},
	obs::{FlowKind, FlowOutcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one device flow operation.
///
/// The `client_id`, `device_code`, and `outcome` fields start empty and are filled in as the
/// operation learns them. Device codes are only ever recorded by fingerprint.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a span tagged with the operation kind and the call site.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oauth2_device_flow.flow",
				flow = kind.as_str(),
				stage,
				client_id = tracing::field::Empty,
				device_code = tracing::field::Empty,
				outcome = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Records the client the operation runs for.
	pub fn record_client(&self, client_id: &ClientId) -> &Self {
		#[cfg(feature = "tracing")]
		self.span.record("client_id", client_id.as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = client_id;

		self
	}

	/// Records the fingerprint of the device code being polled or redeemed.
	pub fn record_device_code(&self, device_code: &DeviceCodeHandle) -> &Self {
		#[cfg(feature = "tracing")]
		self.span.record("device_code", device_code.fingerprint().as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = device_code;

		self
	}

	/// Records how the operation finished.
	pub fn record_outcome(&self, outcome: FlowOutcome) {
		#[cfg(feature = "tracing")]
		self.span.record("outcome", outcome.as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = outcome;
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
