// self
use crate::{
	obs::{FlowKind, FlowOutcome},
	validation::TokenErrorCode,
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_device_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a poll rejected with `code` via the global metrics recorder (when enabled).
pub fn record_rejection(code: TokenErrorCode) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("oauth2_device_flow_rejections_total", "error" => code.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = code;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_installed_recorder() {
		record_flow_outcome(FlowKind::Polling, FlowOutcome::Rejected);
		record_rejection(TokenErrorCode::SlowDown);
	}
}
