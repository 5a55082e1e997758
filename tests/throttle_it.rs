mod common;

// std
use std::sync::Arc;
// crates.io
use time::Duration;
// self
use common::*;
use oauth2_device_flow::throttle::{PollingThrottle, ThrottlingPolicy};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_polls_let_exactly_one_through() {
	let throttle = Arc::new(PollingThrottle::new(Duration::seconds(5)));
	let record = Arc::new(pending_record("dc", "11111111", NOW));
	let polls = (0..8)
		.map(|_| {
			let throttle = throttle.clone();
			let record = record.clone();

			tokio::spawn(async move {
				throttle.should_slow_down(&record.device_code, &record, NOW).await
			})
		})
		.collect::<Vec<_>>();
	let mut passed = 0;

	for poll in polls {
		if !poll.await.expect("Poll task should not panic.").expect("Throttle should not fail.") {
			passed += 1;
		}
	}

	assert_eq!(passed, 1);
}

#[tokio::test]
async fn waiting_one_interval_always_proceeds() {
	let throttle = PollingThrottle::new(Duration::seconds(5));
	let record = pending_record("dc", "11111111", NOW);
	let mut at = NOW;

	for _ in 0..5 {
		assert!(
			!throttle.should_slow_down(&record.device_code, &record, at).await.expect("poll"),
			"A client that waits a full interval must not be told to slow down."
		);

		at += Duration::seconds(5);
	}
}

#[tokio::test]
async fn handles_are_throttled_independently() {
	let throttle = PollingThrottle::new(Duration::seconds(5));
	let first = pending_record("dc-1", "11111111", NOW);
	let second = pending_record("dc-2", "22222222", NOW);

	assert!(!throttle.should_slow_down(&first.device_code, &first, NOW).await.expect("poll"));
	assert!(!throttle.should_slow_down(&second.device_code, &second, NOW).await.expect("poll"));
	assert!(throttle.should_slow_down(&first.device_code, &first, NOW).await.expect("poll"));
}
