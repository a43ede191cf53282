//! Fuzz target: `DetectorConfig` JSON parsing and validation
//!
//! Feeds arbitrary bytes to the config deserialiser and verifies:
//! - No panics in parsing or `validate()`
//! - Any config that validates can build an estimator and survive a poll
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use smokewatch::config::DetectorConfig;
use smokewatch::estimator::StateEstimator;
use smokewatch::sensors::Sample;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<DetectorConfig>(data) else {
        return;
    };
    if config.validate().is_err() {
        return;
    }

    let mut est = StateEstimator::new(&config);
    for t in 0..=config.window_capacity as u64 {
        let _ = est.observe(Sample::analog(t * u64::from(config.poll_interval_ms), 1.0));
    }
    assert!(est.filtered_value().is_some());
});
