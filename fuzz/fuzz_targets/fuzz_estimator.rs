//! Fuzz target: state estimator on arbitrary sample streams
//!
//! Each input byte becomes one reading (`byte / 255`), with the first
//! byte choosing the window capacity.  Verifies:
//! - No panics for any stream
//! - The filtered value always stays in [0, 1]
//! - Transitions alternate between clear and smoke
//!
//! cargo fuzz run fuzz_estimator

#![no_main]

use libfuzzer_sys::fuzz_target;
use smokewatch::config::DetectorConfig;
use smokewatch::estimator::StateEstimator;
use smokewatch::sensors::Sample;
use smokewatch::signal::{MAX_WINDOW, MIN_WINDOW};

fuzz_target!(|data: &[u8]| {
    let Some((&first, stream)) = data.split_first() else {
        return;
    };
    let config = DetectorConfig {
        window_capacity: MIN_WINDOW + usize::from(first) % (MAX_WINDOW - MIN_WINDOW + 1),
        ..DetectorConfig::default()
    };
    let mut est = StateEstimator::new(&config);
    let mut state = est.current_state();

    for (i, byte) in stream.iter().enumerate() {
        let level = f32::from(*byte) / 255.0;
        if let Some(change) = est.observe(Sample::analog(i as u64 * 50, level)) {
            assert_eq!(change.from, state);
            assert_ne!(change.from, change.to);
            state = change.to;
        }
        if let Some(f) = est.filtered_value() {
            assert!((0.0..=1.0).contains(&f));
        }
    }
});
