//! Monotonic clock adapter.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.
//!
//! Both report milliseconds since the clock was created, so sample
//! timestamps start near zero on every run.

use crate::app::ports::Clock;

pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(target_os = "espidf")]
    start_us: u64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self {
            start_us: boot_us(),
        }
    }

    /// Microseconds since the clock was created.
    #[cfg(not(target_os = "espidf"))]
    pub fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Microseconds since the clock was created.
    #[cfg(target_os = "espidf")]
    pub fn elapsed_us(&self) -> u64 {
        boot_us().saturating_sub(self.start_us)
    }
}

#[cfg(target_os = "espidf")]
fn boot_us() -> u64 {
    // SAFETY: esp_timer is initialised by the IDF startup code.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.elapsed_us() / 1000
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = clock.now_ms();
        assert!(b >= a);
        assert!(b >= 2);
    }
}
