//! Three-stage noise filter: IQR outlier rejection, median, exponential
//! smoothing.
//!
//! ```text
//!  window ──▶ sort ──▶ drop x ∉ [Q1 − 1.5·IQR, Q3 + 1.5·IQR] ──▶ median
//!                                                                  │
//!  history (last K outputs) ──▶ α·median + (1 − α)·previous ◀──────┘
//! ```
//!
//! Quartiles use linear interpolation between closest ranks.  A window of
//! identical values has IQR = 0 and keeps every sample; only an empty
//! input yields no survivors, in which case the filter returns 0.0.
//!
//! Cost is one sort of at most [`MAX_WINDOW`] values per call, with no
//! heap allocation.

use heapless::{Deque, Vec};

use super::{MAX_HISTORY, MAX_WINDOW, ReadingWindow};

/// Tukey fence multiplier.
const IQR_FENCE: f32 = 1.5;

/// Stateful filter: remembers its last outputs for smoothing continuity.
pub struct NoiseFilter {
    alpha: f32,
    history: Deque<f32, MAX_HISTORY>,
    history_len: usize,
}

impl NoiseFilter {
    pub fn new(alpha: f32, history_len: usize) -> Self {
        Self {
            alpha,
            history: Deque::new(),
            history_len: history_len.clamp(1, MAX_HISTORY),
        }
    }

    /// Run one filter pass over the window and record the output.
    pub fn apply(&mut self, window: &ReadingWindow) -> f32 {
        let values = window.values();
        let out = filter(&values, self.previous(), self.alpha);

        if self.history.len() >= self.history_len {
            self.history.pop_front();
        }
        let _ = self.history.push_back(out);
        out
    }

    /// Most recent filtered value, if any pass has run.
    pub fn previous(&self) -> Option<f32> {
        self.history.back().copied()
    }

    /// Retained filtered values, oldest first.
    pub fn history(&self) -> impl Iterator<Item = f32> + '_ {
        self.history.iter().copied()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

/// Pure filter contract: `values` in window order, `previous` the last
/// filtered output (`None` on cold start).
pub fn filter(values: &[f32], previous: Option<f32>, alpha: f32) -> f32 {
    let mut sorted: Vec<f32, MAX_WINDOW> = values.iter().copied().take(MAX_WINDOW).collect();
    sorted.sort_unstable_by(f32::total_cmp);

    let survivors = reject_outliers(&sorted);
    let Some(median) = median(&survivors) else {
        return 0.0;
    };

    let smoothed = match previous {
        Some(prev) => alpha * median + (1.0 - alpha) * prev,
        None => median,
    };
    smoothed.clamp(0.0, 1.0)
}

/// Keep the values of `sorted` inside the Tukey fences.  Output stays sorted.
pub fn reject_outliers(sorted: &[f32]) -> Vec<f32, MAX_WINDOW> {
    if sorted.is_empty() {
        return Vec::new();
    }
    let q1 = quantile(sorted, 0.25);
    let q3 = quantile(sorted, 0.75);
    let iqr = q3 - q1;
    let lo = q1 - IQR_FENCE * iqr;
    let hi = q3 + IQR_FENCE * iqr;

    sorted
        .iter()
        .copied()
        .filter(|v| (lo..=hi).contains(v))
        .collect()
}

/// Linear-interpolated quantile of an already sorted, non-empty slice.
pub fn quantile(sorted: &[f32], q: f32) -> f32 {
    debug_assert!(!sorted.is_empty());
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Median of a sorted slice; mean of the two middle values for even counts.
pub fn median(sorted: &[f32]) -> Option<f32> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}
