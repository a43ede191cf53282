//! Signal conditioning: the bounded reading window and the noise filter.
//!
//! Both live in fixed-capacity `heapless` buffers, so a poll cycle never
//! allocates.

pub mod filter;
pub mod window;

pub use filter::NoiseFilter;
pub use window::ReadingWindow;

/// Smallest configurable reading window: the median of three samples is
/// the first that can discard a lone spike.
pub const MIN_WINDOW: usize = 3;

/// Upper bound on the configurable reading window capacity.
pub const MAX_WINDOW: usize = 32;

/// Upper bound on the configurable filtered-value history length.
pub const MAX_HISTORY: usize = 16;
