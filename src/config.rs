//! # Per-stream configuration.
//!
//! [`MuxConfig`] defines how one [`OutputMux`](crate::OutputMux) instance
//! behaves: how long a single drain invocation may occupy the scheduler and
//! how many subscribers may attach.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use outmux::MuxConfig;
//!
//! let mut cfg = MuxConfig::default();
//! cfg.write_budget = Duration::from_millis(1);
//! cfg.max_subscribers = 8;
//!
//! assert_eq!(cfg.max_subscribers, 8);
//! ```

use std::time::Duration;

/// Configuration for one output stream instance.
///
/// Controls drain fairness and subscriber capacity.
#[derive(Clone, Copy, Debug)]
pub struct MuxConfig {
    /// Maximum wall-clock time one drain invocation may spend writing.
    ///
    /// Measured against a monotonic clock. When the budget is exceeded with
    /// work remaining, the drain stops early and resumes on the next
    /// readiness signal; at least one write is attempted per invocation, so
    /// a zero budget still makes progress.
    pub write_budget: Duration,
    /// Maximum number of attached subscribers (0 = unlimited).
    pub max_subscribers: usize,
}

impl Default for MuxConfig {
    /// Provides a default configuration:
    /// - `write_budget = 500µs`
    /// - `max_subscribers = 0` (unlimited)
    fn default() -> Self {
        Self {
            write_budget: Duration::from_micros(500),
            max_subscribers: 0,
        }
    }
}
