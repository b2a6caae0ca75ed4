//! Unified error handling for the traffic engine.

use thiserror::Error;

/// Errors surfaced by the traffic engine.
///
/// Almost every malformed input (unresolvable ways, stale fix pairs,
/// stationary segments, inadmissible speed samples) is skipped silently;
/// only genuine programming errors are reported here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrafficError {
    /// A completing crossing carried a timestamp earlier than the pending
    /// crossing it matched. Crossings are processed in ascending time
    /// order, so this can only happen if that ordering was violated.
    #[error("crossing completed {dt_seconds}s before the pending crossing it matches")]
    CrossingOrderViolation { dt_seconds: f64 },
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, TrafficError>;
