//! Error kinds for the analytic engine (spec §7).
//!
//! Everything other than malformed input and cooperative cancellation is
//! absorbed locally: a disconnected graph, an empty cohort, or an unknown
//! rater id are not errors, they are documented degenerate outputs.

use thiserror::Error;

/// Errors the engine can return.
///
/// `degenerate-fit` and `not-available` from spec §7 are *not* represented
/// here: they are encoded as ordinary values (a single-row fit, or `None`)
/// because they are not failures, just small or unavailable results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A malformed input was rejected defensively: a verdict referencing a
    /// missing text, a negative `targetPerText`, or an anchor grade outside
    /// the configured bounds.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Human-readable description naming the offending value.
        message: String,
    },

    /// Cooperative cancellation was observed between Newton iterations (C3)
    /// or between Monte-Carlo splits (C7).
    #[error("operation cancelled")]
    Cancelled,
}
