//! Crate-wide error taxonomy.
//!
//! Mirrors the shape of `kannaka-memory`'s `EarError`/`StoreError`: one
//! `thiserror` enum per failure class, no panics for caller-reachable
//! invariant violations.

#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// Odd FFT order/window size, window > FFT, hop > window, wrong
    /// feature dimension, non-mono audio, etc.
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// Negative sequence length, null/empty cost input, malformed caller
    /// arguments that aren't a dimension mismatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Caller-enforced budget exceeded (see [`crate::dtw::cost_matrix_mb`]).
    /// The aligner itself never raises this on its own.
    #[error("resource exceeded: {0}")]
    ResourceExceeded(String),

    /// Backtrace reached an unreachable state. Signals a bug in the
    /// aligner, not a caller mistake.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}
