//! Typed errors for the engine's publish paths.
//!
//! Internal invariants are additionally checked with `debug_assert!` at the
//! point they're computed; these types are for the checks that run
//! unconditionally, so a release build fails an operation instead of
//! panicking (see the Design Notes on exceptions/abort in the original).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("internal invariant violated: {0}")]
    Invariant(&'static str),

    #[error("failed to save merge result: {0}")]
    Save(#[from] std::io::Error),

    #[error("{0} unresolved conflict(s) remain; save refused")]
    UnresolvedConflicts(usize),

    #[error("failed to load settings: {0}")]
    Settings(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Returned by long-running stages when the caller's [`crate::progress::ProgressReporter`]
/// reports cancellation. Not an error: the caller discards the partial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;
