//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `TcError` as one
//! variant via `#[from]`.

use thiserror::Error;

use crate::ClockMode;

/// The base error type for `tc-core` and a common variant for sub-crates.
#[derive(Debug, Error)]
pub enum TcError {
    #[error("clock runs in {locked} mode, {requested} step requested")]
    ClockModeMismatch {
        locked:    ClockMode,
        requested: ClockMode,
    },

    #[error("step length must be finite and positive, got {0}")]
    InvalidDelta(f64),

    #[error("absolute time went backwards: last {last} ms, requested {requested} ms")]
    TimeWentBackwards { last: u64, requested: u64 },

    #[error("advancing {delta_s} s from {last} ms overflows the clock")]
    TimeOverflow { last: u64, delta_s: f64 },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for all `tc-*` crates.
pub type TcResult<T> = Result<T, TcError>;
