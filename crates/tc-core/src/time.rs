//! Simulation time model.
//!
//! # Design
//!
//! A host drives the manager in one of two clock modes:
//!
//! * **absolute** — every step names the wall-clock timestamp (ms) it
//!   simulates up to; the step length is the configured `time_step_s`.
//! * **relative** — every step names only its length in seconds; the
//!   timestamp is derived as `last_abs_ms + delta`.
//!
//! Both produce the same canonical [`TimeParams`] descriptor, which is all the
//! rest of the workspace ever sees.  A clock locks to the first mode it is
//! driven in; switching modes mid-run is an error because the two timelines
//! cannot be reconciled.

use std::fmt;

use crate::{TcError, TcResult};

// ── TimeParams ───────────────────────────────────────────────────────────────

/// Canonical time descriptor for one simulation step.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeParams {
    /// Absolute timestamp at the end of the step, milliseconds.
    pub abs_time_ms: u64,
    /// Length of the step in seconds.
    pub delta_s: f64,
    /// Simulated seconds accumulated since the clock was created.
    pub passed_s: f64,
    /// Number of completed steps, including this one.
    pub step_index: u64,
}

impl TimeParams {
    /// Absolute timestamp in seconds.
    #[inline]
    pub fn abs_time_s(&self) -> f64 {
        self.abs_time_ms as f64 / 1000.0
    }
}

impl fmt::Display for TimeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "abs = {:.3}s, relative = {:.3}s, passed = {:.3}s, step = {}",
            self.abs_time_s(), self.delta_s, self.passed_s, self.step_index,
        )
    }
}

// ── ClockMode ────────────────────────────────────────────────────────────────

/// Which kind of step request the clock is driven by.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClockMode {
    Absolute,
    Relative,
}

impl ClockMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ClockMode::Absolute => "absolute",
            ClockMode::Relative => "relative",
        }
    }
}

impl fmt::Display for ClockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── SimClock ─────────────────────────────────────────────────────────────────

/// Converts step requests into [`TimeParams`].
///
/// `SimClock` is cheap to copy and holds no heap data.
#[derive(Clone, Debug)]
pub struct SimClock {
    /// Step length used in absolute mode, seconds.
    pub time_step_s: f64,
    mode:    Option<ClockMode>,
    current: TimeParams,
}

impl SimClock {
    /// Create a clock whose timeline starts at `start_abs_ms`.
    pub fn new(start_abs_ms: u64, time_step_s: f64) -> Self {
        Self {
            time_step_s,
            mode: None,
            current: TimeParams {
                abs_time_ms: start_abs_ms,
                delta_s:     0.0,
                passed_s:    0.0,
                step_index:  0,
            },
        }
    }

    /// Descriptor of the most recently completed step (or the start point).
    #[inline]
    pub fn current(&self) -> TimeParams {
        self.current
    }

    /// The mode the clock locked to, if it has been stepped yet.
    #[inline]
    pub fn mode(&self) -> Option<ClockMode> {
        self.mode
    }

    /// Advance to the absolute timestamp `abs_time_ms`.
    ///
    /// # Errors
    /// `ClockModeMismatch` if the clock already runs in relative mode;
    /// `TimeWentBackwards` if `abs_time_ms` precedes the last step.
    pub fn advance_abs(&mut self, abs_time_ms: u64) -> TcResult<TimeParams> {
        self.check_mode(ClockMode::Absolute)?;
        if abs_time_ms < self.current.abs_time_ms {
            return Err(TcError::TimeWentBackwards {
                last:      self.current.abs_time_ms,
                requested: abs_time_ms,
            });
        }
        self.mode = Some(ClockMode::Absolute);
        self.current = TimeParams {
            abs_time_ms,
            delta_s:    self.time_step_s,
            passed_s:   self.current.passed_s + self.time_step_s,
            step_index: self.current.step_index + 1,
        };
        Ok(self.current)
    }

    /// Advance by `delta_s` seconds.
    ///
    /// # Errors
    /// `ClockModeMismatch` if the clock already runs in absolute mode;
    /// `InvalidDelta` for a non-finite or non-positive step;
    /// `TimeOverflow` if the new timestamp does not fit in `u64` milliseconds.
    pub fn advance_relative(&mut self, delta_s: f64) -> TcResult<TimeParams> {
        if !delta_s.is_finite() || delta_s <= 0.0 {
            return Err(TcError::InvalidDelta(delta_s));
        }
        self.check_mode(ClockMode::Relative)?;
        let last = self.current.abs_time_ms;
        let delta_ms = (delta_s * 1000.0).round();
        let abs_time_ms = if delta_ms < u64::MAX as f64 {
            last.checked_add(delta_ms as u64)
        } else {
            None
        }
        .ok_or(TcError::TimeOverflow { last, delta_s })?;
        self.mode = Some(ClockMode::Relative);
        self.current = TimeParams {
            abs_time_ms,
            delta_s,
            passed_s:    self.current.passed_s + delta_s,
            step_index:  self.current.step_index + 1,
        };
        Ok(self.current)
    }

    /// Fails if the clock is locked to a different mode.  Does not lock.
    fn check_mode(&self, requested: ClockMode) -> TcResult<()> {
        match self.mode {
            None                                => Ok(()),
            Some(locked) if locked == requested => Ok(()),
            Some(locked) => Err(TcError::ClockModeMismatch { locked, requested }),
        }
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Some(mode) => write!(f, "{} ({mode})", self.current),
            None       => write!(f, "{} (not started)", self.current),
        }
    }
}
