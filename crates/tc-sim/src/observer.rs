//! Observer trait for statistics and data collection.

use tc_core::TimeParams;
use tc_vehicle::PopulationStore;

use crate::{HandoffReport, StepReport};

/// Callbacks invoked by [`TrafficManager`][crate::TrafficManager] at key
/// points of the control plane.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  Observers run while the manager lock
/// is held; they must not call back into the manager.
///
/// # Example — step counter
///
/// ```rust,ignore
/// struct Counter { steps: u64 }
///
/// impl StepObserver for Counter {
///     fn on_step_end(&mut self, _report: &StepReport, _store: &PopulationStore) {
///         self.steps += 1;
///     }
/// }
/// ```
pub trait StepObserver {
    /// Called before a step's spawn phase.
    fn on_step_start(&mut self, _time: &TimeParams) {}

    /// Called after a step's post-step bookkeeping, with read-only access
    /// to the updated population.
    fn on_step_end(&mut self, _report: &StepReport, _store: &PopulationStore) {}

    /// Called after every `reset_traffic_info`.
    fn on_handoff(&mut self, _abs_time_ms: u64, _report: &HandoffReport, _store: &PopulationStore) {}

    /// Called once when the manager is released.
    fn on_release(&mut self, _time: &TimeParams) {}
}

/// A [`StepObserver`] that does nothing.
pub struct NoopObserver;

impl StepObserver for NoopObserver {}
