//! Read-only simulation state passed to every kernel callback.

use tc_core::TimeParams;
use tc_spatial::{RegionTable, RoadMap};
use tc_vehicle::PopulationStore;

/// A read-only snapshot of the simulation passed to every
/// [`TrafficKernel`][crate::TrafficKernel] call.
///
/// `StepContext` is built once per step by tc-sim and shared (immutably)
/// across all vehicles during the intent phase.
///
/// # Lifetimes
///
/// All borrows live for the duration of one step's intent phase.  tc-sim
/// never allows mutable access to these structures while `StepContext` is
/// live.
pub struct StepContext<'a> {
    /// Timing of the step being simulated.
    pub time: TimeParams,

    /// The active region table.
    pub regions: &'a RegionTable,

    /// Map-service lookups (road lengths).
    pub map: &'a dyn RoadMap,

    /// The population as it stood at the start of the step, for leader and
    /// neighbour queries.
    pub population: &'a PopulationStore,
}

impl<'a> StepContext<'a> {
    #[inline]
    pub fn new(
        time:       TimeParams,
        regions:    &'a RegionTable,
        map:        &'a dyn RoadMap,
        population: &'a PopulationStore,
    ) -> Self {
        Self { time, regions, map, population }
    }
}
