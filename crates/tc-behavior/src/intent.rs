//! Vehicle intents — what a kernel vehicle wants to happen this step.

use tc_core::GeoPoint;
use tc_vehicle::Kinematics;

/// New state for a vehicle that keeps driving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position:      GeoPoint,
    pub kinematics:    Kinematics,
    pub road_idx:      usize,
    pub road_offset_m: f64,
}

/// The outcome of advancing one kernel vehicle by one step.
///
/// Intents are produced by [`TrafficKernel::advance`][crate::TrafficKernel::advance]
/// and applied by the step controller in tc-sim.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Overwrite position, kinematics and route progress.
    Move(Motion),

    /// The vehicle finished its route (or otherwise left the simulation)
    /// and is removed from the population.
    Despawn,

    /// Leave the vehicle unchanged.
    Stay,
}
