//! A no-op kernel — vehicles never move.

use tc_vehicle::VehicleRecord;

use crate::{BehaviorResult, Intent, StepContext, TrafficKernel};

/// A [`TrafficKernel`] that always returns [`Intent::Stay`].
///
/// Useful in tests of ownership and handoff, where vehicle positions must
/// only change when the test changes them.
pub struct NoopKernel;

impl TrafficKernel for NoopKernel {
    fn advance(&self, _vehicle: &VehicleRecord, _ctx: &StepContext<'_>) -> BehaviorResult<Intent> {
        Ok(Intent::Stay)
    }
}
