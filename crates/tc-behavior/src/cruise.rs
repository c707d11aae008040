//! Constant-speed route following.

use tc_vehicle::VehicleRecord;

use crate::{BehaviorError, BehaviorResult, Intent, Motion, StepContext, TrafficKernel};

/// Drives every vehicle at its current speed along its heading, advancing
/// through its route as road lengths are used up.  Despawns the vehicle when
/// it runs off the end of its route.
///
/// No interaction between vehicles; a stand-in for a real kernel in demos
/// and tests that need vehicles to cross roads and region boundaries.
pub struct CruiseKernel;

impl TrafficKernel for CruiseKernel {
    fn advance(&self, vehicle: &VehicleRecord, ctx: &StepContext<'_>) -> BehaviorResult<Intent> {
        let Some(mut road) = vehicle.current_road() else {
            return Ok(Intent::Despawn);
        };

        let travelled = vehicle.kinematics.speed_mps.max(0.0) * ctx.time.delta_s;
        let mut road_idx = vehicle.road_idx;
        let mut offset = vehicle.road_offset_m + travelled;

        loop {
            let length = ctx.map.road_length_m(road).ok_or(BehaviorError::UnknownRoad(road))?;
            if offset < length {
                break;
            }
            offset -= length;
            road_idx += 1;
            match vehicle.route.get(road_idx) {
                Some(&next) => road = next,
                None => return Ok(Intent::Despawn),
            }
        }

        Ok(Intent::Move(Motion {
            position:      vehicle.position.offset_m(vehicle.kinematics.heading_rad, travelled),
            kinematics:    vehicle.kinematics,
            road_idx,
            road_offset_m: offset,
        }))
    }
}
