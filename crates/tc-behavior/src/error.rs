use tc_core::{RoadId, VehicleId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BehaviorError {
    #[error("road {0} is not known to the map")]
    UnknownRoad(RoadId),

    #[error("kernel failed to advance {id}: {reason}")]
    Kernel { id: VehicleId, reason: String },
}

pub type BehaviorResult<T> = Result<T, BehaviorError>;
