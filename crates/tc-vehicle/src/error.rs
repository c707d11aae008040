use tc_core::VehicleId;
use thiserror::Error;

use crate::{MalformedReason, Representation};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{id} is already resident as a {existing} vehicle")]
    IdentityConflict {
        id:       VehicleId,
        existing: Representation,
    },

    #[error("malformed record for {id}: {reason}")]
    Malformed {
        id:     VehicleId,
        reason: MalformedReason,
    },

    #[error("{0} is not a registered ego")]
    UnknownEgo(VehicleId),

    #[error("{0} is already a registered ego")]
    EgoAlreadyRegistered(VehicleId),

    #[error("ego {ego} would be placed {distance_m:.2} m from {nearest}")]
    UnsafeEgoPlacement {
        ego:        VehicleId,
        nearest:    VehicleId,
        distance_m: f64,
    },

    #[error("{0} is not in the population")]
    VehicleNotFound(VehicleId),
}

pub type StoreResult<T> = Result<T, StoreError>;
