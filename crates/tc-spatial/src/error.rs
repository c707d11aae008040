//! Spatial-subsystem error type.

use thiserror::Error;

use tc_core::{GeoPoint, RoadId};

/// Errors produced by `tc-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("map range {bottom_left} .. {top_right} has a non-finite coordinate")]
    InvalidRange {
        bottom_left: GeoPoint,
        top_right:   GeoPoint,
    },

    #[error("road {0} is not known to the map")]
    UnknownRoad(RoadId),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
