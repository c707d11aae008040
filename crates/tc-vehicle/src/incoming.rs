//! Vehicle records arriving from a host or a neighbouring region.
//!
//! An [`IncomingRecord`] is either a full state archive, from which a kernel
//! vehicle can be instantiated, or a position-only archive, which can only
//! ever become an edge stand-in.

use std::fmt;

use tc_core::{GeoPoint, RoadId, VehicleId};
use tc_spatial::RoadMap;

use crate::{ArchiveKind, Kinematics, StoreError, StoreResult, VehicleType};

/// Everything needed to seed a kernel vehicle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleState {
    pub id:             VehicleId,
    pub position:       GeoPoint,
    pub kinematics:     Kinematics,
    pub route:          Vec<RoadId>,
    pub road_idx:       usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub road_offset_m:  f64,
    pub lane_id:        i32,
    pub vehicle_type:   VehicleType,
}

/// Position and motion only.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionOnly {
    pub id:          VehicleId,
    pub position:    GeoPoint,
    pub heading_rad: f64,
    pub speed_mps:   f64,
    pub route:       Option<Vec<RoadId>>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IncomingRecord {
    Full(VehicleState),
    Simple(PositionOnly),
}

/// Why an incoming record was rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum MalformedReason {
    NonFinitePosition,
    EmptyRoute,
    RoadIndexOutOfRoute { road_idx: usize, route_len: usize },
    UnknownRoad(RoadId),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::NonFinitePosition => f.write_str("non-finite position"),
            MalformedReason::EmptyRoute        => f.write_str("full archive with an empty route"),
            MalformedReason::RoadIndexOutOfRoute { road_idx, route_len } => {
                write!(f, "road index {road_idx} outside route of {route_len} roads")
            }
            MalformedReason::UnknownRoad(road) => write!(f, "route references unknown {road}"),
        }
    }
}

impl IncomingRecord {
    #[inline]
    pub fn id(&self) -> VehicleId {
        match self {
            IncomingRecord::Full(s)   => s.id,
            IncomingRecord::Simple(p) => p.id,
        }
    }

    #[inline]
    pub fn position(&self) -> GeoPoint {
        match self {
            IncomingRecord::Full(s)   => s.position,
            IncomingRecord::Simple(p) => p.position,
        }
    }

    #[inline]
    pub fn archive_kind(&self) -> ArchiveKind {
        match self {
            IncomingRecord::Full(_)   => ArchiveKind::Full,
            IncomingRecord::Simple(_) => ArchiveKind::Simple,
        }
    }

    /// Reject records the store must never hold.
    ///
    /// Every record needs a finite position.  A full archive additionally
    /// needs a non-empty route, a `road_idx` inside it, and only roads the
    /// map knows, since it may become a kernel vehicle.
    pub fn validate<M: RoadMap + ?Sized>(&self, map: &M) -> StoreResult<()> {
        let malformed = |reason| StoreError::Malformed { id: self.id(), reason };

        if !self.position().is_finite() {
            return Err(malformed(MalformedReason::NonFinitePosition));
        }
        if let IncomingRecord::Full(s) = self {
            if s.route.is_empty() {
                return Err(malformed(MalformedReason::EmptyRoute));
            }
            if s.road_idx >= s.route.len() {
                return Err(malformed(MalformedReason::RoadIndexOutOfRoute {
                    road_idx:  s.road_idx,
                    route_len: s.route.len(),
                }));
            }
            if let Some(&road) = s.route.iter().find(|&&r| !map.contains_road(r)) {
                return Err(malformed(MalformedReason::UnknownRoad(road)));
            }
        }
        Ok(())
    }
}
