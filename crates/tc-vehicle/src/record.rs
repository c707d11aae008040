//! Per-vehicle state owned by the population store.

use std::fmt;

use tc_core::{GeoPoint, RoadId, VehicleId};

use crate::{PositionOnly, VehicleState};

// ── Enums ─────────────────────────────────────────────────────────────────────

/// Which simulation a record belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Representation {
    /// Full-fidelity vehicle advanced by the traffic kernel.
    Kernel,
    /// Lightweight stand-in outside every region; never advanced.
    Edge,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Representation::Kernel => "kernel",
            Representation::Edge   => "edge",
        })
    }
}

/// How much state a record carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArchiveKind {
    /// Enough to instantiate a kernel vehicle.
    Full,
    /// Position and heading only.
    Simple,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleType {
    #[default]
    Car,
    Bus,
    Truck,
}

/// Longitudinal state plus heading (radians, 0 = east, counter-clockwise).
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Kinematics {
    pub speed_mps:   f64,
    pub accel_mps2:  f64,
    pub heading_rad: f64,
}

// ── VehicleRecord ─────────────────────────────────────────────────────────────

/// One traffic participant.
///
/// `in_range_after_simulation` is only meaningful for kernel vehicles: it is
/// the region-table membership of `position` as it stood at the end of the
/// last simulation advance (or at instantiation), not of any position a host
/// injects later.  The kill pass decides on this flag alone.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleRecord {
    pub id:             VehicleId,
    pub position:       GeoPoint,
    pub kinematics:     Kinematics,
    /// Roads the vehicle drives, in order.  May be empty for edge vehicles
    /// built from a Simple record.
    pub route:          Vec<RoadId>,
    /// Index into `route` of the current road.
    pub road_idx:       usize,
    /// Metres travelled along the current road.
    pub road_offset_m:  f64,
    pub lane_id:        i32,
    pub vehicle_type:   VehicleType,
    pub representation: Representation,
    pub archive_kind:   ArchiveKind,
    pub alive:          bool,
    pub in_range_after_simulation: bool,
    pub spawned_at_ms:  u64,
}

impl VehicleRecord {
    /// A kernel vehicle seeded from a full state record.
    pub fn kernel_from_state(state: &VehicleState, in_range: bool, now_ms: u64) -> Self {
        Self {
            id:             state.id,
            position:       state.position,
            kinematics:     state.kinematics,
            route:          state.route.clone(),
            road_idx:       state.road_idx,
            road_offset_m:  state.road_offset_m,
            lane_id:        state.lane_id,
            vehicle_type:   state.vehicle_type,
            representation: Representation::Kernel,
            archive_kind:   ArchiveKind::Full,
            alive:          true,
            in_range_after_simulation: in_range,
            spawned_at_ms:  now_ms,
        }
    }

    /// An edge stand-in from a full state record.
    pub fn edge_from_state(state: &VehicleState, now_ms: u64) -> Self {
        Self {
            representation: Representation::Edge,
            in_range_after_simulation: false,
            ..Self::kernel_from_state(state, false, now_ms)
        }
    }

    /// An edge stand-in from a position-only record.
    pub fn edge_from_position(pos: &PositionOnly, now_ms: u64) -> Self {
        Self {
            id:             pos.id,
            position:       pos.position,
            kinematics:     Kinematics {
                speed_mps:   pos.speed_mps,
                accel_mps2:  0.0,
                heading_rad: pos.heading_rad,
            },
            route:          pos.route.clone().unwrap_or_default(),
            road_idx:       0,
            road_offset_m:  0.0,
            lane_id:        0,
            vehicle_type:   VehicleType::Car,
            representation: Representation::Edge,
            archive_kind:   ArchiveKind::Simple,
            alive:          true,
            in_range_after_simulation: false,
            spawned_at_ms:  now_ms,
        }
    }

    /// A kernel vehicle created by a spawn point at the start of `route`.
    pub fn spawned(id: VehicleId, position: GeoPoint, route: Vec<RoadId>, speed_mps: f64, now_ms: u64) -> Self {
        Self {
            id,
            position,
            kinematics:     Kinematics { speed_mps, ..Kinematics::default() },
            route,
            road_idx:       0,
            road_offset_m:  0.0,
            lane_id:        0,
            vehicle_type:   VehicleType::Car,
            representation: Representation::Kernel,
            archive_kind:   ArchiveKind::Full,
            alive:          true,
            in_range_after_simulation: true,
            spawned_at_ms:  now_ms,
        }
    }

    /// The road the vehicle is currently on, if its route is non-empty.
    #[inline]
    pub fn current_road(&self) -> Option<RoadId> {
        self.route.get(self.road_idx).copied()
    }

    #[inline]
    pub fn is_kernel(&self) -> bool {
        self.representation == Representation::Kernel
    }
}
