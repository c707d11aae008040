//! Read-only population snapshots (`snapshot_micro`).
//!
//! Kernel vehicles that ended the last step outside every region are
//! exported as Full archives: they are about to be killed here, and a
//! neighbouring region's manager can seed its own kernel vehicle from them.
//! In-range kernel vehicles are exported as Simple archives.  Edge vehicles
//! keep the archive kind they arrived with.

use serde::{Deserialize, Serialize};

use tc_core::{GeoPoint, RoadId, TimeParams, VehicleId};
use tc_vehicle::{
    ArchiveKind, EgoRecord, IncomingRecord, Kinematics, PositionOnly, Representation,
    VehicleRecord, VehicleState, VehicleType,
};

use crate::{SimError, SimResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id:             VehicleId,
    pub position:       GeoPoint,
    pub kinematics:     Kinematics,
    pub route:          Vec<RoadId>,
    pub road_idx:       usize,
    pub road_offset_m:  f64,
    pub lane_id:        i32,
    pub vehicle_type:   VehicleType,
    pub representation: Representation,
    pub archive_kind:   ArchiveKind,
    pub in_range_after_simulation: bool,
}

impl VehicleSnapshot {
    pub fn from_record(record: &VehicleRecord) -> Self {
        let archive_kind = match record.representation {
            Representation::Kernel if !record.in_range_after_simulation => ArchiveKind::Full,
            Representation::Kernel => ArchiveKind::Simple,
            Representation::Edge   => record.archive_kind,
        };
        Self {
            id:             record.id,
            position:       record.position,
            kinematics:     record.kinematics,
            route:          record.route.clone(),
            road_idx:       record.road_idx,
            road_offset_m:  record.road_offset_m,
            lane_id:        record.lane_id,
            vehicle_type:   record.vehicle_type,
            representation: record.representation,
            archive_kind,
            in_range_after_simulation: record.in_range_after_simulation,
        }
    }

    /// Convert back into a record another manager's `reset_traffic_info`
    /// accepts.
    pub fn into_incoming(self) -> IncomingRecord {
        match self.archive_kind {
            ArchiveKind::Full => IncomingRecord::Full(VehicleState {
                id:            self.id,
                position:      self.position,
                kinematics:    self.kinematics,
                route:         self.route,
                road_idx:      self.road_idx,
                road_offset_m: self.road_offset_m,
                lane_id:       self.lane_id,
                vehicle_type:  self.vehicle_type,
            }),
            ArchiveKind::Simple => IncomingRecord::Simple(PositionOnly {
                id:          self.id,
                position:    self.position,
                heading_rad: self.kinematics.heading_rad,
                speed_mps:   self.kinematics.speed_mps,
                route:       (!self.route.is_empty()).then_some(self.route),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub frame_id: u64,
    pub time:     TimeParams,
    /// Alive kernel vehicles, ascending id.
    pub vehicles: Vec<VehicleSnapshot>,
    /// Alive edge vehicles, ascending id.
    pub edges:    Vec<VehicleSnapshot>,
    pub egos:     Vec<EgoRecord>,
}

impl PopulationSnapshot {
    /// Every vehicle row as an incoming batch, kernel vehicles first.
    pub fn into_incoming(self) -> Vec<IncomingRecord> {
        self.vehicles
            .into_iter()
            .chain(self.edges)
            .map(VehicleSnapshot::into_incoming)
            .collect()
    }

    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string(self)
            .map_err(|e| SimError::Core(tc_core::TcError::Parse(e.to_string())))
    }
}
