//! Plain data rows produced by the recorder and written by exporters.

use tc_core::{RoadId, VehicleId};

/// Aggregated travel time on one road.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadTravelTime {
    pub length_m:   f64,
    /// Vehicles whose traversal has been folded into the average.
    pub pass_count: u64,
    pub average_ms: f64,
}

impl RoadTravelTime {
    pub fn first(length_m: f64, sample_ms: f64) -> Self {
        Self { length_m, pass_count: 1, average_ms: sample_ms }
    }

    /// Fold one more traversal into the running mean.
    pub fn fold(&mut self, sample_ms: f64) {
        let n = self.pass_count as f64;
        self.average_ms = (self.average_ms * n + sample_ms) / (n + 1.0);
        self.pass_count += 1;
    }

    /// Mean speed implied by the mean travel time; 0 when the time is 0.
    pub fn avg_speed_mps(&self) -> f64 {
        if self.average_ms > 0.0 {
            self.length_m * 1000.0 / self.average_ms
        } else {
            0.0
        }
    }
}

/// Start, last sighting, and roads driven by one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VehicleTrip {
    pub start_ms:    u64,
    /// Time of the most recent sighting after the first.
    pub arrive_ms:   Option<u64>,
    /// Distinct consecutive roads, in the order driven.
    pub actual_path: Vec<RoadId>,
}

/// One row of `road_stats.csv`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadStat {
    pub road:          RoadId,
    pub vehicle_count: u64,
    pub avg_time_ms:   f64,
    pub avg_speed_mps: f64,
    pub length_m:      f64,
}

/// One row of `vehicle_trips.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripStat {
    pub vehicle:     VehicleId,
    pub start_ms:    u64,
    pub arrive_ms:   Option<u64>,
    /// `false` while the vehicle is still in the population.
    pub completed:   bool,
    pub actual_path: Vec<RoadId>,
}

/// Statistics snapshot at one point in simulated time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimStat {
    pub at_ms: u64,
    pub roads: Vec<RoadStat>,
    pub trips: Vec<TripStat>,
}
