//! `TrafficRecorder` — per-road travel times and per-vehicle trips built from
//! successive population sightings.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use tc_core::{RoadId, VehicleId};
use tc_spatial::RoadMap;
use tc_vehicle::PopulationStore;

use crate::{RoadStat, RoadTravelTime, SimStat, TripStat, VehicleTrip};

/// Road a vehicle was last seen on and when it got there.
#[derive(Debug, Clone, Copy)]
struct RoadEntry {
    road:       Option<RoadId>,
    entered_ms: u64,
}

/// Accumulates statistics from `record_step` calls.
///
/// A vehicle's time on a road is folded into that road's mean once the
/// vehicle is seen on a different road.  Roads the map does not know are not
/// tracked.
pub struct TrafficRecorder {
    map:      Arc<dyn RoadMap>,
    trips:    BTreeMap<VehicleId, VehicleTrip>,
    on_road:  BTreeMap<VehicleId, RoadEntry>,
    roads:    BTreeMap<RoadId, RoadTravelTime>,
}

impl TrafficRecorder {
    pub fn new(map: Arc<dyn RoadMap>) -> Self {
        Self {
            map,
            trips:   BTreeMap::new(),
            on_road: BTreeMap::new(),
            roads:   BTreeMap::new(),
        }
    }

    /// Record one sighting of every vehicle in `vehicles` at `now_ms`.
    pub fn record_step(
        &mut self,
        now_ms:   u64,
        vehicles: impl IntoIterator<Item = (VehicleId, Option<RoadId>)>,
    ) {
        for (id, road) in vehicles {
            self.record_trip(id, road, now_ms);
            self.record_road(id, road, now_ms);
        }
    }

    /// Record every alive kernel vehicle of `store`.
    pub fn record_population(&mut self, now_ms: u64, store: &PopulationStore) {
        self.record_step(now_ms, store.kernel().map(|v| (v.id, v.current_road())));
    }

    fn record_trip(&mut self, id: VehicleId, road: Option<RoadId>, now_ms: u64) {
        match self.trips.get_mut(&id) {
            None => {
                self.trips.insert(id, VehicleTrip {
                    start_ms:    now_ms,
                    arrive_ms:   None,
                    actual_path: road.into_iter().collect(),
                });
            }
            Some(trip) => {
                trip.arrive_ms = Some(now_ms);
                if let Some(road) = road {
                    if trip.actual_path.last() != Some(&road) {
                        trip.actual_path.push(road);
                    }
                }
            }
        }
    }

    fn record_road(&mut self, id: VehicleId, road: Option<RoadId>, now_ms: u64) {
        let entry = self.on_road.entry(id).or_insert(RoadEntry { road, entered_ms: now_ms });
        if entry.road == road {
            return;
        }
        let previous = std::mem::replace(entry, RoadEntry { road, entered_ms: now_ms });
        if let Some(prev_road) = previous.road {
            let sample = now_ms.saturating_sub(previous.entered_ms) as f64;
            fold_sample(&mut self.roads, &*self.map, prev_road, sample);
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Per-road means including the last road of every vehicle that is no
    /// longer in `present`.  Does not change the recorder.
    pub fn final_road_travel_times(&self, present: &BTreeSet<VehicleId>) -> BTreeMap<RoadId, RoadTravelTime> {
        let mut roads = self.roads.clone();
        for (id, trip) in self.trips.iter().filter(|(id, _)| !present.contains(*id)) {
            let Some(entry) = self.on_road.get(id) else { continue };
            let Some(road) = entry.road else { continue };
            let left_ms = trip.arrive_ms.unwrap_or(trip.start_ms);
            fold_sample(&mut roads, &*self.map, road, left_ms.saturating_sub(entry.entered_ms) as f64);
        }
        roads
    }

    /// Road and trip statistics at `now_ms`.  Vehicles in `present` are
    /// still driving; every other recorded vehicle has finished its trip.
    pub fn sim_stat(&self, present: &BTreeSet<VehicleId>, now_ms: u64) -> SimStat {
        let roads = self
            .final_road_travel_times(present)
            .into_iter()
            .map(|(road, t)| RoadStat {
                road,
                vehicle_count: t.pass_count,
                avg_time_ms:   t.average_ms,
                avg_speed_mps: t.avg_speed_mps(),
                length_m:      t.length_m,
            })
            .collect();
        let trips = self
            .trips
            .iter()
            .map(|(&vehicle, trip)| TripStat {
                vehicle,
                start_ms:    trip.start_ms,
                arrive_ms:   trip.arrive_ms,
                completed:   !present.contains(&vehicle),
                actual_path: trip.actual_path.clone(),
            })
            .collect();
        SimStat { at_ms: now_ms, roads, trips }
    }

    pub fn trip(&self, id: VehicleId) -> Option<&VehicleTrip> {
        self.trips.get(&id)
    }

    pub fn road(&self, road: RoadId) -> Option<&RoadTravelTime> {
        self.roads.get(&road)
    }

    pub fn vehicle_count(&self) -> usize {
        self.trips.len()
    }

    pub fn clear(&mut self) {
        self.trips.clear();
        self.on_road.clear();
        self.roads.clear();
    }
}

fn fold_sample(roads: &mut BTreeMap<RoadId, RoadTravelTime>, map: &dyn RoadMap, road: RoadId, sample_ms: f64) {
    if let Some(stat) = roads.get_mut(&road) {
        stat.fold(sample_ms);
        return;
    }
    match map.road_length_m(road) {
        Some(length_m) => {
            roads.insert(road, RoadTravelTime::first(length_m, sample_ms));
        }
        None => debug!(road = %road, "road unknown to map, travel time not tracked"),
    }
}
