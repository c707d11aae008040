//! One simulation advance.
//!
//! ```text
//! ① Spawn   — active input agents whose timer elapsed inject kernel vehicles.
//! ② Intents — TrafficKernel::advance for every alive kernel vehicle
//!             (parallel with the `parallel` feature).
//! ③ Apply   — in ascending VehicleId order:
//!               Move(m)  → overwrite position, kinematics, route progress
//!               Despawn  → kill
//!               Stay     → nothing
//! ④ Post    — refresh post-step range flags, compact, rebuild road index.
//! ```
//!
//! Edge vehicles are never advanced.

use tracing::{debug, warn};

use tc_behavior::{BehaviorResult, Intent, StepContext, TrafficKernel};
use tc_core::{TimeParams, VehicleId};
use tc_spatial::{RegionTable, RoadMap};
use tc_vehicle::{EgoRegistry, PopulationStore};

use crate::spawn::InputAgents;

/// Per-step outcome counts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepReport {
    pub time:         TimeParams,
    pub spawned:      usize,
    pub moved:        usize,
    pub despawned:    usize,
    /// Vehicles whose `advance` returned an error (left unchanged).
    pub failed:       usize,
    pub kernel_count: usize,
}

pub(crate) struct StepPass<'a> {
    pub store:           &'a mut PopulationStore,
    pub regions:         &'a RegionTable,
    pub map:             &'a dyn RoadMap,
    pub egos:            &'a EgoRegistry,
    pub kernel:          &'a dyn TrafficKernel,
    pub agents:          &'a mut InputAgents,
    pub spawn_speed_mps: f64,
}

impl StepPass<'_> {
    pub fn run(self, time: TimeParams) -> StepReport {
        let mut report = StepReport { time, ..StepReport::default() };

        // ── ① Spawn ──────────────────────────────────────────────────────
        let spawned = self.agents.spawn_due(self.store, self.egos, &time, self.spawn_speed_mps);
        for &id in &spawned {
            if let Some(record) = self.store.get(id) {
                self.kernel.on_vehicle_added(record);
            }
        }
        report.spawned = spawned.len();

        // ── ② Intent phase (produce) ─────────────────────────────────────
        let intents = compute_intents(self.store, self.regions, self.map, self.kernel, time);

        // ── ③ Apply phase (consume) ──────────────────────────────────────
        //
        // Intents arrive in ascending id order (BTreeMap iteration), so the
        // result is deterministic even when the intent phase ran in parallel.
        for (id, result) in intents {
            match result {
                Ok(Intent::Move(m)) => {
                    if let Some(v) = self.store.kernel_mut(id) {
                        v.position      = m.position;
                        v.kinematics    = m.kinematics;
                        v.road_idx      = m.road_idx;
                        v.road_offset_m = m.road_offset_m;
                        report.moved += 1;
                    }
                }
                Ok(Intent::Despawn) => {
                    if self.store.kill(id).is_ok() {
                        debug!(vehicle = %id, "despawn: route finished");
                        if let Some(record) = self.store.kernel_record(id) {
                            self.kernel.on_vehicle_removed(record);
                        }
                        report.despawned += 1;
                    }
                }
                Ok(Intent::Stay) => {}
                Err(e) => {
                    warn!(vehicle = %id, error = %e, "kernel advance failed, vehicle left unchanged");
                    report.failed += 1;
                }
            }
        }

        // ── ④ Post-step bookkeeping ──────────────────────────────────────
        self.store.refresh_range_flags(self.regions);
        self.store.compact();
        self.store.rebuild_road_index();
        report.kernel_count = self.store.kernel_count();
        report
    }
}

/// Call the kernel for every alive kernel vehicle against a shared read-only
/// context.  With the `parallel` feature the calls run on the current Rayon
/// pool.
fn compute_intents(
    store:   &PopulationStore,
    regions: &RegionTable,
    map:     &dyn RoadMap,
    kernel:  &dyn TrafficKernel,
    time:    TimeParams,
) -> Vec<(VehicleId, BehaviorResult<Intent>)> {
    let ctx = StepContext::new(time, regions, map, store);

    #[cfg(not(feature = "parallel"))]
    {
        store.kernel().map(|v| (v.id, kernel.advance(v, &ctx))).collect()
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let vehicles: Vec<&tc_vehicle::VehicleRecord> = store.kernel().collect();
        vehicles
            .into_par_iter()
            .map(|v| (v.id, kernel.advance(v, &ctx)))
            .collect()
    }
}
