//! The handoff engine: reconcile an incoming vehicle batch with the
//! population under the current region table.
//!
//! # Passes
//!
//! ```text
//! ⓪ Key     — batch → BTreeMap<VehicleId, IncomingRecord>; last occurrence wins.
//! ① Kill    — every alive kernel vehicle whose post-step range flag is false
//!             is killed (parallel, each worker touches only its own record).
//! ② Clear   — drop every edge vehicle; edges are rebuilt from the batch.
//! ③ Classify (parallel, read-only) — one Classification per id:
//!               registered ego          → skip
//!               malformed               → skip
//!               in range  ∧ Full        → promote to kernel unless resident
//!               in range  ∧ Simple      → pass through (drift check only)
//!               out of range            → edge stand-in
//!   Apply    (sequential, ascending id) — mutate the store.
//! ④ Finalize — compact, rebuild per-road index, report kernel count.
//! ```
//!
//! The kill pass decides on the flag recorded at the end of the last
//! simulation advance, never on the position injected by this call: a
//! vehicle the host reports just outside a region is only killed once the
//! kernel itself has moved it out.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use tc_behavior::TrafficKernel;
use tc_core::VehicleId;
use tc_spatial::{RegionTable, RoadMap};
use tc_vehicle::{EgoRegistry, IncomingRecord, PopulationStore, StoreError, VehicleRecord};

/// Drift tolerance (metres) between a pass-through record and the resident
/// kernel vehicle before a warning is logged.
pub const DEFAULT_MAX_ERROR_DISTANCE: f64 = 2.0;

/// Per-call outcome counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandoffReport {
    /// Kernel vehicles killed because they ended the last step out of range.
    pub killed:       usize,
    /// New kernel vehicles instantiated from Full records.
    pub promoted:     usize,
    /// Full records for vehicles that were already kernel-resident.
    pub retained:     usize,
    /// In-range Simple records (no kernel action).
    pub pass_through: usize,
    /// Edge stand-ins created.
    pub edge:         usize,
    /// Records skipped: ego ids, malformed records, identity conflicts.
    pub rejected:     usize,
    /// Kernel vehicles after finalize.
    pub kernel_count: usize,
}

/// Decision for one incoming record, computed without mutation.
enum Classification {
    EgoConflict,
    Rejected(StoreError),
    Promote(VehicleRecord),
    Retain,
    PassThrough { drift_m: Option<f64> },
    Edge(VehicleRecord),
}

/// Borrowed view of everything one handoff call reads or writes.
pub struct HandoffPass<'a> {
    pub store:   &'a mut PopulationStore,
    pub regions: &'a RegionTable,
    pub map:     &'a dyn RoadMap,
    pub egos:    &'a EgoRegistry,
    pub kernel:  &'a dyn TrafficKernel,
}

impl HandoffPass<'_> {
    /// Run all passes.  Per-record failures are logged and counted; they
    /// never fail the call.
    pub fn run(
        mut self,
        abs_time_ms:        u64,
        batch:              Vec<IncomingRecord>,
        max_error_distance: f64,
    ) -> HandoffReport {
        let mut report = HandoffReport::default();

        // ── ⓪ Key the batch ──────────────────────────────────────────────
        let mut keyed: BTreeMap<VehicleId, IncomingRecord> = BTreeMap::new();
        for record in batch {
            if let Some(previous) = keyed.insert(record.id(), record) {
                debug!(vehicle = %previous.id(), "duplicate id in batch, last record wins");
            }
        }

        // ── ① Kill out-of-range kernel vehicles ──────────────────────────
        let killed = kill_out_of_range(self.store);
        for &id in &killed {
            debug!(vehicle = %id, "kill: out of range after simulation");
            if let Some(record) = self.store.kernel_record(id) {
                self.kernel.on_vehicle_removed(record);
            }
        }
        report.killed = killed.len();

        // ── ② Clear edge vehicles ────────────────────────────────────────
        self.store.remove_all_edge_vehicles();

        // ── ③ Classify (produce) ─────────────────────────────────────────
        let decisions = self.classify(&keyed, abs_time_ms, max_error_distance);

        // ── ③ Apply (consume, ascending id) ──────────────────────────────
        for (id, decision) in decisions {
            self.apply(id, decision, &mut report);
        }

        // ── ④ Finalize ───────────────────────────────────────────────────
        self.store.compact();
        self.store.rebuild_road_index();
        report.kernel_count = self.store.kernel_count();

        info!(
            abs_time_ms,
            killed       = report.killed,
            promoted     = report.promoted,
            retained     = report.retained,
            pass_through = report.pass_through,
            edge         = report.edge,
            rejected     = report.rejected,
            kernel_count = report.kernel_count,
            "reset traffic info"
        );
        report
    }

    fn classify(
        &self,
        keyed:              &BTreeMap<VehicleId, IncomingRecord>,
        abs_time_ms:        u64,
        max_error_distance: f64,
    ) -> Vec<(VehicleId, Classification)> {
        let store   = &*self.store;
        let regions = self.regions;
        let map     = self.map;
        let egos    = self.egos;

        let decide = |(&id, record): (&VehicleId, &IncomingRecord)| {
            (id, classify_one(record, store, regions, map, egos, abs_time_ms, max_error_distance))
        };

        #[cfg(not(feature = "parallel"))]
        {
            keyed.iter().map(decide).collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            let entries: Vec<(&VehicleId, &IncomingRecord)> = keyed.iter().collect();
            // `collect` on an indexed parallel iterator preserves order, so
            // results stay in ascending id order.
            entries.into_par_iter().map(decide).collect()
        }
    }

    fn apply(&mut self, id: VehicleId, decision: Classification, report: &mut HandoffReport) {
        match decision {
            Classification::EgoConflict => {
                warn!(vehicle = %id, "skipping record: id is a registered ego");
                report.rejected += 1;
            }
            Classification::Rejected(e) => {
                warn!(vehicle = %id, error = %e, "skipping record");
                report.rejected += 1;
            }
            Classification::Promote(record) => match self.store.add_kernel_vehicle(record) {
                Ok(()) => {
                    debug!(vehicle = %id, "promote: kernel vehicle instantiated");
                    if let Some(record) = self.store.get(id) {
                        self.kernel.on_vehicle_added(record);
                    }
                    report.promoted += 1;
                }
                Err(e) => {
                    warn!(vehicle = %id, error = %e, "skipping record");
                    report.rejected += 1;
                }
            },
            Classification::Retain => {
                debug!(vehicle = %id, "retain: already kernel-resident");
                report.retained += 1;
            }
            Classification::PassThrough { drift_m } => {
                if let Some(drift_m) = drift_m {
                    warn!(vehicle = %id, drift_m, "pass-through record drifted from kernel position");
                }
                debug!(vehicle = %id, "pass-through");
                report.pass_through += 1;
            }
            Classification::Edge(record) => match self.store.add_edge_vehicle(record) {
                Ok(()) => {
                    debug!(vehicle = %id, "edge: stand-in registered");
                    report.edge += 1;
                }
                Err(e) => {
                    warn!(vehicle = %id, error = %e, "skipping record");
                    report.rejected += 1;
                }
            },
        }
    }
}

/// Kill every alive kernel vehicle whose post-step flag is false.  Returns
/// the killed ids in ascending order.
fn kill_out_of_range(store: &mut PopulationStore) -> Vec<VehicleId> {
    let kill = |record: &mut VehicleRecord| {
        if record.alive && !record.in_range_after_simulation {
            record.alive = false;
            Some(record.id)
        } else {
            None
        }
    };

    #[cfg(not(feature = "parallel"))]
    {
        store.kernel_values_mut().filter_map(kill).collect()
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let mut killed: Vec<VehicleId> = store.kernel_values_mut().par_bridge().filter_map(kill).collect();
        killed.sort_unstable();
        killed
    }
}

fn classify_one(
    record:             &IncomingRecord,
    store:              &PopulationStore,
    regions:            &RegionTable,
    map:                &dyn RoadMap,
    egos:               &EgoRegistry,
    now_ms:             u64,
    max_error_distance: f64,
) -> Classification {
    let id = record.id();
    if egos.contains(id) {
        return Classification::EgoConflict;
    }
    if let Err(e) = record.validate(map) {
        return Classification::Rejected(e);
    }

    let in_range = regions.in_range(record.position());
    match (in_range, record) {
        (true, IncomingRecord::Full(state)) => {
            if store.is_kernel_resident(id) {
                Classification::Retain
            } else {
                Classification::Promote(VehicleRecord::kernel_from_state(state, true, now_ms))
            }
        }
        (true, IncomingRecord::Simple(pos)) => {
            let drift_m = store
                .get(id)
                .filter(|r| r.is_kernel())
                .map(|r| r.position.distance_m(pos.position))
                .filter(|&d| d > max_error_distance);
            Classification::PassThrough { drift_m }
        }
        (false, IncomingRecord::Full(state)) => {
            Classification::Edge(VehicleRecord::edge_from_state(state, now_ms))
        }
        (false, IncomingRecord::Simple(pos)) => {
            Classification::Edge(VehicleRecord::edge_from_position(pos, now_ms))
        }
    }
}
