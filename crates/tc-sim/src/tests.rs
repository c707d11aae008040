//! Integration tests for tc-sim.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tc_behavior::{
    BehaviorError, BehaviorResult, CruiseKernel, Intent, Motion, NoopKernel, StepContext, TrafficKernel,
};
use tc_core::{GeoPoint, InputAgentId, MapRange, RoadId, TimeParams, VehicleId};
use tc_spatial::{RegionTable, RoadMap, RoadTable};
use tc_vehicle::{
    ArchiveKind, EgoRegistry, IncomingRecord, Kinematics, LocationState, PopulationStore,
    PositionOnly, VehicleRecord, VehicleState, VehicleType,
};

use crate::{
    DEFAULT_MAX_ERROR_DISTANCE, ErrCode, HandoffPass, HandoffReport, InputAgentConfig,
    ManagerConfig, StepObserver, StepReport, TrafficManager,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn unit_square() -> MapRange {
    MapRange::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0))
}

fn roads() -> RoadTable {
    [(RoadId(1), 10_000.0), (RoadId(2), 10_000.0), (RoadId(3), 5.0)].into_iter().collect()
}

fn test_config() -> ManagerConfig {
    ManagerConfig {
        time_step_s: 1.0,
        num_threads: Some(2),
        regions:     vec![unit_square()],
        ..ManagerConfig::default()
    }
}

fn manager_with<K: TrafficKernel>(kernel: K) -> TrafficManager<K, RoadTable> {
    let manager = TrafficManager::new(kernel, roads());
    assert_eq!(manager.init(test_config()), ErrCode::Succ);
    manager
}

fn manager() -> TrafficManager<NoopKernel, RoadTable> {
    manager_with(NoopKernel)
}

fn state(id: u64, lon: f64, lat: f64) -> VehicleState {
    VehicleState {
        id:            VehicleId(id),
        position:      GeoPoint::new(lon, lat),
        kinematics:    Kinematics { speed_mps: 10.0, ..Kinematics::default() },
        route:         vec![RoadId(1), RoadId(2)],
        road_idx:      0,
        road_offset_m: 0.0,
        lane_id:       1,
        vehicle_type:  VehicleType::Car,
    }
}

fn full(id: u64, lon: f64, lat: f64) -> IncomingRecord {
    IncomingRecord::Full(state(id, lon, lat))
}

fn simple(id: u64, lon: f64, lat: f64) -> IncomingRecord {
    IncomingRecord::Simple(PositionOnly {
        id:          VehicleId(id),
        position:    GeoPoint::new(lon, lat),
        heading_rad: 0.0,
        speed_mps:   10.0,
        route:       None,
    })
}

fn kernel_ids<K: TrafficKernel>(m: &TrafficManager<K, RoadTable>) -> Vec<u64> {
    m.with_population(|s| s.kernel().map(|v| v.id.0).collect()).unwrap_or_default()
}

fn edge_ids<K: TrafficKernel>(m: &TrafficManager<K, RoadTable>) -> Vec<u64> {
    m.with_population(|s| s.edge().map(|v| v.id.0).collect()).unwrap_or_default()
}

/// No id is alive as both a kernel and an edge vehicle.
fn assert_disjoint<K: TrafficKernel>(m: &TrafficManager<K, RoadTable>) {
    let kernel: BTreeSet<u64> = kernel_ids(m).into_iter().collect();
    for id in edge_ids(m) {
        assert!(!kernel.contains(&id), "vehicle {id} alive in both subsets");
    }
}

/// Moves every vehicle to a fixed point.
struct JumpKernel(GeoPoint);

impl TrafficKernel for JumpKernel {
    fn advance(&self, vehicle: &VehicleRecord, _ctx: &StepContext<'_>) -> BehaviorResult<Intent> {
        Ok(Intent::Move(Motion {
            position:      self.0,
            kinematics:    vehicle.kinematics,
            road_idx:      vehicle.road_idx,
            road_offset_m: vehicle.road_offset_m,
        }))
    }
}

/// Reflects every vehicle across the meridian at lon 1.0 each step.
struct MirrorKernel;

impl TrafficKernel for MirrorKernel {
    fn advance(&self, vehicle: &VehicleRecord, _ctx: &StepContext<'_>) -> BehaviorResult<Intent> {
        let p = vehicle.position;
        Ok(Intent::Move(Motion {
            position:      GeoPoint::new(2.0 - p.lon, p.lat),
            kinematics:    vehicle.kinematics,
            road_idx:      vehicle.road_idx,
            road_offset_m: vehicle.road_offset_m,
        }))
    }
}

/// Every kernel vehicle's post-step flag agrees with the current region table.
fn assert_flags_match_regions<K: TrafficKernel>(m: &TrafficManager<K, RoadTable>) {
    let regions = m.regions();
    m.with_population(|s| {
        for v in s.kernel() {
            assert_eq!(
                v.in_range_after_simulation,
                regions.in_range(v.position),
                "vehicle {} at {}", v.id, v.position
            );
        }
    });
}

/// Records every hook call.
#[derive(Clone, Default)]
struct Counters {
    starts:   Arc<AtomicUsize>,
    ends:     Arc<AtomicUsize>,
    handoffs: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl StepObserver for Counters {
    fn on_step_start(&mut self, _time: &TimeParams) {
        self.starts.fetch_add(1, Ordering::Relaxed);
    }
    fn on_step_end(&mut self, _report: &StepReport, _store: &PopulationStore) {
        self.ends.fetch_add(1, Ordering::Relaxed);
    }
    fn on_handoff(&mut self, _t: u64, _report: &HandoffReport, _store: &PopulationStore) {
        self.handoffs.fetch_add(1, Ordering::Relaxed);
    }
    fn on_release(&mut self, _time: &TimeParams) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }
}

// ── Handoff engine ────────────────────────────────────────────────────────────

#[cfg(test)]
mod handoff {
    use super::*;

    fn run_pass(store: &mut PopulationStore, egos: &EgoRegistry, batch: Vec<IncomingRecord>) -> HandoffReport {
        let regions = RegionTable::from_ranges([unit_square()]);
        let map = roads();
        HandoffPass { store, regions: &regions, map: &map, egos, kernel: &NoopKernel }
            .run(0, batch, DEFAULT_MAX_ERROR_DISTANCE)
    }

    #[test]
    fn classifies_every_record() {
        let mut store = PopulationStore::new(1_000);
        let egos = EgoRegistry::new();
        let report = run_pass(&mut store, &egos, vec![
            full(1, 0.5, 0.5),   // in range, Full      → promote
            simple(2, 5.0, 5.0), // out of range        → edge
            full(3, 5.0, 5.0),   // out of range, Full  → edge
            simple(4, 0.5, 0.5), // in range, Simple    → pass-through
        ]);

        assert_eq!(report.promoted, 1);
        assert_eq!(report.edge, 2);
        assert_eq!(report.pass_through, 1);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.kernel_count, 1);
        assert!(store.is_kernel_resident(VehicleId(1)));
        assert_eq!(store.edge().map(|v| v.id.0).collect::<Vec<_>>(), vec![2, 3]);
        assert!(!store.contains_alive(VehicleId(4)));
    }

    #[test]
    fn full_record_for_resident_vehicle_is_retained() {
        let mut store = PopulationStore::new(1_000);
        let egos = EgoRegistry::new();
        run_pass(&mut store, &egos, vec![full(1, 0.5, 0.5)]);
        store.kernel_mut(VehicleId(1)).unwrap().position = GeoPoint::new(0.6, 0.6);

        let report = run_pass(&mut store, &egos, vec![full(1, 0.5, 0.5)]);
        assert_eq!(report.retained, 1);
        assert_eq!(report.promoted, 0);
        // The resident state wins over the injected one.
        assert_eq!(store.get(VehicleId(1)).unwrap().position, GeoPoint::new(0.6, 0.6));
    }

    #[test]
    fn ego_ids_are_skipped() {
        let mut store = PopulationStore::new(1_000);
        let egos = EgoRegistry::new();
        egos.register(VehicleId(9), LocationState::at(GeoPoint::new(0.5, 0.5)), false).unwrap();

        let report = run_pass(&mut store, &egos, vec![full(9, 0.5, 0.5), simple(8, 5.0, 5.0)]);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.edge, 1);
        assert!(!store.contains_alive(VehicleId(9)));
    }

    #[test]
    fn malformed_records_do_not_abort_the_batch() {
        let mut store = PopulationStore::new(1_000);
        let egos = EgoRegistry::new();
        let mut bad_route = state(2, 0.5, 0.5);
        bad_route.route = vec![RoadId(99)];
        let report = run_pass(&mut store, &egos, vec![
            full(1, 0.5, 0.5),
            IncomingRecord::Full(bad_route),
            simple(3, f64::NAN, 0.5),
            full(4, 0.4, 0.4),
        ]);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.promoted, 2);
        assert_eq!(store.kernel().map(|v| v.id.0).collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn duplicate_ids_last_record_wins() {
        let mut store = PopulationStore::new(1_000);
        let egos = EgoRegistry::new();
        let report = run_pass(&mut store, &egos, vec![full(1, 0.5, 0.5), simple(1, 5.0, 5.0)]);
        assert_eq!(report.promoted, 0);
        assert_eq!(report.edge, 1);
        assert_eq!(store.representation_of(VehicleId(1)), Some(tc_vehicle::Representation::Edge));
    }

    #[test]
    fn out_of_range_record_for_kernel_vehicle_is_a_conflict() {
        let mut store = PopulationStore::new(1_000);
        let egos = EgoRegistry::new();
        run_pass(&mut store, &egos, vec![full(1, 0.5, 0.5)]);

        // Host reports the vehicle outside; the kernel still has it inside.
        let report = run_pass(&mut store, &egos, vec![simple(1, 5.0, 5.0)]);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.killed, 0);
        assert!(store.is_kernel_resident(VehicleId(1)));
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn idempotent_without_intervening_step() {
        let m = manager();
        let batch = || vec![full(1, 0.5, 0.5), full(2, 0.2, 0.8), simple(3, 2.0, 2.0), simple(4, 0.1, 0.1)];

        assert_eq!(m.reset_traffic_info(0, batch(), DEFAULT_MAX_ERROR_DISTANCE), 2);
        let (kernel, edges) = (kernel_ids(&m), edge_ids(&m));

        assert_eq!(m.reset_traffic_info(0, batch(), DEFAULT_MAX_ERROR_DISTANCE), 2);
        assert_eq!(kernel_ids(&m), kernel);
        assert_eq!(edge_ids(&m), edges);
        assert_disjoint(&m);
    }

    #[test]
    fn edges_are_rebuilt_from_each_batch() {
        let m = manager();
        m.reset_traffic_info(0, vec![simple(10, 3.0, 3.0), simple(11, 4.0, 4.0)], DEFAULT_MAX_ERROR_DISTANCE);
        assert_eq!(edge_ids(&m), vec![10, 11]);

        m.reset_traffic_info(100, vec![simple(12, 3.0, 3.0)], DEFAULT_MAX_ERROR_DISTANCE);
        assert_eq!(edge_ids(&m), vec![12]);

        m.reset_traffic_info(200, Vec::new(), DEFAULT_MAX_ERROR_DISTANCE);
        assert_eq!(m.edge_count(), 0);
    }

    #[test]
    fn kill_uses_position_after_simulation() {
        let m = manager_with(CruiseKernel);
        // 10 m/s eastwards, ~5 m inside the east boundary.
        m.reset_traffic_info(0, vec![full(7, 0.99995, 0.5)], DEFAULT_MAX_ERROR_DISTANCE);
        assert_eq!(kernel_ids(&m), vec![7]);

        // An injected out-of-range position does not kill it.
        m.reset_traffic_info(0, vec![simple(7, 1.5, 0.5)], DEFAULT_MAX_ERROR_DISTANCE);
        assert_eq!(kernel_ids(&m), vec![7]);

        // One second later the kernel itself has moved it out.
        assert_eq!(m.step_relative(1.0), ErrCode::Succ);
        assert_eq!(m.with_population(|s| s.in_range_after_simulation(VehicleId(7))), Some(false));
        assert_eq!(m.kernel_count(), 1);

        let out = m.with_population(|s| s.get(VehicleId(7)).unwrap().position).unwrap();
        assert_eq!(m.reset_traffic_info(1_000, vec![full(7, out.lon, out.lat)], DEFAULT_MAX_ERROR_DISTANCE), 0);
        assert_eq!(edge_ids(&m), vec![7]);
        assert_disjoint(&m);
    }

    #[test]
    fn vehicle_moved_into_range_survives_kill() {
        let m = manager_with(JumpKernel(GeoPoint::new(5.5, 5.5)));
        assert_eq!(m.reset_traffic_info(0, vec![full(7, 0.5, 0.5)], DEFAULT_MAX_ERROR_DISTANCE), 1);

        // The region moves away from the vehicle.
        let far = MapRange::new(GeoPoint::new(5.0, 5.0), GeoPoint::new(6.0, 6.0));
        assert!(m.reset_simulation_range([far]));
        assert_eq!(m.with_population(|s| s.in_range_after_simulation(VehicleId(7))), Some(false));

        // The kernel drives it back inside before the next reset.
        assert!(m.step_relative(1.0).is_succ());
        assert_eq!(m.with_population(|s| s.in_range_after_simulation(VehicleId(7))), Some(true));

        assert_eq!(m.reset_traffic_info(1_000, Vec::new(), DEFAULT_MAX_ERROR_DISTANCE), 1);
        assert_eq!(kernel_ids(&m), vec![7]);
    }

    #[test]
    fn vehicle_crosses_into_neighbouring_manager() {
        let west = manager_with(CruiseKernel);
        let east = TrafficManager::new(CruiseKernel, roads());
        east.reset_simulation_range([MapRange::new(GeoPoint::new(1.0, 0.0), GeoPoint::new(2.0, 1.0))]);
        assert!(east.init(ManagerConfig { regions: Vec::new(), ..test_config() }).is_succ());

        west.reset_traffic_info(0, vec![full(7, 0.99995, 0.5)], DEFAULT_MAX_ERROR_DISTANCE);
        west.step_relative(1.0);

        let snapshot = west.snapshot_micro(1).unwrap();
        assert_eq!(snapshot.vehicles[0].archive_kind, ArchiveKind::Full);

        assert_eq!(east.reset_traffic_info(1_000, snapshot.into_incoming(), DEFAULT_MAX_ERROR_DISTANCE), 1);
        assert_eq!(west.reset_traffic_info(1_000, Vec::new(), DEFAULT_MAX_ERROR_DISTANCE), 0);
        assert_eq!(kernel_ids(&east), vec![7]);
    }
}

// ── Stepping ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod stepping {
    use super::*;

    struct FailingKernel;

    impl TrafficKernel for FailingKernel {
        fn advance(&self, vehicle: &VehicleRecord, _ctx: &StepContext<'_>) -> BehaviorResult<Intent> {
            Err(BehaviorError::Kernel { id: vehicle.id, reason: "diverged".into() })
        }
    }

    #[test]
    fn not_initialized_fails() {
        let m = TrafficManager::new(NoopKernel, roads());
        assert_eq!(m.step_abs(100), ErrCode::Err);
        assert_eq!(m.step_relative(0.1), ErrCode::Err);
        assert_eq!(m.step(0, 0, 0, 1), ErrCode::Err);
        assert_eq!(m.release(), ErrCode::Err);
    }

    #[test]
    fn absolute_mode_uses_config_step() {
        let m = manager();
        assert!(m.step_abs(1_000).is_succ());
        assert!(m.step_abs(2_500).is_succ());
        let t = m.current_time().unwrap();
        assert_eq!(t.abs_time_ms, 2_500);
        assert_eq!(t.delta_s, 1.0);
        assert_eq!(t.passed_s, 2.0);
        assert_eq!(t.step_index, 2);
    }

    #[test]
    fn relative_mode_accumulates() {
        let m = manager();
        assert!(m.step_relative(0.5).is_succ());
        assert!(m.step(1, 0, 0, 1).is_succ());
        let t = m.current_time().unwrap();
        assert_eq!(t.abs_time_ms, 1_500);
        assert_eq!(t.passed_s, 1.5);
    }

    #[test]
    fn mixing_modes_is_rejected() {
        let m = manager();
        assert!(m.step_abs(1_000).is_succ());
        assert_eq!(m.step_relative(0.1), ErrCode::Err);
        assert_eq!(m.current_time().unwrap().step_index, 1);

        let m = manager();
        assert!(m.step_relative(0.1).is_succ());
        assert_eq!(m.step_abs(5_000), ErrCode::Err);
    }

    #[test]
    fn invalid_steps_are_rejected() {
        let m = manager();
        assert_eq!(m.step_relative(0.0), ErrCode::Err);
        assert_eq!(m.step_relative(f64::NAN), ErrCode::Err);
        assert!(m.step_abs(1_000).is_succ());
        assert_eq!(m.step_abs(500), ErrCode::Err);
        assert_eq!(m.current_time().unwrap().abs_time_ms, 1_000);
    }

    #[test]
    fn clock_overflow_fails_the_step() {
        let m = manager();
        assert!(m.step_relative(1.0e16).is_succ());
        assert_eq!(m.step_relative(1.0e16), ErrCode::Err);
        assert_eq!(m.current_time().unwrap().step_index, 1);
        // The manager stays usable.
        assert!(m.step_relative(1.0).is_succ());
    }

    #[test]
    fn cruise_moves_and_despawns() {
        let m = manager_with(CruiseKernel);
        let mut short = state(1, 0.5, 0.5);
        short.route = vec![RoadId(3)]; // 5 m road
        m.reset_traffic_info(0, vec![IncomingRecord::Full(short), full(2, 0.5, 0.4)], DEFAULT_MAX_ERROR_DISTANCE);

        assert!(m.step_relative(1.0).is_succ());
        assert_eq!(kernel_ids(&m), vec![2]);
        let moved = m.with_population(|s| s.get(VehicleId(2)).unwrap().clone()).unwrap();
        assert!(moved.position.lon > 0.5);
        assert!((moved.road_offset_m - 10.0).abs() < 1e-9);
    }

    #[test]
    fn kernel_errors_leave_vehicle_unchanged() {
        let m = manager_with(FailingKernel);
        m.reset_traffic_info(0, vec![full(1, 0.5, 0.5)], DEFAULT_MAX_ERROR_DISTANCE);
        assert!(m.step_relative(1.0).is_succ());
        let pos = m.with_population(|s| s.get(VehicleId(1)).unwrap().position).unwrap();
        assert_eq!(pos, GeoPoint::new(0.5, 0.5));
    }

    #[test]
    fn observers_see_every_call() {
        let m = manager();
        let counters = Counters::default();
        m.add_observer(Box::new(counters.clone()));

        m.step_relative(0.1);
        m.step_relative(0.1);
        m.step_abs(10_000); // rejected before any hook runs
        m.reset_traffic_info(0, Vec::new(), DEFAULT_MAX_ERROR_DISTANCE);
        m.release();

        assert_eq!(counters.starts.load(Ordering::Relaxed), 2);
        assert_eq!(counters.ends.load(Ordering::Relaxed), 2);
        assert_eq!(counters.handoffs.load(Ordering::Relaxed), 1);
        assert_eq!(counters.releases.load(Ordering::Relaxed), 1);
    }
}

// ── Egos ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod egos {
    use super::*;

    fn at(lon: f64, lat: f64) -> LocationState {
        LocationState::at(GeoPoint::new(lon, lat))
    }

    #[test]
    fn add_checks_placement_and_identity() {
        let m = manager();
        m.reset_traffic_info(0, vec![full(1, 0.5, 0.5)], DEFAULT_MAX_ERROR_DISTANCE);

        // ~1 m from vehicle 1.
        assert_eq!(m.add_ego(VehicleId(100), at(0.50001, 0.5)), ErrCode::Err);
        assert_eq!(m.add_ego(VehicleId(1), at(0.9, 0.9)), ErrCode::Err);
        assert_eq!(m.add_ego(VehicleId(100), at(0.6, 0.5)), ErrCode::Succ);
        assert_eq!(m.add_ego(VehicleId(100), at(0.7, 0.5)), ErrCode::Err);
        assert_eq!(m.ego_count(), 1);
    }

    #[test]
    fn forced_add_takes_over_vehicle_id() {
        let m = manager();
        m.reset_traffic_info(0, vec![full(1, 0.5, 0.5), simple(2, 3.0, 3.0)], DEFAULT_MAX_ERROR_DISTANCE);

        assert!(m.add_ego_force(VehicleId(1), at(0.5, 0.5)).is_succ());
        assert!(m.add_ego_force(VehicleId(2), at(3.0, 3.0)).is_succ());
        assert_eq!(m.kernel_count(), 0);
        assert_eq!(m.edge_count(), 0);
        assert_eq!(m.ego_count(), 2);
        assert!(m.snapshot_micro(0).unwrap().egos.iter().all(|e| e.managed));

        // Still rejected when already an ego.
        assert_eq!(m.add_ego_force(VehicleId(1), at(0.5, 0.5)), ErrCode::Err);
    }

    #[test]
    fn delete_and_update_require_a_known_ego() {
        let m = manager();
        assert_eq!(m.delete_ego(VehicleId(5), 0), ErrCode::Err);
        assert_eq!(m.update_ego_info(VehicleId(5), at(0.1, 0.1)), ErrCode::Err);

        assert!(m.add_ego(VehicleId(5), at(0.1, 0.1)).is_succ());
        assert!(m.update_ego_info(VehicleId(5), at(0.2, 0.2)).is_succ());
        assert!(m.delete_ego(VehicleId(5), 3).is_succ());
        assert_eq!(m.ego_count(), 0);
    }

    #[test]
    fn reset_makes_registry_equal_to_map() {
        let m = manager();
        for id in [1, 2, 3] {
            assert!(m.add_ego(VehicleId(id), at(0.1 * id as f64, 0.1)).is_succ());
        }

        let target: BTreeMap<VehicleId, LocationState> =
            [(VehicleId(2), at(0.25, 0.25)), (VehicleId(4), at(0.4, 0.4))].into_iter().collect();
        assert_eq!(m.reset_ego_info(0, &target), 2);

        let egos = m.snapshot_micro(0).unwrap().egos;
        assert_eq!(egos.iter().map(|e| e.id.0).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(egos[0].location.position, GeoPoint::new(0.25, 0.25));
    }

    #[test]
    fn reset_on_uninitialized_manager_returns_zero() {
        let m = TrafficManager::new(NoopKernel, roads());
        let target: BTreeMap<VehicleId, LocationState> = [(VehicleId(1), at(0.5, 0.5))].into_iter().collect();
        assert_eq!(m.reset_ego_info(0, &target), 0);
        assert_eq!(m.add_ego(VehicleId(1), at(0.5, 0.5)), ErrCode::Err);
    }

    #[test]
    fn spawned_vehicles_skip_ego_ids() {
        let mut config = test_config();
        config.spawn_id_base = 50;
        config.input_agents = vec![InputAgentConfig {
            id:       InputAgentId(0),
            location: GeoPoint::new(0.5, 0.5),
            routes:   vec![vec![RoadId(1)]],
            period_s: 1.0,
        }];
        let m = TrafficManager::new(NoopKernel, roads());
        assert!(m.init(config).is_succ());
        assert!(m.add_ego_force(VehicleId(50), at(0.9, 0.9)).is_succ());

        m.step_relative(1.0);
        assert_eq!(kernel_ids(&m), vec![51]);
    }

    #[test]
    fn query_by_circle_returns_vehicles_and_egos_nearest_first() {
        let m = manager();
        m.reset_traffic_info(0, vec![full(1, 0.5001, 0.5), full(2, 0.51, 0.5)], DEFAULT_MAX_ERROR_DISTANCE);
        assert!(m.add_ego_force(VehicleId(100), at(0.5, 0.5)).is_succ());
        assert!(m.add_ego_force(VehicleId(101), at(0.5, 0.5002)).is_succ());

        let hits = m.query_by_circle(VehicleId(100), 50.0).unwrap();
        assert_eq!(hits, vec![VehicleId(1), VehicleId(101)]);
        assert_eq!(m.query_by_circle(VehicleId(999), 50.0), None);
    }
}

// ── Input agents ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod spawning {
    use super::*;

    fn config_with_agent(lon: f64) -> ManagerConfig {
        ManagerConfig {
            time_step_s:  0.5,
            input_agents: vec![InputAgentConfig {
                id:       InputAgentId(3),
                location: GeoPoint::new(lon, 0.5),
                routes:   vec![vec![RoadId(1)], vec![RoadId(2)]],
                period_s: 1.0,
            }],
            ..test_config()
        }
    }

    #[test]
    fn active_agent_spawns_on_its_period() {
        let m = TrafficManager::new(NoopKernel, roads());
        assert!(m.init(config_with_agent(0.5)).is_succ());
        for _ in 0..4 {
            assert!(m.step(0, 0, 0, 1).is_succ());
        }
        // passed_s = 0.5, 1.0, 1.5, 2.0 → spawns at 0.5, 1.0, 2.0
        assert_eq!(kernel_ids(&m), vec![1_000_000_000, 1_000_000_001, 1_000_000_002]);
    }

    #[test]
    fn inactive_agent_builds_no_backlog() {
        let m = TrafficManager::new(NoopKernel, roads());
        assert!(m.init(config_with_agent(5.0)).is_succ());
        for _ in 0..6 {
            m.step(0, 0, 0, 1);
        }
        assert_eq!(m.kernel_count(), 0);

        assert!(m.reset_simulation_range([
            unit_square(),
            MapRange::new(GeoPoint::new(4.0, 0.0), GeoPoint::new(6.0, 1.0)),
        ]));
        m.step(0, 0, 0, 1);
        assert_eq!(m.kernel_count(), 1);
    }

    #[test]
    fn route_choice_is_deterministic_per_seed() {
        let routes = |seed: u64| {
            let m = TrafficManager::new(NoopKernel, roads());
            assert!(m.init(ManagerConfig { seed, ..config_with_agent(0.5) }).is_succ());
            for _ in 0..20 {
                m.step(0, 0, 0, 1);
            }
            m.with_population(|s| s.kernel().map(|v| v.route.clone()).collect::<Vec<_>>()).unwrap()
        };
        assert_eq!(routes(11), routes(11));
        assert_eq!(routes(11).len(), 11);
    }
}

// ── Control plane ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod control {
    use super::*;

    #[test]
    fn uninitialized_manager_reports_failure_values() {
        let m = TrafficManager::new(NoopKernel, roads());
        assert_eq!(m.reset_traffic_info(0, vec![full(1, 0.5, 0.5)], DEFAULT_MAX_ERROR_DISTANCE), 0);
        assert!(m.snapshot_micro(0).is_none());
        assert!(m.query_by_circle(VehicleId(1), 10.0).is_none());
        assert_eq!(m.kernel_count(), 0);

        // The range is still accepted and used by the next init.
        assert!(!m.reset_simulation_range([unit_square()]));
        assert!(m.in_range(GeoPoint::new(0.5, 0.5)));
        assert!(m.init(ManagerConfig { regions: Vec::new(), ..test_config() }).is_succ());
        assert_eq!(m.regions().len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let m = TrafficManager::new(NoopKernel, roads());
        assert_eq!(m.init(ManagerConfig { time_step_s: 0.0, ..ManagerConfig::default() }), ErrCode::Err);
        assert!(!m.is_initialized());
    }

    #[test]
    fn release_drops_population_and_keeps_regions() {
        let m = manager();
        m.reset_traffic_info(0, vec![full(1, 0.5, 0.5)], DEFAULT_MAX_ERROR_DISTANCE);
        assert!(m.release().is_succ());
        assert_eq!(m.kernel_count(), 0);
        assert!(m.in_range(GeoPoint::new(0.5, 0.5)));
        assert_eq!(m.release(), ErrCode::Err);
    }

    #[test]
    fn shrinking_the_range_kills_on_next_reset() {
        let m = manager();
        m.reset_traffic_info(0, vec![full(1, 0.5, 0.5), full(2, 0.1, 0.1)], DEFAULT_MAX_ERROR_DISTANCE);

        assert!(m.reset_simulation_range([MapRange::new(GeoPoint::new(0.4, 0.4), GeoPoint::new(0.6, 0.6))]));
        assert_eq!(m.kernel_count(), 2);
        assert_eq!(m.reset_traffic_info(0, Vec::new(), DEFAULT_MAX_ERROR_DISTANCE), 1);
        assert_eq!(kernel_ids(&m), vec![1]);
    }

    #[test]
    fn snapshot_does_not_mutate() {
        let m = manager();
        m.reset_traffic_info(0, vec![full(1, 0.5, 0.5), simple(2, 3.0, 3.0)], DEFAULT_MAX_ERROR_DISTANCE);
        let a = m.snapshot_micro(7).unwrap();
        let b = m.snapshot_micro(7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.vehicles.len(), 1);
        assert_eq!(a.vehicles[0].archive_kind, ArchiveKind::Simple);
        assert_eq!(a.edges[0].archive_kind, ArchiveKind::Simple);
        assert_eq!((m.kernel_count(), m.edge_count()), (1, 1));

        let json = a.to_json().unwrap();
        assert!(json.contains("\"frame_id\":7"));
    }

    #[test]
    fn concurrent_calls_are_serialized() {
        let m = Arc::new(manager());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let m = Arc::clone(&m);
                std::thread::spawn(move || {
                    for i in 0..10u64 {
                        let id = VehicleId(t * 100 + i);
                        assert!(m.add_ego_force(id, LocationState::at(GeoPoint::new(0.5, 0.5))).is_succ());
                        assert!(m.step_relative(0.1).is_succ());
                        m.reset_traffic_info(0, vec![full(10_000 + t, 0.2, 0.2)], DEFAULT_MAX_ERROR_DISTANCE);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(m.ego_count(), 80);
        assert_eq!(m.current_time().unwrap().step_index, 80);
        assert_disjoint(&m);
    }

    #[test]
    fn range_resets_interleave_with_steps() {
        let m = Arc::new(manager_with(MirrorKernel));
        let batch: Vec<_> = (1..=20u64).map(|i| full(i, 0.5, 0.04 * i as f64)).collect();
        assert_eq!(m.reset_traffic_info(0, batch, DEFAULT_MAX_ERROR_DISTANCE), 20);

        let west = unit_square();
        let east = MapRange::new(GeoPoint::new(1.0, 0.0), GeoPoint::new(2.0, 1.0));

        let stepper = {
            let m = Arc::clone(&m);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    assert!(m.step_relative(0.1).is_succ());
                }
            })
        };
        // Only this thread writes the region table, so `regions()` and the
        // population read after each call see the same table.
        let ranger = {
            let m = Arc::clone(&m);
            std::thread::spawn(move || {
                for i in 0..200 {
                    let range = if i % 2 == 0 { east } else { west };
                    assert!(m.reset_simulation_range([range]));
                    assert_flags_match_regions(&*m);
                }
            })
        };
        stepper.join().unwrap();
        ranger.join().unwrap();

        assert_flags_match_regions(&*m);
        assert_eq!(m.kernel_count(), 20);
        assert_eq!(m.current_time().unwrap().step_index, 200);
    }

    #[test]
    fn works_with_shared_map() {
        let map: Arc<dyn RoadMap> = Arc::new(roads());
        let m = TrafficManager::new(CruiseKernel, map);
        assert!(m.init(test_config()).is_succ());
        assert_eq!(m.reset_traffic_info(0, vec![full(1, 0.5, 0.5)], DEFAULT_MAX_ERROR_DISTANCE), 1);
        assert!(m.step_relative(1.0).is_succ());
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod config {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let c = ManagerConfig::from_json_str("{}").unwrap();
        assert_eq!(c, ManagerConfig::default());
    }

    #[test]
    fn regions_and_agents_parse() {
        let c = ManagerConfig::from_json_str(r#"{
            "time_step_s": 0.2,
            "num_threads": 4,
            "regions": [ { "bottom_left": { "lon": 0.0, "lat": 0.0 },
                           "top_right":   { "lon": 1.0, "lat": 1.0 } } ],
            "input_agents": [ { "id": 1, "location": { "lon": 0.5, "lat": 0.5 },
                                "routes": [[1, 2]], "period_s": 3.0 } ]
        }"#).unwrap();
        assert_eq!(c.num_threads, Some(4));
        assert_eq!(c.regions, vec![unit_square()]);
        assert_eq!(c.input_agents[0].routes, vec![vec![RoadId(1), RoadId(2)]]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for json in [
            r#"{ "time_step_s": 0 }"#,
            r#"{ "num_threads": 0 }"#,
            r#"{ "ego_safe_radius_m": -1 }"#,
            r#"{ "input_agents": [ { "id": 1, "location": { "lon": 0, "lat": 0 }, "routes": [], "period_s": 1 } ] }"#,
            r#"{ "input_agents": [ { "id": 1, "location": { "lon": 0, "lat": 0 }, "routes": [[1]], "period_s": 0 } ] }"#,
            "not json",
        ] {
            assert!(ManagerConfig::from_json_str(json).is_err(), "accepted {json}");
        }
    }
}
