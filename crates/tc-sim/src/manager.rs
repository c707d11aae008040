//! `TrafficManager` — the control plane a host process drives.
//!
//! Every public method takes one coarse lock for its whole duration, so each
//! call is atomic with respect to every other call.  Inside a call, the
//! population scans run on a bounded worker pool.
//!
//! Methods report success as [`ErrCode`] (or a count / `Option`); the reason
//! for a failure goes to the log at `warn`.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use tc_behavior::TrafficKernel;
use tc_core::{GeoPoint, MapRange, SimClock, TcResult, TimeParams, VehicleId};
use tc_spatial::{RegionTable, RoadMap, VehicleIndex};
use tc_vehicle::{EgoRegistry, LocationState, PopulationStore, StoreError};

use crate::{
    HandoffPass, HandoffReport, InputAgents, ManagerConfig, PopulationSnapshot, SimError,
    SimResult, StepObserver, StepReport, VehicleSnapshot,
    step::StepPass,
};

/// Outcome of a control-plane call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrCode {
    Succ,
    Err,
}

impl ErrCode {
    pub fn is_succ(self) -> bool {
        self == ErrCode::Succ
    }

    fn from_result<T>(op: &'static str, result: SimResult<T>) -> Self {
        match result {
            Ok(_) => ErrCode::Succ,
            Err(e) => {
                warn!(op, error = %e, "call failed");
                ErrCode::Err
            }
        }
    }
}

// ── Worker pool ───────────────────────────────────────────────────────────────

/// Bounded pool for the kill, classify, and intent scans.  Without the
/// `parallel` feature the closure simply runs on the calling thread.
struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    fn build(num_threads: Option<usize>) -> SimResult<Self> {
        #[cfg(feature = "parallel")]
        {
            let mut builder = rayon::ThreadPoolBuilder::new()
                .thread_name(|i| format!("tc-sim-worker-{i}"));
            if let Some(n) = num_threads {
                builder = builder.num_threads(n);
            }
            Ok(Self { pool: builder.build()? })
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = num_threads;
            Ok(Self {})
        }
    }

    fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        #[cfg(feature = "parallel")]
        {
            self.pool.install(f)
        }

        #[cfg(not(feature = "parallel"))]
        {
            f()
        }
    }

    fn threads(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            self.pool.current_num_threads()
        }

        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Everything that exists between `init` and `release`.
struct SimState {
    config: ManagerConfig,
    clock:  SimClock,
    store:  PopulationStore,
    egos:   EgoRegistry,
    agents: InputAgents,
    pool:   WorkerPool,
}

struct Inner {
    /// Survives `release`; may be set before `init`.
    regions:   RegionTable,
    state:     Option<SimState>,
    observers: Vec<Box<dyn StepObserver + Send>>,
}

// ── TrafficManager ────────────────────────────────────────────────────────────

/// The traffic population manager for one host process.
///
/// `K` advances kernel vehicles; `M` answers road-length queries.  Share
/// between threads with `Arc<TrafficManager<K, M>>`.
///
/// ```rust,ignore
/// let manager = TrafficManager::new(CruiseKernel, road_table);
/// manager.reset_simulation_range([MapRange::new(a, b)]);
/// assert!(manager.init(ManagerConfig::default()).is_succ());
/// manager.reset_traffic_info(0, batch, DEFAULT_MAX_ERROR_DISTANCE);
/// manager.step_abs(100);
/// ```
pub struct TrafficManager<K: TrafficKernel, M: RoadMap> {
    kernel: K,
    map:    M,
    inner:  Mutex<Inner>,
}

impl<K: TrafficKernel, M: RoadMap> TrafficManager<K, M> {
    pub fn new(kernel: K, map: M) -> Self {
        Self {
            kernel,
            map,
            inner: Mutex::new(Inner {
                regions:   RegionTable::new(),
                state:     None,
                observers: Vec::new(),
            }),
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Build the population, clock, egos, and worker pool.  A second `init`
    /// discards the previous run.  Non-empty `config.regions` replace the
    /// region table.
    pub fn init(&self, config: ManagerConfig) -> ErrCode {
        ErrCode::from_result("init", self.try_init(config))
    }

    fn try_init(&self, config: ManagerConfig) -> SimResult<()> {
        config.validate()?;
        let pool = WorkerPool::build(config.num_threads)?;

        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state.is_some() {
            warn!("init called on a running manager, previous state discarded");
        }
        if !config.regions.is_empty() {
            inner.regions.replace(config.regions.iter().copied());
        }

        let mut agents = InputAgents::from_config(&config.input_agents, config.seed);
        let active = agents.reactivate(&inner.regions);

        info!(
            regions       = inner.regions.len(),
            input_agents  = agents.len(),
            active_agents = active,
            threads       = pool.threads(),
            time_step_s   = config.time_step_s,
            "traffic manager initialized"
        );

        inner.state = Some(SimState {
            clock:  SimClock::new(config.start_abs_time_ms, config.time_step_s),
            store:  PopulationStore::new(config.spawn_id_base),
            egos:   EgoRegistry::new(),
            agents,
            pool,
            config,
        });
        Ok(())
    }

    /// Drop the population and ego registry.  The region table and
    /// observers are kept.
    pub fn release(&self) -> ErrCode {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(state) = inner.state.take() else {
            return ErrCode::from_result::<()>("release", Err(SimError::NotInitialized));
        };
        let time = state.clock.current();
        for observer in &mut inner.observers {
            observer.on_release(&time);
        }
        info!(
            kernel_count = state.store.kernel_count(),
            egos         = state.egos.len(),
            %time,
            "traffic manager released"
        );
        ErrCode::Succ
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().state.is_some()
    }

    pub fn add_observer(&self, observer: Box<dyn StepObserver + Send>) {
        self.inner.lock().observers.push(observer);
    }

    // ── Ego management ────────────────────────────────────────────────────

    /// Register an ego.  Fails if the id is already an ego or an alive
    /// vehicle, or if a kernel vehicle lies within `ego_safe_radius_m`.
    pub fn add_ego(&self, ego_id: VehicleId, location: LocationState) -> ErrCode {
        let mut guard = self.inner.lock();
        let result = state_mut(&mut guard)
            .and_then(|state| self.add_ego_locked(state, ego_id, location, false));
        ErrCode::from_result("add_ego", result)
    }

    /// Register an ego without the identity and placement checks.  An alive
    /// vehicle holding the same id is removed from the population.
    pub fn add_ego_force(&self, ego_id: VehicleId, location: LocationState) -> ErrCode {
        let mut guard = self.inner.lock();
        let result = state_mut(&mut guard)
            .and_then(|state| self.add_ego_locked(state, ego_id, location, true));
        ErrCode::from_result("add_ego_force", result)
    }

    pub fn delete_ego(&self, ego_id: VehicleId, frame_id: u64) -> ErrCode {
        let mut guard = self.inner.lock();
        let result = state_mut(&mut guard).and_then(|state| {
            state.egos.remove(ego_id)?;
            debug!(ego = %ego_id, frame_id, "ego deleted");
            Ok(())
        });
        ErrCode::from_result("delete_ego", result)
    }

    pub fn update_ego_info(&self, ego_id: VehicleId, location: LocationState) -> ErrCode {
        let mut guard = self.inner.lock();
        let result = state_mut(&mut guard)
            .and_then(|state| state.egos.update(ego_id, location).map_err(SimError::from));
        ErrCode::from_result("update_ego_info", result)
    }

    /// Make the ego registry equal to `egos`: update egos present on both
    /// sides, delete egos missing from `egos`, force-add new ones.  Returns
    /// the resulting ego count (0 if not initialized).
    pub fn reset_ego_info(
        &self,
        abs_time_ms: u64,
        egos:        &BTreeMap<VehicleId, LocationState>,
    ) -> i32 {
        let mut guard = self.inner.lock();
        let Ok(state) = state_mut(&mut guard) else {
            warn!(abs_time_ms, "reset_ego_info on an uninitialized manager");
            return 0;
        };

        let diff = state.egos.diff(egos);
        for &(id, location) in &diff.update {
            if let Err(e) = state.egos.update(id, location) {
                warn!(ego = %id, error = %e, "ego update failed");
            }
        }
        for &id in &diff.delete {
            if let Err(e) = state.egos.remove(id) {
                warn!(ego = %id, error = %e, "ego delete failed");
            }
        }
        for &(id, location) in &diff.add {
            if let Err(e) = self.add_ego_locked(state, id, location, true) {
                warn!(ego = %id, error = %e, "ego add failed");
            }
        }

        let count = state.egos.len();
        info!(
            abs_time_ms,
            updated = diff.update.len(),
            deleted = diff.delete.len(),
            added   = diff.add.len(),
            count,
            "reset ego info"
        );
        saturating_i32(count)
    }

    fn add_ego_locked(
        &self,
        state:    &mut SimState,
        ego_id:   VehicleId,
        location: LocationState,
        force:    bool,
    ) -> SimResult<()> {
        if state.egos.contains(ego_id) {
            return Err(StoreError::EgoAlreadyRegistered(ego_id).into());
        }

        if let Some(existing) = state.store.representation_of(ego_id) {
            if !force {
                return Err(StoreError::IdentityConflict { id: ego_id, existing }.into());
            }
            // The id now belongs to the ego; the vehicle leaves the population.
            state.store.kill(ego_id)?;
            if let Some(record) = state.store.kernel_record(ego_id) {
                self.kernel.on_vehicle_removed(record);
            }
            state.store.compact();
            state.store.rebuild_road_index();
            debug!(ego = %ego_id, %existing, "vehicle replaced by forced ego");
        }

        if !force {
            let index = VehicleIndex::build(state.store.kernel().map(|v| (v.id, v.position)));
            let radius = state.config.ego_safe_radius_m;
            if let Some((nearest, distance_m)) = index.nearest_within(location.position, radius) {
                return Err(StoreError::UnsafeEgoPlacement { ego: ego_id, nearest, distance_m }.into());
            }
        }

        state.egos.register(ego_id, location, force)?;
        debug!(ego = %ego_id, force, position = %location.position, "ego registered");
        Ok(())
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// Control-plane step: one relative-mode advance of `time_step_s`.
    /// The remaining arguments are recorded in the log only.
    pub fn step(&self, frame_id: u64, log_level: u32, abs_begin_time: u64, step_count: u64) -> ErrCode {
        debug!(frame_id, log_level, abs_begin_time, step_count, "step");
        let result = self.advance(|clock| {
            let delta_s = clock.time_step_s;
            clock.advance_relative(delta_s)
        });
        ErrCode::from_result("step", result)
    }

    /// Advance to an absolute host time.
    pub fn step_abs(&self, abs_time_ms: u64) -> ErrCode {
        ErrCode::from_result("step_abs", self.advance(|clock| clock.advance_abs(abs_time_ms)))
    }

    /// Advance by `delta_s` seconds.
    pub fn step_relative(&self, delta_s: f64) -> ErrCode {
        ErrCode::from_result("step_relative", self.advance(|clock| clock.advance_relative(delta_s)))
    }

    /// Tick the clock, then run one advance under the lock.
    fn advance(&self, tick: impl FnOnce(&mut SimClock) -> TcResult<TimeParams>) -> SimResult<StepReport> {
        let mut guard = self.inner.lock();
        let Inner { regions, state, observers } = &mut *guard;
        let state = state.as_mut().ok_or(SimError::NotInitialized)?;

        let time = tick(&mut state.clock)?;
        for observer in observers.iter_mut() {
            observer.on_step_start(&time);
        }

        let SimState { config, store, egos, agents, pool, .. } = state;
        let regions = &*regions;
        let report = pool.install(|| {
            StepPass {
                store:           &mut *store,
                regions,
                map:             &self.map,
                egos:            &*egos,
                kernel:          &self.kernel,
                agents:          &mut *agents,
                spawn_speed_mps: config.spawn_speed_mps,
            }
            .run(time)
        });

        for observer in observers.iter_mut() {
            observer.on_step_end(&report, store);
        }
        debug!(
            step         = time.step_index,
            spawned      = report.spawned,
            moved        = report.moved,
            despawned    = report.despawned,
            failed       = report.failed,
            kernel_count = report.kernel_count,
            "step complete"
        );
        Ok(report)
    }

    // ── Handoff ───────────────────────────────────────────────────────────

    /// Reconcile `batch` with the population.  Returns the kernel vehicle
    /// count afterwards (0 if not initialized).
    pub fn reset_traffic_info(
        &self,
        abs_time_ms:        u64,
        batch:              Vec<tc_vehicle::IncomingRecord>,
        max_error_distance: f64,
    ) -> i32 {
        match self.handoff(abs_time_ms, batch, max_error_distance) {
            Ok(report) => saturating_i32(report.kernel_count),
            Err(e) => {
                warn!(op = "reset_traffic_info", error = %e, "call failed");
                0
            }
        }
    }

    fn handoff(
        &self,
        abs_time_ms:        u64,
        batch:              Vec<tc_vehicle::IncomingRecord>,
        max_error_distance: f64,
    ) -> SimResult<HandoffReport> {
        let mut guard = self.inner.lock();
        let Inner { regions, state, observers } = &mut *guard;
        let state = state.as_mut().ok_or(SimError::NotInitialized)?;

        let SimState { store, egos, pool, .. } = state;
        let regions = &*regions;
        let report = pool.install(|| {
            HandoffPass {
                store:   &mut *store,
                regions,
                map:     &self.map,
                egos:    &*egos,
                kernel:  &self.kernel,
            }
            .run(abs_time_ms, batch, max_error_distance)
        });

        for observer in observers.iter_mut() {
            observer.on_handoff(abs_time_ms, &report, store);
        }
        Ok(report)
    }

    /// Replace the region table.  Invalid ranges are skipped.  Returns
    /// `false` if the manager is not initialized; the table is replaced
    /// either way and applies from the next `init`.
    pub fn reset_simulation_range(&self, ranges: impl IntoIterator<Item = MapRange>) -> bool {
        let mut guard = self.inner.lock();
        let Inner { regions, state, .. } = &mut *guard;
        let accepted = regions.replace(ranges);

        let Some(state) = state.as_mut() else {
            info!(regions = accepted, "simulation range set before init");
            return false;
        };
        state.store.refresh_range_flags(regions);
        let active = state.agents.reactivate(regions);
        info!(regions = accepted, active_agents = active, "simulation range reset");
        true
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Export the population without changing it.
    pub fn snapshot_micro(&self, frame_id: u64) -> Option<PopulationSnapshot> {
        let guard = self.inner.lock();
        let state = guard.state.as_ref()?;
        Some(PopulationSnapshot {
            frame_id,
            time:     state.clock.current(),
            vehicles: state.store.kernel().map(VehicleSnapshot::from_record).collect(),
            edges:    state.store.edge().map(VehicleSnapshot::from_record).collect(),
            egos:     state.egos.snapshot(),
        })
    }

    /// Kernel vehicles and other egos within `radius_m` of an ego, nearest
    /// first.  `None` if not initialized or `ego_id` is not an ego.
    pub fn query_by_circle(&self, ego_id: VehicleId, radius_m: f64) -> Option<Vec<VehicleId>> {
        let guard = self.inner.lock();
        let state = guard.state.as_ref()?;
        let center = state.egos.get(ego_id)?.location.position;

        let index = VehicleIndex::build(state.store.kernel().map(|v| (v.id, v.position)));
        let mut hits = index.within_radius(center, radius_m);
        hits.extend(
            state
                .egos
                .snapshot()
                .into_iter()
                .filter(|e| e.id != ego_id)
                .map(|e| (e.id, center.distance_m(e.location.position)))
                .filter(|&(_, d)| d <= radius_m),
        );
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        Some(hits.into_iter().map(|(id, _)| id).collect())
    }

    pub fn in_range(&self, point: GeoPoint) -> bool {
        self.inner.lock().regions.in_range(point)
    }

    pub fn regions(&self) -> RegionTable {
        self.inner.lock().regions.clone()
    }

    pub fn current_time(&self) -> Option<TimeParams> {
        self.inner.lock().state.as_ref().map(|s| s.clock.current())
    }

    pub fn kernel_count(&self) -> usize {
        self.inner.lock().state.as_ref().map_or(0, |s| s.store.kernel_count())
    }

    pub fn edge_count(&self) -> usize {
        self.inner.lock().state.as_ref().map_or(0, |s| s.store.edge_count())
    }

    pub fn ego_count(&self) -> usize {
        self.inner.lock().state.as_ref().map_or(0, |s| s.egos.len())
    }

    /// Run `f` against the population under the lock.  `None` if not
    /// initialized.
    pub fn with_population<R>(&self, f: impl FnOnce(&PopulationStore) -> R) -> Option<R> {
        self.inner.lock().state.as_ref().map(|s| f(&s.store))
    }
}

fn state_mut(inner: &mut Inner) -> SimResult<&mut SimState> {
    inner.state.as_mut().ok_or(SimError::NotInitialized)
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
