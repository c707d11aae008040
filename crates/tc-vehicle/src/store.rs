//! The `PopulationStore` — every non-ego vehicle, split into kernel and edge.
//!
//! # Identity invariant
//!
//! A `VehicleId` is alive in at most one of the two subsets.  Insertion
//! checks both; a kernel record that has been killed but not yet compacted
//! does not block a new instantiation under the same id (the new record
//! replaces it).
//!
//! Both subsets are `BTreeMap`s so iteration, and therefore snapshots and
//! the per-road index, come out in ascending id order.

use std::collections::BTreeMap;
use std::collections::btree_map;

use tracing::debug;

use tc_core::{RoadId, VehicleId};
use tc_spatial::RegionTable;

use crate::{Representation, StoreError, StoreResult, VehicleRecord};

pub struct PopulationStore {
    kernel: BTreeMap<VehicleId, VehicleRecord>,
    edge:   BTreeMap<VehicleId, VehicleRecord>,

    /// `RoadId → alive kernel vehicles on it`, ascending id.  Derived; only
    /// valid after [`rebuild_road_index`](Self::rebuild_road_index).
    road_index: BTreeMap<RoadId, Vec<VehicleId>>,

    /// Next candidate id for spawned vehicles.
    next_spawn: u64,
}

impl PopulationStore {
    /// An empty store whose spawned vehicles are numbered from `spawn_id_base`.
    pub fn new(spawn_id_base: u64) -> Self {
        Self {
            kernel:     BTreeMap::new(),
            edge:       BTreeMap::new(),
            road_index: BTreeMap::new(),
            next_spawn: spawn_id_base,
        }
    }

    // ── Insertion ─────────────────────────────────────────────────────────

    fn check_identity(&self, id: VehicleId) -> StoreResult<()> {
        match self.representation_of(id) {
            Some(existing) => Err(StoreError::IdentityConflict { id, existing }),
            None => Ok(()),
        }
    }

    /// Insert a kernel vehicle.
    ///
    /// # Errors
    /// `IdentityConflict` (store unchanged) if `record.id` is alive in either
    /// subset.
    pub fn add_kernel_vehicle(&mut self, mut record: VehicleRecord) -> StoreResult<()> {
        self.check_identity(record.id)?;
        record.representation = Representation::Kernel;
        record.alive = true;
        self.kernel.insert(record.id, record);
        Ok(())
    }

    /// Insert an edge stand-in.
    ///
    /// # Errors
    /// `IdentityConflict` (store unchanged) if `record.id` is alive in either
    /// subset.
    pub fn add_edge_vehicle(&mut self, mut record: VehicleRecord) -> StoreResult<()> {
        self.check_identity(record.id)?;
        record.representation = Representation::Edge;
        record.alive = true;
        record.in_range_after_simulation = false;
        self.edge.insert(record.id, record);
        Ok(())
    }

    // ── Removal ───────────────────────────────────────────────────────────

    /// Drop every edge vehicle.  Returns how many were removed.
    pub fn remove_all_edge_vehicles(&mut self) -> usize {
        let n = self.edge.len();
        self.edge.clear();
        n
    }

    /// Mark a vehicle dead.  Storage is reclaimed by [`compact`](Self::compact).
    ///
    /// # Errors
    /// `VehicleNotFound` if no alive vehicle has this id.
    pub fn kill(&mut self, id: VehicleId) -> StoreResult<()> {
        let record = self
            .kernel
            .get_mut(&id)
            .filter(|r| r.alive)
            .or_else(|| self.edge.get_mut(&id).filter(|r| r.alive))
            .ok_or(StoreError::VehicleNotFound(id))?;
        record.alive = false;
        Ok(())
    }

    /// Remove killed records from both subsets.  Returns how many were removed.
    pub fn compact(&mut self) -> usize {
        let before = self.kernel.len() + self.edge.len();
        self.kernel.retain(|_, r| r.alive);
        self.edge.retain(|_, r| r.alive);
        let removed = before - self.kernel.len() - self.edge.len();
        if removed > 0 {
            debug!(removed, "compacted population store");
        }
        removed
    }

    // ── Range bookkeeping ─────────────────────────────────────────────────

    /// Post-step range flag of an alive kernel vehicle (`false` otherwise).
    #[inline]
    pub fn in_range_after_simulation(&self, id: VehicleId) -> bool {
        self.kernel
            .get(&id)
            .is_some_and(|r| r.alive && r.in_range_after_simulation)
    }

    /// Re-evaluate every kernel vehicle's post-step flag from its current
    /// position.  Must only be called when positions are post-step positions
    /// (after an advance, or on a region-table replacement).
    pub fn refresh_range_flags(&mut self, regions: &RegionTable) {
        for record in self.kernel.values_mut() {
            record.in_range_after_simulation = regions.in_range(record.position);
        }
    }

    /// Mutable access to kernel records for in-place scans.
    ///
    /// Callers may edit record fields but never `id`.
    pub fn kernel_values_mut(&mut self) -> btree_map::ValuesMut<'_, VehicleId, VehicleRecord> {
        self.kernel.values_mut()
    }

    // ── Per-road index ────────────────────────────────────────────────────

    /// Regenerate the `RoadId → vehicles` listing from alive kernel vehicles.
    pub fn rebuild_road_index(&mut self) {
        self.road_index.clear();
        for record in self.kernel.values().filter(|r| r.alive) {
            if let Some(road) = record.current_road() {
                self.road_index.entry(road).or_default().push(record.id);
            }
        }
    }

    pub fn road_index(&self) -> &BTreeMap<RoadId, Vec<VehicleId>> {
        &self.road_index
    }

    /// Alive kernel vehicles on `road` as of the last index rebuild.
    pub fn vehicles_on_road(&self, road: RoadId) -> &[VehicleId] {
        self.road_index.get(&road).map(Vec::as_slice).unwrap_or(&[])
    }

    // ── Spawn ids ─────────────────────────────────────────────────────────

    /// Allocate an id for a spawned vehicle: monotonically increasing from
    /// the configured base, skipping ids currently resident in either subset.
    pub fn next_spawn_id(&mut self) -> VehicleId {
        loop {
            let candidate = VehicleId(self.next_spawn);
            self.next_spawn += 1;
            if !self.kernel.contains_key(&candidate) && !self.edge.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Alive kernel vehicles.
    pub fn kernel_count(&self) -> usize {
        self.kernel.values().filter(|r| r.alive).count()
    }

    pub fn edge_count(&self) -> usize {
        self.edge.values().filter(|r| r.alive).count()
    }

    /// Which subset holds `id` alive, if any.
    pub fn representation_of(&self, id: VehicleId) -> Option<Representation> {
        if self.kernel.get(&id).is_some_and(|r| r.alive) {
            Some(Representation::Kernel)
        } else if self.edge.get(&id).is_some_and(|r| r.alive) {
            Some(Representation::Edge)
        } else {
            None
        }
    }

    #[inline]
    pub fn contains_alive(&self, id: VehicleId) -> bool {
        self.representation_of(id).is_some()
    }

    #[inline]
    pub fn is_kernel_resident(&self, id: VehicleId) -> bool {
        self.representation_of(id) == Some(Representation::Kernel)
    }

    /// The alive record for `id` from whichever subset holds it.
    pub fn get(&self, id: VehicleId) -> Option<&VehicleRecord> {
        self.kernel
            .get(&id)
            .filter(|r| r.alive)
            .or_else(|| self.edge.get(&id).filter(|r| r.alive))
    }

    /// A kernel record whether alive or killed-but-not-compacted.
    pub fn kernel_record(&self, id: VehicleId) -> Option<&VehicleRecord> {
        self.kernel.get(&id)
    }

    /// Mutable alive kernel record.
    pub fn kernel_mut(&mut self, id: VehicleId) -> Option<&mut VehicleRecord> {
        self.kernel.get_mut(&id).filter(|r| r.alive)
    }

    /// Alive kernel vehicles in ascending id order.
    pub fn kernel(&self) -> impl Iterator<Item = &VehicleRecord> + '_ {
        self.kernel.values().filter(|r| r.alive)
    }

    /// Alive edge vehicles in ascending id order.
    pub fn edge(&self) -> impl Iterator<Item = &VehicleRecord> + '_ {
        self.edge.values().filter(|r| r.alive)
    }
}
