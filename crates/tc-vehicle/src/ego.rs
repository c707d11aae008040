//! The ego registry: externally controlled vehicles the host drives itself.
//!
//! The registry is independently thread-safe (`&self` CRUD behind a
//! `parking_lot::RwLock`) so it can be read while the manager's population
//! lock is held by another call.  Cross-checks against the population
//! (identity, safe radius) are the manager's job.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use tc_core::{GeoPoint, VehicleId};

use crate::{StoreError, StoreResult};

/// Where an ego is and how it moves.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationState {
    pub position:     GeoPoint,
    pub heading_rad:  f64,
    pub speed_mps:    f64,
    pub timestamp_ms: u64,
}

impl LocationState {
    pub fn at(position: GeoPoint) -> Self {
        Self { position, ..Self::default() }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EgoRecord {
    pub id:       VehicleId,
    pub location: LocationState,
    /// `true` for forced registrations.
    pub managed:  bool,
}

/// Result of comparing the registry against a full ego map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EgoDiff {
    /// Present on both sides: location to overwrite.
    pub update: Vec<(VehicleId, LocationState)>,
    /// Registered but absent from the incoming map.
    pub delete: Vec<VehicleId>,
    /// Incoming but not registered.
    pub add:    Vec<(VehicleId, LocationState)>,
}

#[derive(Default)]
pub struct EgoRegistry {
    egos: RwLock<BTreeMap<VehicleId, EgoRecord>>,
}

impl EgoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// `EgoAlreadyRegistered` if `id` is already an ego.
    pub fn register(&self, id: VehicleId, location: LocationState, managed: bool) -> StoreResult<()> {
        let mut egos = self.egos.write();
        if egos.contains_key(&id) {
            return Err(StoreError::EgoAlreadyRegistered(id));
        }
        egos.insert(id, EgoRecord { id, location, managed });
        Ok(())
    }

    /// # Errors
    /// `UnknownEgo` if `id` is not an ego.
    pub fn remove(&self, id: VehicleId) -> StoreResult<EgoRecord> {
        self.egos.write().remove(&id).ok_or(StoreError::UnknownEgo(id))
    }

    /// # Errors
    /// `UnknownEgo` if `id` is not an ego.
    pub fn update(&self, id: VehicleId, location: LocationState) -> StoreResult<()> {
        let mut egos = self.egos.write();
        let ego = egos.get_mut(&id).ok_or(StoreError::UnknownEgo(id))?;
        ego.location = location;
        Ok(())
    }

    #[inline]
    pub fn contains(&self, id: VehicleId) -> bool {
        self.egos.read().contains_key(&id)
    }

    pub fn get(&self, id: VehicleId) -> Option<EgoRecord> {
        self.egos.read().get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.egos.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.egos.read().is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<VehicleId> {
        self.egos.read().keys().copied().collect()
    }

    /// Copy of every record in ascending id order.
    pub fn snapshot(&self) -> Vec<EgoRecord> {
        self.egos.read().values().copied().collect()
    }

    /// Compare the registry to `incoming` without modifying anything.
    ///
    /// The three sets are computed under a single read lock so they describe
    /// one consistent registry state.
    pub fn diff(&self, incoming: &BTreeMap<VehicleId, LocationState>) -> EgoDiff {
        let egos = self.egos.read();
        let mut diff = EgoDiff::default();
        for (&id, &location) in incoming {
            if egos.contains_key(&id) {
                diff.update.push((id, location));
            } else {
                diff.add.push((id, location));
            }
        }
        diff.delete = egos.keys().filter(|id| !incoming.contains_key(id)).copied().collect();
        diff
    }
}
