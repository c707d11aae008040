//! Map-service seam.
//!
//! The manager never routes or builds geometry itself; it only needs to ask
//! the map service whether a road exists and how long it is (to validate
//! incoming routes and to turn per-road travel times into speeds).  That
//! narrow surface is the [`RoadMap`] trait.  [`RoadTable`] is the in-memory
//! implementation used by tests and by hosts that preload their road list.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use tc_core::RoadId;

use crate::{SpatialError, SpatialResult};

// ── RoadMap ───────────────────────────────────────────────────────────────────

/// Read-only road lookups.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` because the handoff classify pass
/// queries the map from rayon worker threads.
pub trait RoadMap: Send + Sync + 'static {
    /// Length of `road` in metres, or `None` if the map does not know it.
    fn road_length_m(&self, road: RoadId) -> Option<f64>;

    /// `true` if the map knows `road`.
    fn contains_road(&self, road: RoadId) -> bool {
        self.road_length_m(road).is_some()
    }

    /// Like [`road_length_m`](Self::road_length_m) but as a `Result`.
    fn require_road(&self, road: RoadId) -> SpatialResult<f64> {
        self.road_length_m(road).ok_or(SpatialError::UnknownRoad(road))
    }
}

impl<M: RoadMap + ?Sized> RoadMap for Arc<M> {
    fn road_length_m(&self, road: RoadId) -> Option<f64> {
        (**self).road_length_m(road)
    }
}

// ── RoadTable ─────────────────────────────────────────────────────────────────

/// A flat `RoadId → length` table.
///
/// # Example
///
/// ```
/// use tc_core::RoadId;
/// use tc_spatial::{RoadMap, RoadTable};
///
/// let mut roads = RoadTable::new();
/// roads.insert(RoadId(1), 250.0);
/// assert_eq!(roads.road_length_m(RoadId(1)), Some(250.0));
/// assert!(!roads.contains_road(RoadId(2)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RoadTable {
    lengths: FxHashMap<RoadId, f64>,
}

impl RoadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(roads: usize) -> Self {
        Self {
            lengths: FxHashMap::with_capacity_and_hasher(roads, Default::default()),
        }
    }

    /// Add or overwrite a road.  Returns the previous length, if any.
    pub fn insert(&mut self, road: RoadId, length_m: f64) -> Option<f64> {
        self.lengths.insert(road, length_m)
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

impl FromIterator<(RoadId, f64)> for RoadTable {
    fn from_iter<I: IntoIterator<Item = (RoadId, f64)>>(iter: I) -> Self {
        Self { lengths: iter.into_iter().collect() }
    }
}

impl RoadMap for RoadTable {
    #[inline]
    fn road_length_m(&self, road: RoadId) -> Option<f64> {
        self.lengths.get(&road).copied()
    }
}
