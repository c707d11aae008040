//! R-tree index over vehicle positions.
//!
//! Built on demand from a population snapshot (bulk load, O(N log N)) for
//! the ego placement check and circle queries.  Points are stored as
//! `[lon, lat]` degrees; radius queries first select the degree-space
//! envelope that bounds the circle, then filter candidates by exact
//! haversine distance, so results are in true metres.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use tc_core::{GeoPoint, VehicleId};

/// Metres per degree of latitude on the mean-radius sphere.
const METRES_PER_DEG_LAT: f64 = 111_195.0;

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct VehicleEntry {
    point: [f64; 2], // [lon, lat]
    pos:   GeoPoint,
    id:    VehicleId,
}

impl RTreeObject for VehicleEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for VehicleEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlon = self.point[0] - point[0];
        let dlat = self.point[1] - point[1];
        dlon * dlon + dlat * dlat
    }
}

// ── VehicleIndex ──────────────────────────────────────────────────────────────

pub struct VehicleIndex {
    tree: RTree<VehicleEntry>,
}

impl VehicleIndex {
    /// Bulk-load from `(id, position)` pairs.  Non-finite positions are
    /// left out of the index.
    pub fn build(vehicles: impl IntoIterator<Item = (VehicleId, GeoPoint)>) -> Self {
        let entries: Vec<VehicleEntry> = vehicles
            .into_iter()
            .filter(|(_, pos)| pos.is_finite())
            .map(|(id, pos)| VehicleEntry { point: [pos.lon, pos.lat], pos, id })
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// All vehicles within `radius_m` metres of `center`, with their
    /// distances, sorted by ascending distance (ties by id).
    pub fn within_radius(&self, center: GeoPoint, radius_m: f64) -> Vec<(VehicleId, f64)> {
        if !center.is_finite() || !(radius_m >= 0.0) {
            return Vec::new();
        }
        let d_lat = radius_m / METRES_PER_DEG_LAT;
        // Widen the longitude span by the cosine of the latitude nearest the
        // pole so the envelope always covers the whole circle.
        let max_abs_lat = (center.lat.abs() + d_lat).min(89.999);
        let d_lon = radius_m / (METRES_PER_DEG_LAT * max_abs_lat.to_radians().cos());
        let envelope = AABB::from_corners(
            [center.lon - d_lon, center.lat - d_lat],
            [center.lon + d_lon, center.lat + d_lat],
        );

        let mut hits: Vec<(VehicleId, f64)> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|e| (e.id, center.distance_m(e.pos)))
            .filter(|&(_, d)| d <= radius_m)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits
    }

    /// The closest vehicle within `radius_m` of `center`, if any.
    pub fn nearest_within(&self, center: GeoPoint, radius_m: f64) -> Option<(VehicleId, f64)> {
        self.within_radius(center, radius_m).into_iter().next()
    }

    /// The closest vehicle in lon/lat space and its haversine distance.
    ///
    /// Suitable for diagnostics; use [`nearest_within`](Self::nearest_within)
    /// for metric thresholds.
    pub fn nearest(&self, pos: GeoPoint) -> Option<(VehicleId, f64)> {
        self.tree
            .nearest_neighbor(&[pos.lon, pos.lat])
            .map(|e| (e.id, pos.distance_m(e.pos)))
    }
}
