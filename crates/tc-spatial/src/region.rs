//! The region table: which parts of the map are simulated at kernel fidelity.
//!
//! A point is "in range" iff it lies inside the union of the current ranges.
//! An empty table is valid and means every vehicle is an edge vehicle.
//!
//! The table is replaced wholesale, never edited in place.  Readers (the
//! parallel handoff scans) hold `&RegionTable` and the single writer holds
//! `&mut RegionTable`, so a scan always sees either the old or the new set,
//! never a mixture.

use tracing::warn;

use tc_core::{GeoPoint, MapRange};

use crate::{SpatialError, SpatialResult};

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionTable {
    ranges: Vec<MapRange>,
}

impl RegionTable {
    /// An empty table: everything is out of range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `ranges`, skipping invalid ones (see [`replace`](Self::replace)).
    pub fn from_ranges(ranges: impl IntoIterator<Item = MapRange>) -> Self {
        let mut table = Self::new();
        table.replace(ranges);
        table
    }

    /// Normalize a range, rejecting any with a non-finite coordinate.
    pub fn validate(range: MapRange) -> SpatialResult<MapRange> {
        if !range.is_finite() {
            return Err(SpatialError::InvalidRange {
                bottom_left: range.bottom_left,
                top_right:   range.top_right,
            });
        }
        Ok(range.normalized())
    }

    /// Replace the whole set.  Invalid ranges are logged and dropped; the
    /// rest are installed.  Returns the number of ranges installed.
    pub fn replace(&mut self, ranges: impl IntoIterator<Item = MapRange>) -> usize {
        let mut next = Vec::new();
        for range in ranges {
            match Self::validate(range) {
                Ok(r) => next.push(r),
                Err(e) => warn!(error = %e, "skipping map range"),
            }
        }
        self.ranges = next;
        self.ranges.len()
    }

    /// `true` iff `point` lies inside at least one range (bounds inclusive).
    #[inline]
    pub fn in_range(&self, point: GeoPoint) -> bool {
        self.ranges.iter().any(|r| r.contains(point))
    }

    #[inline]
    pub fn ranges(&self) -> &[MapRange] {
        &self.ranges
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
