//! Geographic coordinate and region-rectangle types.
//!
//! `GeoPoint` uses `f64` longitude/latitude.  Region membership decides which
//! representation owns a vehicle, so boundary comparisons need more than the
//! ~1 m resolution single precision would give at city scale.

/// A WGS-84 geographic coordinate (degrees) with an altitude in metres.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub alt: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat, alt: 0.0 }
    }

    #[inline]
    pub fn with_alt(lon: f64, lat: f64, alt: f64) -> Self {
        Self { lon, lat, alt }
    }

    /// `true` if every coordinate is a finite number.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && self.alt.is_finite()
    }

    /// Haversine great-circle distance in metres (altitude ignored).
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        const R: f64 = 6_371_000.0; // mean Earth radius, metres

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        R * c
    }

    /// Move `distance_m` metres along `heading_rad` (0 = east, π/2 = north)
    /// using a local equirectangular approximation.  Good to well under a
    /// metre for the step lengths a traffic kernel produces.
    pub fn offset_m(self, heading_rad: f64, distance_m: f64) -> GeoPoint {
        const METRES_PER_DEG_LAT: f64 = 111_195.0;
        let d_north = distance_m * heading_rad.sin();
        let d_east  = distance_m * heading_rad.cos();
        let metres_per_deg_lon = METRES_PER_DEG_LAT * self.lat.to_radians().cos().max(1e-9);
        GeoPoint {
            lon: self.lon + d_east / metres_per_deg_lon,
            lat: self.lat + d_north / METRES_PER_DEG_LAT,
            alt: self.alt,
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.7}, {:.7})", self.lon, self.lat)
    }
}

// ── MapRange ──────────────────────────────────────────────────────────────────

/// An axis-aligned lon/lat rectangle requiring kernel-fidelity simulation.
///
/// Bounds are inclusive.  Construct through [`MapRange::new`] to get the
/// corners normalized; deserialized ranges are normalized by the region
/// table on insertion.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapRange {
    pub bottom_left: GeoPoint,
    pub top_right:   GeoPoint,
}

impl MapRange {
    /// Build a range from two opposite corners in any order.
    pub fn new(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            bottom_left: GeoPoint::new(a.lon.min(b.lon), a.lat.min(b.lat)),
            top_right:   GeoPoint::new(a.lon.max(b.lon), a.lat.max(b.lat)),
        }
    }

    /// Same rectangle with `bottom_left <= top_right` on both axes.
    #[inline]
    pub fn normalized(self) -> Self {
        Self::new(self.bottom_left, self.top_right)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.bottom_left.is_finite() && self.top_right.is_finite()
    }

    /// Inclusive containment test in lon/lat.
    #[inline]
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon >= self.bottom_left.lon
            && p.lon <= self.top_right.lon
            && p.lat >= self.bottom_left.lat
            && p.lat <= self.top_right.lat
    }
}
