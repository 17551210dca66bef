//! Geographic coordinate type and distance metrics.
//!
//! `GeoPoint` stores latitude/longitude in `f64`.  Node coordinates feed the
//! migration-network builder, where distances are raised to arbitrary
//! exponents; single precision is not enough headroom there.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in kilometres.
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// Planar distance treating `(lon, lat)` as `(x, y)` in coordinate units.
    #[inline]
    pub fn planar_distance(self, other: GeoPoint) -> f64 {
        (other.lon - self.lon).hypot(other.lat - self.lat)
    }

    /// `true` if both components are finite and within WGS-84 range.
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── DistanceMetric ────────────────────────────────────────────────────────────

/// How pairwise node distances are measured.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Haversine distance in kilometres.
    #[default]
    GreatCircle,
    /// Euclidean distance in raw coordinate units.
    Euclidean,
}

impl DistanceMetric {
    #[inline]
    pub fn distance(self, a: GeoPoint, b: GeoPoint) -> f64 {
        match self {
            DistanceMetric::GreatCircle => a.distance_km(b),
            DistanceMetric::Euclidean   => a.planar_distance(b),
        }
    }
}
