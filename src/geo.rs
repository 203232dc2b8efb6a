//! Random point generation on the globe.
//!
//! All functions are pure apart from the random source they are handed.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Equatorial radius used for offset math, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6378.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Point reached by travelling `distance_km` from `self` along the
    /// initial bearing `bearing` (radians, clockwise from north).
    pub fn destination(&self, distance_km: f64, bearing: f64) -> GeoPoint {
        let angular = distance_km / EARTH_RADIUS_KM;
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();

        let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
        let lon2 = lon1
            + (bearing.sin() * angular.sin() * lat1.cos())
                .atan2(angular.cos() - lat1.sin() * lat2.sin());

        GeoPoint {
            lat: lat2.to_degrees(),
            lon: normalize_lon(lon2.to_degrees()),
        }
    }
}

fn normalize_lon(lon: f64) -> f64 {
    (lon + 540.0).rem_euclid(360.0) - 180.0
}

/// Axis-aligned lat/lon rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Rough bounding box of Italy.
    pub const ITALY: GeoBounds = GeoBounds {
        min_lat: 36.6,
        max_lat: 47.1,
        min_lon: 6.6,
        max_lon: 18.5,
    };

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }

    pub fn is_valid(&self) -> bool {
        GeoPoint::new(self.min_lat, self.min_lon).is_valid()
            && GeoPoint::new(self.max_lat, self.max_lon).is_valid()
            && self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
    }
}

pub fn random_point_in_bounds<R: Rng + ?Sized>(rng: &mut R, bounds: &GeoBounds) -> GeoPoint {
    GeoPoint {
        lat: rng.gen_range(bounds.min_lat..=bounds.max_lat),
        lon: rng.gen_range(bounds.min_lon..=bounds.max_lon),
    }
}

/// Uniform-by-area sample inside a disk of `radius_km` around `center`.
///
/// Sampling the radius as `R * sqrt(u)` keeps the density flat across the
/// disk; a plain `R * u` would crowd points toward the center.
pub fn random_point_in_radius<R: Rng + ?Sized>(
    rng: &mut R,
    center: &GeoPoint,
    radius_km: f64,
) -> GeoPoint {
    let u1: f64 = rng.gen();
    let u2: f64 = rng.gen();
    let distance = radius_km * u1.sqrt();
    let bearing = 2.0 * PI * u2;
    center.destination(distance, bearing)
}
