//! Great-circle distance on a spherical Earth.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Central city landmark every listing's distance is measured from.
pub const LANDMARK: GeoPoint = GeoPoint {
    latitude: 19.4270,
    longitude: -99.1677,
};

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Haversine distance between two points, in kilometres.
///
/// The intermediate `a` term is clamped to `[0, 1]` so rounding near
/// identical or antipodal points never pushes `sqrt(1 - a)` out of domain.
pub fn haversine_km(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let phi1 = p1.latitude.to_radians();
    let phi2 = p2.latitude.to_radians();
    let d_phi = (p2.latitude - p1.latitude).to_radians();
    let d_lambda = (p2.longitude - p1.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn same_point_is_zero() {
        for p in [
            LANDMARK,
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(90.0, 180.0),
            GeoPoint::new(-90.0, -180.0),
            GeoPoint::new(51.5074, -0.1278),
        ] {
            assert_eq!(haversine_km(&p, &p), 0.0);
        }
    }

    #[test]
    fn symmetric() {
        let a = GeoPoint::new(19.4326, -99.1332);
        let b = GeoPoint::new(19.3467, -99.1617);
        assert_eq!(haversine_km(&a, &b), haversine_km(&b, &a));
    }

    #[test]
    fn known_value_london_paris() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        assert!(approx_eq(haversine_km(&london, &paris), 343.56, 5.0));
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 180.0);
        let d = haversine_km(&a, &b);
        assert!(d.is_finite());
        assert!(approx_eq(d, std::f64::consts::PI * EARTH_RADIUS_KM, 1e-6));

        let north = GeoPoint::new(90.0, 0.0);
        let south = GeoPoint::new(-90.0, 0.0);
        assert!(approx_eq(
            haversine_km(&north, &south),
            std::f64::consts::PI * EARTH_RADIUS_KM,
            1e-6
        ));
    }

    #[test]
    fn zocalo_is_a_few_km_from_landmark() {
        let zocalo = GeoPoint::new(19.4326, -99.1332);
        let d = haversine_km(&zocalo, &LANDMARK);
        assert!(d > 3.0 && d < 4.5, "got {d}");
    }

    #[test]
    fn validity_bounds() {
        assert!(LANDMARK.is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(90.5, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.1).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }
}
