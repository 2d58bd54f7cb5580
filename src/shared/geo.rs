//! Geometry helpers: haversine distance and fallback travel-time estimates.

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road-network correction applied on top of great-circle distance.
pub const DEFAULT_ROAD_FACTOR: f64 = 1.35;

/// Average urban driving speed used when no mapping provider is available.
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 30.0;

/// A WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude must be in [-90, 90] and longitude in [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: Point, b: Point) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Estimated road distance: haversine scaled by a road factor, in metres.
pub fn road_distance_meters(a: Point, b: Point, road_factor: f64) -> f64 {
    haversine_km(a, b) * road_factor * 1000.0
}

/// Estimated driving time in minutes, assuming a constant average speed.
pub fn estimate_travel_minutes(a: Point, b: Point, road_factor: f64, average_speed_kmh: f64) -> f64 {
    let km = haversine_km(a, b) * road_factor;
    km / average_speed_kmh * 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_identical_points() {
        let p = Point::new(-33.45, -70.66);
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Santiago -> Valparaíso, roughly 100 km great-circle.
        let scl = Point::new(-33.4489, -70.6693);
        let valpo = Point::new(-33.0472, -71.6127);
        let km = haversine_km(scl, valpo);
        assert!((km - 98.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn travel_minutes_scale_with_speed() {
        let a = Point::new(-33.45, -70.66);
        let b = Point::new(-33.46, -70.65);
        let slow = estimate_travel_minutes(a, b, DEFAULT_ROAD_FACTOR, 15.0);
        let fast = estimate_travel_minutes(a, b, DEFAULT_ROAD_FACTOR, 30.0);
        assert!((slow / fast - 2.0).abs() < 1e-9);
    }

    #[test]
    fn point_validation_rejects_out_of_range() {
        assert!(Point::new(-33.45, -70.66).is_valid());
        assert!(!Point::new(-91.0, 0.0).is_valid());
        assert!(!Point::new(0.0, 181.0).is_valid());
        assert!(!Point::new(f64::NAN, 0.0).is_valid());
    }
}
