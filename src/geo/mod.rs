use crate::models::courier::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// City traffic average used to turn a crow-flies distance into a rough ETA.
const AVERAGE_COURIER_SPEED_KMH: f64 = 25.0;

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Minutes a courier needs for `distance_km`, never less than one.
pub fn estimate_duration_minutes(distance_km: f64) -> u32 {
    let minutes = (distance_km / AVERAGE_COURIER_SPEED_KMH) * 60.0;
    minutes.ceil().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        let p = GeoPoint {
            lat: 40.7128,
            lng: -74.0060,
        };
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn known_distance_manhattan_to_brooklyn() {
        let manhattan = GeoPoint {
            lat: 40.7831,
            lng: -73.9712,
        };
        let brooklyn = GeoPoint {
            lat: 40.6782,
            lng: -73.9442,
        };
        let km = haversine_km(manhattan, brooklyn);
        assert!((11.0..13.0).contains(&km), "got {km}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint { lat: 51.5, lng: -0.12 };
        let b = GeoPoint { lat: 48.85, lng: 2.35 };
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn duration_estimate_has_a_floor() {
        assert_eq!(estimate_duration_minutes(0.0), 1);
        assert_eq!(estimate_duration_minutes(25.0), 60);
    }
}
