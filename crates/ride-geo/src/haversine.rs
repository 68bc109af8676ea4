//! Great-circle distance between two lng/lat points. Generalized from the
//! teacher's H3-cell distance helper (`spatial::distance_km_between_cells`)
//! to plain coordinates, since this system's pickup/dropoff are raw lng/lat
//! pairs, not H3 cell indices.

use ride_core::Location;

const EARTH_RADIUS_KM: f64 = 6371.0;

pub fn distance_km(a: Location, b: Location) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        let p = Location { lng: 10.0, lat: 20.0 };
        assert!(distance_km(p, p) < 1e-9);
    }

    #[test]
    fn known_distance_is_approximately_correct() {
        // Roughly the distance between two points one degree of latitude apart.
        let a = Location { lng: 0.0, lat: 0.0 };
        let b = Location { lng: 0.0, lat: 1.0 };
        let d = distance_km(a, b);
        assert!((d - 111.19).abs() < 1.0, "got {d}");
    }
}
