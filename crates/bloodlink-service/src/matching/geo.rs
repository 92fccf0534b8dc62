//! Great-circle distance and the rectangular pre-filter.

use bloodlink_entity::request::{BoundingBox, Coordinates};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of latitude, as used by the pre-filter.
const KM_PER_DEGREE: f64 = 111.0;

/// Haversine distance between two points, in kilometres.
pub fn distance_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Whether `b` lies within `radius_km` of `a`.
pub fn within_radius(a: &Coordinates, b: &Coordinates, radius_km: f64) -> bool {
    distance_km(a, b) <= radius_km
}

/// A box guaranteed to contain every point within `radius_km` of `center`.
///
/// Latitude spans `radius/111` degrees each way. Longitude spans
/// `radius/(111·cos lat)`; when that reaches a pole or crosses the
/// antimeridian the box covers every longitude instead.
pub fn bounding_box(center: &Coordinates, radius_km: f64) -> BoundingBox {
    let d_lat = radius_km / KM_PER_DEGREE;
    let min_lat = (center.lat - d_lat).max(-90.0);
    let max_lat = (center.lat + d_lat).min(90.0);

    let full = BoundingBox {
        min_lat,
        max_lat,
        min_lng: -180.0,
        max_lng: 180.0,
    };

    // The widest longitude span within the box is at the latitude nearest
    // a pole.
    let widest_lat = center.lat.abs() + d_lat;
    if widest_lat >= 90.0 {
        return full;
    }
    let d_lng = radius_km / (KM_PER_DEGREE * widest_lat.to_radians().cos());
    let (min_lng, max_lng) = (center.lng - d_lng, center.lng + d_lng);
    if min_lng < -180.0 || max_lng > 180.0 {
        return full;
    }

    BoundingBox {
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> Coordinates {
        Coordinates { lat, lng }
    }

    #[test]
    fn test_distance_is_symmetric_and_zero_on_self() {
        let nouakchott = point(18.0735, -15.9582);
        let dakar = point(14.7167, -17.4677);
        assert_eq!(distance_km(&nouakchott, &nouakchott), 0.0);
        assert_eq!(distance_km(&nouakchott, &dakar), distance_km(&dakar, &nouakchott));
    }

    #[test]
    fn test_known_distance() {
        let nouakchott = point(18.0735, -15.9582);
        let dakar = point(14.7167, -17.4677);
        let d = distance_km(&nouakchott, &dakar);
        assert!((d - 405.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn test_box_contains_points_on_the_radius() {
        let center = point(18.0735, -15.9582);
        let radius = 25.0;
        let area = bounding_box(&center, radius);
        for bearing in (0..360).step_by(15) {
            let theta = (bearing as f64).to_radians();
            // Walk outwards until just inside the radius.
            let mut step = 0.0;
            let mut last = center;
            loop {
                step += 0.001;
                let candidate =
                    point(center.lat + step * theta.cos(), center.lng + step * theta.sin());
                if !within_radius(&center, &candidate, radius) {
                    break;
                }
                last = candidate;
            }
            assert!(area.contains(&last), "bearing {bearing} escaped the box");
        }
    }

    #[test]
    fn test_box_widens_near_poles_and_antimeridian() {
        let polar = bounding_box(&point(89.9, 10.0), 50.0);
        assert_eq!((polar.min_lng, polar.max_lng), (-180.0, 180.0));
        assert_eq!(polar.max_lat, 90.0);

        let dateline = bounding_box(&point(0.0, 179.9), 50.0);
        assert_eq!((dateline.min_lng, dateline.max_lng), (-180.0, 180.0));
    }
}
