use proptest::prelude::*;

use roadwatch_geo::{haversine_m, NearFilter, EARTH_RADIUS_M};
use roadwatch_types::Coordinates;

fn point() -> impl Strategy<Value = Coordinates> {
    (-180.0f64..=180.0, -90.0f64..=90.0).prop_map(|(lon, lat)| Coordinates::new(lon, lat).unwrap())
}

proptest! {
    #[test]
    fn distance_is_symmetric(a in point(), b in point()) {
        let ab = haversine_m(&a, &b);
        let ba = haversine_m(&b, &a);
        prop_assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn distance_is_bounded(a in point(), b in point()) {
        let d = haversine_m(&a, &b);
        prop_assert!(d >= 0.0);
        prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_M + 1e-3);
    }

    #[test]
    fn point_is_within_any_radius_of_itself(a in point(), radius in 0.0f64..50_000.0) {
        let filter = NearFilter::new(a, radius).unwrap();
        prop_assert!(filter.contains(&a));
    }

    /// The bounding-box shortcut never drops a point the exact distance accepts.
    #[test]
    fn filter_agrees_with_exact_distance(
        center in point(),
        other in point(),
        radius in 1.0f64..3_000_000.0,
    ) {
        let filter = NearFilter::new(center, radius).unwrap();
        let exact = haversine_m(&center, &other) <= radius;
        prop_assert_eq!(filter.contains(&other), exact);
    }
}
