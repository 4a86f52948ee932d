//! Geospatial radius filtering.
//!
//! Pure functions over (longitude, latitude) pairs. Distances are great-circle
//! distances on a spherical Earth (haversine), which is well within the
//! accuracy a "reports near me" query needs.
//!
//! A cheap bounding-box test runs before the trigonometry so large report
//! sets are mostly rejected on two subtractions.

use roadwatch_types::{Coordinates, Report};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius (IUGG), in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Radius used when a caller asks for "nearby" without a radius (10 km).
pub const DEFAULT_RADIUS_M: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("radius must be a finite, non-negative number of meters, got {0}")]
    InvalidRadius(f64),
}

/// Great-circle distance between two points, in meters.
pub fn haversine_m(a: &Coordinates, b: &Coordinates) -> f64 {
    let phi1 = a.latitude().to_radians();
    let phi2 = b.latitude().to_radians();
    let d_phi = (b.latitude() - a.latitude()).to_radians();
    let d_lambda = (b.longitude() - a.longitude()).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Absolute longitude difference in degrees, accounting for the antimeridian.
fn longitude_gap(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// "Within `radius_m` of `center`" predicate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNearFilter")]
pub struct NearFilter {
    center: Coordinates,
    radius_m: f64,
}

#[derive(Deserialize)]
struct RawNearFilter {
    center: Coordinates,
    radius_m: f64,
}

impl TryFrom<RawNearFilter> for NearFilter {
    type Error = GeoError;

    fn try_from(raw: RawNearFilter) -> Result<Self, Self::Error> {
        NearFilter::new(raw.center, raw.radius_m)
    }
}

impl NearFilter {
    pub fn new(center: Coordinates, radius_m: f64) -> Result<Self, GeoError> {
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(GeoError::InvalidRadius(radius_m));
        }
        Ok(Self { center, radius_m })
    }

    /// Filter centered on `center` with [`DEFAULT_RADIUS_M`].
    pub fn around(center: Coordinates) -> Self {
        Self {
            center,
            radius_m: DEFAULT_RADIUS_M,
        }
    }

    pub fn center(&self) -> Coordinates {
        self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Bounding-box rejection. Never rejects a point inside the circle.
    fn outside_bounds(&self, point: &Coordinates) -> bool {
        let r = self.radius_m / EARTH_RADIUS_M;
        // Small slack so points exactly on the circle survive rounding.
        let slack = 1e-9;
        let d_lat = r.to_degrees() + slack;
        if (point.latitude() - self.center.latitude()).abs() > d_lat {
            return true;
        }
        let lat = self.center.latitude().to_radians();
        if lat.abs() + r >= std::f64::consts::FRAC_PI_2 {
            // The circle reaches a pole: every longitude is reachable.
            return false;
        }
        let d_lon = (r.sin() / lat.cos()).asin().to_degrees() + slack;
        longitude_gap(point.longitude(), self.center.longitude()) > d_lon
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        if self.outside_bounds(point) {
            return false;
        }
        haversine_m(&self.center, point) <= self.radius_m
    }

    pub fn matches(&self, report: &Report) -> bool {
        self.contains(&report.location.coordinates)
    }

    pub fn distance_to(&self, report: &Report) -> f64 {
        haversine_m(&self.center, &report.location.coordinates)
    }
}

/// Reports located within `radius_m` of `center`, in input order.
pub fn within<'a, I>(center: Coordinates, radius_m: f64, reports: I) -> Result<Vec<&'a Report>, GeoError>
where
    I: IntoIterator<Item = &'a Report>,
{
    let filter = NearFilter::new(center, radius_m)?;
    Ok(reports.into_iter().filter(|r| filter.matches(r)).collect())
}

/// Sort reports nearest-first relative to the filter center.
pub fn sort_nearest_first(filter: &NearFilter, reports: &mut [&Report]) {
    reports.sort_by(|a, b| filter.distance_to(a).total_cmp(&filter.distance_to(b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadwatch_types::{Category, Location, PrincipalId, ReportId, Timestamp};

    fn coords(lon: f64, lat: f64) -> Coordinates {
        Coordinates::new(lon, lat).unwrap()
    }

    fn report_at(id: &str, lon: f64, lat: f64) -> Report {
        Report::new_pending(
            ReportId::new(id).unwrap(),
            PrincipalId::new("u0").unwrap(),
            Category::Congestion,
            String::new(),
            Location {
                name: String::new(),
                address: String::new(),
                coordinates: coords(lon, lat),
            },
            None,
            Timestamp::EPOCH,
        )
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_m(&coords(0.0, 0.0), &coords(0.0, 1.0));
        assert!((d - 111_195.08).abs() < 1.0, "got {d}");
    }

    #[test]
    fn equator_degree_matches_meridian_degree() {
        let lat = haversine_m(&coords(0.0, 0.0), &coords(0.0, 1.0));
        let lon = haversine_m(&coords(0.0, 0.0), &coords(1.0, 0.0));
        assert!((lat - lon).abs() < 1e-6);
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let d = haversine_m(&coords(0.0, 0.0), &coords(180.0, 0.0));
        let half = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!((d - half).abs() < 1.0);
    }

    #[test]
    fn negative_or_nan_radius_rejected() {
        assert!(NearFilter::new(coords(0.0, 0.0), -1.0).is_err());
        assert!(NearFilter::new(coords(0.0, 0.0), f64::NAN).is_err());
        assert!(NearFilter::new(coords(0.0, 0.0), 0.0).is_ok());
    }

    #[test]
    fn within_keeps_only_nearby_reports() {
        let reports = vec![
            report_at("zgc", 116.316, 39.983),
            report_at("cbd", 116.461, 39.909),
            report_at("sh", 121.474, 31.230),
        ];
        // Center near Zhongguancun, 5 km.
        let hits = within(coords(116.310, 39.990), 5_000.0, &reports).unwrap();
        let ids: Vec<_> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["zgc"]);

        // 20 km reaches the CBD too, but not Shanghai.
        let hits = within(coords(116.310, 39.990), 20_000.0, &reports).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn crosses_antimeridian() {
        let filter = NearFilter::new(coords(179.99, 0.0), 5_000.0).unwrap();
        assert!(filter.contains(&coords(-179.99, 0.0)));
        assert!(!filter.contains(&coords(-179.0, 0.0)));
    }

    #[test]
    fn near_pole_every_longitude_considered() {
        let filter = NearFilter::new(coords(0.0, 89.99), 5_000.0).unwrap();
        assert!(filter.contains(&coords(180.0, 89.99)));
    }

    #[test]
    fn sort_puts_closest_first() {
        let reports = vec![
            report_at("far", 116.461, 39.909),
            report_at("near", 116.316, 39.983),
        ];
        let filter = NearFilter::around(coords(116.310, 39.990));
        let mut refs: Vec<&Report> = reports.iter().collect();
        sort_nearest_first(&filter, &mut refs);
        assert_eq!(refs[0].id.as_str(), "near");
    }

    #[test]
    fn deserialize_validates_radius() {
        let ok: NearFilter = serde_json::from_str(
            r#"{"center":{"longitude":116.3,"latitude":39.9},"radius_m":500.0}"#,
        )
        .unwrap();
        assert_eq!(ok.radius_m(), 500.0);

        let negative = serde_json::from_str::<NearFilter>(
            r#"{"center":{"longitude":116.3,"latitude":39.9},"radius_m":-1.0}"#,
        );
        assert!(negative.is_err());
    }
}
