//! Path interpolation over `[lon, lat]` line geometry.
//!
//! All distances are haversine meters. Functions here are pure and never
//! fail: out-of-range distances are clamped and short geometry degrades to
//! its endpoints.

use geo::{Coord, HaversineDistance, HaversineIntermediate, HaversineLength, LineString, Point};

/// Below this a partial line collapses to its first point (meters).
const ZERO_DISTANCE: f64 = 1e-6;

/// Haversine length of `geometry` in meters. Fewer than two points → 0.
pub fn length(geometry: &LineString<f64>) -> f64 {
    if geometry.0.len() < 2 {
        return 0.0;
    }
    geometry.haversine_length()
}

fn leg_length(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Point(a).haversine_distance(&Point(b))
}

/// Point `fraction` of the way along the great circle from `a` to `b`.
fn along(a: Coord<f64>, b: Coord<f64>, fraction: f64) -> Coord<f64> {
    if fraction <= 0.0 {
        return a;
    }
    if fraction >= 1.0 {
        return b;
    }
    Point(a).haversine_intermediate(&Point(b), fraction).0
}

/// Walks the legs of `geometry` until `distance` is reached.
///
/// Returns the index of the leg's start vertex and the interpolated point.
/// Caller guarantees `0 < distance < length(geometry)`.
fn locate(geometry: &LineString<f64>, distance: f64) -> Option<(usize, Coord<f64>)> {
    let mut walked = 0.0;
    for (i, leg) in geometry.0.windows(2).enumerate() {
        let (a, b) = (leg[0], leg[1]);
        let span = leg_length(a, b);
        if span <= 0.0 {
            continue;
        }
        if walked + span >= distance {
            return Some((i, along(a, b, (distance - walked) / span)));
        }
        walked += span;
    }
    None
}

/// Coordinate at `distance` meters along `geometry`.
///
/// `distance <= 0` (or NaN) yields the first coordinate and
/// `distance >= length` the last, both exactly. Empty geometry yields `None`.
pub fn position_at(geometry: &LineString<f64>, distance: f64) -> Option<Coord<f64>> {
    let first = *geometry.0.first()?;
    let last = *geometry.0.last()?;

    if distance.is_nan() || distance <= 0.0 {
        return Some(first);
    }
    let total = length(geometry);
    if distance >= total {
        return Some(last);
    }

    // Float drift in the leg sums can leave us a hair short of the end
    Some(locate(geometry, distance).map_or(last, |(_, point)| point))
}

/// The leading portion of `geometry` up to `distance` meters.
///
/// Empty geometry stays empty. A distance of (nearly) zero, or degenerate
/// geometry, gives a single-point line; `distance >= length` the full line.
pub fn partial_line(geometry: &LineString<f64>, distance: f64) -> LineString<f64> {
    let Some(&first) = geometry.0.first() else {
        return LineString::new(Vec::new());
    };

    let total = length(geometry);
    if total <= 0.0 || distance.is_nan() || distance <= ZERO_DISTANCE {
        return LineString::new(vec![first]);
    }
    if distance >= total {
        return geometry.clone();
    }

    match locate(geometry, distance) {
        Some((leg, point)) => {
            let mut coords: Vec<Coord<f64>> = geometry.0[..=leg].to_vec();
            coords.push(point);
            LineString::new(coords)
        }
        None => geometry.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{equator_line, lon_for_meters};
    use approx::assert_relative_eq;

    #[test]
    fn test_length_of_short_geometry_is_zero() {
        assert_eq!(length(&LineString::new(vec![])), 0.0);
        assert_eq!(length(&LineString::from(vec![(10.0, 10.0)])), 0.0);
    }

    #[test]
    fn test_length_matches_haversine() {
        let line = equator_line(&[0.0, 1_000.0, 3_000.0]);
        assert_relative_eq!(length(&line), 3_000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_position_at_endpoints_are_exact() {
        let line = LineString::from(vec![(22.524, 40.758), (24.0, 40.9), (26.4, 40.2)]);
        let total = length(&line);

        assert_eq!(position_at(&line, 0.0), Some(line.0[0]));
        assert_eq!(position_at(&line, total), Some(line.0[2]));
        assert_eq!(position_at(&line, total * 2.0), Some(line.0[2]));
        assert_eq!(position_at(&line, -5.0), Some(line.0[0]));
    }

    #[test]
    fn test_position_at_midpoint_of_second_leg() {
        let line = equator_line(&[0.0, 1_000.0, 3_000.0]);
        let point = position_at(&line, 2_000.0).unwrap();

        assert_relative_eq!(point.x, lon_for_meters(2_000.0), max_relative = 1e-9);
        assert_relative_eq!(point.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_position_at_skips_zero_length_legs() {
        let line = equator_line(&[0.0, 500.0, 500.0, 1_000.0]);
        let point = position_at(&line, 750.0).unwrap();
        assert_relative_eq!(point.x, lon_for_meters(750.0), max_relative = 1e-9);
    }

    #[test]
    fn test_position_at_empty_geometry() {
        assert_eq!(position_at(&LineString::new(vec![]), 10.0), None);
    }

    #[test]
    fn test_partial_line_shapes() {
        let line = equator_line(&[0.0, 1_000.0, 3_000.0]);

        let start = partial_line(&line, 0.0);
        assert_eq!(start.0.len(), 1);

        let middle = partial_line(&line, 2_000.0);
        assert_eq!(middle.0.len(), 3);
        assert_eq!(middle.0[..2], line.0[..2]);
        assert_relative_eq!(length(&middle), 2_000.0, max_relative = 1e-6);

        assert_eq!(partial_line(&line, 10_000.0), line);
    }

    #[test]
    fn test_partial_line_of_degenerate_geometry() {
        let point = LineString::from(vec![(5.0, 5.0)]);
        assert_eq!(partial_line(&point, 100.0).0.len(), 1);
        assert!(partial_line(&LineString::new(vec![]), 100.0).0.is_empty());
    }
}
