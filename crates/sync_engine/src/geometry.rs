//! Zone coverage polygon

use std::f64::consts::TAU;

use geo::{MinimumRotatedRect, MultiPoint, Point};

/// Buffer radius around each spot, in degrees
pub const BUFFER_DEGREES: f64 = 0.0001;

/// Vertices approximating the buffer circle around each spot
const RING_VERTICES: usize = 32;

/// Minimum-area rotated rectangle covering every point buffered by
/// [`BUFFER_DEGREES`].
///
/// Input points are `(latitude, longitude)`. The returned ring is closed and
/// in `[longitude, latitude]` order. `None` when there are no points.
pub fn coverage_rectangle(points: &[(f64, f64)]) -> Option<Vec<[f64; 2]>> {
    if points.is_empty() {
        return None;
    }

    let buffered: Vec<Point<f64>> = points
        .iter()
        .flat_map(|&(lat, lon)| {
            (0..RING_VERTICES).map(move |i| {
                let theta = TAU * i as f64 / RING_VERTICES as f64;
                Point::new(lat + BUFFER_DEGREES * theta.cos(), lon + BUFFER_DEGREES * theta.sin())
            })
        })
        .collect();

    let rect = MultiPoint::from(buffered).minimum_rotated_rect()?;
    Some(rect.exterior().coords().map(|c| [c.y, c.x]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shoelace area of a closed ring
    fn ring_area(ring: &[[f64; 2]]) -> f64 {
        ring.windows(2)
            .map(|w| w[0][0] * w[1][1] - w[1][0] * w[0][1])
            .sum::<f64>()
            .abs()
            / 2.0
    }

    #[test]
    fn test_no_points() {
        assert!(coverage_rectangle(&[]).is_none());
    }

    #[test]
    fn test_single_point_has_area() {
        let ring = coverage_rectangle(&[(41.0, 2.0)]).unwrap();
        assert_eq!(ring.first(), ring.last());
        let area = ring_area(&ring);
        // roughly the buffer square: (2 * 0.0001)^2
        assert!(area > 3.0e-8 && area < 5.0e-8, "area {area}");
    }

    #[test]
    fn test_collinear_points_have_area() {
        let ring = coverage_rectangle(&[(41.0, 2.0), (41.001, 2.0), (41.002, 2.0)]).unwrap();
        assert!(ring_area(&ring) > 0.0);
    }

    #[test]
    fn test_output_is_longitude_first() {
        let ring = coverage_rectangle(&[(41.0, 2.0), (41.01, 2.01)]).unwrap();
        for [lon, lat] in &ring {
            assert!((1.99..2.02).contains(lon), "lon {lon}");
            assert!((40.99..41.02).contains(lat), "lat {lat}");
        }
    }
}
