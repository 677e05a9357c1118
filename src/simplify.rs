// src/simplify.rs - Reduce raw contours to compact boundary polygons

use imageproc::point::Point;
use nalgebra::Point2;

use crate::config::{Config, MAX_POLYGON_POINTS, MIN_POLYGON_POINTS};
use crate::shape_analysis::calculate_perimeter;
use crate::types::Polygon;

/// Two-tier simplifier: perimeter-relative Douglas-Peucker first, coarse
/// resampling of the raw contour when that collapses too far, and stride
/// sampling when the result is still too large.
#[derive(Debug, Clone)]
pub struct PolygonSimplifier {
    pub epsilon_ratio: f64,
    pub resample_target_points: usize,
    pub capped_target_points: usize,
}

impl PolygonSimplifier {
    pub fn from_config(config: &Config) -> Self {
        Self {
            epsilon_ratio: config.simplify_epsilon_ratio,
            resample_target_points: config.resample_target_points,
            capped_target_points: config.capped_target_points,
        }
    }

    /// Returns None when fewer than four points survive
    pub fn simplify(&self, contour: &[Point<i32>]) -> Option<Polygon> {
        if contour.is_empty() {
            return None;
        }

        let epsilon = self.epsilon_ratio * calculate_perimeter(contour);
        let mut points = simplify_closed(contour, epsilon);

        if points.len() < MIN_POLYGON_POINTS {
            log::debug!(
                "Simplification left {} points, resampling the raw contour to {}",
                points.len(),
                self.resample_target_points
            );
            points = resample_uniform(contour, self.resample_target_points);
        }

        if points.len() > MAX_POLYGON_POINTS {
            points = stride_sample(&points, self.capped_target_points);
        }

        if points.len() < MIN_POLYGON_POINTS {
            return None;
        }

        Some(points.iter().map(|p| [p.x as f64, p.y as f64]).collect())
    }
}

fn to_point2(p: Point<i32>) -> Point2<f64> {
    Point2::new(p.x as f64, p.y as f64)
}

/// Distance from `p` to the line through `a` and `b` (to `a` when they coincide)
fn perpendicular_distance(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let ap = p - a;
    let length = ab.norm();
    if length == 0.0 {
        return ap.norm();
    }
    (ab.x * ap.y - ab.y * ap.x).abs() / length
}

/// Douglas-Peucker on an open polyline; both endpoints are always kept
pub fn simplify_open(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut pending = vec![(0usize, points.len() - 1)];
    while let Some((start, end)) = pending.pop() {
        if end <= start + 1 {
            continue;
        }

        let a = to_point2(points[start]);
        let b = to_point2(points[end]);
        let mut max_distance = 0.0;
        let mut max_index = start;
        for (index, point) in points.iter().enumerate().take(end).skip(start + 1) {
            let distance = perpendicular_distance(to_point2(*point), a, b);
            if distance > max_distance {
                max_distance = distance;
                max_index = index;
            }
        }

        if max_distance > epsilon {
            keep[max_index] = true;
            pending.push((start, max_index));
            pending.push((max_index, end));
        }
    }

    points.iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(*p))
        .collect()
}

/// Douglas-Peucker on a closed ring.
///
/// The ring is split at the point farthest from its first point and each half
/// is simplified as an open polyline. The first point is not repeated at the end.
pub fn simplify_closed(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if contour.len() < 3 {
        return contour.to_vec();
    }

    let start = to_point2(contour[0]);
    let mut far_index = 0;
    let mut far_distance = 0.0;
    for (index, point) in contour.iter().enumerate().skip(1) {
        let distance = (to_point2(*point) - start).norm();
        if distance > far_distance {
            far_distance = distance;
            far_index = index;
        }
    }

    if far_index == 0 {
        // Every point coincides with the start
        return vec![contour[0]];
    }

    let mut second_half = contour[far_index..].to_vec();
    second_half.push(contour[0]);

    let mut result = simplify_open(&contour[..=far_index], epsilon);
    result.pop(); // far point opens the second half
    result.extend(simplify_open(&second_half, epsilon));
    result.pop(); // ring start repeated at the end
    result
}

/// Pick `target` evenly spaced points from the contour (all of them when it is shorter)
pub fn resample_uniform(contour: &[Point<i32>], target: usize) -> Vec<Point<i32>> {
    if contour.len() <= target || target == 0 {
        return contour.to_vec();
    }

    (0..target)
        .map(|i| contour[i * contour.len() / target])
        .collect()
}

/// Keep every n-th point so that at most `target` points remain
pub fn stride_sample(points: &[Point<i32>], target: usize) -> Vec<Point<i32>> {
    if points.len() <= target || target == 0 {
        return points.to_vec();
    }

    let step = points.len().div_ceil(target);
    points.iter().step_by(step).copied().collect()
}
