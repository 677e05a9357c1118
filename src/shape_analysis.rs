// src/shape_analysis.rs - Contour geometry used for candidate scoring

use imageproc::point::Point;

/// Area enclosed by a closed contour (shoelace formula, always non-negative)
pub fn calculate_area(contour: &[Point<i32>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let n = contour.len();
    let mut twice_area = 0.0;
    for i in 0..n {
        let p1 = contour[i];
        let p2 = contour[(i + 1) % n]; // Wrap around to first point
        twice_area += p1.x as f64 * p2.y as f64 - p2.x as f64 * p1.y as f64;
    }

    twice_area.abs() / 2.0
}

/// Calculate the perimeter of a closed contour
pub fn calculate_perimeter(contour: &[Point<i32>]) -> f64 {
    if contour.len() < 2 {
        return 0.0;
    }

    let mut perimeter = 0.0;
    let n = contour.len();

    for i in 0..n {
        let p1 = contour[i];
        let p2 = contour[(i + 1) % n];

        let dx = p2.x as f64 - p1.x as f64;
        let dy = p2.y as f64 - p1.y as f64;
        perimeter += (dx * dx + dy * dy).sqrt();
    }

    perimeter
}

/// Inclusive pixel extents of the contour's axis-aligned bounding box.
/// Returns (width, height); both are at least 1 for a non-empty contour.
pub fn calculate_bounding_box_dimensions(contour: &[Point<i32>]) -> (u32, u32) {
    let first = match contour.first() {
        Some(p) => *p,
        None => return (0, 0),
    };

    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in contour {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    ((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32)
}

/// max(width, height) / min(width, height) of the bounding box
pub fn calculate_aspect_ratio(width: u32, height: u32) -> f64 {
    let shorter = width.min(height);
    if shorter == 0 {
        return f64::INFINITY;
    }
    width.max(height) as f64 / shorter as f64
}

/// Convex hull via Andrew's monotone chain, counter-clockwise in image coordinates
pub fn convex_hull(contour: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut points: Vec<(i64, i64)> = contour.iter().map(|p| (p.x as i64, p.y as i64)).collect();
    points.sort_unstable();
    points.dedup();

    if points.len() < 3 {
        return points.into_iter().map(|(x, y)| Point::new(x as i32, y as i32)).collect();
    }

    let cross = |o: (i64, i64), a: (i64, i64), b: (i64, i64)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut hull: Vec<(i64, i64)> = Vec::with_capacity(points.len() * 2);

    // Lower chain
    for &p in &points {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }

    // Upper chain
    let lower_len = hull.len() + 1;
    for &p in points.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }

    hull.pop(); // last point repeats the first
    hull.into_iter().map(|(x, y)| Point::new(x as i32, y as i32)).collect()
}

/// Contour area divided by convex hull area; 0.0 when the hull is degenerate
pub fn calculate_solidity(contour: &[Point<i32>], area: f64) -> f64 {
    let hull_area = calculate_area(&convex_hull(contour));
    if hull_area <= 0.0 {
        return 0.0;
    }
    area / hull_area
}
