use crate::types::Polygon;

/// Axis-aligned rectangle inset from the image edges by width/divisor and
/// height/divisor, ordered top-left, top-right, bottom-right, bottom-left.
pub fn fallback_boundary(width: u32, height: u32, margin_divisor: f64) -> Polygon {
    let (w, h) = (width as f64, height as f64);
    let (margin_x, margin_y) = (w / margin_divisor, h / margin_divisor);

    vec![
        [margin_x, margin_y],
        [w - margin_x, margin_y],
        [w - margin_x, h - margin_y],
        [margin_x, h - margin_y],
    ]
}
