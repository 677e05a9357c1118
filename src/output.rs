use std::fs;
use std::path::{Path, PathBuf};
use bresenham::Bresenham;
use csv::Writer;
use image::{Rgba, RgbaImage};

use crate::errors::{BoundaryError, Result};
use crate::types::BoundaryResult;

/// Overlay color for boundaries found by a detection strategy
pub const DETECTED_COLOR: [u8; 3] = [0, 200, 0];

/// Overlay color for the fallback rectangle
pub const FALLBACK_COLOR: [u8; 3] = [255, 140, 0];

/// Side length of the square drawn on each polygon vertex
const VERTEX_MARKER_SIZE: u32 = 5;

/// One line of the batch summary
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub filename: String,
    pub result: BoundaryResult,
    pub elapsed_ms: f64,
}

/// Write the boundary result as pretty JSON to `<output_dir>/json/<filename>.json`
pub fn write_result_json<P: AsRef<Path>>(
    result: &BoundaryResult,
    output_dir: P,
    filename: &str,
) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join("json").join(format!("{}.json", filename));

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = fs::File::create(&output_path)?;
    serde_json::to_writer_pretty(file, result)?;

    Ok(output_path)
}

/// Write one row per processed image to `<output_dir>/summary.csv`
pub fn write_summary_csv<P: AsRef<Path>>(rows: &[SummaryRow], output_dir: P) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join("summary.csv");

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(&output_path)?;

    writer.write_record([
        "Filename",
        "Success",
        "Processing_Method",
        "Point_Count",
        "Width",
        "Height",
        "Strategies_Tried",
        "Elapsed_ms",
        "Error",
    ])?;

    for row in rows {
        let result = &row.result;
        writer.write_record(&[
            row.filename.clone(),
            result.success.to_string(),
            result.method.map(|m| m.as_str()).unwrap_or("none").to_string(),
            result.point_count.to_string(),
            result.diagnostics.width.to_string(),
            result.diagnostics.height.to_string(),
            result.diagnostics.strategies.len().to_string(),
            format!("{:.1}", row.elapsed_ms),
            result.error.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush().map_err(|e| BoundaryError::CsvOutput(csv::Error::from(e)))?;

    Ok(output_path)
}

/// Copy of the image with the closed polygon drawn on top and each vertex marked
pub fn draw_boundary_overlay(image: &RgbaImage, polygon: &[[f64; 2]], color: [u8; 3]) -> RgbaImage {
    let mut overlay = image.clone();
    let (width, height) = overlay.dimensions();
    let pixel = Rgba([color[0], color[1], color[2], 255]);

    let mut plot = |x: isize, y: isize| {
        if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
            overlay.put_pixel(x as u32, y as u32, pixel);
        }
    };

    let vertices: Vec<(isize, isize)> = polygon
        .iter()
        .map(|[x, y]| (x.round() as isize, y.round() as isize))
        .collect();

    for (i, &start) in vertices.iter().enumerate() {
        let end = vertices[(i + 1) % vertices.len()];
        for (x, y) in Bresenham::new(start, end) {
            plot(x, y);
        }
    }

    let radius = (VERTEX_MARKER_SIZE / 2) as isize;
    for &(vx, vy) in &vertices {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                plot(vx + dx, vy + dy);
            }
        }
    }

    overlay
}

/// Overlay color matching how the boundary was obtained
pub fn overlay_color(result: &BoundaryResult) -> [u8; 3] {
    if result.is_fallback() {
        FALLBACK_COLOR
    } else {
        DETECTED_COLOR
    }
}
