// src/preprocess.rs - Grayscale conversion, normalization and local contrast enhancement

use image::{GrayImage, Luma, RgbaImage};
use imageproc::contrast::stretch_contrast;

use crate::config::Config;
use crate::errors::{BoundaryError, Result};

/// Intensity buffer handed to the detection strategies
pub struct Preprocessed {
    pub intensity: GrayImage,
    /// false when contrast enhancement failed and the plain normalized buffer is used
    pub enhanced: bool,
}

/// Convert an RGBA raster into a normalized, contrast-enhanced intensity buffer.
///
/// A failure of the enhancement step is recovered locally: the normalized
/// grayscale buffer is returned instead.
pub fn preprocess(image: &RgbaImage, config: &Config) -> Preprocessed {
    let gray = image::imageops::grayscale(image);
    let normalized = normalize_intensity(&gray);

    match equalize_adaptive(&normalized, config.clahe_clip_limit, config.clahe_tile_grid) {
        Ok(intensity) => Preprocessed { intensity, enhanced: true },
        Err(e) => {
            log::warn!("{}; continuing with the normalized grayscale buffer", e);
            Preprocessed { intensity: normalized, enhanced: false }
        }
    }
}

/// Min-max normalization to the full [0, 255] range.
/// Uniform images are returned unchanged.
pub fn normalize_intensity(gray: &GrayImage) -> GrayImage {
    let (min, max) = gray.pixels().fold((u8::MAX, u8::MIN), |(lo, hi), p| {
        (lo.min(p[0]), hi.max(p[0]))
    });

    if min >= max {
        return gray.clone();
    }

    stretch_contrast(gray, min, max)
}

/// Contrast-limited adaptive histogram equalization on a `grid` x `grid` tiling.
///
/// Each tile gets its own clipped-histogram lookup table; output pixels are
/// bilinearly interpolated between the four nearest tile centers.
pub fn equalize_adaptive(image: &GrayImage, clip_limit: f64, grid: u32) -> Result<GrayImage> {
    let (width, height) = image.dimensions();

    if grid == 0 {
        return Err(BoundaryError::Enhancement("tile grid must be > 0".to_string()));
    }

    if !(clip_limit > 0.0) {
        return Err(BoundaryError::Enhancement(format!(
            "clip limit must be > 0.0, got {}", clip_limit
        )));
    }

    if width < grid || height < grid {
        return Err(BoundaryError::Enhancement(format!(
            "{}x{} image is smaller than the {}x{} tile grid", width, height, grid, grid
        )));
    }

    let tile_w = width as f64 / grid as f64;
    let tile_h = height as f64 / grid as f64;

    let mut luts = Vec::with_capacity((grid * grid) as usize);
    for ty in 0..grid {
        let (y0, y1) = tile_span(ty, tile_h, height);
        for tx in 0..grid {
            let (x0, x1) = tile_span(tx, tile_w, width);

            let mut histogram = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            luts.push(clipped_lut(&mut histogram, (x1 - x0) * (y1 - y0), clip_limit));
        }
    }

    let mut result = GrayImage::new(width, height);
    for y in 0..height {
        let (ty0, ty1, wy) = interpolation_cell(y, tile_h, grid);
        for x in 0..width {
            let (tx0, tx1, wx) = interpolation_cell(x, tile_w, grid);
            let value = image.get_pixel(x, y)[0] as usize;
            let lookup = |tx: u32, ty: u32| luts[(ty * grid + tx) as usize][value] as f64;

            let top = lookup(tx0, ty0) * (1.0 - wx) + lookup(tx1, ty0) * wx;
            let bottom = lookup(tx0, ty1) * (1.0 - wx) + lookup(tx1, ty1) * wx;
            let mapped = top * (1.0 - wy) + bottom * wy;

            result.put_pixel(x, y, Luma([mapped.round().clamp(0.0, 255.0) as u8]));
        }
    }

    Ok(result)
}

/// Pixel range [start, end) covered by tile `index`
fn tile_span(index: u32, tile_size: f64, limit: u32) -> (u32, u32) {
    let start = (index as f64 * tile_size).floor() as u32;
    let end = (((index + 1) as f64 * tile_size).floor() as u32).min(limit);
    (start, end)
}

/// Neighbouring tile indices and the blend weight of the second one
fn interpolation_cell(coord: u32, tile_size: f64, grid: u32) -> (u32, u32, f64) {
    let position = (coord as f64 + 0.5) / tile_size - 0.5;
    if position <= 0.0 {
        return (0, 0, 0.0);
    }

    let lower = position.floor() as u32;
    if lower >= grid - 1 {
        return (grid - 1, grid - 1, 0.0);
    }

    (lower, lower + 1, position - lower as f64)
}

/// Clip the histogram, redistribute the excess and build the equalization table
fn clipped_lut(histogram: &mut [u32; 256], tile_pixels: u32, clip_limit: f64) -> [u8; 256] {
    let limit = ((clip_limit * tile_pixels as f64 / 256.0) as u32).max(1);

    let mut excess = 0u32;
    for count in histogram.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let per_bin = excess / 256;
    let residual = (excess % 256) as usize;
    for count in histogram.iter_mut() {
        *count += per_bin;
    }
    if residual > 0 {
        let step = (256 / residual).max(1);
        for count in histogram.iter_mut().step_by(step).take(residual) {
            *count += 1;
        }
    }

    let scale = 255.0 / tile_pixels as f64;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (value, &count) in histogram.iter().enumerate() {
        cumulative += count;
        lut[value] = (cumulative as f64 * scale).round().min(255.0) as u8;
    }

    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_normalize_stretches_to_full_range() {
        let mut gray = GrayImage::from_pixel(10, 10, Luma([100]));
        gray.put_pixel(0, 0, Luma([50]));
        gray.put_pixel(9, 9, Luma([150]));

        let normalized = normalize_intensity(&gray);
        assert_eq!(normalized.get_pixel(0, 0)[0], 0);
        assert_eq!(normalized.get_pixel(9, 9)[0], 255);
    }

    #[test]
    fn test_normalize_leaves_uniform_image_alone() {
        let gray = GrayImage::from_pixel(5, 5, Luma([77]));
        assert_eq!(normalize_intensity(&gray), gray);
    }

    #[test]
    fn test_white_image_stays_white_after_equalization() {
        let gray = GrayImage::from_pixel(64, 48, Luma([255]));
        let equalized = equalize_adaptive(&gray, 2.0, 8).unwrap();
        assert!(equalized.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_equalization_keeps_dark_ink_dark() {
        let mut gray = GrayImage::from_pixel(80, 80, Luma([255]));
        for y in 20..60 {
            for x in 20..60 {
                gray.put_pixel(x, y, Luma([0]));
            }
        }

        let equalized = equalize_adaptive(&gray, 2.0, 8).unwrap();
        assert!(equalized.get_pixel(40, 40)[0] < 40);
        assert_eq!(equalized.get_pixel(2, 2)[0], 255);
    }

    #[test]
    fn test_image_smaller_than_grid_is_an_error() {
        let gray = GrayImage::from_pixel(4, 4, Luma([10]));
        assert!(matches!(
            equalize_adaptive(&gray, 2.0, 8),
            Err(BoundaryError::Enhancement(_))
        ));
    }

    #[test]
    fn test_preprocess_recovers_when_enhancement_fails() {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255]));
        image.put_pixel(1, 1, Rgba([0, 0, 0, 255]));

        let result = preprocess(&image, &Config::default());
        assert!(!result.enhanced);
        assert_eq!(result.intensity.dimensions(), (4, 4));
        assert_eq!(result.intensity.get_pixel(1, 1)[0], 0);
        assert_eq!(result.intensity.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_preprocess_preserves_dimensions() {
        let image = RgbaImage::from_pixel(97, 33, Rgba([120, 130, 140, 255]));
        let result = preprocess(&image, &Config::default());
        assert!(result.enhanced);
        assert_eq!(result.intensity.dimensions(), (97, 33));
    }
}
