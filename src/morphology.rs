use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::filter::box_filter;
use imageproc::point::Point;

use crate::types::Contour;

/// Mask value for foreground pixels
pub const FOREGROUND: u8 = 255;

/// Mask value for background pixels
pub const BACKGROUND: u8 = 0;

/// Locally adaptive binarization (inverted): a pixel becomes foreground when it is
/// darker than the mean of its `block_size` x `block_size` neighbourhood minus `offset`.
pub fn adaptive_threshold_inv(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let radius = block_size / 2;
    let local_means = box_filter(image, radius, radius);

    let mut mask = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let mean = local_means.get_pixel(x, y)[0] as i32;
        let value = if (pixel[0] as i32) < mean - offset { FOREGROUND } else { BACKGROUND };
        mask.put_pixel(x, y, Luma([value]));
    }

    mask
}

/// Global inverted binarization: pixels strictly below `cut` become foreground
pub fn threshold_below(image: &GrayImage, cut: u8) -> GrayImage {
    let mut mask = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel[0] < cut { FOREGROUND } else { BACKGROUND };
        mask.put_pixel(x, y, Luma([value]));
    }
    mask
}

/// Logical OR of `other` into `mask`; both must share dimensions
pub fn union_into(mask: &mut GrayImage, other: &GrayImage) {
    for (target, source) in mask.pixels_mut().zip(other.pixels()) {
        if source[0] != BACKGROUND {
            target[0] = FOREGROUND;
        }
    }
}

/// Radius of a square structuring element with the given side length
fn kernel_radius(kernel_size: u32) -> u8 {
    (kernel_size / 2).min(u8::MAX as u32) as u8
}

/// Morphological closing (dilation then erosion) with a square structuring element.
/// Bridges gaps narrower than the element.
pub fn close_mask(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    let radius = kernel_radius(kernel_size);
    if radius == 0 {
        return mask.clone();
    }
    imageproc::morphology::close(mask, Norm::LInf, radius)
}

/// Morphological opening (erosion then dilation) with a square structuring element.
/// Strips specks and strokes thinner than the element.
pub fn open_mask(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    let radius = kernel_radius(kernel_size);
    if radius == 0 {
        return mask.clone();
    }
    imageproc::morphology::open(mask, Norm::LInf, radius)
}

/// Trace the outermost borders of the mask's connected components.
/// Holes, and components nested inside holes, are skipped.
///
/// The mask is traced inside a one pixel background frame: components touching
/// the left edge would otherwise be classified as holes.
pub fn trace_external_contours(mask: &GrayImage) -> Vec<Contour> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut framed = GrayImage::new(width + 2, height + 2);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] != BACKGROUND {
            framed.put_pixel(x + 1, y + 1, Luma([FOREGROUND]));
        }
    }

    let (max_x, max_y) = (width as i32 - 1, height as i32 - 1);
    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new((p.x - 1).clamp(0, max_x), (p.y - 1).clamp(0, max_y)))
                .collect()
        })
        .collect()
}

/// Count foreground pixels in a mask
pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] != BACKGROUND).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_rect(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for y in y0..y1 {
            for x in x0..x1 {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
        mask
    }

    #[test]
    fn test_adaptive_threshold_marks_dark_edges_only() {
        let mut image = GrayImage::from_pixel(60, 60, Luma([255]));
        for y in 20..40 {
            for x in 20..40 {
                image.put_pixel(x, y, Luma([0]));
            }
        }

        let mask = adaptive_threshold_inv(&image, 15, 8);
        assert_eq!(mask.get_pixel(20, 20)[0], FOREGROUND);
        assert_eq!(mask.get_pixel(19, 19)[0], BACKGROUND);
        assert_eq!(mask.get_pixel(5, 5)[0], BACKGROUND);
        // Deep inside a large dark area the local mean is dark too
        let mut large = GrayImage::from_pixel(60, 60, Luma([0]));
        large.put_pixel(0, 0, Luma([255]));
        assert_eq!(adaptive_threshold_inv(&large, 15, 8).get_pixel(40, 40)[0], BACKGROUND);
    }

    #[test]
    fn test_uniform_image_gives_empty_adaptive_mask() {
        let image = GrayImage::from_pixel(30, 30, Luma([200]));
        assert_eq!(foreground_count(&adaptive_threshold_inv(&image, 15, 8)), 0);
    }

    #[test]
    fn test_threshold_levels_and_union() {
        let mut image = GrayImage::from_pixel(3, 1, Luma([250]));
        image.put_pixel(0, 0, Luma([90]));
        image.put_pixel(1, 0, Luma([180]));

        let mut mask = threshold_below(&image, 100);
        assert_eq!(foreground_count(&mask), 1);

        union_into(&mut mask, &threshold_below(&image, 200));
        assert_eq!(mask.get_pixel(0, 0)[0], FOREGROUND);
        assert_eq!(mask.get_pixel(1, 0)[0], FOREGROUND);
        assert_eq!(mask.get_pixel(2, 0)[0], BACKGROUND);
    }

    #[test]
    fn test_closing_bridges_one_pixel_gap() {
        let mut mask = filled_rect(30, 30, 5, 10, 25, 15);
        for y in 10..15 {
            mask.put_pixel(15, y, Luma([BACKGROUND]));
        }

        let closed = close_mask(&mask, 3);
        assert_eq!(closed.get_pixel(15, 12)[0], FOREGROUND);
    }

    #[test]
    fn test_opening_removes_speck() {
        let mut mask = filled_rect(30, 30, 5, 5, 20, 20);
        mask.put_pixel(27, 27, Luma([FOREGROUND]));

        let opened = open_mask(&mask, 3);
        assert_eq!(opened.get_pixel(27, 27)[0], BACKGROUND);
        assert_eq!(opened.get_pixel(12, 12)[0], FOREGROUND);
    }

    #[test]
    fn test_external_contours_skip_holes_and_nested_islands() {
        // Frame with a hole, plus an island inside the hole
        let mut mask = filled_rect(50, 50, 5, 5, 45, 45);
        for y in 10..40 {
            for x in 10..40 {
                mask.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }
        for y in 20..30 {
            for x in 20..30 {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }

        let contours = trace_external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].iter().all(|p| p.x == 5 || p.x == 44 || p.y == 5 || p.y == 44));
    }

    #[test]
    fn test_components_touching_the_left_edge_are_traced() {
        let contours = trace_external_contours(&filled_rect(200, 200, 0, 50, 60, 100));
        assert_eq!(contours.len(), 1);
        assert!(contours[0].contains(&Point::new(0, 50)));
        assert!(contours[0].contains(&Point::new(59, 99)));
    }

    #[test]
    fn test_components_filling_a_corner_keep_image_coordinates() {
        let contours = trace_external_contours(&filled_rect(50, 40, 0, 0, 20, 40));
        assert_eq!(contours.len(), 1);
        for p in &contours[0] {
            assert!((0..20).contains(&p.x) && (0..40).contains(&p.y), "{:?}", p);
        }
        assert!(contours[0].contains(&Point::new(0, 0)));
        assert!(contours[0].contains(&Point::new(19, 39)));
    }

    #[test]
    fn test_separate_components_each_get_a_contour() {
        let mut mask = filled_rect(40, 20, 2, 2, 10, 10);
        union_into(&mut mask, &filled_rect(40, 20, 20, 5, 35, 15));
        assert_eq!(trace_external_contours(&mask).len(), 2);
    }
}
