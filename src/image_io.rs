use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::fs;
use image::{ImageFormat, RgbaImage};

use crate::errors::{BoundaryError, Result};

/// File extensions picked up when scanning a directory for floor plans
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: RgbaImage,
    pub path: PathBuf,
    pub filename: String,
}

/// Get all supported image files from a directory (recursively), sorted by path
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(BoundaryError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(BoundaryError::Config(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut image_files = Vec::new();
    find_image_files_recursive(dir_path, &mut image_files)?;
    image_files.sort();

    Ok(image_files)
}

fn find_image_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_image_files_recursive(&path, result)?;
        } else if path.is_file() && has_image_extension(&path) {
            result.push(path);
        }
    }

    Ok(())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Output names for a batch of input files, one per file and all distinct.
///
/// A name is the path relative to `root` without its extension, directories
/// joined by `__`. When two files still share a name (`plan.png`, `plan.jpg`)
/// their lowercased extension is appended, and any remaining clash gets a
/// numeric suffix.
pub fn output_names<P: AsRef<Path>>(files: &[PathBuf], root: P) -> Vec<String> {
    let root = root.as_ref();

    let bases: Vec<String> = files.iter()
        .map(|path| {
            let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if parts.is_empty() { "unnamed".to_string() } else { parts.join("__") }
        })
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *counts.entry(base.as_str()).or_default() += 1;
    }

    let mut taken = HashSet::new();
    files.iter()
        .zip(&bases)
        .map(|(path, base)| {
            let mut name = base.clone();
            if counts[base.as_str()] > 1 {
                if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                    name = format!("{}_{}", name, ext.to_ascii_lowercase());
                }
            }

            let mut candidate = name.clone();
            let mut suffix = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{}_{}", name, suffix);
                suffix += 1;
            }
            candidate
        })
        .collect()
}

/// Reject rasters that cannot hold a boundary at all
pub fn ensure_dimensions(image: &RgbaImage) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(BoundaryError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Load an image file and convert it to RGBA
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BoundaryError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let rgba_img = image::open(path)?.to_rgba8();
    ensure_dimensions(&rgba_img)?;

    Ok(InputImage {
        image: rgba_img,
        path: path.to_path_buf(),
        filename,
    })
}

/// Decode an in-memory encoded image (PNG, JPEG, ...) to RGBA
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbaImage> {
    let rgba_img = image::load_from_memory(bytes)?.to_rgba8();
    ensure_dimensions(&rgba_img)?;
    Ok(rgba_img)
}

/// Wrap raw interleaved RGBA pixels, e.g. read back from a canvas
pub fn image_from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(BoundaryError::InvalidDimensions { width, height });
    }

    let expected = width as usize * height as usize * 4;
    let actual = pixels.len();
    RgbaImage::from_raw(width, height, pixels)
        .ok_or(BoundaryError::PixelBufferSize { expected, actual })
}

/// Save an RGBA image to the specified path as PNG
pub fn save_image<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_raw_buffer_of_wrong_length_is_rejected() {
        let result = image_from_rgba(4, 4, vec![0; 10]);
        assert!(matches!(
            result,
            Err(BoundaryError::PixelBufferSize { expected: 64, actual: 10 })
        ));
    }

    #[test]
    fn test_zero_dimensions_are_rejected() {
        assert!(matches!(
            image_from_rgba(0, 10, Vec::new()),
            Err(BoundaryError::InvalidDimensions { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_corrupt_bytes_fail_to_decode() {
        let result = decode_image_bytes(b"definitely not an image");
        assert!(matches!(result, Err(BoundaryError::Image(_))));
    }

    #[test]
    fn test_directory_scan_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("level2");
        fs::create_dir_all(&nested).unwrap();

        let image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        save_image(&image, dir.path().join("a.png")).unwrap();
        save_image(&image, nested.join("b.PNG")).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let files = get_image_files_in_dir(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| has_image_extension(p)));
    }

    #[test]
    fn test_same_stem_inputs_get_distinct_output_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();

        let image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        save_image(&image, dir.path().join("a").join("plan.png")).unwrap();
        save_image(&image, dir.path().join("b").join("plan.png")).unwrap();
        save_image(&image, dir.path().join("plan.png")).unwrap();
        image::DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .save(dir.path().join("plan.jpg"))
            .unwrap();

        let files = get_image_files_in_dir(dir.path()).unwrap();
        assert_eq!(files.len(), 4);

        let mut names = output_names(&files, dir.path());
        names.sort();
        assert_eq!(names, vec!["a__plan", "b__plan", "plan_jpg", "plan_png"]);
    }

    #[test]
    fn test_output_names_keep_plain_stems_when_unique() {
        let files = vec![PathBuf::from("/scans/first.png"), PathBuf::from("/scans/second.tif")];
        assert_eq!(output_names(&files, "/scans"), vec!["first", "second"]);

        // Same relative path twice still yields two names
        let files = vec![PathBuf::from("/scans/x.png"), PathBuf::from("/scans/x.png")];
        assert_eq!(output_names(&files, "/scans"), vec!["x_png", "x_png_2"]);
    }

    #[test]
    fn test_load_image_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.png");
        let image = RgbaImage::from_pixel(12, 7, Rgba([10, 20, 30, 255]));
        save_image(&image, &path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.filename, "plan");
        assert_eq!(loaded.image.dimensions(), (12, 7));
    }
}
