// src/strategies.rs - Contour detection strategies, tried in priority order

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use crate::candidate_filter::{Candidate, CandidateFilter};
use crate::config::Config;
use crate::errors::{BoundaryError, Result};
use crate::morphology::{
    adaptive_threshold_inv, close_mask, open_mask, threshold_below, trace_external_contours,
    union_into,
};
use crate::types::{Contour, ProcessingMethod};

/// One way of turning the preprocessed intensity buffer into raw contours.
///
/// Each strategy owns the masks it allocates; they are dropped before
/// `find_contours` returns.
pub trait DetectionStrategy: Send + Sync {
    fn method(&self) -> ProcessingMethod;

    /// Binarize the intensity buffer and trace the external contours of the mask
    fn find_contours(&self, intensity: &GrayImage) -> Result<Vec<Contour>>;

    /// Raw contours narrowed down to the best footprint candidate, if any
    fn detect(
        &self,
        intensity: &GrayImage,
        image_area: f64,
        filter: &CandidateFilter,
    ) -> Result<Option<Candidate>> {
        let contours = self.find_contours(intensity)?;
        Ok(filter.select_best(contours, image_area))
    }
}

/// The three built-in strategies in priority order
pub fn default_strategies(config: &Config) -> Vec<Box<dyn DetectionStrategy>> {
    vec![
        Box::new(AdaptiveThresholdStrategy::from_config(config)),
        Box::new(EdgeStrategy::from_config(config)),
        Box::new(MultiLevelThresholdStrategy::from_config(config)),
    ]
}

fn check_kernel_size(name: &str, size: u32) -> Result<()> {
    if size == 0 || size % 2 == 0 {
        return Err(BoundaryError::Strategy(format!(
            "{} must be an odd number > 0, got {}", name, size
        )));
    }
    Ok(())
}

/// Local-mean threshold, then closing and opening
#[derive(Debug, Clone)]
pub struct AdaptiveThresholdStrategy {
    pub block_size: u32,
    pub offset: i32,
    pub morph_kernel_size: u32,
}

impl AdaptiveThresholdStrategy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            block_size: config.adaptive_block_size,
            offset: config.adaptive_offset,
            morph_kernel_size: config.morph_kernel_size,
        }
    }
}

impl DetectionStrategy for AdaptiveThresholdStrategy {
    fn method(&self) -> ProcessingMethod {
        ProcessingMethod::AdaptiveThreshold
    }

    fn find_contours(&self, intensity: &GrayImage) -> Result<Vec<Contour>> {
        if self.block_size < 3 {
            return Err(BoundaryError::Strategy(format!(
                "adaptive block size must be >= 3, got {}", self.block_size
            )));
        }
        check_kernel_size("adaptive block size", self.block_size)?;
        check_kernel_size("morphology kernel size", self.morph_kernel_size)?;

        let mask = {
            let binary = adaptive_threshold_inv(intensity, self.block_size, self.offset);
            let closed = close_mask(&binary, self.morph_kernel_size);
            open_mask(&closed, self.morph_kernel_size)
        };

        Ok(trace_external_contours(&mask))
    }
}

/// Gaussian blur, Canny edges, then closing to bridge broken edges
#[derive(Debug, Clone)]
pub struct EdgeStrategy {
    pub blur_kernel_size: u32,
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub morph_kernel_size: u32,
}

impl EdgeStrategy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            blur_kernel_size: config.blur_kernel_size,
            low_threshold: config.canny_low_threshold,
            high_threshold: config.canny_high_threshold,
            morph_kernel_size: config.morph_kernel_size,
        }
    }

    /// Standard deviation matching a square Gaussian kernel of the configured size
    pub fn blur_sigma(&self) -> f32 {
        0.3 * ((self.blur_kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

impl DetectionStrategy for EdgeStrategy {
    fn method(&self) -> ProcessingMethod {
        ProcessingMethod::EdgeBased
    }

    fn find_contours(&self, intensity: &GrayImage) -> Result<Vec<Contour>> {
        check_kernel_size("blur kernel size", self.blur_kernel_size)?;
        check_kernel_size("morphology kernel size", self.morph_kernel_size)?;

        if !(self.low_threshold >= 0.0 && self.low_threshold <= self.high_threshold) {
            return Err(BoundaryError::Strategy(format!(
                "invalid Canny thresholds {} / {}", self.low_threshold, self.high_threshold
            )));
        }

        let mask = {
            let blurred = gaussian_blur_f32(intensity, self.blur_sigma());
            let edges = canny(&blurred, self.low_threshold, self.high_threshold);
            close_mask(&edges, self.morph_kernel_size)
        };

        Ok(trace_external_contours(&mask))
    }
}

/// Union of several fixed-level thresholds, then opening and closing.
/// Recovers outlines that only stand out at one lighting level.
#[derive(Debug, Clone)]
pub struct MultiLevelThresholdStrategy {
    pub levels: Vec<u8>,
    pub morph_kernel_size: u32,
}

impl MultiLevelThresholdStrategy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            levels: config.multi_level_thresholds.clone(),
            morph_kernel_size: config.morph_kernel_size,
        }
    }
}

impl DetectionStrategy for MultiLevelThresholdStrategy {
    fn method(&self) -> ProcessingMethod {
        ProcessingMethod::MultiLevelThreshold
    }

    fn find_contours(&self, intensity: &GrayImage) -> Result<Vec<Contour>> {
        check_kernel_size("morphology kernel size", self.morph_kernel_size)?;

        let (first, rest) = self.levels.split_first().ok_or_else(|| {
            BoundaryError::Strategy("no threshold levels configured".to_string())
        })?;

        let mask = {
            let mut combined = threshold_below(intensity, *first);
            for &level in rest {
                union_into(&mut combined, &threshold_below(intensity, level));
            }
            let opened = open_mask(&combined, self.morph_kernel_size);
            close_mask(&opened, self.morph_kernel_size)
        };

        Ok(trace_external_contours(&mask))
    }
}
