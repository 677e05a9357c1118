// src/pipeline.rs - Boundary extraction: preprocessing, strategy cascade, fallback

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{DynamicImage, GrayImage, RgbaImage};

use crate::candidate_filter::CandidateFilter;
use crate::config::Config;
use crate::errors::{BoundaryError, Result};
use crate::fallback::fallback_boundary;
use crate::image_io::{decode_image_bytes, ensure_dimensions, image_from_rgba, load_image};
use crate::preprocess::preprocess;
use crate::simplify::PolygonSimplifier;
use crate::strategies::{default_strategies, DetectionStrategy};
use crate::types::{BoundaryResult, Diagnostics, Polygon, StrategyOutcome, StrategyReport};

/// Cooperative cancellation flag, checked between pipeline stages
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Err(Cancelled) once `cancel` has been called on any clone
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(BoundaryError::Cancelled);
        }
        Ok(())
    }
}

/// Stage an extraction run is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionState {
    Idle,
    Preprocessing,
    /// Index into the strategy list
    TryingStrategy(usize),
    Filtering,
    Simplifying,
    Done,
}

/// Tracks stage transitions for one run and logs them at debug level
struct StateTracker {
    state: ExtractionState,
}

impl StateTracker {
    fn new() -> Self {
        Self { state: ExtractionState::Idle }
    }

    fn advance(&mut self, next: ExtractionState) {
        log::debug!("Extraction state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Outcome of one strategy attempt, before it is folded into the diagnostics
struct Attempt {
    report: StrategyReport,
    polygon: Option<Polygon>,
}

/// Runs the full extraction for single rasters.
///
/// The extractor holds no per-image state, so one instance can be shared
/// across threads.
pub struct BoundaryExtractor {
    config: Config,
    strategies: Vec<Box<dyn DetectionStrategy>>,
    filter: CandidateFilter,
    simplifier: PolygonSimplifier,
}

impl BoundaryExtractor {
    /// Build an extractor with the three built-in strategies
    pub fn new(config: Config) -> Result<Self> {
        let strategies = default_strategies(&config);
        Self::with_strategies(config, strategies)
    }

    /// Build an extractor with a custom strategy list, tried in the given order
    pub fn with_strategies(
        config: Config,
        strategies: Vec<Box<dyn DetectionStrategy>>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            filter: CandidateFilter::from_config(&config),
            simplifier: PolygonSimplifier::from_config(&config),
            config,
            strategies,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract a boundary; hard failures are reported inside the result
    pub fn extract(&self, image: &RgbaImage) -> BoundaryResult {
        self.extract_with_cancel(image, &CancellationToken::new())
            .unwrap_or_else(|e| BoundaryResult::failure(&e))
    }

    /// Extract from any decoded raster, converting it to RGBA first
    pub fn extract_dynamic(&self, image: &DynamicImage) -> BoundaryResult {
        self.extract(&image.to_rgba8())
    }

    /// Decode an image file and extract its boundary
    pub fn extract_from_path<P: AsRef<Path>>(&self, path: P) -> BoundaryResult {
        match load_image(path) {
            Ok(input) => self.extract(&input.image),
            Err(e) => BoundaryResult::failure(&e),
        }
    }

    /// Decode an in-memory encoded image and extract its boundary
    pub fn extract_from_bytes(&self, bytes: &[u8]) -> BoundaryResult {
        match decode_image_bytes(bytes) {
            Ok(image) => self.extract(&image),
            Err(e) => BoundaryResult::failure(&e),
        }
    }

    /// Extract from raw interleaved RGBA pixels
    pub fn extract_from_rgba(&self, width: u32, height: u32, pixels: Vec<u8>) -> BoundaryResult {
        match image_from_rgba(width, height, pixels) {
            Ok(image) => self.extract(&image),
            Err(e) => BoundaryResult::failure(&e),
        }
    }

    /// Extract a boundary, checking the token between stages.
    ///
    /// Only invalid input and cancellation are errors; every other failure
    /// degrades to the next strategy and finally to the fallback rectangle.
    pub fn extract_with_cancel(
        &self,
        image: &RgbaImage,
        token: &CancellationToken,
    ) -> Result<BoundaryResult> {
        ensure_dimensions(image)?;
        let (width, height) = image.dimensions();
        let image_area = width as f64 * height as f64;
        let mut tracker = StateTracker::new();

        token.check()?;
        tracker.advance(ExtractionState::Preprocessing);
        let preprocessed = preprocess(image, &self.config);

        let mut diagnostics = Diagnostics {
            width,
            height,
            contrast_enhanced: preprocessed.enhanced,
            strategies: Vec::with_capacity(self.strategies.len()),
        };

        for (index, strategy) in self.strategies.iter().enumerate() {
            token.check()?;
            tracker.advance(ExtractionState::TryingStrategy(index));

            let attempt = self.attempt(
                strategy.as_ref(),
                &preprocessed.intensity,
                image_area,
                &mut tracker,
            );
            diagnostics.strategies.push(attempt.report);

            if let Some(points) = attempt.polygon {
                tracker.advance(ExtractionState::Done);
                let method = strategy.method();
                log::info!("Boundary found by {} with {} points", method, points.len());
                return Ok(BoundaryResult::detected(method, points, diagnostics));
            }
        }

        token.check()?;
        tracker.advance(ExtractionState::Done);
        log::info!(
            "No strategy produced a usable boundary for the {}x{} image, using fallback rectangle",
            width, height
        );

        let points = fallback_boundary(width, height, self.config.fallback_margin_divisor);
        Ok(BoundaryResult::fallback(points, diagnostics))
    }

    /// Run one strategy through filtering and simplification.
    /// A strategy error is recorded and never propagated.
    fn attempt(
        &self,
        strategy: &dyn DetectionStrategy,
        intensity: &GrayImage,
        image_area: f64,
        tracker: &mut StateTracker,
    ) -> Attempt {
        let method = strategy.method();
        let mut report = StrategyReport {
            method,
            contours_found: 0,
            outcome: StrategyOutcome::NoCandidate,
            candidate: None,
        };

        let contours = match strategy.find_contours(intensity) {
            Ok(contours) => contours,
            Err(e) => {
                log::warn!("Strategy {} failed: {}", method, e);
                report.outcome = StrategyOutcome::Error { message: e.to_string() };
                return Attempt { report, polygon: None };
            }
        };
        report.contours_found = contours.len();

        tracker.advance(ExtractionState::Filtering);
        let Some(candidate) = self.filter.select_best(contours, image_area) else {
            log::debug!("Strategy {}: no contour passed the filters", method);
            return Attempt { report, polygon: None };
        };
        report.candidate = Some(candidate.metrics(image_area));

        tracker.advance(ExtractionState::Simplifying);
        match self.simplifier.simplify(&candidate.contour) {
            Some(points) => {
                report.outcome = StrategyOutcome::Accepted { point_count: points.len() };
                Attempt { report, polygon: Some(points) }
            }
            None => {
                log::debug!("Strategy {}: candidate simplified to fewer than 4 points", method);
                report.outcome = StrategyOutcome::TooFewPoints;
                Attempt { report, polygon: None }
            }
        }
    }
}

/// One-shot convenience wrapper with the default configuration
pub fn extract_boundary(image: &RgbaImage) -> Result<BoundaryResult> {
    let extractor = BoundaryExtractor::new(Config::default())?;
    Ok(extractor.extract(image))
}
