//! Shared data types for boundary extraction

use std::fmt;

use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::errors::BoundaryError;

/// Ordered boundary trace of a connected mask region, in pixel coordinates
pub type Contour = Vec<Point<i32>>;

/// Implicitly closed boundary polygon; the first point is not repeated at the end
pub type Polygon = Vec<[f64; 2]>;

/// Which stage produced the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    AdaptiveThreshold,
    EdgeBased,
    MultiLevelThreshold,
    Fallback,
}

impl ProcessingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMethod::AdaptiveThreshold => "adaptive_threshold",
            ProcessingMethod::EdgeBased => "edge_based",
            ProcessingMethod::MultiLevelThreshold => "multi_level_threshold",
            ProcessingMethod::Fallback => "fallback",
        }
    }

    /// True for the three detection strategies, false for the fallback
    pub fn is_detection(&self) -> bool {
        !matches!(self, ProcessingMethod::Fallback)
    }
}

impl fmt::Display for ProcessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry of the candidate a strategy settled on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMetrics {
    pub area: f64,
    pub area_ratio: f64,
    pub solidity: f64,
    pub aspect_ratio: f64,
}

/// How a single strategy attempt ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StrategyOutcome {
    Accepted { point_count: usize },
    NoCandidate,
    TooFewPoints,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyReport {
    pub method: ProcessingMethod,
    pub contours_found: usize,
    pub outcome: StrategyOutcome,
    pub candidate: Option<CandidateMetrics>,
}

/// Per-run metadata for callers that want to know why a method was chosen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub width: u32,
    pub height: u32,
    pub contrast_enhanced: bool,
    pub strategies: Vec<StrategyReport>,
}

/// Terminal result of one extraction run.
///
/// Serialized field names follow the overlay consumer's contract
/// (`boundaries`, `contourCount`, `processingMethod`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryResult {
    pub success: bool,
    #[serde(rename = "boundaries")]
    pub points: Polygon,
    #[serde(rename = "contourCount")]
    pub point_count: usize,
    /// None only when the image could not be decoded
    #[serde(rename = "processingMethod")]
    pub method: Option<ProcessingMethod>,
    pub error: Option<String>,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl BoundaryResult {
    pub fn detected(method: ProcessingMethod, points: Polygon, diagnostics: Diagnostics) -> Self {
        Self {
            success: true,
            point_count: points.len(),
            points,
            method: Some(method),
            error: None,
            diagnostics,
        }
    }

    pub fn fallback(points: Polygon, diagnostics: Diagnostics) -> Self {
        Self::detected(ProcessingMethod::Fallback, points, diagnostics)
    }

    /// Hard failure: no boundary at all
    pub fn failure(error: &BoundaryError) -> Self {
        Self {
            success: false,
            points: Vec::new(),
            point_count: 0,
            method: None,
            error: Some(error.to_string()),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.method == Some(ProcessingMethod::Fallback)
    }
}
