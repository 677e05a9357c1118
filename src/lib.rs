// src/lib.rs - Library interface for floor plan boundary extraction

pub mod candidate_filter;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod image_io;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod shape_analysis;
pub mod simplify;
pub mod strategies;
pub mod types;

// Re-export commonly used types and functions
pub use errors::{BoundaryError, Result};
pub use config::{Config, MAX_POLYGON_POINTS, MIN_POLYGON_POINTS};
pub use pipeline::{extract_boundary, BoundaryExtractor, CancellationToken, ExtractionState};
pub use image_io::{InputImage, load_image, save_image};

pub use types::{
    BoundaryResult,
    CandidateMetrics,
    Contour,
    Diagnostics,
    Polygon,
    ProcessingMethod,
    StrategyOutcome,
    StrategyReport,
};

// Detection building blocks, for custom strategy lists
pub use strategies::{
    default_strategies,
    AdaptiveThresholdStrategy,
    DetectionStrategy,
    EdgeStrategy,
    MultiLevelThresholdStrategy,
};
pub use candidate_filter::{Candidate, CandidateFilter, Rejection};
pub use simplify::PolygonSimplifier;
pub use fallback::fallback_boundary;

// Re-export shape analysis functions
pub use shape_analysis::{
    calculate_area,
    calculate_aspect_ratio,
    calculate_bounding_box_dimensions,
    calculate_perimeter,
    calculate_solidity,
    convex_hull,
};
