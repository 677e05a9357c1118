// src/candidate_filter.rs - Geometric filtering of raw contours

use crate::config::Config;
use crate::shape_analysis::{
    calculate_area, calculate_aspect_ratio, calculate_bounding_box_dimensions, calculate_solidity,
};
use crate::types::{CandidateMetrics, Contour};

/// A contour that passed every filter, with the measurements used to judge it
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub contour: Contour,
    pub area: f64,
    pub bounding_width: u32,
    pub bounding_height: u32,
    pub solidity: f64,
}

impl Candidate {
    pub fn aspect_ratio(&self) -> f64 {
        calculate_aspect_ratio(self.bounding_width, self.bounding_height)
    }

    pub fn metrics(&self, image_area: f64) -> CandidateMetrics {
        CandidateMetrics {
            area: self.area,
            area_ratio: self.area / image_area,
            solidity: self.solidity,
            aspect_ratio: self.aspect_ratio(),
        }
    }
}

/// Why a contour was turned down
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    Degenerate,
    AreaRatio(f64),
    AspectRatio(f64),
    Solidity(f64),
}

/// Area ratio, aspect ratio and solidity gates; bounds are inclusive
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    pub min_area_ratio: f64,
    pub max_area_ratio: f64,
    pub min_solidity: f64,
    pub max_aspect_ratio: f64,
}

impl CandidateFilter {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_area_ratio: config.min_area_ratio,
            max_area_ratio: config.max_area_ratio,
            min_solidity: config.min_solidity,
            max_aspect_ratio: config.max_aspect_ratio,
        }
    }

    /// Measure a contour and decide whether it can be a building footprint
    pub fn evaluate(&self, contour: &Contour, image_area: f64) -> Result<Candidate, Rejection> {
        if contour.len() < 3 || image_area <= 0.0 {
            return Err(Rejection::Degenerate);
        }

        let area = calculate_area(contour);
        let area_ratio = area / image_area;
        if area_ratio < self.min_area_ratio || area_ratio > self.max_area_ratio {
            return Err(Rejection::AreaRatio(area_ratio));
        }

        let (bounding_width, bounding_height) = calculate_bounding_box_dimensions(contour);
        let aspect_ratio = calculate_aspect_ratio(bounding_width, bounding_height);
        if aspect_ratio > self.max_aspect_ratio {
            return Err(Rejection::AspectRatio(aspect_ratio));
        }

        let solidity = calculate_solidity(contour, area);
        if solidity < self.min_solidity {
            return Err(Rejection::Solidity(solidity));
        }

        Ok(Candidate {
            contour: contour.clone(),
            area,
            bounding_width,
            bounding_height,
            solidity,
        })
    }

    /// Largest-area contour passing every filter; the first one found wins ties
    pub fn select_best(&self, contours: Vec<Contour>, image_area: f64) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        let mut rejected = 0usize;

        for contour in &contours {
            match self.evaluate(contour, image_area) {
                Ok(candidate) => {
                    if best.as_ref().map_or(true, |b| candidate.area > b.area) {
                        best = Some(candidate);
                    }
                }
                Err(_) => rejected += 1,
            }
        }

        log::debug!(
            "Candidate filter: {} of {} contours rejected{}",
            rejected,
            contours.len(),
            best.as_ref()
                .map(|b| format!(", best area {:.0} px", b.area))
                .unwrap_or_default()
        );

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Contour {
        vec![Point::new(x0, y0), Point::new(x1, y0), Point::new(x1, y1), Point::new(x0, y1)]
    }

    fn filter() -> CandidateFilter {
        CandidateFilter::from_config(&Config::default())
    }

    // 100 x 100 image => 1% is 100 px, 85% is 8500 px
    const IMAGE_AREA: f64 = 10_000.0;

    #[test]
    fn test_area_exactly_one_percent_is_accepted() {
        assert!(filter().evaluate(&rect(0, 0, 10, 10), IMAGE_AREA).is_ok());
    }

    #[test]
    fn test_area_just_below_one_percent_is_rejected() {
        // 9 x 11 = 99 px
        let result = filter().evaluate(&rect(0, 0, 9, 11), IMAGE_AREA);
        assert!(matches!(result, Err(Rejection::AreaRatio(r)) if r < 0.01));
    }

    #[test]
    fn test_area_exactly_85_percent_is_accepted() {
        assert!(filter().evaluate(&rect(0, 0, 85, 100), IMAGE_AREA).is_ok());
    }

    #[test]
    fn test_area_just_above_85_percent_is_rejected() {
        // 8501 px: 85 x 100 plus a one pixel sliver triangle pair
        let contour = vec![
            Point::new(0, 0),
            Point::new(85, 0),
            Point::new(85, 49),
            Point::new(86, 50),
            Point::new(85, 51),
            Point::new(85, 100),
            Point::new(0, 100),
        ];
        let result = filter().evaluate(&contour, IMAGE_AREA);
        assert!(matches!(result, Err(Rejection::AreaRatio(r)) if r > 0.85));
    }

    #[test]
    fn test_sliver_is_rejected_by_aspect_ratio() {
        // 2 x 60 px bounding box (inclusive) would be 30:1
        let result = filter().evaluate(&rect(0, 0, 60, 2), 1_000.0);
        assert!(matches!(result, Err(Rejection::AspectRatio(_))));
    }

    #[test]
    fn test_thin_v_is_rejected_by_solidity() {
        // Two thin strokes meeting at the bottom: 492 px inside a 5100 px hull
        let contour = vec![
            Point::new(0, 0),
            Point::new(2, 0),
            Point::new(50, 96),
            Point::new(98, 0),
            Point::new(100, 0),
            Point::new(51, 100),
            Point::new(49, 100),
        ];

        let result = filter().evaluate(&contour, IMAGE_AREA);
        assert!(matches!(result, Err(Rejection::Solidity(s)) if s < 0.2), "{:?}", result);
    }

    #[test]
    fn test_degenerate_contours_are_rejected() {
        let line = vec![Point::new(0, 0), Point::new(50, 50)];
        assert_eq!(filter().evaluate(&line, IMAGE_AREA), Err(Rejection::Degenerate));
        assert_eq!(filter().evaluate(&rect(0, 0, 10, 10), 0.0), Err(Rejection::Degenerate));
    }

    #[test]
    fn test_largest_candidate_wins() {
        let contours = vec![rect(0, 0, 20, 20), rect(30, 30, 70, 70), rect(0, 80, 5, 81)];
        let best = filter().select_best(contours, IMAGE_AREA).unwrap();
        assert_eq!(best.area, 1600.0);
        assert_eq!((best.bounding_width, best.bounding_height), (41, 41));
    }

    #[test]
    fn test_first_found_breaks_ties() {
        let contours = vec![rect(0, 0, 20, 20), rect(50, 50, 70, 70)];
        let best = filter().select_best(contours, IMAGE_AREA).unwrap();
        assert_eq!(best.contour[0], Point::new(0, 0));
    }

    #[test]
    fn test_no_survivors_yields_none() {
        let contours = vec![rect(0, 0, 2, 2), rect(0, 0, 99, 99)];
        assert!(filter().select_best(contours, IMAGE_AREA).is_none());
    }
}
