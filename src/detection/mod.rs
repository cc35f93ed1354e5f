pub mod hand_tracker;
pub mod model_mediapipe;
pub mod model_palm;
pub mod region;

use anyhow::Result;
use image::RgbImage;
use nalgebra::{Point2, Vector2};

use crate::detection::region::SquareRegion;
use crate::landmarks::{HandObservation, Landmark};

// the hand fits in a square this many times the palm box
const HAND_REGION_SCALE: f32 = 2.6;
// palm box heights the hand center sits toward the fingers
const HAND_REGION_SHIFT: f32 = 0.5;

/// Turns a frame into zero or more hands, each with all 21 landmarks
/// normalized to the frame.
pub trait HandLandmarksModel {
    fn run(&self, image: &RgbImage) -> Result<Vec<HandObservation>>;
}

/// Hand landmarks inside one region of the frame; `None` when the region
/// holds no hand.
pub trait HandRegionModel {
    fn run_in_region(&self, image: &RgbImage, region: &SquareRegion) -> Result<Option<HandObservation>>;
}

/// Face mesh or body pose keypoints, normalized to the frame. `None` when
/// nothing was found.
pub trait PointLandmarksModel {
    fn run(&self, image: &RgbImage) -> Result<Option<Vec<Landmark>>>;
}

/// Palms found anywhere in the frame, best first.
pub trait PalmDetectionModel {
    fn run(&self, image: &RgbImage) -> Result<Vec<PalmBox>>;
}

/// A detected palm in normalized frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmBox {
    pub center: Point2<f32>,
    pub width: f32,
    pub height: f32,
    pub wrist: Point2<f32>,
    pub middle_mcp: Point2<f32>,
    pub score: f32,
}

impl PalmBox {
    /// Square around the whole hand: the palm box enlarged and pushed from
    /// the wrist toward the fingers.
    pub fn hand_region(&self, image_width: u32, image_height: u32) -> SquareRegion {
        let (w, h) = (image_width as f32, image_height as f32);

        let box_width = self.width * w;
        let box_height = self.height * h;

        let up = Vector2::new(
            (self.middle_mcp.x - self.wrist.x) * w,
            (self.middle_mcp.y - self.wrist.y) * h,
        );
        let up = if up.norm() > f32::EPSILON {
            up.normalize()
        } else {
            Vector2::new(0.0, -1.0)
        };

        let center = Vector2::new(self.center.x * w, self.center.y * h) + up * (HAND_REGION_SHIFT * box_height);
        let side = HAND_REGION_SCALE * box_width.max(box_height);

        SquareRegion::around(center.x, center.y, side, image_width, image_height)
    }

    pub fn iou(&self, other: &PalmBox) -> f32 {
        let overlap = |a_center: f32, a_size: f32, b_center: f32, b_size: f32| {
            let lo = (a_center - a_size / 2.0).max(b_center - b_size / 2.0);
            let hi = (a_center + a_size / 2.0).min(b_center + b_size / 2.0);
            (hi - lo).max(0.0)
        };

        let intersection = overlap(self.center.x, self.width, other.center.x, other.width)
            * overlap(self.center.y, self.height, other.center.y, other.height);
        let union = self.width * self.height + other.width * other.height - intersection;

        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}
