use anyhow::Result;
use image::RgbImage;
use log::debug;

use crate::detection::{HandLandmarksModel, HandRegionModel, PalmDetectionModel};
use crate::landmarks::HandObservation;

/// Palm detection followed by hand landmarks in a region around each palm,
/// so hands are found anywhere in the frame.
pub struct PalmHandTracker {
    palms: Box<dyn PalmDetectionModel>,
    landmarks: Box<dyn HandRegionModel>,
    max_hands: usize,
}

impl PalmHandTracker {
    pub fn new(palms: Box<dyn PalmDetectionModel>, landmarks: Box<dyn HandRegionModel>, max_hands: usize) -> Self {
        Self {
            palms,
            landmarks,
            max_hands,
        }
    }
}

impl HandLandmarksModel for PalmHandTracker {
    fn run(&self, image: &RgbImage) -> Result<Vec<HandObservation>> {
        let (width, height) = image.dimensions();
        let palms = self.palms.run(image)?;

        let mut hands = Vec::with_capacity(self.max_hands);
        for palm in palms.iter().take(self.max_hands) {
            let region = palm.hand_region(width, height);
            if let Some(hand) = self.landmarks.run_in_region(image, &region)? {
                hands.push(hand);
            }
        }

        debug!("{} palm(s), {} hand(s)", palms.len(), hands.len());

        Ok(hands)
    }
}
