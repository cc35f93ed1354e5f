use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use image::RgbImage;
use log::{debug, info};
use nalgebra::Point2;
use ndarray::Array2;
use ort::{Environment, Session};

use crate::detection::model_mediapipe::{load_session, run_session, sigmoid};
use crate::detection::region::SquareRegion;
use crate::detection::{PalmBox, PalmDetectionModel};

pub const PALM_INPUT_SIZE: u32 = 192;
pub const MAX_HANDS: usize = 2;

// one entry per anchor layer; layers sharing a stride share a grid
const ANCHOR_STRIDES: [u32; 4] = [8, 16, 16, 16];
const ANCHORS_PER_LAYER: usize = 2;
const PALM_KEYPOINTS: usize = 7;
const VALUES_PER_PALM: usize = 4 + 2 * PALM_KEYPOINTS;
const NMS_IOU_THRESHOLD: f32 = 0.3;
// raw scores are clipped before the sigmoid
const SCORE_CLIP: f32 = 100.0;

/// SSD anchors as `(x_center, y_center, width, height)` rows, normalized to
/// the detector input. Anchor sizes are fixed at 1.
pub fn generate_anchors(input_size: u32) -> Array2<f32> {
    let mut centers: Vec<(f32, f32)> = Vec::new();

    let mut layer = 0;
    while layer < ANCHOR_STRIDES.len() {
        let stride = ANCHOR_STRIDES[layer];

        let mut per_cell = 0;
        while layer < ANCHOR_STRIDES.len() && ANCHOR_STRIDES[layer] == stride {
            per_cell += ANCHORS_PER_LAYER;
            layer += 1;
        }

        let grid = (input_size + stride - 1) / stride;
        for y in 0..grid {
            for x in 0..grid {
                let center = (
                    (x as f32 + 0.5) / grid as f32,
                    (y as f32 + 0.5) / grid as f32,
                );
                centers.extend(std::iter::repeat(center).take(per_cell));
            }
        }
    }

    Array2::from_shape_fn((centers.len(), 4), |(i, j)| match j {
        0 => centers[i].0,
        1 => centers[i].1,
        _ => 1.0,
    })
}

/// Decodes raw regressor/classifier outputs into palms, normalized to the
/// detector input. Palms scoring below `threshold` are dropped.
pub fn decode_palms(
    scores: &[f32],
    boxes: &[f32],
    anchors: &Array2<f32>,
    input_size: u32,
    threshold: f32,
) -> Vec<PalmBox> {
    let scale = input_size as f32;
    let mut palms = Vec::new();

    for i in 0..anchors.nrows() {
        let (Some(raw_score), Some(raw)) = (
            scores.get(i),
            boxes.get(i * VALUES_PER_PALM..(i + 1) * VALUES_PER_PALM),
        ) else {
            break;
        };

        let score = sigmoid(raw_score.clamp(-SCORE_CLIP, SCORE_CLIP));
        if score < threshold {
            continue;
        }

        let (anchor_x, anchor_y) = (anchors[[i, 0]], anchors[[i, 1]]);
        let (anchor_w, anchor_h) = (anchors[[i, 2]], anchors[[i, 3]]);

        let keypoint = |k: usize| {
            Point2::new(
                raw[4 + 2 * k] / scale * anchor_w + anchor_x,
                raw[5 + 2 * k] / scale * anchor_h + anchor_y,
            )
        };

        palms.push(PalmBox {
            center: Point2::new(raw[0] / scale * anchor_w + anchor_x, raw[1] / scale * anchor_h + anchor_y),
            width: raw[2] / scale * anchor_w,
            height: raw[3] / scale * anchor_h,
            // keypoint 0 is the wrist, 2 the base of the middle finger
            wrist: keypoint(0),
            middle_mcp: keypoint(2),
            score,
        });
    }

    palms
}

/// Greedy suppression: keeps the best palm and drops the ones overlapping it,
/// until `max_palms` are kept.
pub fn non_max_suppression(mut palms: Vec<PalmBox>, iou_threshold: f32, max_palms: usize) -> Vec<PalmBox> {
    palms.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<PalmBox> = Vec::new();
    for palm in palms {
        if kept.len() == max_palms {
            break;
        }
        if kept.iter().all(|k| k.iou(&palm) <= iou_threshold) {
            kept.push(palm);
        }
    }
    kept
}

/// Maps a palm normalized to `region` into normalized frame coordinates.
pub fn palm_to_frame(palm: &PalmBox, region: &SquareRegion, input_size: u32) -> PalmBox {
    let size = input_size as f32;
    let point = |p: Point2<f32>| {
        let mapped = region.to_frame(p.x * size, p.y * size, 0.0, input_size);
        Point2::new(mapped.x, mapped.y)
    };

    let (width, _) = region.span_to_frame(palm.width * size, input_size);
    let (_, height) = region.span_to_frame(palm.height * size, input_size);

    PalmBox {
        center: point(palm.center),
        width,
        height,
        wrist: point(palm.wrist),
        middle_mcp: point(palm.middle_mcp),
        score: palm.score,
    }
}

/// ONNX export of the MediaPipe palm detector.
pub struct MediapipePalmModel {
    _environment: Arc<Environment>,
    session: Session,
    anchors: Array2<f32>,
    score_threshold: f32,
    max_palms: usize,
}

impl MediapipePalmModel {
    pub fn new<P: AsRef<Path>>(path: P, score_threshold: f32, max_palms: usize) -> Result<Self> {
        let path = path.as_ref();
        let (environment, session) = load_session(path)?;
        let anchors = generate_anchors(PALM_INPUT_SIZE);

        info!("Loaded palm detector {} ({} anchors)", path.display(), anchors.nrows());

        Ok(Self {
            _environment: environment,
            session,
            anchors,
            score_threshold,
            max_palms,
        })
    }
}

impl PalmDetectionModel for MediapipePalmModel {
    fn run(&self, image: &RgbImage) -> Result<Vec<PalmBox>> {
        let (width, height) = image.dimensions();

        // pad rather than crop, so palms near the edges are still seen
        let region = SquareRegion::letterbox(width, height);
        let input = region.extract(image, PALM_INPUT_SIZE);
        let outputs = run_session(&self.session, &input)?;

        let count = self.anchors.nrows();
        let boxes = outputs.tensors.iter().find(|t| t.len() == count * VALUES_PER_PALM);
        let scores = outputs.tensors.iter().find(|t| t.len() == count);
        let (Some(boxes), Some(scores)) = (boxes, scores) else {
            bail!("palm detector outputs do not match {} anchors", count);
        };

        let palms = decode_palms(scores, boxes, &self.anchors, PALM_INPUT_SIZE, self.score_threshold);
        let palms = non_max_suppression(palms, NMS_IOU_THRESHOLD, self.max_palms);

        debug!("{} palm(s) detected", palms.len());

        Ok(palms
            .iter()
            .map(|palm| palm_to_frame(palm, &region, PALM_INPUT_SIZE))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_grid_matches_detector_output() {
        let anchors = generate_anchors(PALM_INPUT_SIZE);
        assert_eq!(anchors.nrows(), 2016);

        // first anchor sits in the first 8px cell
        assert!((anchors[[0, 0]] - 0.5 / 24.0).abs() < 1e-6);
        assert_eq!(anchors[[0, 2]], 1.0);

        // the 16px grid follows the 24x24x2 block with 6 anchors per cell
        assert!((anchors[[1152, 0]] - 0.5 / 12.0).abs() < 1e-6);
        assert_eq!(anchors[[1157, 0]], anchors[[1152, 0]]);
        assert!((anchors[[1158, 0]] - 1.5 / 12.0).abs() < 1e-6);
    }

    // raw detector outputs with one confident palm per entry of `hits`
    fn raw_outputs(anchors: &Array2<f32>, hits: &[(usize, f32)]) -> (Vec<f32>, Vec<f32>) {
        let mut scores = vec![-10.0; anchors.nrows()];
        let mut boxes = vec![0.0; anchors.nrows() * VALUES_PER_PALM];

        for (anchor, size) in hits {
            scores[*anchor] = 5.0;
            let raw = &mut boxes[anchor * VALUES_PER_PALM..(anchor + 1) * VALUES_PER_PALM];
            raw[2] = *size;
            raw[3] = *size;
            // wrist below the center, middle finger base above
            raw[5] = size / 2.0;
            raw[9] = -size / 2.0;
        }

        (scores, boxes)
    }

    #[test]
    fn decodes_confident_anchors_only() {
        let anchors = generate_anchors(PALM_INPUT_SIZE);
        let (scores, boxes) = raw_outputs(&anchors, &[(0, 48.0)]);

        let palms = decode_palms(&scores, &boxes, &anchors, PALM_INPUT_SIZE, 0.5);
        assert_eq!(palms.len(), 1);

        let palm = palms[0];
        assert!((palm.center.x - anchors[[0, 0]]).abs() < 1e-6);
        assert!((palm.width - 0.25).abs() < 1e-6);
        assert!((palm.wrist.y - (anchors[[0, 1]] + 0.125)).abs() < 1e-6);
        assert!(palm.middle_mcp.y < palm.center.y);
        assert!(palm.score > 0.99);
    }

    #[test]
    fn suppression_keeps_distinct_palms() {
        let anchors = generate_anchors(PALM_INPUT_SIZE);
        // two anchors in the same cell report the same palm; a third is far away
        let (scores, boxes) = raw_outputs(&anchors, &[(0, 40.0), (1, 40.0), (2000, 40.0)]);

        let palms = decode_palms(&scores, &boxes, &anchors, PALM_INPUT_SIZE, 0.5);
        assert_eq!(palms.len(), 3);

        let kept = non_max_suppression(palms, NMS_IOU_THRESHOLD, MAX_HANDS);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].iou(&kept[1]) < NMS_IOU_THRESHOLD);
    }

    #[test]
    fn suppression_caps_the_hand_count() {
        let palm = |x: f32, score: f32| PalmBox {
            center: Point2::new(x, 0.5),
            width: 0.1,
            height: 0.1,
            wrist: Point2::new(x, 0.55),
            middle_mcp: Point2::new(x, 0.45),
            score,
        };

        let kept = non_max_suppression(vec![palm(0.1, 0.6), palm(0.5, 0.9), palm(0.9, 0.7)], 0.3, 2);
        let scores: Vec<f32> = kept.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![0.9, 0.7]);
    }

    #[test]
    fn letterboxed_palm_maps_to_frame() {
        // 400x200 frame, padded to a 400px square starting 100px above the frame
        let region = SquareRegion::letterbox(400, 200);
        let palm = PalmBox {
            center: Point2::new(0.5, 0.5),
            width: 0.1,
            height: 0.1,
            wrist: Point2::new(0.5, 0.55),
            middle_mcp: Point2::new(0.5, 0.45),
            score: 0.9,
        };

        let mapped = palm_to_frame(&palm, &region, PALM_INPUT_SIZE);
        assert!((mapped.center.x - 0.5).abs() < 1e-5);
        assert!((mapped.center.y - 0.5).abs() < 1e-5);
        // 40px wide: a tenth of the frame width, a fifth of its height
        assert!((mapped.width - 0.1).abs() < 1e-5);
        assert!((mapped.height - 0.2).abs() < 1e-5);
        assert!((mapped.wrist.y - 0.6).abs() < 1e-5);
    }
}
