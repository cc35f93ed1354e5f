use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::RgbImage;
use log::{debug, info};
use ndarray::{Array, CowArray};
use ort::tensor::OrtOwnedTensor;
use ort::{Environment, ExecutionProvider, Session, SessionBuilder, Value};

use crate::detection::region::SquareRegion;
use crate::detection::{HandLandmarksModel, HandRegionModel, PointLandmarksModel};
use crate::landmarks::{HandObservation, Handedness, Landmark};

/// Shape of a MediaPipe landmark network: square RGB input, a flat landmark
/// tensor, and a presence flag.
#[derive(Debug, Clone, Copy)]
pub struct ModelLayout {
    pub input_size: u32,
    // landmarks the caller keeps (pose carries extra auxiliary points)
    pub landmark_count: usize,
    pub values_per_landmark: usize,
    // face flag is a raw logit, the others are already probabilities
    pub flag_is_logit: bool,
}

pub const HAND_LAYOUT: ModelLayout = ModelLayout {
    input_size: 224,
    landmark_count: 21,
    values_per_landmark: 3,
    flag_is_logit: false,
};

pub const FACE_LAYOUT: ModelLayout = ModelLayout {
    input_size: 256,
    landmark_count: 478,
    values_per_landmark: 3,
    flag_is_logit: true,
};

pub const POSE_LAYOUT: ModelLayout = ModelLayout {
    input_size: 256,
    landmark_count: 33,
    values_per_landmark: 5,
    flag_is_logit: false,
};

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Raw output tensors of one inference, flattened.
#[derive(Debug, Clone)]
pub struct RawOutputs {
    pub tensors: Vec<Vec<f32>>,
}

impl RawOutputs {
    // the landmark tensor is the one large enough to hold every landmark
    fn landmarks(&self, layout: &ModelLayout) -> Option<&[f32]> {
        let needed = layout.landmark_count * layout.values_per_landmark;
        self.tensors
            .iter()
            .find(|t| t.len() >= needed)
            .map(|t| t.as_slice())
    }

    // single-value outputs, in model order (presence flag first, then handedness)
    fn scalars(&self) -> Vec<f32> {
        self.tensors
            .iter()
            .filter(|t| t.len() == 1)
            .map(|t| t[0])
            .collect()
    }

    pub fn presence(&self, layout: &ModelLayout) -> f32 {
        let flag = self.scalars().first().copied().unwrap_or(0.0);
        if layout.flag_is_logit {
            sigmoid(flag)
        } else {
            flag
        }
    }

    pub fn handedness(&self) -> Handedness {
        match self.scalars().get(1) {
            Some(score) if *score > 0.5 => Handedness::Right,
            _ => Handedness::Left,
        }
    }

    pub fn decode_landmarks(&self, layout: &ModelLayout, region: &SquareRegion) -> Option<Vec<Landmark>> {
        let raw = self.landmarks(layout)?;

        let points = raw
            .chunks(layout.values_per_landmark)
            .take(layout.landmark_count)
            .map(|v| region.to_frame(v[0], v[1], v[2], layout.input_size))
            .collect();

        Some(points)
    }
}

/// Decodes one hand from the landmark network's outputs for `region`.
/// Below `presence_threshold`, or with a short landmark tensor, there is no hand.
pub fn hand_from_outputs(
    outputs: &RawOutputs,
    layout: &ModelLayout,
    region: &SquareRegion,
    presence_threshold: f32,
) -> Option<HandObservation> {
    if outputs.presence(layout) < presence_threshold {
        return None;
    }

    // a hand is only reported with its full set of landmarks
    let points = outputs.decode_landmarks(layout, region)?;
    let flat: Vec<f32> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();

    HandObservation::from_vec(&flat, outputs.handedness())
}

pub(crate) fn load_session(path: &Path) -> Result<(Arc<Environment>, Session)> {
    let environment = Environment::builder()
        .with_name("handtracking")
        .with_execution_providers([ExecutionProvider::CPU(Default::default())])
        .build()?
        .into_arc();

    let session = SessionBuilder::new(&environment)?
        .with_intra_threads(4)?
        .with_model_from_file(path)
        .with_context(|| format!("failed to load model {}", path.display()))?;

    Ok((environment, session))
}

// runs `session` on a square RGB input (NHWC, scaled to [0, 1]) and flattens every output
pub(crate) fn run_session(session: &Session, input: &RgbImage) -> Result<RawOutputs> {
    let (width, height) = input.dimensions();
    let input_: Vec<f32> = input.as_raw().iter().map(|p| *p as f32 / 255.0).collect();

    let array: CowArray<_, _> = Array::from_shape_vec((1, height as usize, width as usize, 3), input_)?
        .into_dyn()
        .into();

    let inputs = vec![Value::from_array(session.allocator(), &array)?];
    let outputs: Vec<Value> = session.run(inputs)?;

    let mut tensors = Vec::with_capacity(outputs.len());
    for output in outputs.iter() {
        let tensor: OrtOwnedTensor<f32, _> = output.try_extract()?;
        tensors.push(tensor.view().iter().copied().collect());
    }

    Ok(RawOutputs { tensors })
}

/// An ONNX export of one of the MediaPipe landmark networks.
pub struct MediapipeLandmarkModel {
    _environment: Arc<Environment>,
    session: Session,
    layout: ModelLayout,
    presence_threshold: f32,
}

impl MediapipeLandmarkModel {
    pub fn new<P: AsRef<Path>>(path: P, layout: ModelLayout, presence_threshold: f32) -> Result<Self> {
        let path = path.as_ref();
        let (environment, session) = load_session(path)?;

        info!(
            "Loaded landmark model {} ({}x{} input)",
            path.display(),
            layout.input_size,
            layout.input_size
        );

        Ok(Self {
            _environment: environment,
            session,
            layout,
            presence_threshold,
        })
    }

    fn infer(&self, image: &RgbImage, region: &SquareRegion) -> Result<RawOutputs> {
        let input = region.extract(image, self.layout.input_size);
        run_session(&self.session, &input)
    }
}

impl HandRegionModel for MediapipeLandmarkModel {
    fn run_in_region(&self, image: &RgbImage, region: &SquareRegion) -> Result<Option<HandObservation>> {
        let outputs = self.infer(image, region)?;
        let hand = hand_from_outputs(&outputs, &self.layout, region, self.presence_threshold);

        debug!(
            "hand presence {:.2} in {}px region at ({}, {}), detected: {}",
            outputs.presence(&self.layout),
            region.side,
            region.x,
            region.y,
            hand.is_some()
        );

        Ok(hand)
    }
}

// without a palm detector, look for a single hand in the middle of the frame
impl HandLandmarksModel for MediapipeLandmarkModel {
    fn run(&self, image: &RgbImage) -> Result<Vec<HandObservation>> {
        let (width, height) = image.dimensions();
        let region = SquareRegion::centered(width, height);

        Ok(self.run_in_region(image, &region)?.into_iter().collect())
    }
}

impl PointLandmarksModel for MediapipeLandmarkModel {
    fn run(&self, image: &RgbImage) -> Result<Option<Vec<Landmark>>> {
        let (width, height) = image.dimensions();
        let region = SquareRegion::centered(width, height);
        let outputs = self.infer(image, &region)?;

        if outputs.presence(&self.layout) < self.presence_threshold {
            return Ok(None);
        }

        Ok(outputs.decode_landmarks(&self.layout, &region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_outputs(flag: f32, handedness: f32) -> RawOutputs {
        let landmarks: Vec<f32> = (0..21).flat_map(|i| [i as f32, 2.0 * i as f32, 0.0]).collect();
        RawOutputs {
            tensors: vec![landmarks, vec![flag], vec![handedness]],
        }
    }

    #[test]
    fn decodes_hand_outputs() {
        let outputs = hand_outputs(0.9, 0.8);
        let region = SquareRegion::centered(224, 224);

        assert!((outputs.presence(&HAND_LAYOUT) - 0.9).abs() < 1e-6);
        assert_eq!(outputs.handedness(), Handedness::Right);

        let points = outputs.decode_landmarks(&HAND_LAYOUT, &region).unwrap();
        assert_eq!(points.len(), 21);
        assert!((points[20].x - 20.0 / 224.0).abs() < 1e-6);
        assert!((points[20].y - 40.0 / 224.0).abs() < 1e-6);
    }

    #[test]
    fn low_handedness_score_is_left() {
        assert_eq!(hand_outputs(0.9, 0.2).handedness(), Handedness::Left);
    }

    #[test]
    fn face_flag_goes_through_sigmoid() {
        let outputs = RawOutputs {
            tensors: vec![vec![0.0; 478 * 3], vec![0.0]],
        };
        assert!((outputs.presence(&FACE_LAYOUT) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pose_keeps_only_body_landmarks() {
        let outputs = RawOutputs {
            tensors: vec![vec![128.0; 39 * 5], vec![1.0]],
        };
        let region = SquareRegion::centered(256, 256);
        let points = outputs.decode_landmarks(&POSE_LAYOUT, &region).unwrap();
        assert_eq!(points.len(), 33);
        assert!((points[0].x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn short_landmark_tensor_is_rejected() {
        let outputs = RawOutputs {
            tensors: vec![vec![0.0; 30], vec![1.0]],
        };
        let region = SquareRegion::centered(224, 224);
        assert!(outputs.decode_landmarks(&HAND_LAYOUT, &region).is_none());
    }

    // landmark network outputs with every point at the middle of its input
    fn centered_hand_outputs(handedness: f32) -> RawOutputs {
        let landmarks: Vec<f32> = (0..21).flat_map(|_| [112.0, 112.0, 0.0]).collect();
        RawOutputs {
            tensors: vec![landmarks, vec![0.95], vec![handedness]],
        }
    }

    #[test]
    fn two_regions_give_two_hands_in_frame_coordinates() {
        // 640x480 frame, one hand region on each side
        let left = SquareRegion::around(160.0, 240.0, 200.0, 640, 480);
        let right = SquareRegion::around(480.0, 200.0, 160.0, 640, 480);

        let hands: Vec<HandObservation> = [(left, 0.1), (right, 0.9)]
            .iter()
            .filter_map(|(region, handedness)| {
                hand_from_outputs(&centered_hand_outputs(*handedness), &HAND_LAYOUT, region, 0.5)
            })
            .collect();

        assert_eq!(hands.len(), 2);

        let wrist = hands[0].get_point(crate::landmarks::HandLandmark::Wrist);
        assert!((wrist.x - 0.25).abs() < 1e-5);
        assert!((wrist.y - 0.5).abs() < 1e-5);
        assert_eq!(hands[0].handedness, Handedness::Left);

        let wrist = hands[1].get_point(crate::landmarks::HandLandmark::Wrist);
        assert!((wrist.x - 0.75).abs() < 1e-5);
        assert!((wrist.y - 200.0 / 480.0).abs() < 1e-5);
        assert_eq!(hands[1].handedness, Handedness::Right);
    }

    #[test]
    fn weak_presence_is_no_hand() {
        let mut outputs = centered_hand_outputs(0.9);
        outputs.tensors[1] = vec![0.2];

        let region = SquareRegion::centered(224, 224);
        assert!(hand_from_outputs(&outputs, &HAND_LAYOUT, &region, 0.5).is_none());
    }
}
