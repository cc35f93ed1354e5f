//! Hand landmark indices and observations, plus the geometry helpers
//! [`distance`] and [`angle_2d`].
//!
//! Both helpers are part of the public API for callers measuring landmarks
//! outside the built-in gestures. [`distance`] has no caller inside the crate.

use nalgebra::Point2;
use nalgebra::Point3;

// a single normalized keypoint: x and y relative to frame width/height, z relative depth
pub type Landmark = Point3<f32>;

pub const HAND_LANDMARK_COUNT: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl HandLandmark {
    pub fn index(&self) -> usize {
        match self {
            HandLandmark::Wrist => 0,
            HandLandmark::ThumbCmc => 1,
            HandLandmark::ThumbMcp => 2,
            HandLandmark::ThumbIp => 3,
            HandLandmark::ThumbTip => 4,
            HandLandmark::IndexMcp => 5,
            HandLandmark::IndexPip => 6,
            HandLandmark::IndexDip => 7,
            HandLandmark::IndexTip => 8,
            HandLandmark::MiddleMcp => 9,
            HandLandmark::MiddlePip => 10,
            HandLandmark::MiddleDip => 11,
            HandLandmark::MiddleTip => 12,
            HandLandmark::RingMcp => 13,
            HandLandmark::RingPip => 14,
            HandLandmark::RingDip => 15,
            HandLandmark::RingTip => 16,
            HandLandmark::PinkyMcp => 17,
            HandLandmark::PinkyPip => 18,
            HandLandmark::PinkyDip => 19,
            HandLandmark::PinkyTip => 20,
        }
    }
}

/// Bone connections used to draw a hand skeleton, as landmark index pairs.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (17, 18), (18, 19), (19, 20),
    (0, 17),
];

/// One detected hand: all 21 landmarks in detector order plus its handedness.
///
/// The detector only reports a hand when every landmark is present, so the
/// gesture code indexes into `points` without checks.
#[derive(Debug, Clone)]
pub struct HandObservation {
    pub points: [Landmark; HAND_LANDMARK_COUNT],
    pub handedness: Handedness,
}

impl HandObservation {
    pub fn new(points: [Landmark; HAND_LANDMARK_COUNT], handedness: Handedness) -> Self {
        Self { points, handedness }
    }

    // construct from 1D vector of 21 3D points (flattened 3D points)
    pub fn from_vec(points: &[f32], handedness: Handedness) -> Option<HandObservation> {
        if points.len() < HAND_LANDMARK_COUNT * 3 {
            return None;
        }

        let mut landmarks = [Landmark::origin(); HAND_LANDMARK_COUNT];
        for (i, landmark) in landmarks.iter_mut().enumerate() {
            *landmark = Landmark::new(points[i * 3], points[i * 3 + 1], points[i * 3 + 2]);
        }

        Some(HandObservation::new(landmarks, handedness))
    }

    pub fn get_point(&self, point: HandLandmark) -> Landmark {
        self.points[point.index()]
    }

    pub fn get_point_2d(&self, point: HandLandmark) -> Point2<f32> {
        let p = self.get_point(point);
        Point2::new(p.x, p.y)
    }
}

/// Euclidean distance between two landmarks, depth included.
pub fn distance(a: &Landmark, b: &Landmark) -> f32 {
    (a - b).norm()
}

/// Angle in degrees of the vector `from -> to`, measured with `atan2(dx, dy)`.
///
/// Zero when `to` lies straight below `from` in image coordinates, positive
/// as the vector swings toward +x.
pub fn angle_2d(from: &Landmark, to: &Landmark) -> f32 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;

    dx.atan2(dy).to_degrees()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// An open hand with fingers pointing up, palm centered in the frame.
    pub(crate) fn open_hand(handedness: Handedness) -> HandObservation {
        let mut points = [Landmark::new(0.5, 0.8, 0.0); HAND_LANDMARK_COUNT];
        // thumb sticks out to the hand's outer side
        let thumb_dir = match handedness {
            Handedness::Right => 1.0,
            Handedness::Left => -1.0,
        };
        points[1] = Landmark::new(0.5 + 0.05 * thumb_dir, 0.75, 0.0);
        points[2] = Landmark::new(0.5 + 0.10 * thumb_dir, 0.70, 0.0);
        points[3] = Landmark::new(0.5 + 0.15 * thumb_dir, 0.65, 0.0);
        points[4] = Landmark::new(0.5 + 0.20 * thumb_dir, 0.60, 0.0);

        for (finger, x) in [0.42f32, 0.48, 0.54, 0.60].iter().enumerate() {
            let base = 5 + finger * 4;
            points[base] = Landmark::new(*x, 0.6, 0.0);
            points[base + 1] = Landmark::new(*x, 0.5, 0.0);
            points[base + 2] = Landmark::new(*x, 0.4, 0.0);
            points[base + 3] = Landmark::new(*x, 0.3, 0.0);
        }

        HandObservation::new(points, handedness)
    }

    /// A closed fist: every fingertip curled below its middle joint, thumb tucked in.
    pub(crate) fn fist(handedness: Handedness) -> HandObservation {
        let mut hand = open_hand(handedness);
        for finger in 0..4 {
            let base = 5 + finger * 4;
            let x = hand.points[base].x;
            hand.points[base + 3] = Landmark::new(x, 0.65, 0.0);
        }
        let ip_x = hand.points[3].x;
        let tuck = match handedness {
            Handedness::Right => -0.1,
            Handedness::Left => 0.1,
        };
        hand.points[4] = Landmark::new(ip_x + tuck, 0.65, 0.0);
        hand
    }

    #[test]
    fn from_vec_requires_all_points() {
        let flat = vec![0.5f32; 20 * 3];
        assert!(HandObservation::from_vec(&flat, Handedness::Left).is_none());

        let flat: Vec<f32> = (0..63).map(|i| i as f32).collect();
        let hand = HandObservation::from_vec(&flat, Handedness::Right).unwrap();
        assert_eq!(hand.get_point(HandLandmark::IndexTip), Landmark::new(24.0, 25.0, 26.0));
        assert_eq!(hand.handedness, Handedness::Right);
    }

    #[test]
    fn angle_from_wrist_to_mcp() {
        let wrist = Landmark::new(0.5, 0.5, 0.0);
        assert!((angle_2d(&wrist, &Landmark::new(0.5, 0.6, 0.0))).abs() < 1e-4);
        assert!((angle_2d(&wrist, &Landmark::new(0.6, 0.5, 0.0)) - 90.0).abs() < 1e-4);
        assert!((angle_2d(&wrist, &Landmark::new(0.4, 0.5, 0.0)) + 90.0).abs() < 1e-4);
    }

    #[test]
    fn distance_is_euclidean_in_3d() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(0.3, 0.4, 0.0);
        assert!((distance(&a, &b) - 0.5).abs() < 1e-6);
        let c = Landmark::new(0.0, 0.0, 2.0);
        assert!((distance(&a, &c) - 2.0).abs() < 1e-6);
    }
}
