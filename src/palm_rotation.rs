use log::debug;
use nalgebra::Point2;

use crate::landmarks::{angle_2d, HandLandmark, HandObservation};

// minimum frame-to-frame rotation (degrees) that counts as a turn
pub const ROTATION_THRESHOLD: f32 = 5.0;
// weight of the new target in the exponential smoothing step
pub const SMOOTHING_FACTOR: f32 = 0.15;
// volume points per degree of rotation
pub const VOLUME_CHANGE_RATE: f32 = 2.0;
pub const INITIAL_VOLUME: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    None,
    Left,
    Right,
}

impl RotationDirection {
    pub fn label(&self) -> &'static str {
        match self {
            RotationDirection::None => "none",
            RotationDirection::Left => "left",
            RotationDirection::Right => "right",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GestureInfo {
    pub palm_angle: f32,
    pub rotation_direction: RotationDirection,
    pub volume: u8,
    pub wrist_pos: Point2<f32>,
    pub middle_mcp_pos: Point2<f32>,
}

/// Tracks the palm orientation across frames and turns rotation into a volume level.
///
/// Turning the palm right (clockwise on screen) raises the volume, turning it
/// left lowers it. Small jitters below [`ROTATION_THRESHOLD`] are ignored.
pub struct RotationTracker {
    previous_angle: Option<f32>,
    base_angle: Option<f32>,
    current_volume: f32,
}

impl Default for RotationTracker {
    fn default() -> Self {
        Self {
            previous_angle: None,
            base_angle: None,
            current_volume: INITIAL_VOLUME,
        }
    }
}

impl RotationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Palm angle in degrees, from the wrist to the base of the middle finger.
    pub fn palm_angle(&self, hand: &HandObservation) -> f32 {
        let wrist = hand.get_point(HandLandmark::Wrist);
        let middle_mcp = hand.get_point(HandLandmark::MiddleMcp);

        angle_2d(&wrist, &middle_mcp)
    }

    /// Returns `(current_angle, angle_delta, direction)` and advances the previous angle.
    pub fn detect_rotation(&mut self, hand: &HandObservation) -> (f32, f32, RotationDirection) {
        let current_angle = self.palm_angle(hand);

        let previous_angle = match (self.base_angle, self.previous_angle) {
            (Some(_), Some(previous)) => previous,
            _ => {
                // first observation since construction or reset
                self.base_angle = Some(current_angle);
                self.previous_angle = Some(current_angle);
                return (current_angle, 0.0, RotationDirection::None);
            }
        };

        let angle_delta = current_angle - previous_angle;

        let direction = if angle_delta.abs() > ROTATION_THRESHOLD {
            if angle_delta > 0.0 {
                RotationDirection::Right
            } else {
                RotationDirection::Left
            }
        } else {
            RotationDirection::None
        };

        self.previous_angle = Some(current_angle);

        (current_angle, angle_delta, direction)
    }

    pub fn update_volume_from_rotation(&mut self, angle_delta: f32) -> u8 {
        let target_volume =
            (self.current_volume + angle_delta * VOLUME_CHANGE_RATE).clamp(0.0, 100.0);

        self.current_volume =
            SMOOTHING_FACTOR * target_volume + (1.0 - SMOOTHING_FACTOR) * self.current_volume;

        self.volume()
    }

    pub fn gesture_info(&mut self, hand: &HandObservation) -> GestureInfo {
        let (palm_angle, angle_delta, rotation_direction) = self.detect_rotation(hand);

        let volume = if rotation_direction != RotationDirection::None {
            let volume = self.update_volume_from_rotation(angle_delta);
            debug!(
                "palm turned {} by {:.1} deg, volume now {}",
                rotation_direction.label(),
                angle_delta,
                volume
            );
            volume
        } else {
            self.volume()
        };

        GestureInfo {
            palm_angle,
            rotation_direction,
            volume,
            wrist_pos: hand.get_point_2d(HandLandmark::Wrist),
            middle_mcp_pos: hand.get_point_2d(HandLandmark::MiddleMcp),
        }
    }

    // truncated, never rounded
    pub fn volume(&self) -> u8 {
        self.current_volume as u8
    }

    pub fn base_angle(&self) -> Option<f32> {
        self.base_angle
    }

    /// Forget the angle baseline so the next observation re-baselines.
    /// The smoothed volume is kept.
    pub fn reset(&mut self) {
        self.previous_angle = None;
        self.base_angle = None;
    }
}
