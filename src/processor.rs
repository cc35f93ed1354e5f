use image::RgbImage;
use log::{error, info, warn};
use nalgebra::Point2;

use crate::air_writer::AirWriter;
use crate::detection::{HandLandmarksModel, PointLandmarksModel};
use crate::finger_count::{FingerCountResult, FingerCounter};
use crate::landmarks::HandObservation;
use crate::mode::Mode;
use crate::overlay;
use crate::palm_rotation::{GestureInfo, RotationDirection, RotationTracker};
use crate::volume::VolumeController;

pub const VOLUME_BAR_HEIGHT: u32 = 30;
pub const VOLUME_BAR_PADDING: u32 = 20;

// pen colors reachable from the keyboard
const COLOR_KEYS: [(char, &str); 5] = [
    ('r', "red"),
    ('b', "blue"),
    ('g', "green"),
    ('y', "yellow"),
    ('w', "white"),
];

/// Whichever landmark models could be loaded. A missing model leaves its
/// modes showing the bare frame.
#[derive(Default)]
pub struct Detectors {
    pub hands: Option<Box<dyn HandLandmarksModel>>,
    pub face: Option<Box<dyn PointLandmarksModel>>,
    pub pose: Option<Box<dyn PointLandmarksModel>>,
}

impl Detectors {
    fn available(&self, mode: Mode) -> bool {
        if mode.needs_hands() {
            return self.hands.is_some();
        }

        match mode {
            Mode::Face => self.face.is_some(),
            Mode::Pose => self.pose.is_some(),
            _ => true,
        }
    }
}

/// What one call to [`VisionProcessor::process`] found.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub mode: Mode,
    pub hands_detected: usize,
    // face or pose keypoints
    pub points_detected: usize,
    pub finger_count: Option<FingerCountResult>,
    pub gesture: Option<GestureInfo>,
    // pen state and index fingertip
    pub drawing: Option<(bool, Point2<f32>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Handled,
    Ignored,
    Quit,
}

pub struct VisionProcessor {
    mode: Mode,
    detectors: Detectors,
    finger_counter: FingerCounter,
    rotation_tracker: RotationTracker,
    air_writer: AirWriter,
    volume: VolumeController,
}

impl VisionProcessor {
    pub fn new(detectors: Detectors, air_writer: AirWriter, volume: VolumeController) -> Self {
        Self {
            mode: Mode::None,
            detectors,
            finger_counter: FingerCounter::new(),
            rotation_tracker: RotationTracker::new(),
            air_writer,
            volume,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Gestures {
            // new session, new baseline angle
            self.rotation_tracker.reset();
        }

        if !self.detectors.available(mode) {
            warn!("No landmark model loaded for {} mode", mode);
        }

        if mode != self.mode {
            info!("Mode: {}", mode);
        }
        self.mode = mode;
    }

    pub fn handle_key(&mut self, key: char) -> KeyAction {
        let key = key.to_ascii_lowercase();

        if key == 'q' {
            return KeyAction::Quit;
        }

        if let Some(mode) = Mode::from_key(key) {
            self.set_mode(mode);
            return KeyAction::Handled;
        }

        if key == 'x' {
            self.air_writer.clear_canvas();
            info!("Drawing cleared");
            return KeyAction::Handled;
        }

        match COLOR_KEYS.iter().find(|(k, _)| *k == key) {
            Some((_, name)) => {
                self.air_writer.change_color(name);
                KeyAction::Handled
            }
            None => KeyAction::Ignored,
        }
    }

    pub fn air_writer(&self) -> &AirWriter {
        &self.air_writer
    }

    /// Smoothed level held by the rotation tracker.
    pub fn volume(&self) -> u8 {
        self.rotation_tracker.volume()
    }

    pub fn volume_controller(&self) -> &VolumeController {
        &self.volume
    }

    /// Runs the current mode on `frame` and draws its overlay in place.
    pub fn process(&mut self, frame: &mut RgbImage) -> FrameReport {
        let mut report = FrameReport {
            mode: self.mode,
            ..Default::default()
        };

        match self.mode {
            Mode::Face => {
                report.points_detected =
                    detect_points(self.detectors.face.as_deref(), frame, overlay::CYAN);
            }
            Mode::Pose => {
                report.points_detected =
                    detect_points(self.detectors.pose.as_deref(), frame, overlay::YELLOW);
            }
            mode if mode.needs_hands() => {
                let hands = self.detect_hands(frame);
                report.hands_detected = hands.len();
                self.process_hands(&hands, frame, &mut report);
            }
            _ => {}
        }

        report
    }

    fn detect_hands(&self, frame: &RgbImage) -> Vec<HandObservation> {
        let Some(model) = self.detectors.hands.as_ref() else {
            return Vec::new();
        };

        model.run(frame).unwrap_or_else(|e| {
            error!("Hand detection failed: {:#}", e);
            Vec::new()
        })
    }

    fn process_hands(&mut self, hands: &[HandObservation], frame: &mut RgbImage, report: &mut FrameReport) {
        for hand in hands {
            overlay::draw_hand_skeleton(frame, hand);
        }

        match self.mode {
            Mode::Count => {
                let counts = self.finger_counter.count_all_hands(hands);
                let (width, height) = frame.dimensions();
                overlay::draw_count_backdrop(frame, width / 3, height / 3);
                report.finger_count = Some(counts);
            }
            Mode::Draw => {
                let pen = hands
                    .first()
                    .map(|hand| self.air_writer.detect_drawing_gesture(hand));

                if let Some((true, tip)) = pen {
                    self.air_writer.add_point(tip);
                }

                self.air_writer.draw_on_frame(frame);

                if let Some((is_drawing, tip)) = pen {
                    self.air_writer.draw_cursor(frame, tip, is_drawing);
                }
                report.drawing = pen;
            }
            Mode::Gestures => {
                if let Some(hand) = hands.first() {
                    let info = self.rotation_tracker.gesture_info(hand);

                    if info.rotation_direction != RotationDirection::None {
                        self.volume.set_volume(info.volume as i32);
                    }

                    overlay::draw_rotation_indicator(frame, &info);
                    report.gesture = Some(info);
                }

                overlay::draw_volume_bar(
                    frame,
                    self.rotation_tracker.volume(),
                    VOLUME_BAR_HEIGHT,
                    VOLUME_BAR_PADDING,
                );
            }
            _ => {}
        }
    }
}

fn detect_points(model: Option<&dyn PointLandmarksModel>, frame: &mut RgbImage, color: image::Rgb<u8>) -> usize {
    let Some(model) = model else {
        return 0;
    };

    match model.run(frame) {
        Ok(Some(points)) => {
            overlay::draw_landmark_points(frame, &points, color);
            points.len()
        }
        Ok(None) => 0,
        Err(e) => {
            error!("Landmark detection failed: {:#}", e);
            0
        }
    }
}
