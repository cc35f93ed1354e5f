use std::path::PathBuf;

use clap::Parser;

use crate::air_writer::{DEFAULT_LINE_THICKNESS, DEFAULT_MAX_POINTS};
use crate::mode::Mode;
use crate::volume::VolumeBackend;
use crate::webcam::CaptureOptions;

// Some defaults; all of which can be overriden via CLI args
const CAMERA_INDEX: u32 = 1;
const FALLBACK_CAMERA_INDEX: u32 = 0;
const FRAME_WIDTH: u32 = 1280;
const FRAME_HEIGHT: u32 = 720;
const FRAME_RATE: u32 = 30;
const PRESENCE_THRESHOLD: f32 = 0.5;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Index of the camera to open; device 0 is tried if it is unavailable
    #[arg(long = "camera", default_value_t = CAMERA_INDEX)]
    pub camera: u32,

    #[arg(long = "width", default_value_t = FRAME_WIDTH)]
    pub width: u32,

    #[arg(long = "height", default_value_t = FRAME_HEIGHT)]
    pub height: u32,

    #[arg(long = "fps", default_value_t = FRAME_RATE)]
    pub fps: u32,

    /// Flip frames horizontally, so the preview behaves like a mirror
    #[arg(long = "mirror")]
    pub mirror: bool,

    /// Print the available cameras and exit
    #[arg(long = "listDevices")]
    pub list_devices: bool,

    /// Mode at startup: none, hands, face, pose, count, draw or gestures
    #[arg(long = "mode", default_value_t = Mode::None)]
    pub mode: Mode,

    /// ONNX export of the MediaPipe hand landmark model
    #[arg(long = "handModel")]
    pub hand_model: Option<PathBuf>,

    /// ONNX export of the MediaPipe palm detector; without it only a hand in
    /// the middle of the frame is found
    #[arg(long = "palmModel")]
    pub palm_model: Option<PathBuf>,

    /// ONNX export of the MediaPipe face mesh model
    #[arg(long = "faceModel")]
    pub face_model: Option<PathBuf>,

    /// ONNX export of the MediaPipe pose landmark model
    #[arg(long = "poseModel")]
    pub pose_model: Option<PathBuf>,

    /// Detections with a lower presence score are dropped
    #[arg(long = "presenceThreshold", default_value_t = PRESENCE_THRESHOLD)]
    pub presence_threshold: f32,

    /// Where gesture volume goes: simulated or pactl
    #[arg(long = "volumeBackend", default_value_t = VolumeBackend::Simulated)]
    pub volume_backend: VolumeBackend,

    /// Length of the air-writing trail, in points
    #[arg(long = "maxPoints", default_value_t = DEFAULT_MAX_POINTS)]
    pub max_points: usize,

    #[arg(long = "lineThickness", default_value_t = DEFAULT_LINE_THICKNESS)]
    pub line_thickness: u32,

    #[arg(long = "loglevel", default_value_t = String::from("info"))]
    pub log_level: String,
}

impl Cli {
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            device: self.camera,
            width: self.width,
            height: self.height,
            fps: self.fps,
            mirror: self.mirror,
        }
    }

    pub fn fallback_cameras(&self) -> Vec<u32> {
        vec![FALLBACK_CAMERA_INDEX]
    }
}
