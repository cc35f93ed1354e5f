use std::path::Path;

use anyhow::{anyhow, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use handtracking::air_writer::AirWriter;
use handtracking::app::HandtrackingApp;
use handtracking::config::Cli;
use handtracking::detection::hand_tracker::PalmHandTracker;
use handtracking::detection::model_mediapipe::{
    MediapipeLandmarkModel, ModelLayout, FACE_LAYOUT, HAND_LAYOUT, POSE_LAYOUT,
};
use handtracking::detection::model_palm::{MediapipePalmModel, MAX_HANDS};
use handtracking::detection::{HandLandmarksModel, PointLandmarksModel};
use handtracking::processor::{Detectors, VisionProcessor};
use handtracking::volume::VolumeController;
use handtracking::webcam::{list_devices, WebcamStream};

fn load_model(path: Option<&Path>, layout: ModelLayout, threshold: f32) -> Option<MediapipeLandmarkModel> {
    let path = path?;

    match MediapipeLandmarkModel::new(path, layout, threshold) {
        Ok(model) => Some(model),
        Err(e) => {
            error!("Could not load {}: {:#}", path.display(), e);
            None
        }
    }
}

// palm detector plus landmarks when both load, else landmarks on the frame center
fn hand_model(cli: &Cli) -> Option<Box<dyn HandLandmarksModel>> {
    let threshold = cli.presence_threshold;
    let landmarks = load_model(cli.hand_model.as_deref(), HAND_LAYOUT, threshold)?;

    let Some(palm_path) = cli.palm_model.as_deref() else {
        info!("No palm detector given, looking for one hand in the middle of the frame");
        return Some(Box::new(landmarks));
    };

    match MediapipePalmModel::new(palm_path, threshold, MAX_HANDS) {
        Ok(palms) => Some(Box::new(PalmHandTracker::new(
            Box::new(palms),
            Box::new(landmarks),
            MAX_HANDS,
        ))),
        Err(e) => {
            error!("Could not load {}: {:#}", palm_path.display(), e);
            Some(Box::new(landmarks))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --loglevel
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level))
        .filter_module("ort", log::LevelFilter::Warn)
        .init();

    if cli.list_devices {
        for (index, name) in list_devices().iter().enumerate() {
            println!("[{}] {}", index, name);
        }
        return Ok(());
    }

    let threshold = cli.presence_threshold;
    let detectors = Detectors {
        hands: hand_model(&cli),
        face: load_model(cli.face_model.as_deref(), FACE_LAYOUT, threshold)
            .map(|m| Box::new(m) as Box<dyn PointLandmarksModel>),
        pose: load_model(cli.pose_model.as_deref(), POSE_LAYOUT, threshold)
            .map(|m| Box::new(m) as Box<dyn PointLandmarksModel>),
    };

    let volume = VolumeController::from_backend(cli.volume_backend);
    let air_writer = AirWriter::new(cli.max_points, cli.line_thickness);

    let mut processor = VisionProcessor::new(detectors, air_writer, volume);
    processor.set_mode(cli.mode);

    let camera = WebcamStream::start_with_fallback(cli.capture_options(), &cli.fallback_cameras())?;

    info!("Starting; press h/f/p/c/d/v/n to switch modes, q to quit");

    let native_options = eframe::NativeOptions::default();

    eframe::run_native(
        "Hand tracking",
        native_options,
        Box::new(move |cc| Box::new(HandtrackingApp::new(cc, camera, processor))),
    )
    .map_err(|e| anyhow!("{}", e))
}
