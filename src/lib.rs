pub mod air_writer;
pub mod app;
pub mod config;
pub mod detection;
pub mod finger_count;
pub mod landmarks;
pub mod mode;
pub mod overlay;
pub mod palm_rotation;
pub mod processor;
pub mod utils;
pub mod volume;
pub mod webcam;
