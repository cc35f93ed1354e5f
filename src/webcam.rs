// thin wrapper around openpnp_capture
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use log::{debug, info, warn};
use openpnp_capture::{Device, Format, Stream};

// latest captured frame, shared between the capture thread and the processing loop
pub type SharedFrame = Arc<Mutex<Option<RgbImage>>>;

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub device: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub mirror: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            device: 0,
            width: 1280,
            height: 720,
            fps: 30,
            mirror: false,
        }
    }
}

pub fn list_devices() -> Vec<String> {
    Device::enumerate()
        .into_iter()
        .filter_map(Device::new)
        .map(|d| d.name)
        .collect()
}

/// Keeps overwriting `slot` with whatever `grab` returns until `stopped` is
/// raised or `grab` fails. Readers never wait for a new frame.
pub fn produce_frames<F>(mut grab: F, slot: &SharedFrame, stopped: &AtomicBool)
where
    F: FnMut() -> Option<RgbImage>,
{
    while !stopped.load(Ordering::Relaxed) {
        match grab() {
            Some(frame) => {
                if let Ok(mut guard) = slot.lock() {
                    *guard = Some(frame);
                }
            }
            None => {
                warn!("Frame capture failed, stopping stream");
                stopped.store(true, Ordering::Relaxed);
            }
        }
    }
}

/// Webcam read on a background thread; [`WebcamStream::read`] hands out the
/// most recent frame.
pub struct WebcamStream {
    frame: SharedFrame,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    device_name: String,
    resolution: (u32, u32),
}

impl WebcamStream {
    pub fn start(options: CaptureOptions) -> Result<Self> {
        let frame: SharedFrame = Arc::new(Mutex::new(None));
        let stopped = Arc::new(AtomicBool::new(false));

        // the stream lives on the capture thread; it reports back once opened
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(String, u32, u32)>>();

        let thread_frame = Arc::clone(&frame);
        let thread_stopped = Arc::clone(&stopped);
        let thread_options = options.clone();

        let handle = std::thread::Builder::new()
            .name("webcam".into())
            .spawn(move || {
                let (device_name, mut stream) = match open_stream(&thread_options) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let format = stream.format();
                let (width, height) = (format.width, format.height);
                let _ = ready_tx.send(Ok((device_name, width, height)));

                let mut buffer = Vec::new();
                let grab = || {
                    stream.advance();
                    if stream.read(&mut buffer).is_err() {
                        return None;
                    }

                    let mut image = RgbImage::from_raw(width, height, buffer.clone())?;
                    if thread_options.mirror {
                        image::imageops::flip_horizontal_in_place(&mut image);
                    }
                    Some(image)
                };

                produce_frames(grab, &thread_frame, &thread_stopped);
                debug!("Capture thread exiting");
            })
            .context("failed to spawn capture thread")?;

        let (device_name, width, height) = ready_rx
            .recv()
            .map_err(|_| anyhow!("capture thread exited before opening the camera"))??;

        info!(
            "Opened camera {} ({}) at {}x{}",
            options.device, device_name, width, height
        );

        Ok(Self {
            frame,
            stopped,
            handle: Some(handle),
            device_name,
            resolution: (width, height),
        })
    }

    /// Tries each device index in turn, returning the first one that opens.
    pub fn start_with_fallback(options: CaptureOptions, fallbacks: &[u32]) -> Result<Self> {
        let mut last_error = match Self::start(options.clone()) {
            Ok(stream) => return Ok(stream),
            Err(e) => e,
        };

        for device in fallbacks.iter().filter(|d| **d != options.device) {
            warn!(
                "Camera {} not available ({:#}). Falling back to camera {}.",
                options.device, last_error, device
            );
            match Self::start(CaptureOptions {
                device: *device,
                ..options.clone()
            }) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = e,
            }
        }

        Err(last_error).context("could not open webcam")
    }

    pub fn read(&self) -> Option<RgbImage> {
        self.frame.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Relaxed)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WebcamStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(options: &CaptureOptions) -> Result<(String, Stream)> {
    let device = Device::new(options.device)
        .with_context(|| format!("no camera with index {}", options.device))?;

    let format = Format::default()
        .width(options.width)
        .height(options.height)
        .fps(options.fps);

    let stream = Stream::new(&device, &format)
        .with_context(|| format!("could not open a stream on {}", device.name))?;

    Ok((device.name, stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn producer_keeps_only_the_latest_frame() {
        let slot: SharedFrame = Arc::new(Mutex::new(None));
        let stopped = AtomicBool::new(false);

        let mut n = 0u8;
        let grab = || {
            n += 1;
            if n > 5 {
                return None;
            }
            Some(RgbImage::from_pixel(2, 2, Rgb([n, n, n])))
        };

        produce_frames(grab, &slot, &stopped);

        // the failing sixth read stopped the loop; frame 5 is what readers see
        assert!(stopped.load(Ordering::Relaxed));
        let latest = slot.lock().unwrap().clone().unwrap();
        assert_eq!(*latest.get_pixel(0, 0), Rgb([5, 5, 5]));
    }

    #[test]
    fn producer_honors_stop_flag() {
        let slot: SharedFrame = Arc::new(Mutex::new(None));
        let stopped = AtomicBool::new(true);

        produce_frames(|| Some(RgbImage::new(1, 1)), &slot, &stopped);

        assert!(slot.lock().unwrap().is_none());
    }
}
