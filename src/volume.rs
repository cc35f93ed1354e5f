use std::process::Command;

use anyhow::{bail, Context, Result};
use log::{error, info, warn};

const FALLBACK_VOLUME: u8 = 50;

/// Anything that can receive a 0-100 volume level. Implementations may fail;
/// [`VolumeController`] absorbs those failures.
pub trait VolumeSink {
    fn name(&self) -> &'static str;
    fn set_volume(&mut self, level: u8) -> Result<()>;
    fn volume(&self) -> Result<u8>;
    fn set_mute(&mut self, muted: bool) -> Result<()>;
    fn is_muted(&self) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeBackend {
    Simulated,
    Pactl,
}

impl std::str::FromStr for VolumeBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "simulated" | "sim" => Ok(VolumeBackend::Simulated),
            "pactl" | "pulse" => Ok(VolumeBackend::Pactl),
            other => bail!("unknown volume backend \"{}\"", other),
        }
    }
}

impl std::fmt::Display for VolumeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeBackend::Simulated => write!(f, "simulated"),
            VolumeBackend::Pactl => write!(f, "pactl"),
        }
    }
}

// keeps the level in memory; used when no system mixer is available
#[derive(Debug)]
pub struct SimulatedVolume {
    level: u8,
    muted: bool,
}

impl Default for SimulatedVolume {
    fn default() -> Self {
        Self {
            level: FALLBACK_VOLUME,
            muted: false,
        }
    }
}

impl VolumeSink for SimulatedVolume {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn set_volume(&mut self, level: u8) -> Result<()> {
        self.level = level;
        Ok(())
    }

    fn volume(&self) -> Result<u8> {
        Ok(self.level)
    }

    fn set_mute(&mut self, muted: bool) -> Result<()> {
        info!("[SIMULATED] audio {}", if muted { "muted" } else { "unmuted" });
        self.muted = muted;
        Ok(())
    }

    fn is_muted(&self) -> Result<bool> {
        Ok(self.muted)
    }
}

/// Drives the default PulseAudio/PipeWire sink through the `pactl` command.
#[derive(Debug)]
pub struct PactlVolume;

impl PactlVolume {
    pub fn new() -> Result<Self> {
        let sink = PactlVolume;
        // query once so a missing binary is reported at startup
        sink.volume().context("pactl is not usable")?;
        Ok(sink)
    }

    fn run(args: &[&str]) -> Result<String> {
        let output = Command::new("pactl")
            .args(args)
            .output()
            .with_context(|| format!("failed to run pactl {}", args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "pactl {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// first "NN%" figure in pactl's volume report
fn parse_percent(report: &str) -> Option<u8> {
    report
        .split_whitespace()
        .filter_map(|word| word.strip_suffix('%'))
        .find_map(|digits| digits.parse::<u32>().ok())
        .map(|percent| percent.min(100) as u8)
}

impl VolumeSink for PactlVolume {
    fn name(&self) -> &'static str {
        "pactl"
    }

    fn set_volume(&mut self, level: u8) -> Result<()> {
        Self::run(&["set-sink-volume", "@DEFAULT_SINK@", &format!("{}%", level)])?;
        Ok(())
    }

    fn volume(&self) -> Result<u8> {
        let report = Self::run(&["get-sink-volume", "@DEFAULT_SINK@"])?;
        parse_percent(&report).context("no volume percentage in pactl output")
    }

    fn set_mute(&mut self, muted: bool) -> Result<()> {
        Self::run(&["set-sink-mute", "@DEFAULT_SINK@", if muted { "1" } else { "0" }])?;
        Ok(())
    }

    fn is_muted(&self) -> Result<bool> {
        let report = Self::run(&["get-sink-mute", "@DEFAULT_SINK@"])?;
        Ok(report.contains("yes"))
    }
}

/// Front for the system volume. Levels are clamped to 0-100 and sink errors
/// are logged, never returned.
pub struct VolumeController {
    sink: Box<dyn VolumeSink>,
}

impl VolumeController {
    pub fn new(sink: Box<dyn VolumeSink>) -> Self {
        Self { sink }
    }

    pub fn simulated() -> Self {
        Self::new(Box::new(SimulatedVolume::default()))
    }

    /// Falls back to simulation when the requested backend cannot be opened.
    pub fn from_backend(backend: VolumeBackend) -> Self {
        match backend {
            VolumeBackend::Simulated => {
                info!("Running volume control in simulation mode");
                Self::simulated()
            }
            VolumeBackend::Pactl => match PactlVolume::new() {
                Ok(sink) => {
                    info!("Volume controller initialized successfully");
                    Self::new(Box::new(sink))
                }
                Err(e) => {
                    warn!("Failed to initialize volume controller: {:#}", e);
                    warn!("Falling back to simulation mode");
                    Self::simulated()
                }
            },
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.sink.name()
    }

    pub fn set_volume(&mut self, level: i32) {
        let level = level.clamp(0, 100) as u8;

        if let Err(e) = self.sink.set_volume(level) {
            error!("Error setting volume: {:#}", e);
        }
    }

    pub fn get_volume(&self) -> u8 {
        self.sink.volume().unwrap_or_else(|e| {
            error!("Error getting volume: {:#}", e);
            FALLBACK_VOLUME
        })
    }

    pub fn mute(&mut self) {
        if let Err(e) = self.sink.set_mute(true) {
            error!("Error muting: {:#}", e);
        }
    }

    pub fn unmute(&mut self) {
        if let Err(e) = self.sink.set_mute(false) {
            error!("Error unmuting: {:#}", e);
        }
    }

    pub fn is_muted(&self) -> bool {
        self.sink.is_muted().unwrap_or_else(|e| {
            error!("Error checking mute status: {:#}", e);
            false
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    /// Records every level it receives; optionally fails every call.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub(crate) levels: Arc<Mutex<Vec<u8>>>,
        pub(crate) broken: bool,
    }

    impl VolumeSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn set_volume(&mut self, level: u8) -> Result<()> {
            if self.broken {
                return Err(anyhow!("device unplugged"));
            }
            self.levels.lock().unwrap().push(level);
            Ok(())
        }

        fn volume(&self) -> Result<u8> {
            if self.broken {
                return Err(anyhow!("device unplugged"));
            }
            Ok(self.levels.lock().unwrap().last().copied().unwrap_or(0))
        }

        fn set_mute(&mut self, _muted: bool) -> Result<()> {
            Err(anyhow!("not supported"))
        }

        fn is_muted(&self) -> Result<bool> {
            Err(anyhow!("not supported"))
        }
    }

    #[test]
    fn levels_are_clamped_before_the_sink() {
        let sink = RecordingSink::default();
        let mut controller = VolumeController::new(Box::new(sink.clone()));

        controller.set_volume(-20);
        controller.set_volume(42);
        controller.set_volume(250);

        assert_eq!(*sink.levels.lock().unwrap(), vec![0, 42, 100]);
        assert_eq!(controller.get_volume(), 100);
    }

    #[test]
    fn sink_errors_are_absorbed() {
        let sink = RecordingSink {
            broken: true,
            ..Default::default()
        };
        let mut controller = VolumeController::new(Box::new(sink));

        controller.set_volume(70);
        controller.mute();
        assert_eq!(controller.get_volume(), 50);
        assert!(!controller.is_muted());
    }

    #[test]
    fn simulated_sink_remembers_state() {
        let mut controller = VolumeController::simulated();
        assert_eq!(controller.get_volume(), 50);
        controller.set_volume(12);
        assert_eq!(controller.get_volume(), 12);
        controller.mute();
        assert!(controller.is_muted());
        controller.unmute();
        assert!(!controller.is_muted());
        assert_eq!(controller.backend_name(), "simulated");
    }

    #[test]
    fn pactl_report_parsing() {
        let report = "Volume: front-left: 32768 /  50% / -18.06 dB,   front-right: 32768 /  50% / -18.06 dB\n";
        assert_eq!(parse_percent(report), Some(50));
        assert_eq!(parse_percent("Volume: nothing here"), None);
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("pactl".parse::<VolumeBackend>().unwrap(), VolumeBackend::Pactl);
        assert_eq!("Simulated".parse::<VolumeBackend>().unwrap(), VolumeBackend::Simulated);
        assert!("alsa".parse::<VolumeBackend>().is_err());
    }
}
