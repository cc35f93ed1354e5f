use std::collections::VecDeque;
use std::time::Instant;

// number of frame deltas the fps figure is averaged over
pub const FPS_WINDOW: usize = 10;

/// Bounded series of samples; the oldest one is dropped once full.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    data: VecDeque<f32>,
    max_length: usize,
}

impl TimeSeries {
    pub fn new(max_length: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(max_length),
            max_length,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.data.push_back(value);

        if self.data.len() > self.max_length {
            self.data.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get_mean(&self) -> Option<f32> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.iter().sum::<f32>() / self.data.len() as f32)
    }
}

pub struct FpsMeter {
    deltas: TimeSeries,
    last_tick: Option<Instant>,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsMeter {
    pub fn new() -> Self {
        Self {
            deltas: TimeSeries::new(FPS_WINDOW),
            last_tick: None,
        }
    }

    // call once per processed frame
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f32 {
        if let Some(last) = self.last_tick {
            let delta = now.duration_since(last).as_secs_f32();
            if delta > 0.0 {
                self.deltas.push(delta);
            }
        }
        self.last_tick = Some(now);

        self.fps()
    }

    pub fn fps(&self) -> f32 {
        match self.deltas.get_mean() {
            Some(mean) if mean > 0.0 => 1.0 / mean,
            _ => 0.0,
        }
    }
}
