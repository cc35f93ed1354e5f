use std::collections::VecDeque;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use log::debug;
use nalgebra::Point2;
use rayon::prelude::*;

use crate::landmarks::{HandLandmark, HandObservation};
use crate::overlay::{draw_thick_line_mut, to_pixel, GRAY, WHITE};

pub const DEFAULT_MAX_POINTS: usize = 512;
pub const DEFAULT_LINE_THICKNESS: u32 = 5;

pub const DEFAULT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

pub const PALETTE: [(&str, Rgb<u8>); 7] = [
    ("green", Rgb([0, 255, 0])),
    ("blue", Rgb([0, 0, 255])),
    ("red", Rgb([255, 0, 0])),
    ("yellow", Rgb([255, 255, 0])),
    ("white", Rgb([255, 255, 255])),
    ("purple", Rgb([255, 0, 255])),
    ("cyan", Rgb([0, 255, 255])),
];

pub fn palette_color(name: &str) -> Option<Rgb<u8>> {
    PALETTE
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, color)| *color)
}

/// Fixed-capacity FIFO of pen positions in normalized coordinates.
///
/// `None` entries mark a pen-up break; no segment is drawn across them.
#[derive(Debug, Clone)]
pub struct PointBuffer {
    points: VecDeque<Option<Point2<f32>>>,
    capacity: usize,
}

impl PointBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: Option<Point2<f32>>) {
        if self.capacity == 0 {
            return;
        }

        // oldest point goes first
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Option<Point2<f32>>> {
        self.points.iter()
    }

    /// Consecutive pairs of points, skipping any pair that touches a gap.
    pub fn segments(&self) -> impl Iterator<Item = (Point2<f32>, Point2<f32>)> + '_ {
        self.points
            .iter()
            .zip(self.points.iter().skip(1))
            .filter_map(|pair| match pair {
                (Some(a), Some(b)) => Some((*a, *b)),
                _ => None,
            })
    }
}

/// Lets the index finger act as a pen: detects the drawing pose, keeps the
/// stroke history, and paints it into a canvas laid over the live frame.
pub struct AirWriter {
    points: PointBuffer,
    line_thickness: u32,
    current_color: Rgb<u8>,
    canvas: Option<RgbImage>,
}

impl Default for AirWriter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POINTS, DEFAULT_LINE_THICKNESS)
    }
}

impl AirWriter {
    pub fn new(max_points: usize, line_thickness: u32) -> Self {
        Self {
            points: PointBuffer::new(max_points),
            line_thickness,
            current_color: DEFAULT_COLOR,
            canvas: None,
        }
    }

    // (re)allocate the canvas whenever the frame size changes
    pub fn initialize_canvas(&mut self, width: u32, height: u32) {
        let matches = self
            .canvas
            .as_ref()
            .map(|canvas| canvas.dimensions() == (width, height))
            .unwrap_or(false);

        if !matches {
            debug!("allocating {}x{} drawing canvas", width, height);
            self.canvas = Some(RgbImage::new(width, height));
        }
    }

    /// Pen is down when the index finger is extended and the middle finger folded.
    /// Returns the index fingertip position whatever the pen state.
    pub fn detect_drawing_gesture(&self, hand: &HandObservation) -> (bool, Point2<f32>) {
        let index_tip = hand.get_point(HandLandmark::IndexTip);
        let index_pip = hand.get_point(HandLandmark::IndexPip);
        let middle_tip = hand.get_point(HandLandmark::MiddleTip);
        let middle_pip = hand.get_point(HandLandmark::MiddlePip);

        let index_up = index_tip.y < index_pip.y;
        let middle_down = middle_tip.y > middle_pip.y;

        (index_up && middle_down, Point2::new(index_tip.x, index_tip.y))
    }

    pub fn add_point(&mut self, point: Point2<f32>) {
        self.points.push(Some(point));
    }

    /// Ends the current stroke; the next point starts a new one.
    pub fn lift_pen(&mut self) {
        self.points.push(None);
    }

    pub fn clear_canvas(&mut self) {
        self.points.clear();
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.fill(0);
        }
    }

    /// Unknown names leave the color unchanged.
    pub fn change_color(&mut self, name: &str) {
        if let Some(color) = palette_color(name) {
            self.current_color = color;
        }
    }

    pub fn current_color(&self) -> Rgb<u8> {
        self.current_color
    }

    pub fn points(&self) -> &PointBuffer {
        &self.points
    }

    pub fn canvas(&self) -> Option<&RgbImage> {
        self.canvas.as_ref()
    }

    /// Paints the stroke history into the canvas and lays the canvas over `frame`.
    ///
    /// The canvas keeps what was painted on earlier frames; only
    /// [`AirWriter::clear_canvas`] or a change in frame size wipes it.
    pub fn draw_on_frame(&mut self, frame: &mut RgbImage) {
        let (width, height) = frame.dimensions();

        self.initialize_canvas(width, height);

        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };

        for (a, b) in self.points.segments() {
            let start = to_pixel(a, width, height);
            let end = to_pixel(b, width, height);
            draw_thick_line_mut(canvas, start, end, self.line_thickness, self.current_color);
        }

        composite(canvas, frame);
    }

    pub fn draw_cursor(&self, frame: &mut RgbImage, position: Point2<f32>, is_drawing: bool) {
        let (width, height) = frame.dimensions();
        let center = to_pixel(position, width, height);

        let (color, radius) = if is_drawing {
            (self.current_color, 10)
        } else {
            (GRAY, 8)
        };

        draw_filled_circle_mut(frame, center, radius, color);
        draw_hollow_circle_mut(frame, center, radius + 3, WHITE);
        draw_hollow_circle_mut(frame, center, radius + 4, WHITE);
    }
}

// any non-black canvas pixel replaces the frame pixel underneath
fn composite(canvas: &RgbImage, frame: &mut RgbImage) {
    frame
        .par_chunks_mut(3)
        .zip(canvas.par_chunks(3))
        .for_each(|(dst, src)| {
            if src.iter().any(|&c| c > 0) {
                dst.copy_from_slice(src);
            }
        });
}
