use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use nalgebra::Point2;

use crate::landmarks::{HandObservation, Landmark, HAND_CONNECTIONS};
use crate::palm_rotation::{GestureInfo, RotationDirection};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const CYAN: Rgb<u8> = Rgb([0, 255, 255]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
pub const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);
const BAR_BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);

/// Normalized `(x, y)` to pixel coordinates, truncating toward zero.
pub fn to_pixel(point: Point2<f32>, width: u32, height: u32) -> (i32, i32) {
    (
        (point.x * width as f32) as i32,
        (point.y * height as f32) as i32,
    )
}

fn landmark_to_pixel(landmark: &Landmark, width: u32, height: u32) -> (i32, i32) {
    to_pixel(Point2::new(landmark.x, landmark.y), width, height)
}

/// Draws a line segment `thickness` pixels wide with round ends.
pub fn draw_thick_line_mut(
    image: &mut RgbImage,
    start: (i32, i32),
    end: (i32, i32),
    thickness: u32,
    color: Rgb<u8>,
) {
    if thickness < 2 {
        draw_line_segment_mut(
            image,
            (start.0 as f32, start.1 as f32),
            (end.0 as f32, end.1 as f32),
            color,
        );
        return;
    }

    let radius = thickness as f32 / 2.0;

    // round caps
    draw_filled_circle_mut(image, start, radius as i32, color);
    draw_filled_circle_mut(image, end, radius as i32, color);

    let dx = (end.0 - start.0) as f32;
    let dy = (end.1 - start.1) as f32;
    let length = (dx * dx + dy * dy).sqrt();
    if length < 1.0 {
        return;
    }

    // offset perpendicular to the segment
    let nx = -dy / length * radius;
    let ny = dx / length * radius;

    let corner = |p: (i32, i32), sign: f32| {
        Point::new(
            (p.0 as f32 + sign * nx).round() as i32,
            (p.1 as f32 + sign * ny).round() as i32,
        )
    };

    let quad = [
        corner(start, 1.0),
        corner(end, 1.0),
        corner(end, -1.0),
        corner(start, -1.0),
    ];

    draw_polygon_mut(image, &quad, color);
}

pub fn draw_hand_skeleton(image: &mut RgbImage, hand: &HandObservation) {
    let (width, height) = image.dimensions();

    for (from, to) in HAND_CONNECTIONS.iter() {
        let a = landmark_to_pixel(&hand.points[*from], width, height);
        let b = landmark_to_pixel(&hand.points[*to], width, height);
        draw_thick_line_mut(image, a, b, 2, WHITE);
    }

    for landmark in hand.points.iter() {
        let p = landmark_to_pixel(landmark, width, height);
        draw_filled_circle_mut(image, p, 4, RED);
    }
}

// face mesh and pose keypoints are only rendered, not interpreted
pub fn draw_landmark_points(image: &mut RgbImage, landmarks: &[Landmark], color: Rgb<u8>) {
    let (width, height) = image.dimensions();

    for landmark in landmarks.iter() {
        let p = landmark_to_pixel(landmark, width, height);
        draw_filled_circle_mut(image, p, 1, color);
    }
}

fn draw_arrow_mut(image: &mut RgbImage, start: (i32, i32), end: (i32, i32), color: Rgb<u8>) {
    draw_thick_line_mut(image, start, end, 3, color);

    // head is 40% of the shaft
    let dx = (start.0 - end.0) as f32 * 0.4;
    let dy = (start.1 - end.1) as f32 * 0.4;
    let (sin, cos) = std::f32::consts::FRAC_PI_6.sin_cos();

    let left = (
        end.0 + (dx * cos - dy * sin) as i32,
        end.1 + (dx * sin + dy * cos) as i32,
    );
    let right = (
        end.0 + (dx * cos + dy * sin) as i32,
        end.1 + (-dx * sin + dy * cos) as i32,
    );

    draw_thick_line_mut(image, end, left, 3, color);
    draw_thick_line_mut(image, end, right, 3, color);
}

/// Line from wrist to middle finger base, colored by the current rotation.
pub fn draw_rotation_indicator(image: &mut RgbImage, info: &GestureInfo) {
    let (width, height) = image.dimensions();

    let wrist = to_pixel(info.wrist_pos, width, height);
    let middle = to_pixel(info.middle_mcp_pos, width, height);

    let (color, thickness) = match info.rotation_direction {
        RotationDirection::Right => (GREEN, 4),
        RotationDirection::Left => (RED, 4),
        RotationDirection::None => (CYAN, 3),
    };

    draw_thick_line_mut(image, wrist, middle, thickness, color);
    draw_filled_circle_mut(image, wrist, 10, color);
    draw_filled_circle_mut(image, middle, 8, color);

    match info.rotation_direction {
        RotationDirection::Right => {
            draw_arrow_mut(image, (middle.0 + 20, middle.1), (middle.0 + 60, middle.1), GREEN)
        }
        RotationDirection::Left => {
            draw_arrow_mut(image, (middle.0 - 20, middle.1), (middle.0 - 60, middle.1), RED)
        }
        RotationDirection::None => {}
    }
}

pub fn volume_color(volume: u8) -> Rgb<u8> {
    if volume < 33 {
        GREEN
    } else if volume < 66 {
        YELLOW
    } else {
        ORANGE
    }
}

/// Horizontal volume bar along the bottom edge of the frame.
pub fn draw_volume_bar(image: &mut RgbImage, volume: u8, bar_height: u32, padding: u32) {
    let (width, height) = image.dimensions();

    if width <= 2 * padding || height <= padding + bar_height {
        return;
    }

    let bar_width = width - 2 * padding;
    let bar_x = padding as i32;
    let bar_y = (height - padding - bar_height) as i32;

    draw_filled_rect_mut(
        image,
        Rect::at(bar_x, bar_y).of_size(bar_width, bar_height),
        BAR_BACKGROUND,
    );

    let fill_width = (volume.min(100) as f32 / 100.0 * bar_width as f32) as u32;
    if fill_width > 0 {
        draw_filled_rect_mut(
            image,
            Rect::at(bar_x, bar_y).of_size(fill_width, bar_height),
            volume_color(volume),
        );
    }

    // 2px border
    draw_hollow_rect_mut(
        image,
        Rect::at(bar_x, bar_y).of_size(bar_width, bar_height),
        WHITE,
    );
    if bar_width > 2 && bar_height > 2 {
        draw_hollow_rect_mut(
            image,
            Rect::at(bar_x + 1, bar_y + 1).of_size(bar_width - 2, bar_height - 2),
            WHITE,
        );
    }
}

/// Darkens a centered box so the finger count drawn on top stays readable.
pub fn draw_count_backdrop(image: &mut RgbImage, box_width: u32, box_height: u32) {
    let (width, height) = image.dimensions();

    let box_width = box_width.min(width);
    let box_height = box_height.min(height);
    let x0 = (width - box_width) / 2;
    let y0 = (height - box_height) / 2;

    for y in y0..y0 + box_height {
        for x in x0..x0 + box_width {
            let pixel = image.get_pixel_mut(x, y);
            for c in pixel.0.iter_mut() {
                *c = (*c as f32 * 0.4) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_coordinates_truncate() {
        assert_eq!(to_pixel(Point2::new(0.5, 0.25), 640, 480), (320, 120));
        assert_eq!(to_pixel(Point2::new(0.999, 0.999), 10, 10), (9, 9));
    }

    #[test]
    fn thick_line_covers_its_width() {
        let mut image = RgbImage::new(40, 40);
        draw_thick_line_mut(&mut image, (5, 20), (35, 20), 5, WHITE);

        assert_eq!(*image.get_pixel(20, 20), WHITE);
        assert_eq!(*image.get_pixel(20, 18), WHITE);
        assert_eq!(*image.get_pixel(20, 22), WHITE);
        assert_eq!(*image.get_pixel(20, 30), Rgb([0, 0, 0]));
    }

    #[test]
    fn zero_length_thick_line_is_a_dot() {
        let mut image = RgbImage::new(20, 20);
        draw_thick_line_mut(&mut image, (10, 10), (10, 10), 5, GREEN);
        assert_eq!(*image.get_pixel(10, 10), GREEN);
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn volume_bar_fill_tracks_level() {
        let mut image = RgbImage::new(140, 100);
        draw_volume_bar(&mut image, 50, 30, 20);

        // bar spans x 20..120, y 50..80; half of it is filled yellow
        assert_eq!(*image.get_pixel(40, 65), YELLOW);
        assert_eq!(*image.get_pixel(100, 65), BAR_BACKGROUND);
        assert_eq!(*image.get_pixel(20, 65), WHITE);
        assert_eq!(*image.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn volume_bar_skips_tiny_frames() {
        let mut image = RgbImage::new(30, 30);
        draw_volume_bar(&mut image, 80, 30, 20);
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn volume_color_bands() {
        assert_eq!(volume_color(0), GREEN);
        assert_eq!(volume_color(32), GREEN);
        assert_eq!(volume_color(33), YELLOW);
        assert_eq!(volume_color(66), ORANGE);
        assert_eq!(volume_color(100), ORANGE);
    }

    #[test]
    fn backdrop_dims_only_the_center() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        draw_count_backdrop(&mut image, 4, 4);
        assert_eq!(*image.get_pixel(5, 5), Rgb([40, 40, 40]));
        assert_eq!(*image.get_pixel(0, 0), Rgb([100, 100, 100]));
    }
}
