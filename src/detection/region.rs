use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::landmarks::Landmark;

/// Square window onto a frame, in frame pixels. It may reach past the frame
/// edges; whatever lies outside reads as black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareRegion {
    pub x: i32,
    pub y: i32,
    pub side: u32,
    pub image_width: u32,
    pub image_height: u32,
}

impl SquareRegion {
    // largest square inside the frame
    pub fn centered(image_width: u32, image_height: u32) -> Self {
        let side = image_width.min(image_height);

        Self {
            x: ((image_width - side) / 2) as i32,
            y: ((image_height - side) / 2) as i32,
            side,
            image_width,
            image_height,
        }
    }

    // smallest square holding the whole frame, padded evenly
    pub fn letterbox(image_width: u32, image_height: u32) -> Self {
        let side = image_width.max(image_height);

        Self {
            x: -(((side - image_width) / 2) as i32),
            y: -(((side - image_height) / 2) as i32),
            side,
            image_width,
            image_height,
        }
    }

    pub fn around(center_x: f32, center_y: f32, side: f32, image_width: u32, image_height: u32) -> Self {
        let side = side.round().max(1.0);

        Self {
            x: (center_x - side / 2.0).round() as i32,
            y: (center_y - side / 2.0).round() as i32,
            side: side as u32,
            image_width,
            image_height,
        }
    }

    /// Maps a point in model input pixels back to normalized frame coordinates.
    pub fn to_frame(&self, x: f32, y: f32, z: f32, input_size: u32) -> Landmark {
        let scale = self.side as f32 / input_size as f32;

        Landmark::new(
            (self.x as f32 + x * scale) / self.image_width as f32,
            (self.y as f32 + y * scale) / self.image_height as f32,
            z / input_size as f32,
        )
    }

    /// Length along x and y of a span of `size` model input pixels, normalized to the frame.
    pub fn span_to_frame(&self, size: f32, input_size: u32) -> (f32, f32) {
        let pixels = size * self.side as f32 / input_size as f32;
        (pixels / self.image_width as f32, pixels / self.image_height as f32)
    }

    /// Cuts the region out of `image` and scales it to `size`x`size`.
    pub fn extract(&self, image: &RgbImage, size: u32) -> RgbImage {
        let mut square = RgbImage::new(self.side, self.side);
        imageops::overlay(&mut square, image, -(self.x as i64), -(self.y as i64));

        imageops::resize(&square, size, size, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn centered_is_inside_the_frame() {
        let region = SquareRegion::centered(1280, 720);
        assert_eq!((region.x, region.y, region.side), (280, 0, 720));

        let region = SquareRegion::centered(480, 640);
        assert_eq!((region.x, region.y, region.side), (0, 80, 480));
    }

    #[test]
    fn letterbox_pads_the_short_side() {
        let region = SquareRegion::letterbox(1280, 720);
        assert_eq!((region.x, region.y, region.side), (0, -280, 1280));

        // the middle of the padded square is the middle of the frame
        let p = region.to_frame(96.0, 96.0, 0.0, 192);
        assert!((p.x - 0.5).abs() < 1e-6);
        assert!((p.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn maps_back_to_frame() {
        let region = SquareRegion::centered(1280, 720);

        let p = region.to_frame(112.0, 112.0, 22.4, 224);
        assert!((p.x - 0.5).abs() < 1e-6);
        assert!((p.y - 0.5).abs() < 1e-6);
        assert!((p.z - 0.1).abs() < 1e-6);

        let p = region.to_frame(0.0, 0.0, 0.0, 224);
        assert!((p.x - 280.0 / 1280.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
    }

    #[test]
    fn region_around_a_point() {
        let region = SquareRegion::around(100.0, 50.0, 40.0, 200, 100);
        assert_eq!((region.x, region.y, region.side), (80, 30, 40));

        let (w, h) = region.span_to_frame(224.0, 224);
        assert!((w - 0.2).abs() < 1e-6);
        assert!((h - 0.4).abs() < 1e-6);
    }

    #[test]
    fn extract_fills_outside_with_black() {
        let image = RgbImage::from_pixel(4, 2, Rgb([200, 200, 200]));
        let region = SquareRegion::letterbox(4, 2);

        let square = region.extract(&image, 4);
        assert_eq!(square.dimensions(), (4, 4));
        assert_eq!(*square.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*square.get_pixel(2, 1), Rgb([200, 200, 200]));
        assert_eq!(*square.get_pixel(2, 3), Rgb([0, 0, 0]));
    }
}
