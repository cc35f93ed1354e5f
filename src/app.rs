use std::time::Duration;

use egui::{Align2, Color32, FontId};

use crate::finger_count::FingerCountResult;
use crate::mode::Mode;
use crate::processor::{FrameReport, KeyAction, VisionProcessor};
use crate::utils::FpsMeter;
use crate::webcam::WebcamStream;

const AIR_WRITING_HELP: [&str; 5] = [
    "Index finger up, middle finger down: draw",
    "Both fingers up: move without drawing",
    "x: clear the drawing",
    "r / b / g / y / w: pen color",
    "q: quit",
];

pub struct HandtrackingApp {
    camera: WebcamStream,
    processor: VisionProcessor,
    fps: FpsMeter,
    texture: Option<egui::TextureHandle>,
    report: FrameReport,
}

impl HandtrackingApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, camera: WebcamStream, processor: VisionProcessor) -> Self {
        Self {
            camera,
            processor,
            fps: FpsMeter::new(),
            texture: None,
            report: FrameReport::default(),
        }
    }

    // typed characters go to the processor; returns true on quit
    fn handle_keys(&mut self, ctx: &egui::Context) -> bool {
        let typed: Vec<char> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Text(text) => Some(text.clone()),
                    _ => None,
                })
                .flat_map(|text| text.chars().collect::<Vec<_>>())
                .collect()
        });

        typed
            .into_iter()
            .any(|key| self.processor.handle_key(key) == KeyAction::Quit)
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            let (width, height) = self.camera.resolution();

            ui.heading("Hand tracking");
            ui.label(format!("Camera: {}", self.camera.device_name()));
            ui.label(format!("Resolution: {}x{}", width, height));
            ui.label(format!("FPS: {:.1}", self.fps.fps()));

            if !self.camera.is_running() {
                ui.colored_label(Color32::RED, "Camera stopped");
            }

            ui.separator();

            let current = self.processor.mode();
            for mode in Mode::ALL {
                let text = format!("[{}] {}", mode.key(), mode.label());
                if ui.selectable_label(current == mode, text).clicked() {
                    self.processor.set_mode(mode);
                }
            }

            ui.separator();

            match self.report.mode {
                Mode::Count => {
                    if let Some(counts) = &self.report.finger_count {
                        for line in count_lines(counts) {
                            ui.label(line);
                        }
                    }
                }
                Mode::Gestures => {
                    ui.label(format!("Volume: {}%", self.processor.volume()));
                    ui.label(format!("Output: {}", self.processor.volume_controller().backend_name()));
                    if let Some(gesture) = &self.report.gesture {
                        ui.label(format!("Palm angle: {:.1}", gesture.palm_angle));
                        ui.label(format!("Rotation: {}", gesture.rotation_direction.label()));
                    }
                    ui.label("Turn your palm right to raise the volume, left to lower it");
                }
                Mode::Draw => {
                    let color = self.processor.air_writer().current_color();
                    ui.colored_label(Color32::from_rgb(color[0], color[1], color[2]), "Pen color");
                    for line in AIR_WRITING_HELP {
                        ui.label(line);
                    }
                }
                Mode::Hands => {
                    ui.label(format!("Hands: {}", self.report.hands_detected));
                }
                Mode::Face | Mode::Pose => {
                    ui.label(format!("Landmarks: {}", self.report.points_detected));
                }
                Mode::None => {}
            }
        });
    }
}

pub fn count_lines(counts: &FingerCountResult) -> Vec<String> {
    let mut lines = vec![format!("Total fingers: {}", counts.total)];
    lines.extend(
        counts
            .hands
            .iter()
            .map(|hand| format!("Hand {} ({}): {}", hand.index + 1, hand.handedness.label(), hand.count)),
    );
    lines
}

/// Color and caption of the big finger count.
pub fn count_style(total: u32) -> (Color32, &'static str) {
    let color = match total {
        0 => Color32::from_rgb(128, 128, 128),
        1..=5 => Color32::from_rgb(0, 255, 0),
        6..=8 => Color32::from_rgb(255, 255, 0),
        _ => Color32::from_rgb(255, 165, 0),
    };
    let caption = if total == 1 { "FINGER" } else { "FINGERS" };
    (color, caption)
}

impl eframe::App for HandtrackingApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        if self.handle_keys(ctx) {
            frame.close();
            return;
        }

        // always the most recent frame; may repeat one the camera has not replaced yet
        if let Some(mut image) = self.camera.read() {
            self.report = self.processor.process(&mut image);
            self.fps.tick();

            let size = [image.width() as usize, image.height() as usize];
            let ui_image = egui::ColorImage::from_rgb(size, image.as_raw());

            match self.texture.as_mut() {
                Some(texture) => texture.set(ui_image, egui::TextureOptions::default()),
                None => {
                    self.texture = Some(ctx.load_texture("image", ui_image, egui::TextureOptions::default()))
                }
            }
        }

        egui::SidePanel::left("side_panel").show(ctx, |ui| self.side_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(texture) = self.texture.as_ref() else {
                ui.label("Waiting for camera...");
                return;
            };

            // fit the image to the panel width
            let [width, height] = texture.size();
            let ui_img_width = ui.available_width();
            let ui_img_height = ui_img_width / (width as f32 / height as f32);

            let response = ui.image(texture, egui::Vec2::new(ui_img_width, ui_img_height));

            // count is drawn over the dimmed box in the middle of the frame
            if let Some(counts) = &self.report.finger_count {
                let (color, caption) = count_style(counts.total);
                let center = response.rect.center();

                ui.painter().text(
                    center,
                    Align2::CENTER_CENTER,
                    counts.total.to_string(),
                    FontId::proportional(ui_img_height / 6.0),
                    color,
                );
                ui.painter().text(
                    center + egui::vec2(0.0, ui_img_height / 8.0),
                    Align2::CENTER_CENTER,
                    caption,
                    FontId::proportional(ui_img_height / 20.0),
                    Color32::WHITE,
                );
            }

            if self.report.mode == Mode::Gestures {
                ui.painter().text(
                    response.rect.left_top() + egui::vec2(20.0, 20.0),
                    Align2::LEFT_TOP,
                    format!("Volume {}%", self.processor.volume()),
                    FontId::proportional(24.0),
                    Color32::WHITE,
                );
            }
        });

        ctx.request_repaint_after(Duration::from_millis(10));
    }
}
