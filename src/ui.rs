use std::path::PathBuf;

use eframe::egui;
use image::DynamicImage;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use tracing::info;

use crate::config::{Config, StrokeStyle};
use crate::error::{PrepError, PrepResult};
use crate::geometry::{Point, Rect};
use crate::pipeline::Operator;
use crate::session::{
    BBoxSession, CropSession, Input, KEY_CONFIRM, KEY_QUIT, KEY_RESET, KEY_SAVE,
};

// ── Preview canvas ──────────────────────────────────────────────────────────

/// The down-scaled image drawn 1:1 in the top-left of the central panel.
struct Canvas<'a> {
    preview: &'a DynamicImage,
    texture: Option<egui::TextureHandle>,
}

impl<'a> Canvas<'a> {
    fn new(preview: &'a DynamicImage) -> Self {
        Self {
            preview,
            texture: None,
        }
    }

    fn size(&self) -> egui::Vec2 {
        egui::vec2(self.preview.width() as f32, self.preview.height() as f32)
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        let rgba = self.preview.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let pixels = rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        self.texture = Some(ctx.load_texture("preview", color_image, egui::TextureOptions::LINEAR));
    }

    /// Paint the image and collect pointer input from the primary button.
    fn show(&self, ui: &mut egui::Ui) -> (egui::Painter, egui::Rect, Vec<Input>) {
        let (response, painter) = ui.allocate_painter(self.size(), egui::Sense::click_and_drag());
        let image_rect = egui::Rect::from_min_size(response.rect.min, self.size());

        if let Some(ref tex) = self.texture {
            painter.image(
                tex.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        let to_point = |pos: egui::Pos2| {
            let rel = pos - image_rect.min;
            Point::new(rel.x.floor() as i32, rel.y.floor() as i32)
        };
        let pointer = response
            .interact_pointer_pos()
            .or(response.hover_pos())
            .or(ui.ctx().input(|i| i.pointer.latest_pos()));

        let mut inputs = Vec::new();
        if let Some(pos) = pointer {
            if response.drag_started_by(egui::PointerButton::Primary) {
                inputs.push(Input::PointerDown(to_point(pos)));
            }
            if response.dragged_by(egui::PointerButton::Primary) {
                inputs.push(Input::PointerMove(to_point(pos)));
            }
            if response.drag_stopped_by(egui::PointerButton::Primary) {
                inputs.push(Input::PointerUp(to_point(pos)));
            }
        }
        (painter, image_rect, inputs)
    }
}

fn paint_rect(painter: &egui::Painter, image_rect: egui::Rect, rect: Rect, style: StrokeStyle) {
    let min = image_rect.min + egui::vec2(rect.x1 as f32, rect.y1 as f32);
    let max = image_rect.min + egui::vec2(rect.x2 as f32, rect.y2 as f32);
    let [r, g, b] = style.color;
    painter.rect_stroke(
        egui::Rect::from_two_pos(min, max),
        0.0,
        egui::Stroke::new(style.stroke as f32, egui::Color32::from_rgb(r, g, b)),
        egui::StrokeKind::Middle,
    );
}

/// Command keys pressed this frame, in a fixed order.
fn pressed_keys(ctx: &egui::Context) -> Vec<Input> {
    const KEYS: [(egui::Key, char); 4] = [
        (egui::Key::C, KEY_CONFIRM),
        (egui::Key::S, KEY_SAVE),
        (egui::Key::R, KEY_RESET),
        (egui::Key::Q, KEY_QUIT),
    ];
    ctx.input(|i| {
        KEYS.iter()
            .filter(|(key, _)| i.key_pressed(*key))
            .map(|(_, c)| Input::Key(*c))
            .collect()
    })
}

// ── Crop window ─────────────────────────────────────────────────────────────

struct CropWindow<'a> {
    canvas: Canvas<'a>,
    session: &'a mut CropSession,
    preview_style: StrokeStyle,
}

impl eframe::App for CropWindow<'_> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.canvas.ensure_texture(ctx);
        let mut inputs = pressed_keys(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let has_region = self.session.region().is_some();
                if ui.add_enabled(has_region, egui::Button::new("Confirm (c)")).clicked() {
                    inputs.push(Input::Key(KEY_CONFIRM));
                }
                if ui.button("Quit (q)").clicked() {
                    inputs.push(Input::Key(KEY_QUIT));
                }
                ui.separator();
                match self.session.region() {
                    Some(r) => ui.label(format!("Region {r} ({}x{})", r.width(), r.height())),
                    None => ui.label("Drag a rectangle to choose the crop region"),
                };
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let (painter, image_rect, pointer) = self.canvas.show(ui);
            inputs.extend(pointer);
            for input in inputs.drain(..) {
                self.session.handle(input);
            }

            if let Some(region) = self.session.region_on_display() {
                paint_rect(&painter, image_rect, region, self.preview_style);
            }
            if let Some(live) = self.session.preview() {
                paint_rect(&painter, image_rect, live, self.preview_style);
            }
        });

        if self.session.is_finished() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

// ── BBox window ─────────────────────────────────────────────────────────────

struct BBoxWindow<'a> {
    canvas: Canvas<'a>,
    session: &'a mut BBoxSession,
    box_style: StrokeStyle,
    preview_style: StrokeStyle,
}

impl eframe::App for BBoxWindow<'_> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.canvas.ensure_texture(ctx);
        let mut inputs = pressed_keys(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Save (s)").clicked() {
                    inputs.push(Input::Key(KEY_SAVE));
                }
                if ui.button("Reset (r)").clicked() {
                    inputs.push(Input::Key(KEY_RESET));
                }
                if ui.button("Quit (q)").clicked() {
                    inputs.push(Input::Key(KEY_QUIT));
                }
                ui.separator();
                ui.label(format!("{} boxes", self.session.boxes().len()));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let (painter, image_rect, pointer) = self.canvas.show(ui);
            inputs.extend(pointer);
            for input in inputs.drain(..) {
                self.session.handle(input);
            }

            for b in self.session.boxes() {
                paint_rect(&painter, image_rect, *b, self.box_style);
            }
            if let Some(live) = self.session.preview() {
                paint_rect(&painter, image_rect, live, self.preview_style);
            }
        });

        if self.session.is_finished() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

// ── Desktop operator ────────────────────────────────────────────────────────

/// Native windows and dialogs.
pub struct DesktopOperator {
    box_style: StrokeStyle,
    preview_style: StrokeStyle,
}

impl DesktopOperator {
    pub fn new(config: &Config) -> Self {
        Self {
            box_style: config.bbox_style,
            preview_style: config.preview_style,
        }
    }

    fn options(preview: &DynamicImage, title: &str) -> eframe::NativeOptions {
        // room for the toolbar
        let size = [preview.width() as f32 + 16.0, preview.height() as f32 + 56.0];
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(size)
                .with_title(title),
            ..Default::default()
        }
    }
}

impl Operator for DesktopOperator {
    fn select_crop(
        &mut self,
        preview: &DynamicImage,
        session: &mut CropSession,
    ) -> PrepResult<()> {
        let title = "figure-prep: crop";
        info!("drag a rectangle, press 'c' to confirm or 'q' to quit");
        let window = CropWindow {
            canvas: Canvas::new(preview),
            session: &mut *session,
            preview_style: self.preview_style,
        };
        eframe::run_native(
            title,
            Self::options(preview, title),
            Box::new(move |_cc| Ok(Box::new(window))),
        )
        .map_err(|e| PrepError::Ui(e.to_string()))?;
        session.abandon();
        Ok(())
    }

    fn annotate(&mut self, preview: &DynamicImage, session: &mut BBoxSession) -> PrepResult<()> {
        let title = "figure-prep: bboxes";
        info!("draw boxes on the template, 's' saves, 'r' resets, 'q' quits");
        let window = BBoxWindow {
            canvas: Canvas::new(preview),
            session: &mut *session,
            box_style: self.box_style,
            preview_style: self.preview_style,
        };
        eframe::run_native(
            title,
            Self::options(preview, title),
            Box::new(move |_cc| Ok(Box::new(window))),
        )
        .map_err(|e| PrepError::Ui(e.to_string()))?;
        session.abandon();
        Ok(())
    }

    fn include_in_annotation(&mut self, subdir: &str) -> bool {
        let answer = MessageDialog::new()
            .set_title("BBox annotation")
            .set_description(format!("Annotate the images in '{subdir}'?"))
            .set_buttons(MessageButtons::YesNo)
            .show();
        matches!(answer, MessageDialogResult::Yes)
    }

    fn notify(&mut self, message: &str) {
        info!("{message}");
        MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title("figure-prep")
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}

/// Ask for the root directory; `None` when the dialog is dismissed.
pub fn pick_root() -> Option<PathBuf> {
    FileDialog::new()
        .set_title("Choose the directory to process")
        .pick_folder()
}
