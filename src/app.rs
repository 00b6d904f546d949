use std::sync::mpsc;

use eframe::egui;
use image::DynamicImage;
use log::{error, info};

use crate::config::Config;
use crate::crop::{self, CropEditor};
use crate::error::AppError;
use crate::intake::{self, IntakeError, SelectedFile};
use crate::raster;
use crate::state::WidgetState;
use crate::upload::{UploadClient, UploadError, UploadOutcome};

const PADDING: f32 = 20.0;
const HANDLE_RADIUS: f32 = 6.0;
const HANDLE_HIT_TOLERANCE: f32 = 10.0;
const DROP_ZONE_HEIGHT: f32 = 220.0;

enum Notice {
    Info(String),
    Error(String),
}

struct Payload {
    file_name: String,
    mime: String,
    bytes: Vec<u8>,
}

pub struct CropSendApp {
    client: UploadClient,
    max_upload_size: u64,
    state: WidgetState,
    file: Option<SelectedFile>,
    decoded: Option<DynamicImage>,
    texture: Option<egui::TextureHandle>,
    editor: Option<CropEditor>,
    notice: Option<Notice>,
    upload_rx: Option<mpsc::Receiver<Result<UploadOutcome, UploadError>>>,
}

impl CropSendApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        Self {
            client: UploadClient::new(config.endpoint, config.token),
            max_upload_size: config.max_upload_size,
            state: WidgetState::Empty,
            file: None,
            decoded: None,
            texture: None,
            editor: None,
            notice: None,
            upload_rx: None,
        }
    }

    fn browse(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg", "bmp", "webp"])
            .pick_file()
        {
            let candidate = intake::read_path(&path, self.max_upload_size);
            self.accept(ctx, candidate);
        }
    }

    fn accept(&mut self, ctx: &egui::Context, candidate: Result<SelectedFile, IntakeError>) {
        if !self.state.can_accept_file() {
            return;
        }
        match candidate {
            Ok(file) => {
                if let Err(err) = self.install_preview(ctx, file) {
                    self.notice = Some(Notice::Error(err.to_string()));
                }
            }
            Err(err) => self.notice = Some(Notice::Error(AppError::Intake(err).to_string())),
        }
    }

    /// Replaces the current selection wholesale and decodes the preview.
    fn install_preview(&mut self, ctx: &egui::Context, file: SelectedFile) -> Result<(), AppError> {
        let decoded = image::load_from_memory(&file.bytes)?;
        info!(
            "previewing {} ({}x{}, {} bytes)",
            file.name,
            decoded.width(),
            decoded.height(),
            file.bytes.len()
        );

        let size = [decoded.width() as _, decoded.height() as _];
        let image_buffer = decoded.to_rgba8();
        let pixels = image_buffer.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        self.texture = Some(ctx.load_texture("preview", color_image, egui::TextureOptions::LINEAR));

        self.decoded = Some(decoded);
        self.file = Some(file);
        // Sized on the first layout pass, once the displayed size is known.
        self.editor = None;
        self.notice = None;
        self.state.transition(WidgetState::PreviewingWholeImage);
        Ok(())
    }

    /// Clears the selection and every preview resource.
    fn reset(&mut self) {
        self.file = None;
        self.decoded = None;
        self.texture = None;
        self.editor = None;
        self.state.transition(WidgetState::Empty);
    }

    /// The preview state this widget should show when not submitting.
    fn preview_state(&self) -> WidgetState {
        match &self.editor {
            Some(editor) if !editor.is_full_frame() => WidgetState::PreviewingWithCrop,
            _ => WidgetState::PreviewingWholeImage,
        }
    }

    fn sync_preview_state(&mut self) {
        if !self.state.is_submitting() && self.state.has_preview() {
            let next = self.preview_state();
            self.state.transition(next);
        }
    }

    fn build_payload(&self, file: &SelectedFile, decoded: &DynamicImage) -> Result<Payload, AppError> {
        match &self.editor {
            // Adjusted crop: rasterize the selected region at native
            // resolution and send the re-encoded JPEG.
            Some(editor) if !editor.is_full_frame() => {
                let region = editor.to_source_rect(decoded.width(), decoded.height());
                let bytes = raster::extract_jpeg(decoded, region)?;
                Ok(Payload {
                    file_name: "crop.jpg".to_owned(),
                    mime: "image/jpeg".to_owned(),
                    bytes,
                })
            }
            // Full frame: the original file goes out untouched.
            _ => Ok(Payload {
                file_name: file.name.clone(),
                mime: file.mime.clone(),
                bytes: file.bytes.clone(),
            }),
        }
    }

    fn begin_submit(&mut self, ctx: &egui::Context) {
        if !self.state.can_submit() {
            return;
        }
        let (Some(file), Some(decoded)) = (&self.file, &self.decoded) else {
            return;
        };
        let payload = match self.build_payload(file, decoded) {
            Ok(payload) => payload,
            Err(err) => {
                error!("could not build payload: {err}");
                self.notice = Some(Notice::Error(err.to_string()));
                return;
            }
        };

        let (tx, rx) = mpsc::channel();
        self.upload_rx = Some(rx);
        self.state.transition(WidgetState::Submitting);
        self.notice = None;

        let client = self.client.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = client.send(&payload.file_name, &payload.mime, payload.bytes);
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }

    fn poll_upload(&mut self) {
        let Some(rx) = &self.upload_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(UploadOutcome::Accepted(note))) => {
                info!("upload accepted: {note}");
                self.upload_rx = None;
                self.notice = Some(Notice::Info(format!("Upload accepted: {note}")));
                self.reset();
            }
            Ok(Ok(UploadOutcome::ProcessedImage(bytes))) => {
                info!("received a processed image ({} bytes)", bytes.len());
                self.upload_rx = None;
                self.offer_download(bytes);
                self.reset();
            }
            Ok(Err(err)) => {
                error!("upload failed: {err}");
                self.upload_rx = None;
                self.notice = Some(Notice::Error(AppError::Upload(err).to_string()));
                // The file stays selected so the user can retry.
                let resume = self.preview_state();
                self.state.transition(resume);
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                error!("upload worker exited without a result");
                self.upload_rx = None;
                self.notice = Some(Notice::Error("upload failed".to_owned()));
                let resume = self.preview_state();
                self.state.transition(resume);
            }
        }
    }

    fn offer_download(&mut self, bytes: Vec<u8>) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name("processed_image.jpg")
            .save_file()
        {
            match std::fs::write(&path, &bytes) {
                Ok(()) => {
                    self.notice = Some(Notice::Info(format!("Saved to {}", path.display())));
                }
                Err(err) => {
                    error!("could not save processed image: {err}");
                    self.notice = Some(Notice::Error(format!("could not save image: {err}")));
                }
            }
        } else {
            self.notice = Some(Notice::Info("Image processed.".to_owned()));
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.first() else {
            return;
        };
        let candidate = if let Some(bytes) = &file.bytes {
            intake::validate(&file.name, bytes.to_vec(), self.max_upload_size)
        } else if let Some(path) = &file.path {
            intake::read_path(path, self.max_upload_size)
        } else {
            return;
        };
        self.accept(ctx, candidate);
    }

    fn show_notice(&self, ui: &mut egui::Ui) {
        if let Some(notice) = &self.notice {
            let (text, color) = match notice {
                Notice::Info(message) => (message, egui::Color32::LIGHT_GREEN),
                Notice::Error(message) => (message, egui::Color32::LIGHT_RED),
            };
            ui.colored_label(color, text);
            ui.separator();
        }
    }

    fn show_drop_zone(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());
        let width = ui.available_width();
        let (rect, response) = ui.allocate_exact_size(
            egui::vec2(width, DROP_ZONE_HEIGHT),
            egui::Sense::click(),
        );

        let stroke = if hovering || response.hovered() {
            egui::Stroke::new(2.0, egui::Color32::WHITE)
        } else {
            egui::Stroke::new(1.0, egui::Color32::GRAY)
        };
        ui.painter().rect_stroke(rect.shrink(4.0), 8.0, stroke);
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Drag an image here or click to browse",
            egui::FontId::proportional(16.0),
            egui::Color32::GRAY,
        );

        if response.clicked() {
            self.browse(ctx);
        }
    }

    fn show_controls(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let submitting = self.state.is_submitting();
        ui.horizontal(|ui| {
            let label = if submitting { "Sending…" } else { "Send to bot" };
            if ui
                .add_enabled(self.state.can_submit(), egui::Button::new(label))
                .clicked()
            {
                self.begin_submit(ctx);
            }

            if ui
                .add_enabled(!submitting, egui::Button::new("Reset crop"))
                .clicked()
            {
                if let Some(editor) = &mut self.editor {
                    editor.reset();
                }
                self.sync_preview_state();
            }

            if ui
                .add_enabled(!submitting, egui::Button::new("Choose another image"))
                .clicked()
            {
                self.browse(ctx);
            }
        });
        ui.separator();
    }

    fn show_preview(&mut self, ui: &mut egui::Ui) {
        let Some(texture) = &self.texture else {
            return;
        };

        let available_size = ui.available_size();
        let max_size = available_size - egui::vec2(PADDING * 2.0, PADDING * 2.0);
        let image_size = texture.size_vec2();

        // Fit within the available space while keeping the aspect ratio.
        let scale = (max_size.x / image_size.x).min(max_size.y / image_size.y);
        let display_size = image_size * scale;
        let total_display_size = display_size + egui::vec2(PADDING * 2.0, PADDING * 2.0);

        let x_offset = (available_size.x - total_display_size.x) / 2.0;
        let y_offset = (available_size.y - total_display_size.y) / 2.0;
        let start_pos = ui.cursor().min + egui::vec2(x_offset.max(0.0), y_offset.max(0.0));
        let target_rect = egui::Rect::from_min_size(start_pos, total_display_size);

        let response = ui.allocate_rect(target_rect, egui::Sense::drag());
        let painter = ui.painter_at(target_rect);

        let image_rect = egui::Rect::from_min_size(
            target_rect.min + egui::vec2(PADDING, PADDING),
            display_size,
        );

        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        // Keep the editor in step with the displayed size.
        match &mut self.editor {
            Some(editor) => editor.set_bounds(display_size.x, display_size.y),
            None => self.editor = Some(CropEditor::new(display_size.x, display_size.y)),
        }

        if !self.state.is_submitting() {
            self.handle_crop_drag(&response, image_rect);
        }

        if let Some(editor) = &self.editor {
            let rect = editor.rect();
            let screen_crop_rect = egui::Rect::from_min_size(
                image_rect.min + egui::vec2(rect.x, rect.y),
                egui::vec2(rect.width, rect.height),
            );
            draw_crop_overlay(&painter, image_rect, screen_crop_rect);
        }
    }

    fn handle_crop_drag(&mut self, response: &egui::Response, image_rect: egui::Rect) {
        let mut drag_ended = false;

        if let Some(editor) = &mut self.editor {
            if response.drag_started() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let local = pos - image_rect.min;
                    if let Some(handle) = crop::hit_test_corner(
                        local.x,
                        local.y,
                        &editor.rect(),
                        HANDLE_HIT_TOLERANCE,
                    ) {
                        editor.begin_drag(handle, local.x, local.y);
                    }
                }
            }

            if response.dragged() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let local = pos - image_rect.min;
                    editor.drag_to(local.x, local.y);
                }
            }

            if response.drag_stopped() {
                editor.end_drag();
                drag_ended = true;
            }
        }

        if drag_ended {
            self.sync_preview_state();
        }
    }
}

fn draw_crop_overlay(painter: &egui::Painter, image_rect: egui::Rect, crop_rect: egui::Rect) {
    let overlay_color = egui::Color32::from_black_alpha(150);

    // Dim everything outside the crop rectangle.
    painter.rect_filled(
        egui::Rect::from_min_max(
            image_rect.min,
            egui::pos2(image_rect.max.x, crop_rect.min.y),
        ),
        0.0,
        overlay_color,
    );
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(image_rect.min.x, crop_rect.max.y),
            image_rect.max,
        ),
        0.0,
        overlay_color,
    );
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(image_rect.min.x, crop_rect.min.y),
            egui::pos2(crop_rect.min.x, crop_rect.max.y),
        ),
        0.0,
        overlay_color,
    );
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(crop_rect.max.x, crop_rect.min.y),
            egui::pos2(image_rect.max.x, crop_rect.max.y),
        ),
        0.0,
        overlay_color,
    );

    painter.rect_stroke(crop_rect, 0.0, egui::Stroke::new(1.0, egui::Color32::WHITE));

    // Corner handles.
    let handle_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);
    let handle_fill = egui::Color32::WHITE;
    let corners = [
        crop_rect.min,
        egui::pos2(crop_rect.max.x, crop_rect.min.y),
        egui::pos2(crop_rect.min.x, crop_rect.max.y),
        crop_rect.max,
    ];
    for pos in corners {
        painter.circle(pos, HANDLE_RADIUS, handle_fill, handle_stroke);
    }
}

impl eframe::App for CropSendApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_upload();
        self.handle_dropped_files(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_notice(ui);

            if self.state.has_preview() {
                self.show_controls(ctx, ui);
                self.show_preview(ui);
            } else {
                self.show_drop_zone(ctx, ui);
            }
        });
    }
}
