use anyhow::{Context as _, Result};
use chrono::Local;
use eframe::egui::{self, Context as EguiContext, Key, RichText, TopBottomPanel};
use eframe::{App, Frame};
use image::RgbaImage;

use annoshot::export::{encode_png, export_flattened, suggested_file_name};
use annoshot::fonts::FontBook;
use annoshot::{CanvasController, EditorConfig, Renderer};

use crate::canvas::{self, Document};
use crate::clipboard;
use crate::toolbar;

const STATUS_SECONDS: f64 = 3.0;

pub struct AnnoshotApp {
    controller: CanvasController,
    renderer: Renderer,
    document: Option<Document>,
    tap_slop: f32,
    status: Option<(String, f64)>,
}

impl AnnoshotApp {
    pub fn new(config: &EditorConfig, fonts: FontBook, image: Option<RgbaImage>) -> Self {
        let controller = CanvasController::from_config(config, Box::new(fonts.clone()));
        Self {
            controller,
            renderer: Renderer::new(fonts),
            document: image.map(Document::new),
            tap_slop: config.tap_slop.max(0.0),
            status: None,
        }
    }

    fn handle_shortcuts(&mut self, ctx: &EguiContext) {
        let (cmd, shift) = ctx.input(|input| {
            (
                input.modifiers.command || input.modifiers.ctrl,
                input.modifiers.shift,
            )
        });
        if !cmd {
            return;
        }

        if ctx.input(|input| input.key_pressed(Key::Z)) && !shift {
            self.controller.undo();
        }
        if shift && ctx.input(|input| input.key_pressed(Key::C)) {
            self.run(ctx, "Copied to clipboard", Self::copy_to_clipboard);
        }
        if ctx.input(|input| input.key_pressed(Key::S)) {
            self.run(ctx, "Saved", Self::save_to_file);
        }
    }

    fn run(
        &mut self,
        ctx: &EguiContext,
        success: &str,
        command: fn(&mut Self) -> Result<bool>,
    ) {
        let message = match command(self) {
            Ok(true) => success.to_string(),
            Ok(false) => return,
            Err(err) => {
                log::error!("{err:#}");
                format!("{err:#}")
            }
        };
        let now = ctx.input(|input| input.time);
        self.status = Some((message, now + STATUS_SECONDS));
    }

    /// The flattened image, with any pending text committed first.
    fn flatten(&mut self) -> Result<Option<RgbaImage>> {
        let Some(document) = self.document.as_ref() else {
            return Ok(None);
        };
        self.controller.commit_text();
        let canvas = document
            .canvas_size()
            .context("canvas has not been laid out yet")?;
        let flattened = export_flattened(
            &document.image,
            self.controller.annotations(),
            canvas,
            &self.renderer,
            document.mosaic(),
        )
        .context("export produced no image")?;
        Ok(Some(flattened))
    }

    fn copy_to_clipboard(&mut self) -> Result<bool> {
        let Some(flattened) = self.flatten()? else {
            return Ok(false);
        };
        clipboard::write_image(&flattened)?;
        Ok(true)
    }

    fn save_to_file(&mut self) -> Result<bool> {
        let Some(flattened) = self.flatten()? else {
            return Ok(false);
        };

        let file = rfd::FileDialog::new()
            .set_title("Save annotated image")
            .set_file_name(suggested_file_name(&Local::now()))
            .add_filter("PNG", &["png"])
            .save_file();
        let Some(path) = file else {
            return Ok(false);
        };

        let png = encode_png(&flattened)?;
        std::fs::write(&path, png)
            .with_context(|| format!("cannot save png to {}", path.display()))?;
        log::info!("saved {}", path.display());
        Ok(true)
    }
}

impl App for AnnoshotApp {
    fn update(&mut self, ctx: &EguiContext, _frame: &mut Frame) {
        self.handle_shortcuts(ctx);

        let has_image = self.document.is_some();
        let toolbar = TopBottomPanel::top("toolbar")
            .exact_height(40.0)
            .show(ctx, |ui| {
                toolbar::show_toolbar(ui, &mut self.controller, has_image)
            })
            .inner;

        if toolbar.undo {
            self.controller.undo();
        }
        if toolbar.clear {
            self.controller.clear();
        }
        if toolbar.copy {
            self.run(ctx, "Copied to clipboard", Self::copy_to_clipboard);
        }
        if toolbar.save {
            self.run(ctx, "Saved", Self::save_to_file);
        }

        let now = ctx.input(|input| input.time);
        if self.status.as_ref().is_some_and(|(_, until)| now > *until) {
            self.status = None;
        }
        if let Some((message, _)) = &self.status {
            TopBottomPanel::bottom("status").show(ctx, |ui| {
                ui.label(RichText::new(message.as_str()).small());
            });
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                canvas::show_canvas(
                    ui,
                    self.document.as_mut(),
                    &mut self.controller,
                    &self.renderer,
                    self.tap_slop,
                );
            });
    }
}
