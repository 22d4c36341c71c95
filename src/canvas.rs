use egui::{
    self, vec2, Align2, Color32, ColorImage, Context, FontId, Id, Key, Pos2, Rect, Sense, Stroke,
    TextureHandle, TextureOptions, Ui, Vec2,
};
use image::RgbaImage;
use tiny_skia::Pixmap;

use annoshot::geometry::{fit_size, Point, Size};
use annoshot::pixelate::MosaicSource;
use annoshot::render::{DrawRequest, Renderer};
use annoshot::CanvasController;

const CANVAS_MARGIN: f32 = 24.0;

#[derive(Clone, Copy, Debug)]
struct Press {
    origin: Point,
    dragging: bool,
}

pub struct Document {
    pub image: RgbaImage,
    /// Canvas coordinate space, fixed the first time the image is laid out.
    canvas_size: Option<Size>,
    texture: Option<TextureHandle>,
    overlay: Option<TextureHandle>,
    overlay_key: Option<(u64, [usize; 2])>,
    mosaic: Option<MosaicSource>,
    press: Option<Press>,
}

impl Document {
    pub fn new(image: RgbaImage) -> Self {
        let mosaic = MosaicSource::from_image(&image);
        Self {
            image,
            canvas_size: None,
            texture: None,
            overlay: None,
            overlay_key: None,
            mosaic,
            press: None,
        }
    }

    pub fn canvas_size(&self) -> Option<Size> {
        self.canvas_size
    }

    pub fn mosaic(&self) -> Option<&MosaicSource> {
        self.mosaic.as_ref()
    }

    fn image_size(&self) -> Size {
        Size::new(self.image.width() as f32, self.image.height() as f32)
    }

    fn ensure_texture(&mut self, ctx: &Context) -> egui::TextureId {
        self.texture
            .get_or_insert_with(|| {
                let size = [self.image.width() as usize, self.image.height() as usize];
                let pixels = ColorImage::from_rgba_unmultiplied(size, self.image.as_raw());
                ctx.load_texture("base-image", pixels, TextureOptions::LINEAR)
            })
            .id()
    }

    /// Re-renders the annotation overlay when the controller changed or the
    /// display resolution did.
    fn refresh_overlay(
        &mut self,
        ctx: &Context,
        controller: &CanvasController,
        renderer: &Renderer,
        canvas: Size,
        pixels: [usize; 2],
    ) -> Option<egui::TextureId> {
        let key = (controller.revision(), pixels);
        if self.overlay_key != Some(key) {
            let mut pixmap = Pixmap::new(pixels[0] as u32, pixels[1] as u32)?;
            let request = DrawRequest {
                annotations: controller.annotations(),
                live: controller.live_annotation(),
                surface_size: canvas,
                mosaic: self.mosaic.as_ref(),
                selected: controller.selected_id(),
            };
            renderer.draw(&mut pixmap, &request, pixels[0] as f32 / canvas.width);

            let image = ColorImage::from_rgba_premultiplied(pixels, pixmap.data());
            match &mut self.overlay {
                Some(texture) => texture.set(image, TextureOptions::LINEAR),
                None => {
                    self.overlay =
                        Some(ctx.load_texture("annotation-overlay", image, TextureOptions::LINEAR))
                }
            }
            self.overlay_key = Some(key);
        }
        self.overlay.as_ref().map(|texture| texture.id())
    }
}

pub fn show_canvas(
    ui: &mut Ui,
    document: Option<&mut Document>,
    controller: &mut CanvasController,
    renderer: &Renderer,
    tap_slop: f32,
) {
    let Some(document) = document else {
        empty_canvas(ui);
        return;
    };

    let available = ui.available_size() - Vec2::splat(CANVAS_MARGIN * 2.0);
    let available = Size::new(available.x.max(1.0), available.y.max(1.0));
    let image_size = document.image_size();
    let canvas = *document
        .canvas_size
        .get_or_insert_with(|| fit_size(image_size, available));
    let display = fit_size(canvas, available);
    let zoom = display.width / canvas.width;

    let (outer, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    let image_rect = Rect::from_center_size(outer.center(), vec2(display.width, display.height));

    let painter = ui.painter_at(outer);
    painter.rect_filled(outer, 0.0, ui.visuals().extreme_bg_color);
    let texture_id = document.ensure_texture(ui.ctx());
    painter.image(texture_id, image_rect, unit_uv(), Color32::WHITE);

    handle_pointer(ui, &response, document, controller, image_rect, zoom, tap_slop);

    let ppp = ui.ctx().pixels_per_point();
    let pixels = [
        (display.width * ppp).round().max(1.0) as usize,
        (display.height * ppp).round().max(1.0) as usize,
    ];
    if let Some(overlay) =
        document.refresh_overlay(ui.ctx(), controller, renderer, canvas, pixels)
    {
        painter.image(overlay, image_rect, unit_uv(), Color32::WHITE);
    }
    painter.rect_stroke(
        image_rect,
        0.0,
        Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 255, 255, 38)),
    );

    draw_text_editor(ui, controller, image_rect, zoom);
}

fn empty_canvas(ui: &mut Ui) {
    let (rect, _) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        "Copy an image to the clipboard or pass a file path",
        FontId::proportional(18.0),
        ui.visuals().weak_text_color(),
    );
}

fn handle_pointer(
    ui: &Ui,
    response: &egui::Response,
    document: &mut Document,
    controller: &mut CanvasController,
    image_rect: Rect,
    zoom: f32,
    tap_slop: f32,
) {
    let (pressed, down, released, position) = ui.input(|input| {
        (
            input.pointer.primary_pressed(),
            input.pointer.primary_down(),
            input.pointer.primary_released(),
            input.pointer.interact_pos(),
        )
    });
    let Some(position) = position else {
        return;
    };
    let point = screen_to_canvas(position, image_rect, zoom);

    if pressed && response.hovered() {
        document.press = Some(Press {
            origin: point,
            dragging: false,
        });
    }

    let Some(mut press) = document.press else {
        return;
    };

    if down {
        if !press.dragging && press.origin.delta(point).length() > tap_slop {
            controller.drag_start(press.origin);
            press.dragging = true;
        }
        if press.dragging {
            controller.drag_changed(point);
        }
        document.press = Some(press);
    }

    if released || !down {
        if press.dragging {
            controller.drag_end(point);
        } else {
            controller.tap(press.origin);
        }
        document.press = None;
    }
}

fn draw_text_editor(ui: &mut Ui, controller: &mut CanvasController, image_rect: Rect, zoom: f32) {
    let font_size = controller.style().font_size * zoom;
    let color = controller.style().color;
    let Some(edit) = controller.text_edit_mut() else {
        return;
    };
    let screen_pos = canvas_to_screen(edit.position, image_rect, zoom);

    let mut commit = false;
    let mut cancel = false;
    egui::Area::new(Id::new("annotation_text_edit"))
        .order(egui::Order::Foreground)
        .fixed_pos(screen_pos)
        .show(ui.ctx(), |ui| {
            egui::Frame::none()
                .fill(Color32::from_black_alpha(96))
                .stroke(Stroke::new(1.0, Color32::from_rgb(77, 141, 255)))
                .rounding(4.0)
                .inner_margin(egui::Margin::symmetric(6.0, 2.0))
                .show(ui, |ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut edit.buffer)
                            .font(FontId::proportional(font_size.max(8.0)))
                            .text_color(Color32::from_rgba_unmultiplied(
                                color[0], color[1], color[2], color[3],
                            ))
                            .hint_text("Type text")
                            .desired_width(240.0)
                            .frame(false),
                    );
                    if !response.has_focus() && !response.lost_focus() {
                        response.request_focus();
                    }
                    if ui.input(|input| input.key_pressed(Key::Escape)) {
                        cancel = true;
                    } else if response.lost_focus()
                        && ui.input(|input| input.key_pressed(Key::Enter))
                    {
                        commit = true;
                    }
                });
        });

    if cancel {
        controller.cancel_text();
    } else if commit {
        controller.commit_text();
    }
}

fn unit_uv() -> Rect {
    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0))
}

fn canvas_to_screen(point: Point, image_rect: Rect, zoom: f32) -> Pos2 {
    Pos2::new(
        image_rect.min.x + point.x * zoom,
        image_rect.min.y + point.y * zoom,
    )
}

fn screen_to_canvas(pos: Pos2, image_rect: Rect, zoom: f32) -> Point {
    Point::new(
        (pos.x - image_rect.min.x) / zoom,
        (pos.y - image_rect.min.y) / zoom,
    )
}
