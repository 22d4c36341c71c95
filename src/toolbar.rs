use egui::{self, vec2, Color32, Layout, RichText, Rounding, Stroke, Ui};

use annoshot::annotation::{Rgba, StrokeWidth, Tool};
use annoshot::controller::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use annoshot::CanvasController;

const PALETTE: [Rgba; 8] = [
    [0xFF, 0x3B, 0x30, 0xFF],
    [0xFF, 0x95, 0x00, 0xFF],
    [0xFF, 0xCC, 0x00, 0xFF],
    [0x34, 0xC7, 0x59, 0xFF],
    [0x00, 0x7A, 0xFF, 0xFF],
    [0xAF, 0x52, 0xDE, 0xFF],
    [0xFF, 0xFF, 0xFF, 0xFF],
    [0x1C, 0x1C, 0x1E, 0xFF],
];

const ACCENT: Color32 = Color32::from_rgb(77, 141, 255);

#[derive(Clone, Copy, Debug, Default)]
pub struct ToolbarOutput {
    pub undo: bool,
    pub clear: bool,
    pub copy: bool,
    pub save: bool,
}

pub fn show_toolbar(ui: &mut Ui, controller: &mut CanvasController, has_image: bool) -> ToolbarOutput {
    let mut output = ToolbarOutput::default();

    ui.horizontal_centered(|ui| {
        ui.spacing_mut().item_spacing = vec2(6.0, 0.0);

        for tool in Tool::ALL {
            let hint = tool_hint(tool);
            if chip(ui, tool.label(), controller.tool() == tool)
                .on_hover_text(hint)
                .clicked()
            {
                controller.set_tool(tool);
            }
        }

        ui.separator();
        for color in PALETTE {
            if color_chip(ui, color, controller.style().color == color)
                .on_hover_text("Choose color")
                .clicked()
            {
                controller.set_color(color);
            }
        }

        ui.separator();
        ui.label(RichText::new("Line").weak().size(12.0));
        let current = selected_preset(controller.style().line_width);
        for (preset, label) in StrokeWidth::ALL.into_iter().zip(["S", "M", "L"]) {
            if chip(ui, label, current == Some(preset))
                .on_hover_text(format!("Line thickness {} px", preset.px()))
                .clicked()
            {
                controller.set_line_width(preset.px());
            }
        }

        if controller.tool() == Tool::Text || controller.is_editing_text() {
            ui.separator();
            let mut size = controller.style().font_size;
            let changed = ui
                .add(
                    egui::DragValue::new(&mut size)
                        .clamp_range(MIN_FONT_SIZE..=MAX_FONT_SIZE)
                        .speed(0.5)
                        .suffix(" pt"),
                )
                .on_hover_text("Font size")
                .changed();
            if changed {
                controller.set_font_size(size);
            }
        }

        ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
            output.save = ui
                .add_enabled(has_image, egui::Button::new("Save"))
                .on_hover_text("Save as PNG (Cmd+S)")
                .clicked();
            output.copy = ui
                .add_enabled(has_image, egui::Button::new("Copy"))
                .on_hover_text("Copy to clipboard (Cmd+Shift+C)")
                .clicked();
            output.clear = ui
                .add_enabled(!controller.is_empty(), egui::Button::new("Clear"))
                .clicked();
            output.undo = ui
                .add_enabled(controller.can_undo(), egui::Button::new("Undo"))
                .on_hover_text("Undo (Cmd+Z)")
                .clicked();
        });
    });

    output
}

fn tool_hint(tool: Tool) -> &'static str {
    match tool {
        Tool::Move => "Move annotations",
        Tool::Arrow => "Draw an arrow",
        Tool::Rectangle => "Draw a rectangle",
        Tool::Text => "Click to place text, Enter to commit",
        Tool::Freehand => "Draw freehand",
        Tool::Mosaic => "Pixelate a region",
    }
}

fn selected_preset(width: f32) -> Option<StrokeWidth> {
    StrokeWidth::ALL
        .into_iter()
        .find(|preset| (preset.px() - width).abs() < f32::EPSILON)
}

fn chip(ui: &mut Ui, label: &str, selected: bool) -> egui::Response {
    let mut button = egui::Button::new(RichText::new(label).size(13.0))
        .min_size(vec2(28.0, 26.0))
        .rounding(Rounding::same(7.0));
    if selected {
        button = button
            .fill(ACCENT.linear_multiply(0.35))
            .stroke(Stroke::new(1.0, ACCENT));
    }
    ui.add(button)
}

fn color_chip(ui: &mut Ui, color: Rgba, selected: bool) -> egui::Response {
    let fill = Color32::from_rgba_unmultiplied(color[0], color[1], color[2], color[3]);
    let stroke = if selected {
        Stroke::new(2.0, ACCENT)
    } else {
        Stroke::new(1.0, Color32::from_white_alpha(40))
    };
    ui.add(
        egui::Button::new("")
            .min_size(vec2(22.0, 22.0))
            .fill(fill)
            .stroke(stroke)
            .rounding(Rounding::same(11.0)),
    )
}
