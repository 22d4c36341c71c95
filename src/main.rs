mod app;
mod canvas;
mod clipboard;
mod toolbar;

use std::path::PathBuf;

use eframe::egui;
use image::RgbaImage;

use annoshot::fonts::FontBook;
use annoshot::EditorConfig;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = EditorConfig::load();
    let fonts = FontBook::load(&config.font_paths);
    let image = initial_image(std::env::args_os().nth(1).map(PathBuf::from));

    let viewport = egui::ViewportBuilder::default()
        .with_title("Annoshot")
        .with_inner_size([1080.0, 760.0])
        .with_min_inner_size([640.0, 480.0]);
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Annoshot",
        options,
        Box::new(move |_cc| Box::new(app::AnnoshotApp::new(&config, fonts, image))),
    )
}

fn initial_image(path: Option<PathBuf>) -> Option<RgbaImage> {
    let result = match path {
        Some(path) => clipboard::read_image_from_path(&path).map(Some),
        None => clipboard::read_image(),
    };
    match result {
        Ok(Some(image)) if image.width() > 0 && image.height() > 0 => {
            log::info!("editing {}x{} image", image.width(), image.height());
            Some(image)
        }
        Ok(_) => {
            log::warn!("no image to annotate");
            None
        }
        Err(err) => {
            log::error!("{err:#}");
            None
        }
    }
}
