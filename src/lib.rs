pub mod annotation;
pub mod config;
pub mod controller;
pub mod export;
pub mod fonts;
pub mod geometry;
pub mod history;
pub mod pixelate;
pub mod render;

pub use annotation::{Annotation, AnnotationId, Shape, StrokeWidth, Tool};
pub use config::EditorConfig;
pub use controller::{CanvasController, Style, TextEdit};
pub use geometry::{Point, Rect, Size, TextMetrics};
pub use render::{DrawRequest, Renderer};
