use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size, TextMetrics};

pub type AnnotationId = u64;

pub type Rgba = [u8; 4];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Tool {
    Move,
    Arrow,
    Rectangle,
    Text,
    Freehand,
    Mosaic,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Move,
        Tool::Arrow,
        Tool::Rectangle,
        Tool::Text,
        Tool::Freehand,
        Tool::Mosaic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Move => "Move",
            Self::Arrow => "Arrow",
            Self::Rectangle => "Rectangle",
            Self::Text => "Text",
            Self::Freehand => "Freehand",
            Self::Mosaic => "Mosaic",
        }
    }

    pub fn draws_by_drag(self) -> bool {
        matches!(
            self,
            Self::Arrow | Self::Rectangle | Self::Freehand | Self::Mosaic
        )
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum StrokeWidth {
    Thin,
    Medium,
    Thick,
}

impl StrokeWidth {
    pub const ALL: [StrokeWidth; 3] = [Self::Thin, Self::Medium, Self::Thick];

    pub fn px(self) -> f32 {
        match self {
            Self::Thin => 1.5,
            Self::Medium => 3.0,
            Self::Thick => 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Arrow {
    pub start: Point,
    pub end: Point,
    pub color: Rgba,
    pub line_width: f32,
}

/// Stroked rectangle. `size` keeps the drag direction and may be negative.
#[derive(Clone, Debug, PartialEq)]
pub struct Rectangle {
    pub origin: Point,
    pub size: Size,
    pub color: Rgba,
    pub line_width: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextLabel {
    pub position: Point,
    pub text: String,
    pub color: Rgba,
    pub font_size: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Freehand {
    pub points: Vec<Point>,
    pub color: Rgba,
    pub line_width: f32,
}

/// Pixelated region. `size` keeps the drag direction and may be negative.
#[derive(Clone, Debug, PartialEq)]
pub struct Mosaic {
    pub origin: Point,
    pub size: Size,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Arrow(Arrow),
    Rectangle(Rectangle),
    Text(TextLabel),
    Freehand(Freehand),
    Mosaic(Mosaic),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub shape: Shape,
}

impl Annotation {
    pub fn new(id: AnnotationId, shape: Shape) -> Self {
        Self { id, shape }
    }

    pub fn tool(&self) -> Tool {
        match &self.shape {
            Shape::Arrow(_) => Tool::Arrow,
            Shape::Rectangle(_) => Tool::Rectangle,
            Shape::Text(_) => Tool::Text,
            Shape::Freehand(_) => Tool::Freehand,
            Shape::Mosaic(_) => Tool::Mosaic,
        }
    }

    pub fn bounding_rect(&self, metrics: &dyn TextMetrics) -> Rect {
        match &self.shape {
            Shape::Arrow(arrow) => {
                let pad = (arrow.line_width * 4.0).max(10.0);
                Rect::from_min_max(arrow.start, arrow.end).expand(pad)
            }
            Shape::Rectangle(rect) => {
                Rect::from_origin_size(rect.origin, rect.size).expand(rect.line_width / 2.0)
            }
            Shape::Text(label) => Rect::from_min_size(
                label.position,
                metrics.measure(&label.text, label.font_size),
            ),
            Shape::Freehand(stroke) => Rect::enclosing(&stroke.points)
                .unwrap_or_default()
                .expand(stroke.line_width / 2.0),
            Shape::Mosaic(mosaic) => Rect::from_origin_size(mosaic.origin, mosaic.size),
        }
    }

    /// Copy with every point field shifted. Sizes are left untouched.
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        let shape = match &self.shape {
            Shape::Arrow(arrow) => Shape::Arrow(Arrow {
                start: arrow.start.translated(dx, dy),
                end: arrow.end.translated(dx, dy),
                ..arrow.clone()
            }),
            Shape::Rectangle(rect) => Shape::Rectangle(Rectangle {
                origin: rect.origin.translated(dx, dy),
                ..rect.clone()
            }),
            Shape::Text(label) => Shape::Text(TextLabel {
                position: label.position.translated(dx, dy),
                ..label.clone()
            }),
            Shape::Freehand(stroke) => Shape::Freehand(Freehand {
                points: stroke
                    .points
                    .iter()
                    .map(|p| p.translated(dx, dy))
                    .collect(),
                ..stroke.clone()
            }),
            Shape::Mosaic(mosaic) => Shape::Mosaic(Mosaic {
                origin: mosaic.origin.translated(dx, dy),
                ..mosaic.clone()
            }),
        };
        Self { id: self.id, shape }
    }
}

impl Arrow {
    /// Closed outline of the tapered arrow: a shaft that widens from the
    /// tail to the head base, then the head flaring out to the tip.
    ///
    /// Vertex order: tail, neck and head corner on the `+normal` side, the
    /// tip, then head corner, neck and tail on the `-normal` side. Empty
    /// when the arrow is 1 unit long or shorter.
    pub fn outline(&self) -> Vec<Point> {
        let dir = self.start.delta(self.end);
        let length = dir.length();
        if length <= 1.0 {
            return Vec::new();
        }
        let unit = dir * (1.0 / length);
        let normal = unit.perp();

        let lw = self.line_width;
        let tail_half = lw * 0.3;
        let neck_half = lw * 1.25;
        let head_len = (lw * 6.0).max(16.0).min(length);
        let head_half = (lw * 4.0).max(10.0);

        let base = self.end - unit * head_len;
        vec![
            self.start + normal * tail_half,
            base + normal * neck_half,
            base + normal * head_half,
            self.end,
            base - normal * head_half,
            base - normal * neck_half,
            self.start - normal * tail_half,
        ]
    }
}

impl Freehand {
    pub fn is_drawable(&self) -> bool {
        self.points.len() >= 2
    }
}
