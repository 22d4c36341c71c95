use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn delta(self, other: Point) -> Point {
        Point::new(other.x - self.x, other.y - self.y)
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length_sq(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    pub fn perp(self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn translated(self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// A width/height pair. Inside annotations it may be signed (drag went
/// left/up); see [`Rect::from_origin_size`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle, always normalized (non-negative size, min
/// corner at `min`).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn from_min_max(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_min_size(min: Point, size: Size) -> Self {
        Self::from_min_max(min, Point::new(min.x + size.width, min.y + size.height))
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::from_min_max(
            origin,
            Point::new(origin.x + size.width, origin.y + size.height),
        )
    }

    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut rect = Rect {
            min: *first,
            max: *first,
        };
        for p in rest {
            rect.min.x = rect.min.x.min(p.x);
            rect.min.y = rect.min.y.min(p.y);
            rect.max.x = rect.max.x.max(p.x);
            rect.max.y = rect.max.y.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn expand(self, amount: f32) -> Self {
        Self {
            min: Point::new(self.min.x - amount, self.min.y - amount),
            max: Point::new(self.max.x + amount, self.max.y + amount),
        }
    }

    /// Shrinks by `amount` on every side. The result may be inverted
    /// (negative size); callers check [`Rect::is_positive`].
    pub fn shrink(self, amount: f32) -> Self {
        Self {
            min: Point::new(self.min.x + amount, self.min.y + amount),
            max: Point::new(self.max.x - amount, self.max.y - amount),
        }
    }

    pub fn is_positive(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self {
            min: self.min.translated(dx, dy),
            max: self.max.translated(dx, dy),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_strict(&self, p: Point) -> bool {
        p.x > self.min.x && p.x < self.max.x && p.y > self.min.y && p.y < self.max.y
    }
}

pub trait TextMetrics {
    fn measure(&self, text: &str, font_size: f32) -> Size;
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let ab = a.delta(b);
    let ap = a.delta(p);
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return ap.length();
    }
    let t = (ap.dot(ab) / len_sq).clamp(0.0, 1.0);
    let projection = a + ab * t;
    projection.delta(p).length()
}

/// Even-odd point-in-polygon test. Degenerate polygons (< 3 vertices)
/// contain nothing.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pj.x + (p.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Largest size with the aspect ratio of `content` that fits in `available`.
/// Returns `available` unchanged when `content` has no area.
pub fn fit_size(content: Size, available: Size) -> Size {
    if content.is_empty() || available.is_empty() {
        return available;
    }
    let content_aspect = content.width / content.height;
    let view_aspect = available.width / available.height;
    if content_aspect > view_aspect {
        Size::new(available.width, available.width / content_aspect)
    } else {
        Size::new(available.height * content_aspect, available.height)
    }
}
