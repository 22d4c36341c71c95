//! The editing session: committed annotations, the gesture in flight, the
//! text being typed and the undo history.
//!
//! Every entry point is a synchronous call from the host UI. The host reads
//! the state back through the accessors and repaints when
//! [`CanvasController::revision`] changes.

use crate::annotation::{
    Annotation, AnnotationId, Arrow, Freehand, Mosaic, Rectangle, Rgba, Shape, TextLabel, Tool,
};
use crate::config::EditorConfig;
use crate::geometry::{Point, Size, TextMetrics};
use crate::hit_test::{hit_test, DEFAULT_TOLERANCE};
use crate::history::UndoHistory;

pub const MIN_FONT_SIZE: f32 = 8.0;
pub const MAX_FONT_SIZE: f32 = 96.0;
pub const MIN_LINE_WIDTH: f32 = 0.5;
pub const MAX_LINE_WIDTH: f32 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub color: Rgba,
    pub line_width: f32,
    pub font_size: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: [255, 59, 48, 255],
            line_width: 3.0,
            font_size: 20.0,
        }
    }
}

impl Style {
    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH);
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextEdit {
    pub position: Point,
    pub buffer: String,
}

#[derive(Clone, Debug)]
struct MoveState {
    index: usize,
    original: Annotation,
    anchor: Point,
}

pub struct CanvasController {
    annotations: Vec<Annotation>,
    live: Option<Annotation>,
    moving: Option<MoveState>,
    text_edit: Option<TextEdit>,
    history: UndoHistory<Vec<Annotation>>,
    tool: Tool,
    style: Style,
    tolerance: f32,
    next_id: AnnotationId,
    revision: u64,
    metrics: Box<dyn TextMetrics>,
}

impl CanvasController {
    pub fn new(style: Style, metrics: Box<dyn TextMetrics>) -> Self {
        Self {
            annotations: Vec::new(),
            live: None,
            moving: None,
            text_edit: None,
            history: UndoHistory::new(),
            tool: Tool::Arrow,
            style,
            tolerance: DEFAULT_TOLERANCE,
            next_id: 1,
            revision: 0,
            metrics,
        }
    }

    pub fn from_config(config: &EditorConfig, metrics: Box<dyn TextMetrics>) -> Self {
        let mut controller = Self::new(config.style(), metrics);
        controller.tolerance = config.hit_tolerance.max(0.0);
        controller
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn live_annotation(&self) -> Option<&Annotation> {
        self.live.as_ref()
    }

    pub fn selected_id(&self) -> Option<AnnotationId> {
        let moving = self.moving.as_ref()?;
        self.annotations.get(moving.index).map(|item| item.id)
    }

    pub fn text_edit(&self) -> Option<&TextEdit> {
        self.text_edit.as_ref()
    }

    pub fn text_edit_mut(&mut self) -> Option<&mut TextEdit> {
        self.text_edit.as_mut()
    }

    pub fn is_editing_text(&self) -> bool {
        self.text_edit.is_some()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn is_dragging(&self) -> bool {
        self.live.is_some() || self.moving.is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn metrics(&self) -> &dyn TextMetrics {
        self.metrics.as_ref()
    }

    /// Switching tools commits any text being typed.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.text_edit.is_some() {
            self.commit_text();
        }
        if self.tool != tool {
            self.tool = tool;
            self.touch();
        }
    }

    pub fn set_color(&mut self, color: Rgba) {
        self.style = self.style.with_color(color);
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.style = self.style.with_line_width(width);
    }

    pub fn set_font_size(&mut self, size: f32) {
        self.style = self.style.with_font_size(size);
    }

    pub fn drag_start(&mut self, point: Point) {
        match self.tool {
            Tool::Move => {
                let Some(index) =
                    hit_test(point, &self.annotations, self.tolerance, self.metrics.as_ref())
                else {
                    return;
                };
                self.push_history();
                self.moving = Some(MoveState {
                    index,
                    original: self.annotations[index].clone(),
                    anchor: point,
                });
                self.touch();
            }
            tool if tool.draws_by_drag() => {
                let id = self.allocate_id();
                self.live = Some(Annotation::new(id, self.start_shape(tool, point)));
                self.touch();
            }
            _ => {}
        }
    }

    pub fn drag_changed(&mut self, point: Point) {
        if let Some(moving) = &self.moving {
            let offset = moving.anchor.delta(point);
            let moved = moving.original.translated(offset.x, offset.y);
            if let Some(slot) = self.annotations.get_mut(moving.index) {
                *slot = moved;
            }
            self.touch();
            return;
        }

        let Some(live) = self.live.as_mut() else {
            return;
        };
        match &mut live.shape {
            Shape::Arrow(arrow) => arrow.end = point,
            Shape::Rectangle(rect) => rect.size = drag_size(rect.origin, point),
            Shape::Mosaic(mosaic) => mosaic.size = drag_size(mosaic.origin, point),
            Shape::Freehand(stroke) => stroke.points.push(point),
            Shape::Text(_) => {}
        }
        self.touch();
    }

    pub fn drag_end(&mut self, point: Point) {
        self.drag_changed(point);

        if let Some(moving) = self.moving.take() {
            log::debug!("moved annotation at index {}", moving.index);
            self.touch();
            return;
        }

        if let Some(annotation) = self.live.take() {
            log::debug!(
                "committed {:?} annotation {}",
                annotation.tool(),
                annotation.id
            );
            self.push_history();
            self.annotations.push(annotation);
            self.touch();
        }
    }

    /// A press-release without travel. Only the text tool reacts: it commits
    /// any pending text and starts a new entry at `point`.
    pub fn tap(&mut self, point: Point) {
        if self.tool != Tool::Text {
            return;
        }
        if self.text_edit.is_some() {
            self.commit_text();
        }
        self.text_edit = Some(TextEdit {
            position: point,
            buffer: String::new(),
        });
        self.touch();
    }

    /// Ends text entry, appending a text annotation when anything was typed.
    pub fn commit_text(&mut self) {
        let Some(edit) = self.text_edit.take() else {
            return;
        };
        if !edit.buffer.is_empty() {
            self.push_history();
            let id = self.allocate_id();
            self.annotations.push(Annotation::new(
                id,
                Shape::Text(TextLabel {
                    position: edit.position,
                    text: edit.buffer,
                    color: self.style.color,
                    font_size: self.style.font_size,
                }),
            ));
            log::debug!("committed text annotation {id}");
        }
        self.touch();
    }

    pub fn cancel_text(&mut self) {
        if self.text_edit.take().is_some() {
            self.touch();
        }
    }

    /// Restores the list saved before the last mutation. Any gesture or text
    /// entry in flight is abandoned, even when there is nothing to undo.
    pub fn undo(&mut self) {
        if let Some(snapshot) = self.history.undo() {
            log::debug!(
                "undo: {} -> {} annotations",
                self.annotations.len(),
                snapshot.len()
            );
            self.annotations = snapshot;
        }
        self.reset_transient();
    }

    pub fn clear(&mut self) {
        if self.annotations.is_empty() {
            return;
        }
        self.push_history();
        self.annotations.clear();
        self.reset_transient();
        log::debug!("cleared annotations");
    }

    fn start_shape(&self, tool: Tool, point: Point) -> Shape {
        let Style {
            color, line_width, ..
        } = self.style;
        match tool {
            Tool::Rectangle => Shape::Rectangle(Rectangle {
                origin: point,
                size: Size::ZERO,
                color,
                line_width,
            }),
            Tool::Freehand => Shape::Freehand(Freehand {
                points: vec![point],
                color,
                line_width,
            }),
            Tool::Mosaic => Shape::Mosaic(Mosaic {
                origin: point,
                size: Size::ZERO,
            }),
            Tool::Arrow | Tool::Move | Tool::Text => Shape::Arrow(Arrow {
                start: point,
                end: point,
                color,
                line_width,
            }),
        }
    }

    fn push_history(&mut self) {
        self.history.push_snapshot(self.annotations.clone());
    }

    fn reset_transient(&mut self) {
        self.live = None;
        self.moving = None;
        self.text_edit = None;
        self.touch();
    }

    fn allocate_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

fn drag_size(origin: Point, point: Point) -> Size {
    let delta = origin.delta(point);
    Size::new(delta.x, delta.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::tests::FixedMetrics;

    fn controller() -> CanvasController {
        CanvasController::new(Style::default(), Box::new(FixedMetrics))
    }

    fn drag(controller: &mut CanvasController, from: Point, to: Point) {
        controller.drag_start(from);
        controller.drag_changed(Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0));
        controller.drag_end(to);
    }

    #[test]
    fn undo_walks_back_through_commits() {
        let mut c = controller();
        c.set_tool(Tool::Arrow);
        drag(&mut c, Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        c.set_tool(Tool::Rectangle);
        c.set_line_width(2.0);
        drag(&mut c, Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert_eq!(c.annotations().len(), 2);

        c.undo();
        assert_eq!(c.annotations().len(), 1);
        assert!(matches!(c.annotations()[0].shape, Shape::Arrow(_)));

        c.undo();
        assert!(c.annotations().is_empty());

        c.undo();
        assert!(c.annotations().is_empty());
        assert!(!c.can_undo());
    }

    #[test]
    fn commit_then_undo_restores_list() {
        let mut c = controller();
        c.set_tool(Tool::Mosaic);
        drag(&mut c, Point::new(5.0, 5.0), Point::new(30.0, 40.0));
        c.set_tool(Tool::Freehand);
        drag(&mut c, Point::new(1.0, 1.0), Point::new(9.0, 9.0));
        let before = c.annotations().to_vec();

        c.set_tool(Tool::Arrow);
        drag(&mut c, Point::new(50.0, 50.0), Point::new(80.0, 60.0));
        assert_eq!(c.annotations().len(), 3);

        c.undo();
        assert_eq!(c.annotations(), before.as_slice());
    }

    #[test]
    fn drawing_tools_shape_the_live_annotation() {
        let mut c = controller();
        c.set_tool(Tool::Rectangle);
        c.drag_start(Point::new(40.0, 40.0));
        c.drag_changed(Point::new(10.0, 20.0));
        match &c.live_annotation().expect("live").shape {
            Shape::Rectangle(rect) => {
                assert_eq!(rect.origin, Point::new(40.0, 40.0));
                assert_eq!(rect.size, Size::new(-30.0, -20.0));
            }
            other => panic!("unexpected shape {other:?}"),
        }
        assert!(c.is_dragging());
        assert!(c.annotations().is_empty());

        c.drag_end(Point::new(12.0, 22.0));
        assert!(c.live_annotation().is_none());
        assert_eq!(c.annotations().len(), 1);
        assert!(c.can_undo());
    }

    #[test]
    fn freehand_collects_every_point() {
        let mut c = controller();
        c.set_tool(Tool::Freehand);
        c.drag_start(Point::new(0.0, 0.0));
        c.drag_changed(Point::new(1.0, 1.0));
        c.drag_changed(Point::new(2.0, 1.0));
        c.drag_end(Point::new(3.0, 0.0));
        match &c.annotations()[0].shape {
            Shape::Freehand(stroke) => assert_eq!(stroke.points.len(), 4),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn move_translates_from_original_and_undoes() {
        let mut c = controller();
        c.set_tool(Tool::Mosaic);
        drag(&mut c, Point::new(10.0, 10.0), Point::new(50.0, 50.0));
        let original = c.annotations()[0].clone();

        c.set_tool(Tool::Move);
        c.drag_start(Point::new(20.0, 20.0));
        assert_eq!(c.selected_id(), Some(original.id));
        c.drag_changed(Point::new(25.0, 20.0));
        c.drag_changed(Point::new(30.0, 25.0));
        c.drag_end(Point::new(30.0, 30.0));
        assert_eq!(c.selected_id(), None);

        assert_eq!(c.annotations()[0], original.translated(10.0, 10.0));
        assert_eq!(c.annotations().len(), 1);

        c.undo();
        assert_eq!(c.annotations()[0], original);
    }

    #[test]
    fn move_on_empty_space_does_nothing() {
        let mut c = controller();
        c.set_tool(Tool::Mosaic);
        drag(&mut c, Point::new(10.0, 10.0), Point::new(20.0, 20.0));
        c.set_tool(Tool::Move);
        let revision = c.revision();

        c.drag_start(Point::new(200.0, 200.0));
        c.drag_changed(Point::new(210.0, 200.0));
        c.drag_end(Point::new(220.0, 200.0));

        assert_eq!(c.revision(), revision);
        c.undo();
        assert!(c.annotations().is_empty(), "only the mosaic commit was recorded");
    }

    #[test]
    fn text_tool_commits_on_tap_and_tool_switch() {
        let mut c = controller();
        c.set_tool(Tool::Text);
        c.drag_start(Point::new(5.0, 5.0));
        assert!(c.live_annotation().is_none());

        c.tap(Point::new(10.0, 10.0));
        c.text_edit_mut().expect("editing").buffer.push_str("first");
        c.tap(Point::new(40.0, 40.0));
        assert_eq!(c.annotations().len(), 1);
        assert_eq!(c.text_edit().map(|edit| edit.position), Some(Point::new(40.0, 40.0)));

        c.text_edit_mut().expect("editing").buffer.push_str("second");
        c.set_tool(Tool::Arrow);
        assert!(!c.is_editing_text());
        assert_eq!(c.annotations().len(), 2);
        match &c.annotations()[1].shape {
            Shape::Text(label) => {
                assert_eq!(label.text, "second");
                assert_eq!(label.position, Point::new(40.0, 40.0));
                assert_eq!(label.font_size, 20.0);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn cancel_text_discards_without_history() {
        let mut c = controller();
        c.set_tool(Tool::Text);
        c.tap(Point::new(12.0, 12.0));
        c.text_edit_mut().expect("editing").buffer.push_str("draft");

        c.cancel_text();

        assert!(c.annotations().is_empty());
        assert!(!c.can_undo());
        assert!(!c.is_editing_text());

        // a later tap starts fresh instead of committing the discarded draft
        c.tap(Point::new(30.0, 30.0));
        assert_eq!(c.text_edit().map(|edit| edit.buffer.as_str()), Some(""));
        assert!(c.annotations().is_empty());
    }

    #[test]
    fn empty_text_commit_records_nothing() {
        let mut c = controller();
        c.set_tool(Tool::Text);
        c.tap(Point::new(10.0, 10.0));
        c.commit_text();
        assert!(!c.is_editing_text());
        assert!(c.annotations().is_empty());
        assert!(!c.can_undo());
    }

    #[test]
    fn tap_is_ignored_by_other_tools() {
        let mut c = controller();
        c.set_tool(Tool::Rectangle);
        c.tap(Point::new(10.0, 10.0));
        assert!(!c.is_editing_text());
    }

    #[test]
    fn undo_cancels_gestures_in_flight() {
        let mut c = controller();
        c.set_tool(Tool::Arrow);
        c.drag_start(Point::new(0.0, 0.0));
        c.drag_changed(Point::new(30.0, 0.0));
        c.undo();
        assert!(c.live_annotation().is_none());
        c.drag_end(Point::new(40.0, 0.0));
        assert!(c.annotations().is_empty());

        c.set_tool(Tool::Text);
        c.tap(Point::new(1.0, 1.0));
        c.undo();
        assert!(!c.is_editing_text());
    }

    #[test]
    fn clear_is_undoable_and_noop_when_empty() {
        let mut c = controller();
        c.clear();
        assert!(!c.can_undo());

        c.set_tool(Tool::Arrow);
        drag(&mut c, Point::new(0.0, 0.0), Point::new(20.0, 20.0));
        drag(&mut c, Point::new(0.0, 20.0), Point::new(20.0, 0.0));
        c.clear();
        assert!(c.is_empty());

        c.undo();
        assert_eq!(c.annotations().len(), 2);
    }

    #[test]
    fn style_changes_only_affect_new_annotations() {
        let mut c = controller();
        c.set_tool(Tool::Arrow);
        c.set_color([0, 0, 255, 255]);
        drag(&mut c, Point::new(0.0, 0.0), Point::new(20.0, 0.0));
        c.set_color([0, 255, 0, 255]);
        c.set_line_width(8.0);
        drag(&mut c, Point::new(0.0, 10.0), Point::new(20.0, 10.0));

        let colors: Vec<(Rgba, f32)> = c
            .annotations()
            .iter()
            .map(|item| match &item.shape {
                Shape::Arrow(arrow) => (arrow.color, arrow.line_width),
                other => panic!("unexpected shape {other:?}"),
            })
            .collect();
        assert_eq!(colors, vec![([0, 0, 255, 255], 3.0), ([0, 255, 0, 255], 8.0)]);
    }

    #[test]
    fn ids_stay_unique_across_undo() {
        let mut c = controller();
        c.set_tool(Tool::Arrow);
        drag(&mut c, Point::new(0.0, 0.0), Point::new(20.0, 0.0));
        drag(&mut c, Point::new(0.0, 5.0), Point::new(20.0, 5.0));
        c.undo();
        drag(&mut c, Point::new(0.0, 9.0), Point::new(20.0, 9.0));
        let ids: Vec<AnnotationId> = c.annotations().iter().map(|item| item.id).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn style_setters_clamp() {
        let mut c = controller();
        c.set_font_size(500.0);
        c.set_line_width(0.0);
        assert_eq!(c.style().font_size, MAX_FONT_SIZE);
        assert_eq!(c.style().line_width, MIN_LINE_WIDTH);
    }
}
