//! Polygon draw/edit state machine for the 2D wall canvas.
//!
//! Every transition consumes the editor and returns the next one, so the
//! caller always holds exactly one consistent state.

use wallmask_shared::geometry::{distance, first_hit};
use wallmask_shared::{Point, MIN_POLYGON_POINTS};

/// A click this close to the first vertex closes the polygon.
pub const CLOSE_RADIUS: f64 = 10.0;
/// Grab radius for vertices in edit mode.
pub const DRAG_RADIUS: f64 = 12.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditorMode {
    #[default]
    Draw,
    Edit,
}

impl EditorMode {
    pub fn toggled(self) -> Self {
        match self {
            EditorMode::Draw => EditorMode::Edit,
            EditorMode::Edit => EditorMode::Draw,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EditorMode::Draw => "DRAW",
            EditorMode::Edit => "EDIT",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditorEvent {
    Click(Point),
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    PointerLeave,
    ToggleMode,
    SetMode(EditorMode),
    Reset,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonEditor {
    points: Vec<Point>,
    closed: bool,
    mode: EditorMode,
    drag: Option<usize>,
}

impl PolygonEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the editor with a saved outline: closed and in edit mode.
    pub fn load(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: true,
            mode: EditorMode::Edit,
            drag: None,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn dragging(&self) -> Option<usize> {
        self.drag
    }

    pub fn has_polygon(&self) -> bool {
        self.closed && self.points.len() >= MIN_POLYGON_POINTS
    }

    fn can_close(&self) -> bool {
        !self.closed && self.points.len() >= MIN_POLYGON_POINTS
    }

    pub fn apply(self, event: EditorEvent) -> Self {
        match event {
            EditorEvent::Click(point) => self.click(point),
            EditorEvent::PointerDown(point) => self.pointer_down(point),
            EditorEvent::PointerMove(point) => self.pointer_move(point),
            EditorEvent::PointerUp | EditorEvent::PointerLeave => Self { drag: None, ..self },
            EditorEvent::ToggleMode => {
                let mode = self.mode.toggled();
                self.with_mode(mode)
            }
            EditorEvent::SetMode(mode) => self.with_mode(mode),
            EditorEvent::Reset => Self::new(),
        }
    }

    fn with_mode(self, mode: EditorMode) -> Self {
        Self {
            mode,
            drag: None,
            ..self
        }
    }

    // A closed polygon in draw mode swallows clicks until the mode changes or a reset.
    fn click(mut self, point: Point) -> Self {
        if self.mode != EditorMode::Draw || self.closed {
            return self;
        }
        if self.can_close() && distance(point, self.points[0]) <= CLOSE_RADIUS {
            self.closed = true;
            self.mode = EditorMode::Edit;
            return self;
        }
        self.points.push(point);
        self
    }

    fn pointer_down(self, point: Point) -> Self {
        if self.mode != EditorMode::Edit {
            return self;
        }
        match first_hit(&self.points, point, DRAG_RADIUS) {
            Some(index) => Self {
                drag: Some(index),
                ..self
            },
            None => self,
        }
    }

    fn pointer_move(mut self, point: Point) -> Self {
        if self.mode != EditorMode::Edit {
            return self;
        }
        if let Some(slot) = self.drag.and_then(|index| self.points.get_mut(index)) {
            *slot = point;
        }
        self
    }

    /// Instruction line drawn in the corner of the editor canvas.
    pub fn hint(&self) -> &'static str {
        match self.mode {
            EditorMode::Draw if self.can_close() => {
                "DRAW: click to add points. Click the green point to close."
            }
            EditorMode::Draw if self.closed => {
                "DRAW: polygon is closed. Switch to EDIT or reset (right click)."
            }
            EditorMode::Draw => "DRAW: click to add points (min 3).",
            EditorMode::Edit => "EDIT: grab and drag a point. Right click resets.",
        }
    }
}
