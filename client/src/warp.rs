//! Corner-drag state machine for the keystone quad.

use wallmask_shared::geometry::hit_circle;
use wallmask_shared::{Corner, Point, WarpQuad};

/// Grab radius around each corner handle.
pub const CORNER_RADIUS: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WarpEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WarpEditor {
    quad: WarpQuad,
    drag: Option<Corner>,
}

impl WarpEditor {
    pub fn new(quad: WarpQuad) -> Self {
        Self { quad, drag: None }
    }

    pub fn quad(&self) -> WarpQuad {
        self.quad
    }

    pub fn dragging(&self) -> Option<Corner> {
        self.drag
    }

    /// First corner in `tl, tr, br, bl` order within the grab radius.
    pub fn hit_test(&self, point: Point) -> Option<Corner> {
        Corner::ALL
            .into_iter()
            .find(|corner| hit_circle(point, self.quad.corner(*corner), CORNER_RADIUS))
    }

    pub fn apply(self, event: WarpEvent) -> Self {
        match event {
            WarpEvent::PointerDown(point) => match self.hit_test(point) {
                Some(corner) => Self {
                    drag: Some(corner),
                    ..self
                },
                None => self,
            },
            WarpEvent::PointerMove(point) => match self.drag {
                Some(corner) => Self {
                    quad: self.quad.with_corner(corner, point),
                    ..self
                },
                None => self,
            },
            WarpEvent::PointerUp => Self { drag: None, ..self },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallmask_shared::{WALL_HEIGHT, WALL_WIDTH};

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn grabs_the_nearest_listed_corner() {
        let editor = WarpEditor::default().apply(WarpEvent::PointerDown(p(795.0, 4.0)));
        assert_eq!(editor.dragging(), Some(Corner::Tr));
    }

    #[test]
    fn misses_leave_the_drag_empty() {
        let editor = WarpEditor::default().apply(WarpEvent::PointerDown(p(400.0, 250.0)));
        assert_eq!(editor.dragging(), None);
    }

    #[test]
    fn coincident_corners_resolve_in_declaration_order() {
        let quad = WarpQuad::full_wall()
            .with_corner(Corner::Br, p(0.0, 0.0))
            .with_corner(Corner::Bl, p(0.0, 0.0));
        let editor = WarpEditor::new(quad).apply(WarpEvent::PointerDown(p(1.0, 1.0)));
        assert_eq!(editor.dragging(), Some(Corner::Tl));
    }

    #[test]
    fn moves_are_clamped_and_touch_one_corner() {
        let editor = WarpEditor::default()
            .apply(WarpEvent::PointerDown(p(2.0, 498.0)))
            .apply(WarpEvent::PointerMove(p(-40.0, 620.0)));
        let quad = editor.quad();
        assert_eq!(quad.bl, p(0.0, WALL_HEIGHT));
        assert_eq!(quad.tl, p(0.0, 0.0));
        assert_eq!(quad.tr, p(WALL_WIDTH, 0.0));
        assert_eq!(quad.br, p(WALL_WIDTH, WALL_HEIGHT));

        let editor = editor.apply(WarpEvent::PointerMove(p(120.0, 430.0)));
        assert_eq!(editor.quad().bl, p(120.0, 430.0));
    }

    #[test]
    fn release_stops_tracking() {
        let editor = WarpEditor::default()
            .apply(WarpEvent::PointerDown(p(0.0, 0.0)))
            .apply(WarpEvent::PointerUp)
            .apply(WarpEvent::PointerMove(p(300.0, 300.0)));
        assert_eq!(editor.quad(), WarpQuad::full_wall());
        assert_eq!(editor.dragging(), None);
    }
}
