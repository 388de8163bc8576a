//! Pixel-space geometry shared by the editors and the 3D preview.

use crate::{Point, WALL_HEIGHT, WALL_WIDTH};

/// Size of the wall in preview world units. Keeps the 8:5 aspect of the canvas.
pub const WORLD_WIDTH: f64 = 8.0;
pub const WORLD_HEIGHT: f64 = 5.0;

pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

pub fn hit_circle(point: Point, center: Point, radius: f64) -> bool {
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    dx * dx + dy * dy <= radius * radius
}

/// Standard quad interpolation. `(u, v) = (0, 0)` is `tl`, `(1, 1)` is `br`.
///
/// This is not a homography: straight lines inside a keystoned quad bend slightly.
/// Stored calibrations assume this exact formula.
pub fn bilinear(u: f64, v: f64, tl: Point, tr: Point, br: Point, bl: Point) -> Point {
    let w_tl = (1.0 - u) * (1.0 - v);
    let w_tr = u * (1.0 - v);
    let w_br = u * v;
    let w_bl = (1.0 - u) * v;
    Point {
        x: w_tl * tl.x + w_tr * tr.x + w_br * br.x + w_bl * bl.x,
        y: w_tl * tl.y + w_tr * tr.y + w_br * br.y + w_bl * bl.y,
    }
}

/// Maps wall pixels to preview world units. Y is flipped; the wall centre is the origin.
pub fn px_to_world(point: Point) -> Point {
    Point {
        x: (point.x / WALL_WIDTH - 0.5) * WORLD_WIDTH,
        y: (0.5 - point.y / WALL_HEIGHT) * WORLD_HEIGHT,
    }
}

/// Index of the first point within `radius` of `target`, in iteration order.
///
/// Ties go to the earliest point, not the closest one.
pub fn first_hit(points: &[Point], target: Point, radius: f64) -> Option<usize> {
    points
        .iter()
        .position(|point| distance(target, *point) <= radius)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const TL: Point = Point::new(12.0, 30.0);
    const TR: Point = Point::new(780.0, 4.0);
    const BR: Point = Point::new(760.0, 490.0);
    const BL: Point = Point::new(25.0, 470.0);

    #[test]
    fn bilinear_is_exact_at_corners() {
        assert_eq!(bilinear(0.0, 0.0, TL, TR, BR, BL), TL);
        assert_eq!(bilinear(1.0, 0.0, TL, TR, BR, BL), TR);
        assert_eq!(bilinear(1.0, 1.0, TL, TR, BR, BL), BR);
        assert_eq!(bilinear(0.0, 1.0, TL, TR, BR, BL), BL);
    }

    #[test]
    fn bilinear_centre_is_corner_average() {
        let centre = bilinear(0.5, 0.5, TL, TR, BR, BL);
        assert_relative_eq!(centre.x, (TL.x + TR.x + BR.x + BL.x) / 4.0);
        assert_relative_eq!(centre.y, (TL.y + TR.y + BR.y + BL.y) / 4.0);
    }

    #[test]
    fn bilinear_still_evaluates_crossed_quads() {
        let crossed = bilinear(0.5, 0.5, TL, BR, TR, BL);
        assert!(crossed.is_finite());
    }

    #[test]
    fn px_to_world_flips_y_around_the_centre() {
        let origin = px_to_world(Point::new(400.0, 250.0));
        assert_relative_eq!(origin.x, 0.0);
        assert_relative_eq!(origin.y, 0.0);

        let top_left = px_to_world(Point::new(0.0, 0.0));
        assert_relative_eq!(top_left.x, -4.0);
        assert_relative_eq!(top_left.y, 2.5);

        let bottom_right = px_to_world(Point::new(800.0, 500.0));
        assert_relative_eq!(bottom_right.x, 4.0);
        assert_relative_eq!(bottom_right.y, -2.5);
    }

    fn world_to_px(point: Point) -> Point {
        Point {
            x: (point.x / WORLD_WIDTH + 0.5) * WALL_WIDTH,
            y: (0.5 - point.y / WORLD_HEIGHT) * WALL_HEIGHT,
        }
    }

    #[test]
    fn px_to_world_is_invertible() {
        let point = Point::new(123.0, 456.0);
        let back = world_to_px(px_to_world(point));
        assert_relative_eq!(back.x, point.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, point.y, epsilon = 1e-9);
    }

    #[test]
    fn first_hit_prefers_insertion_order_over_distance() {
        let points = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        // Closer to the second point, but the first is still within radius.
        assert_eq!(first_hit(&points, Point::new(8.0, 0.0), 12.0), Some(0));
        assert_eq!(first_hit(&points, Point::new(20.0, 0.0), 12.0), Some(1));
        assert_eq!(first_hit(&points, Point::new(50.0, 50.0), 12.0), None);
    }

    #[test]
    fn distance_is_euclidean() {
        assert_relative_eq!(distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)), 5.0);
        assert!(hit_circle(Point::new(3.0, 4.0), Point::new(0.0, 0.0), 5.0));
        assert!(!hit_circle(Point::new(3.0, 4.1), Point::new(0.0, 0.0), 5.0));
    }
}
