//! Pure 3D preview model: the warped projection surface, the window overlay and
//! the calibration aids, plus the orbit camera that puts them on screen.

use glam::{DMat3, DMat4, DVec3};

use wallmask_shared::geometry::px_to_world;
use wallmask_shared::{Point, WarpQuad, MIN_POLYGON_POINTS};

pub const SURFACE_SEGMENTS_X: usize = 40;
pub const SURFACE_SEGMENTS_Y: usize = 25;

pub const GRID_Z: f64 = 0.005;
pub const OUTLINE_Z: f64 = 0.01;
pub const OVERLAY_Z: f64 = 0.02;

pub const GRID_EXTENT: f64 = 10.0;
pub const GRID_CELL: f64 = 0.5;
pub const GRID_SECTION: f64 = 2.5;

pub const OVERLAY_COLOR: &str = "#fafafa";
pub const OUTLINE_COLOR: &str = "red";

pub const PREVIEW_WIDTH: f64 = 900.0;
pub const PREVIEW_HEIGHT: f64 = 600.0;

fn on_plane(point: Point, z: f64) -> DVec3 {
    DVec3::new(point.x, point.y, z)
}

/// Subdivided wall plane, row-major from the top edge.
///
/// `uvs` are texture coordinates with `v` measured from the top of the image, so
/// the sample at `(u, v)` shows the image pixel `(u * width, v * height)`.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceMesh {
    pub columns: usize,
    pub rows: usize,
    pub positions: Vec<DVec3>,
    pub uvs: Vec<(f64, f64)>,
    pub normals: Vec<DVec3>,
    pub indices: Vec<[u32; 3]>,
}

impl SurfaceMesh {
    pub fn vertex_index(&self, column: usize, row: usize) -> usize {
        row * (self.columns + 1) + column
    }
}

/// The window cut-out drawn over the projection.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowOverlay {
    pub outline: Vec<DVec3>,
    /// See-through factor: how much of the window hides the projection.
    pub alpha: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLine {
    pub from: DVec3,
    pub to: DVec3,
    pub section: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub surface: SurfaceMesh,
    pub overlay: Option<WindowOverlay>,
    /// Closed loop `tl, tr, br, bl, tl`.
    pub warp_outline: [DVec3; 5],
    pub grid: Vec<GridLine>,
}

/// Overlay alpha for a mask opacity. A fully opaque mask lets the projection through.
pub fn see_through_alpha(opacity: f64) -> f64 {
    (1.0 - opacity).clamp(0.0, 1.0)
}

pub fn build_scene(points: &[Point], opacity: f64, warp: &WarpQuad, show_grid: bool) -> Scene {
    let world_warp = warp.to_world();
    let corners = world_warp
        .corners()
        .map(|corner| on_plane(corner, OUTLINE_Z));
    Scene {
        surface: build_surface(&world_warp, SURFACE_SEGMENTS_X, SURFACE_SEGMENTS_Y),
        overlay: build_overlay(points, opacity),
        warp_outline: [corners[0], corners[1], corners[2], corners[3], corners[0]],
        grid: if show_grid { build_grid() } else { Vec::new() },
    }
}

pub fn build_surface(world_warp: &WarpQuad, columns: usize, rows: usize) -> SurfaceMesh {
    let columns = columns.max(1);
    let rows = rows.max(1);
    let vertex_count = (columns + 1) * (rows + 1);
    let mut positions = Vec::with_capacity(vertex_count);
    let mut uvs = Vec::with_capacity(vertex_count);
    for row in 0..=rows {
        let v = row as f64 / rows as f64;
        for column in 0..=columns {
            let u = column as f64 / columns as f64;
            positions.push(on_plane(world_warp.sample(u, v), 0.0));
            uvs.push((u, v));
        }
    }

    let stride = (columns + 1) as u32;
    let mut indices = Vec::with_capacity(columns * rows * 2);
    for row in 0..rows as u32 {
        for column in 0..columns as u32 {
            let a = row * stride + column;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            indices.push([a, c, b]);
            indices.push([b, c, d]);
        }
    }

    let normals = vertex_normals(&positions, &indices);
    SurfaceMesh {
        columns,
        rows,
        positions,
        uvs,
        normals,
        indices,
    }
}

// Area-weighted face normals accumulated per vertex.
fn vertex_normals(positions: &[DVec3], indices: &[[u32; 3]]) -> Vec<DVec3> {
    let mut normals = vec![DVec3::ZERO; positions.len()];
    for triangle in indices {
        let [a, b, c] = triangle.map(|index| index as usize);
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        for index in [a, b, c] {
            normals[index] += face;
        }
    }
    normals
        .into_iter()
        .map(|normal| normal.try_normalize().unwrap_or(DVec3::Z))
        .collect()
}

fn build_overlay(points: &[Point], opacity: f64) -> Option<WindowOverlay> {
    if points.len() < MIN_POLYGON_POINTS {
        return None;
    }
    Some(WindowOverlay {
        outline: points
            .iter()
            .map(|point| on_plane(px_to_world(*point), OVERLAY_Z))
            .collect(),
        alpha: see_through_alpha(opacity),
    })
}

fn build_grid() -> Vec<GridLine> {
    let half = GRID_EXTENT / 2.0;
    let steps = (GRID_EXTENT / GRID_CELL).round() as usize;
    let per_section = (GRID_SECTION / GRID_CELL).round() as usize;
    let mut lines = Vec::with_capacity((steps + 1) * 2);
    for step in 0..=steps {
        let offset = -half + step as f64 * GRID_CELL;
        let section = step % per_section == 0;
        lines.push(GridLine {
            from: DVec3::new(offset, -half, GRID_Z),
            to: DVec3::new(offset, half, GRID_Z),
            section,
        });
        lines.push(GridLine {
            from: DVec3::new(-half, offset, GRID_Z),
            to: DVec3::new(half, offset, GRID_Z),
            section,
        });
    }
    lines
}

const ORBIT_SPEED: f64 = 0.01;
const ZOOM_SPEED: f64 = 0.001;
const PITCH_LIMIT: f64 = 1.4;
const MIN_DISTANCE: f64 = 2.0;
const MAX_DISTANCE: f64 = 40.0;
const NEAR: f64 = 0.1;
const FAR: f64 = 100.0;

/// Perspective camera orbiting the origin. There is no panning, the wall stays centred.
///
/// With zero yaw and pitch the eye sits on the +z axis at `distance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Rotation around the vertical axis, radians.
    pub yaw: f64,
    /// Elevation above the wall's horizon, radians.
    pub pitch: f64,
    pub distance: f64,
    pub fov_degrees: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 9.0,
            fov_degrees: 45.0,
            viewport_width: PREVIEW_WIDTH,
            viewport_height: PREVIEW_HEIGHT,
        }
    }
}

impl Camera {
    pub fn eye(&self) -> DVec3 {
        DVec3::new(
            self.distance * self.pitch.cos() * self.yaw.sin(),
            self.distance * self.pitch.sin(),
            self.distance * self.pitch.cos() * self.yaw.cos(),
        )
    }

    pub fn view_projection(&self) -> DMat4 {
        let aspect = self.viewport_width / self.viewport_height;
        let projection = DMat4::perspective_rh(self.fov_degrees.to_radians(), aspect, NEAR, FAR);
        projection * DMat4::look_at_rh(self.eye(), DVec3::ZERO, DVec3::Y)
    }

    pub fn projection(&self) -> Projection {
        Projection {
            matrix: self.view_projection(),
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }

    /// Rotates by a pointer drag in pixels. Dragging right turns the wall to the right.
    pub fn orbit(&mut self, dx: f64, dy: f64) {
        self.yaw -= dx * ORBIT_SPEED;
        self.pitch = (self.pitch + dy * ORBIT_SPEED).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Wheel zoom; positive deltas move away from the wall.
    pub fn zoom(&mut self, delta: f64) {
        self.distance =
            (self.distance * (1.0 + delta * ZOOM_SPEED)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

/// A camera frozen for one frame.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    matrix: DMat4,
    width: f64,
    height: f64,
}

impl Projection {
    /// Screen position in viewport pixels, or `None` behind the camera.
    pub fn project(&self, point: DVec3) -> Option<(f64, f64)> {
        let clip = self.matrix * point.extend(1.0);
        if clip.w <= f64::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some((
            (ndc.x + 1.0) / 2.0 * self.width,
            (1.0 - ndc.y) / 2.0 * self.height,
        ))
    }
}

fn homogeneous(points: [(f64, f64); 3]) -> DMat3 {
    let [a, b, c] = points.map(|(x, y)| DVec3::new(x, y, 1.0));
    DMat3::from_cols(a, b, c)
}

/// Canvas transform `[a, b, c, d, e, f]` taking the `from` triangle onto `to`.
/// `None` for degenerate source triangles.
pub fn affine_between(from: [(f64, f64); 3], to: [(f64, f64); 3]) -> Option<[f64; 6]> {
    let source = homogeneous(from);
    if source.determinant().abs() <= f64::EPSILON {
        return None;
    }
    let m = homogeneous(to) * source.inverse();
    Some([m.x_axis.x, m.x_axis.y, m.y_axis.x, m.y_axis.y, m.z_axis.x, m.z_axis.y])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wallmask_shared::geometry::{WORLD_HEIGHT, WORLD_WIDTH};
    use wallmask_shared::Corner;

    fn triangle() -> Vec<Point> {
        vec![
            Point::new(100.0, 100.0),
            Point::new(300.0, 100.0),
            Point::new(200.0, 300.0),
        ]
    }

    #[test]
    fn default_warp_is_the_identity_plane() {
        let scene = build_scene(&[], 0.35, &WarpQuad::full_wall(), false);
        let surface = &scene.surface;
        assert_eq!(
            surface.positions.len(),
            (SURFACE_SEGMENTS_X + 1) * (SURFACE_SEGMENTS_Y + 1)
        );
        for (position, (u, v)) in surface.positions.iter().zip(&surface.uvs) {
            assert_relative_eq!(position.x, (u - 0.5) * WORLD_WIDTH, epsilon = 1e-9);
            assert_relative_eq!(position.y, (0.5 - v) * WORLD_HEIGHT, epsilon = 1e-9);
            assert_eq!(position.z, 0.0);
        }
    }

    #[test]
    fn surface_corners_follow_the_warp() {
        let warp = WarpQuad::full_wall()
            .with_corner(Corner::Tl, Point::new(80.0, 40.0))
            .with_corner(Corner::Br, Point::new(700.0, 480.0));
        let scene = build_scene(&[], 0.35, &warp, false);
        let surface = &scene.surface;
        let world = warp.to_world();
        let tl = surface.positions[surface.vertex_index(0, 0)];
        let br = surface.positions[surface.vertex_index(surface.columns, surface.rows)];
        assert_relative_eq!(tl.x, world.tl.x, epsilon = 1e-12);
        assert_relative_eq!(tl.y, world.tl.y, epsilon = 1e-12);
        assert_relative_eq!(br.x, world.br.x, epsilon = 1e-12);
        assert_relative_eq!(br.y, world.br.y, epsilon = 1e-12);
    }

    #[test]
    fn normals_face_the_camera() {
        let scene = build_scene(&[], 0.35, &WarpQuad::full_wall(), false);
        assert_eq!(scene.surface.indices.len(), SURFACE_SEGMENTS_X * SURFACE_SEGMENTS_Y * 2);
        for normal in &scene.surface.normals {
            assert_relative_eq!(normal.z, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn overlay_needs_three_points() {
        let points = triangle();
        assert!(build_scene(&points[..2], 0.35, &WarpQuad::default(), false)
            .overlay
            .is_none());
        let overlay = build_scene(&points, 0.35, &WarpQuad::default(), false)
            .overlay
            .unwrap();
        assert_eq!(overlay.outline.len(), 3);
        assert_relative_eq!(overlay.outline[0].x, -3.0);
        assert_relative_eq!(overlay.outline[0].y, 1.5);
        assert_eq!(overlay.outline[0].z, OVERLAY_Z);
    }

    #[test]
    fn overlay_ignores_the_warp() {
        let warp = WarpQuad::full_wall().with_corner(Corner::Tr, Point::new(600.0, 120.0));
        let plain = build_scene(&triangle(), 0.5, &WarpQuad::default(), false);
        let warped = build_scene(&triangle(), 0.5, &warp, false);
        assert_eq!(plain.overlay, warped.overlay);
    }

    #[test]
    fn see_through_alpha_inverts_and_clamps() {
        assert_relative_eq!(see_through_alpha(0.35), 0.65, epsilon = 1e-12);
        assert_eq!(see_through_alpha(1.0), 0.0);
        assert_eq!(see_through_alpha(0.0), 1.0);
        assert_eq!(see_through_alpha(1.4), 0.0);
        assert_eq!(see_through_alpha(-0.2), 1.0);
    }

    #[test]
    fn grid_is_optional_with_sections() {
        assert!(build_scene(&[], 0.35, &WarpQuad::default(), false).grid.is_empty());
        let grid = build_scene(&[], 0.35, &WarpQuad::default(), true).grid;
        assert_eq!(grid.len(), 42);
        assert_eq!(grid.iter().filter(|line| line.section).count(), 10);
    }

    #[test]
    fn outline_is_a_closed_loop() {
        let scene = build_scene(&[], 0.35, &WarpQuad::default(), false);
        assert_eq!(scene.warp_outline[0], scene.warp_outline[4]);
        assert_relative_eq!(scene.warp_outline[2].x, WORLD_WIDTH / 2.0);
        assert_relative_eq!(scene.warp_outline[2].y, -WORLD_HEIGHT / 2.0);
    }

    #[test]
    fn affine_maps_each_source_vertex() {
        let from = [(0.0, 0.0), (20.0, 0.0), (0.0, 10.0)];
        let to = [(100.0, 50.0), (140.0, 60.0), (90.0, 80.0)];
        let [a, b, c, d, e, f] = affine_between(from, to).unwrap();
        for ((x, y), (tx, ty)) in from.into_iter().zip(to) {
            assert_relative_eq!(a * x + c * y + e, tx, epsilon = 1e-9);
            assert_relative_eq!(b * x + d * y + f, ty, epsilon = 1e-9);
        }
        assert!(affine_between([(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)], to).is_none());
    }

    #[test]
    fn camera_centres_the_origin() {
        let projection = Camera::default().projection();
        let (x, y) = projection.project(DVec3::ZERO).unwrap();
        assert_relative_eq!(x, PREVIEW_WIDTH / 2.0, epsilon = 1e-9);
        assert_relative_eq!(y, PREVIEW_HEIGHT / 2.0, epsilon = 1e-9);

        let (_, top) = projection.project(DVec3::new(0.0, 2.5, 0.0)).unwrap();
        assert!(top < PREVIEW_HEIGHT / 2.0);
        assert!(projection.project(DVec3::new(0.0, 0.0, 9.0)).is_none());
    }

    #[test]
    fn unrotated_orbit_is_the_front_view() {
        // Pinhole camera on +z at distance 9, fov 45 degrees.
        let camera = Camera::default();
        assert_eq!((camera.yaw, camera.pitch), (0.0, 0.0));
        let focal = 1.0 / 22.5f64.to_radians().tan();
        let aspect = PREVIEW_WIDTH / PREVIEW_HEIGHT;
        let projection = camera.projection();
        for point in [
            DVec3::new(3.0, 0.0, 0.0),
            DVec3::new(-2.0, 1.25, 0.0),
            DVec3::new(1.0, -1.0, OVERLAY_Z),
        ] {
            let depth = camera.distance - point.z;
            let expected_x = (point.x * focal / (aspect * depth) + 1.0) / 2.0 * PREVIEW_WIDTH;
            let expected_y = (1.0 - point.y * focal / depth) / 2.0 * PREVIEW_HEIGHT;
            let (x, y) = projection.project(point).unwrap();
            assert_relative_eq!(x, expected_x, epsilon = 1e-6);
            assert_relative_eq!(y, expected_y, epsilon = 1e-6);
        }
    }

    #[test]
    fn orbiting_keeps_the_wall_centred_and_turns_it() {
        let mut camera = Camera::default();
        let front = camera.projection().project(DVec3::new(3.0, 0.0, 0.0)).unwrap();
        camera.orbit(60.0, 0.0);
        assert!(camera.eye().x < 0.0);
        assert_relative_eq!(camera.eye().length(), camera.distance, epsilon = 1e-9);

        let projection = camera.projection();
        let (x, y) = projection.project(DVec3::ZERO).unwrap();
        assert_relative_eq!(x, PREVIEW_WIDTH / 2.0, epsilon = 1e-6);
        assert_relative_eq!(y, PREVIEW_HEIGHT / 2.0, epsilon = 1e-6);
        let turned = projection.project(DVec3::new(3.0, 0.0, 0.0)).unwrap();
        assert!((turned.0 - front.0).abs() > 1.0);
    }

    #[test]
    fn pitch_and_zoom_are_clamped() {
        let mut camera = Camera::default();
        camera.orbit(0.0, 10_000.0);
        assert_eq!(camera.pitch, 1.4);
        camera.orbit(0.0, -20_000.0);
        assert_eq!(camera.pitch, -1.4);

        camera.zoom(-100_000.0);
        assert_eq!(camera.distance, 2.0);
        camera.zoom(100_000.0);
        assert_eq!(camera.distance, 40.0);
        camera.zoom(0.0);
        assert_eq!(camera.distance, 40.0);
    }
}
