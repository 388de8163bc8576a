use std::f64::consts::PI;

use glam::DVec3;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use wallmask_shared::{Corner, Point, WarpQuad, WALL_HEIGHT, WALL_WIDTH};

use crate::editor::{EditorMode, PolygonEditor, DRAG_RADIUS};
use crate::scene::{
    affine_between, Camera, Projection, Scene, OUTLINE_COLOR, OVERLAY_COLOR, PREVIEW_HEIGHT,
    PREVIEW_WIDTH,
};

const GRID_STEP: f64 = 50.0;
const VERTEX_RADIUS: f64 = 5.0;
const HANDLE_RADIUS: f64 = 8.0;
const CHECKER_CELLS: (f64, f64) = (8.0, 5.0);

fn trace_polygon(ctx: &CanvasRenderingContext2d, points: &[(f64, f64)]) {
    let Some(((x, y), rest)) = points.split_first() else {
        return;
    };
    ctx.begin_path();
    ctx.move_to(*x, *y);
    for (x, y) in rest {
        ctx.line_to(*x, *y);
    }
    ctx.close_path();
}

fn circle(ctx: &CanvasRenderingContext2d, point: Point, radius: f64) {
    ctx.begin_path();
    let _ = ctx.arc(point.x, point.y, radius, 0.0, PI * 2.0);
}

pub fn draw_editor(
    ctx: &CanvasRenderingContext2d,
    editor: &PolygonEditor,
    opacity: f64,
    show_grid: bool,
) {
    ctx.clear_rect(0.0, 0.0, WALL_WIDTH, WALL_HEIGHT);
    ctx.set_fill_style_str("#f5f5f5");
    ctx.fill_rect(0.0, 0.0, WALL_WIDTH, WALL_HEIGHT);

    if show_grid {
        ctx.save();
        ctx.set_stroke_style_str("rgba(255,0,0,0.35)");
        ctx.set_line_width(1.0);
        let mut x = 0.0;
        while x <= WALL_WIDTH {
            ctx.begin_path();
            ctx.move_to(x, 0.0);
            ctx.line_to(x, WALL_HEIGHT);
            ctx.stroke();
            x += GRID_STEP;
        }
        let mut y = 0.0;
        while y <= WALL_HEIGHT {
            ctx.begin_path();
            ctx.move_to(0.0, y);
            ctx.line_to(WALL_WIDTH, y);
            ctx.stroke();
            y += GRID_STEP;
        }
        ctx.restore();
    }

    ctx.set_stroke_style_str("#999");
    ctx.set_line_width(2.0);
    ctx.stroke_rect(0.0, 0.0, WALL_WIDTH, WALL_HEIGHT);

    let points = editor.points();
    let coords = points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>();
    if editor.has_polygon() {
        ctx.save();
        ctx.set_global_alpha(opacity);
        ctx.set_fill_style_str("black");
        trace_polygon(ctx, &coords);
        ctx.fill();
        ctx.restore();
    }

    if points.len() > 1 {
        ctx.set_stroke_style_str("blue");
        ctx.set_line_width(2.0);
        ctx.begin_path();
        ctx.move_to(points[0].x, points[0].y);
        for point in &points[1..] {
            ctx.line_to(point.x, point.y);
        }
        if editor.is_closed() {
            ctx.line_to(points[0].x, points[0].y);
        }
        ctx.stroke();
    }

    for (index, point) in points.iter().enumerate() {
        ctx.set_fill_style_str(if index == 0 { "green" } else { "blue" });
        circle(ctx, *point, VERTEX_RADIUS);
        ctx.fill();
        if editor.mode() == EditorMode::Edit {
            ctx.set_stroke_style_str("rgba(0,0,0,0.25)");
            ctx.set_line_width(1.0);
            circle(ctx, *point, DRAG_RADIUS);
            ctx.stroke();
        }
    }

    ctx.set_fill_style_str("#333");
    ctx.set_font("14px sans-serif");
    let _ = ctx.fill_text(editor.hint(), 16.0, 24.0);
}

pub fn draw_warp(ctx: &CanvasRenderingContext2d, quad: &WarpQuad) {
    ctx.clear_rect(0.0, 0.0, WALL_WIDTH, WALL_HEIGHT);
    ctx.set_fill_style_str("#fff");
    ctx.fill_rect(0.0, 0.0, WALL_WIDTH, WALL_HEIGHT);

    let coords = quad.corners().map(|p| (p.x, p.y));
    trace_polygon(ctx, &coords);
    ctx.set_fill_style_str("rgba(255,0,0,0.12)");
    ctx.fill();
    ctx.set_stroke_style_str("rgba(255,0,0,0.8)");
    ctx.set_line_width(2.0);
    ctx.stroke();

    ctx.set_font("12px sans-serif");
    for corner in Corner::ALL {
        let point = quad.corner(corner);
        circle(ctx, point, HANDLE_RADIUS);
        ctx.set_fill_style_str("white");
        ctx.fill();
        ctx.set_stroke_style_str("red");
        ctx.stroke();
        ctx.set_fill_style_str("red");
        let _ = ctx.fill_text(corner.label(), point.x + 10.0, point.y - 10.0);
    }
}

pub fn draw_preview(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    camera: &Camera,
    texture: Option<&HtmlImageElement>,
) -> Result<(), JsValue> {
    ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, PREVIEW_WIDTH, PREVIEW_HEIGHT);
    ctx.set_fill_style_str("#fff");
    ctx.fill_rect(0.0, 0.0, PREVIEW_WIDTH, PREVIEW_HEIGHT);

    let projection = camera.projection();
    // Back to front: surface, grid, warp outline, window overlay.
    draw_surface(ctx, scene, &projection, texture)?;

    for line in &scene.grid {
        let (Some(from), Some(to)) = (projection.project(line.from), projection.project(line.to))
        else {
            continue;
        };
        ctx.set_stroke_style_str(if line.section { "#9d4b4b" } else { "#d0d0d0" });
        ctx.set_line_width(if line.section { 1.5 } else { 1.0 });
        ctx.begin_path();
        ctx.move_to(from.0, from.1);
        ctx.line_to(to.0, to.1);
        ctx.stroke();
    }

    let outline = project_all(&projection, &scene.warp_outline);
    if let Some(((x, y), rest)) = outline.split_first() {
        ctx.set_stroke_style_str(OUTLINE_COLOR);
        ctx.set_line_width(1.0);
        ctx.begin_path();
        ctx.move_to(*x, *y);
        for (x, y) in rest {
            ctx.line_to(*x, *y);
        }
        ctx.stroke();
    }

    if let Some(overlay) = &scene.overlay {
        let projected = project_all(&projection, &overlay.outline);
        ctx.save();
        ctx.set_global_alpha(overlay.alpha);
        ctx.set_fill_style_str(OVERLAY_COLOR);
        trace_polygon(ctx, &projected);
        ctx.fill();
        ctx.restore();
    }
    Ok(())
}

fn project_all(projection: &Projection, points: &[DVec3]) -> Vec<(f64, f64)> {
    points
        .iter()
        .filter_map(|point| projection.project(*point))
        .collect()
}

// Each triangle gets the affine map from its texture triangle, clipped to its outline.
fn draw_surface(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    projection: &Projection,
    texture: Option<&HtmlImageElement>,
) -> Result<(), JsValue> {
    let surface = &scene.surface;
    let image = texture.filter(|image| image.complete() && image.natural_width() > 0);
    let (image_width, image_height) = image
        .map(|image| (image.natural_width() as f64, image.natural_height() as f64))
        .unwrap_or((1.0, 1.0));

    for triangle in &surface.indices {
        let [a, b, c] = triangle.map(|index| index as usize);
        let (Some(pa), Some(pb), Some(pc)) = (
            projection.project(surface.positions[a]),
            projection.project(surface.positions[b]),
            projection.project(surface.positions[c]),
        ) else {
            continue;
        };
        let screen = [pa, pb, pc];
        let uv = [surface.uvs[a], surface.uvs[b], surface.uvs[c]];

        match image {
            Some(image) => {
                let source = uv.map(|(u, v)| (u * image_width, v * image_height));
                let Some([m11, m12, m21, m22, dx, dy]) = affine_between(source, screen) else {
                    continue;
                };
                ctx.save();
                trace_polygon(ctx, &screen);
                ctx.clip();
                ctx.set_transform(m11, m12, m21, m22, dx, dy)?;
                ctx.draw_image_with_html_image_element(image, 0.0, 0.0)?;
                ctx.restore();
            }
            None => {
                ctx.set_fill_style_str(checker_color(uv));
                trace_polygon(ctx, &screen);
                ctx.fill();
            }
        }
    }
    Ok(())
}

fn checker_color(uv: [(f64, f64); 3]) -> &'static str {
    let u = (uv[0].0 + uv[1].0 + uv[2].0) / 3.0;
    let v = (uv[0].1 + uv[1].1 + uv[2].1) / 3.0;
    let cell = (u * CHECKER_CELLS.0).floor() as i64 + (v * CHECKER_CELLS.1).floor() as i64;
    if cell % 2 == 0 {
        "#c9d6e8"
    } else {
        "#7f95b5"
    }
}
