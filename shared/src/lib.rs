use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod geometry;
pub mod warp;

pub use warp::{Corner, WarpQuad};

/// Width of the wall canvas in pixels.
pub const WALL_WIDTH: f64 = 800.0;
/// Height of the wall canvas in pixels.
pub const WALL_HEIGHT: f64 = 500.0;

pub const DEFAULT_MODEL_ID: ModelId = 1;
pub const DEFAULT_MASK_TYPE: &str = "polygon";
pub const MIN_POLYGON_POINTS: usize = 3;

pub type ModelId = i64;
pub type MaskId = i64;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamps both coordinates into the wall rectangle.
    pub fn clamp_to_wall(self) -> Self {
        Self {
            x: clamp_axis(self.x, WALL_WIDTH),
            y: clamp_axis(self.y, WALL_HEIGHT),
        }
    }

    /// Nearest integer pixel, the precision masks are persisted with.
    pub fn rounded(self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    value.max(0.0).min(max)
}

pub fn rounded_points(points: &[Point]) -> Vec<Point> {
    points.iter().map(|point| point.rounded()).collect()
}

/// A persisted mask as returned by the façade.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mask {
    pub id: MaskId,
    pub model_id: ModelId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub opacity: f64,
    pub points: Vec<Point>,
}

impl Mask {
    /// Folds the fields echoed by an update response into this entry.
    pub fn apply_update(&mut self, updated: UpdatedMask) {
        self.name = updated.name;
        self.opacity = updated.opacity;
        self.points = updated.points;
    }
}

/// Body of `POST /masks`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewMask {
    pub model_id: ModelId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub opacity: f64,
    pub points: Vec<Point>,
}

/// Body of `PUT /masks/:id`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MaskPatch {
    pub name: String,
    pub opacity: f64,
    pub points: Vec<Point>,
}

/// Response of `PUT /masks/:id`. Carries only the fields that were written.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UpdatedMask {
    pub id: MaskId,
    pub name: String,
    pub opacity: f64,
    pub points: Vec<Point>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
}

/// Field-level rejection reasons, flattened the way the API reports them.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    #[serde(default)]
    pub form_errors: Vec<String>,
    #[serde(default)]
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    pub fn form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }

    pub fn field(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// One line per field, for notifications.
    pub fn summary(&self) -> String {
        let mut lines = self.form_errors.clone();
        for (field, messages) in &self.field_errors {
            lines.push(format!("{field}: {}", messages.join(", ")));
        }
        lines.join("\n")
    }
}

/// Error envelope used by every non-2xx response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ErrorBody {
    Validation { error: ValidationErrors },
    Message { error: String },
}
