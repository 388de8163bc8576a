//! Draft-versus-saved bookkeeping for the editor page.
//!
//! The session never talks to the network. Each persistence action is split into a
//! `*_payload` step that checks the enabling predicate and packages the request, and
//! an `apply_*` step that folds the response back in.

use serde::Serialize;
use thiserror::Error;
use wallmask_shared::{
    rounded_points, Mask, MaskId, MaskPatch, NewMask, Point, UpdatedMask, DEFAULT_MASK_TYPE,
    DEFAULT_MODEL_ID, MIN_POLYGON_POINTS,
};

use crate::editor::{EditorEvent, EditorMode, PolygonEditor};
use crate::warp::{WarpEditor, WarpEvent};

pub const DEFAULT_OPACITY: f64 = 0.35;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("mask {0} is not in the list")]
    UnknownMask(MaskId),
    #[error("mask {id} has {points} points, a polygon needs at least 3")]
    CorruptMask { id: MaskId, points: usize },
}

/// What Export hands to the diagnostic sink.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ExportPayload {
    pub id: Option<MaskId>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub opacity: f64,
    pub points: Vec<Point>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaskSession {
    editor: PolygonEditor,
    warp: WarpEditor,
    opacity: f64,
    name: String,
    selected: Option<MaskId>,
    masks: Vec<Mask>,
    show_grid: bool,
}

impl Default for MaskSession {
    fn default() -> Self {
        Self {
            editor: PolygonEditor::new(),
            warp: WarpEditor::default(),
            opacity: DEFAULT_OPACITY,
            name: String::new(),
            selected: None,
            masks: Vec::new(),
            show_grid: false,
        }
    }
}

impl MaskSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editor(&self) -> &PolygonEditor {
        &self.editor
    }

    pub fn warp(&self) -> &WarpEditor {
        &self.warp
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selected(&self) -> Option<MaskId> {
        self.selected
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn edit(&mut self, event: EditorEvent) {
        self.editor = std::mem::take(&mut self.editor).apply(event);
    }

    pub fn drag_warp(&mut self, event: WarpEvent) {
        self.warp = self.warp.apply(event);
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        if opacity.is_finite() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn toggle_grid(&mut self) {
        self.show_grid = !self.show_grid;
    }

    pub fn set_masks(&mut self, masks: Vec<Mask>) {
        self.masks = masks;
    }

    pub fn has_polygon(&self) -> bool {
        self.editor.has_polygon()
    }

    fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    pub fn can_save_new(&self) -> bool {
        self.has_polygon() && self.has_name()
    }

    pub fn can_update(&self) -> bool {
        self.selected.is_some() && self.has_polygon() && self.has_name()
    }

    pub fn can_export(&self) -> bool {
        self.can_save_new() || self.can_update()
    }

    pub fn new_mask_payload(&self) -> Option<NewMask> {
        if !self.can_save_new() {
            return None;
        }
        Some(NewMask {
            model_id: DEFAULT_MODEL_ID,
            name: self.name.trim().to_string(),
            kind: DEFAULT_MASK_TYPE.to_string(),
            opacity: self.opacity,
            points: rounded_points(self.editor.points()),
        })
    }

    /// The new mask goes to the top of the list and becomes the selection.
    /// The draft keeps its unrounded points.
    pub fn apply_created(&mut self, mask: Mask) {
        self.selected = Some(mask.id);
        self.masks.insert(0, mask);
        self.edit(EditorEvent::SetMode(EditorMode::Edit));
    }

    pub fn update_payload(&self) -> Option<(MaskId, MaskPatch)> {
        let id = self.selected.filter(|_| self.can_update())?;
        Some((
            id,
            MaskPatch {
                name: self.name.trim().to_string(),
                opacity: self.opacity,
                points: rounded_points(self.editor.points()),
            },
        ))
    }

    /// Returns false when the mask has left the list in the meantime.
    pub fn apply_updated(&mut self, updated: UpdatedMask) -> bool {
        match self.masks.iter_mut().find(|mask| mask.id == updated.id) {
            Some(mask) => {
                mask.apply_update(updated);
                true
            }
            None => false,
        }
    }

    pub fn apply_deleted(&mut self, id: MaskId) {
        self.masks.retain(|mask| mask.id != id);
        if self.selected == Some(id) {
            self.reset();
        }
    }

    /// Seeds the draft from a saved mask. Invalid masks leave the session untouched.
    pub fn select(&mut self, id: MaskId) -> Result<(), SessionError> {
        let mask = self
            .masks
            .iter()
            .find(|mask| mask.id == id)
            .ok_or(SessionError::UnknownMask(id))?;
        if mask.points.len() < MIN_POLYGON_POINTS {
            return Err(SessionError::CorruptMask {
                id,
                points: mask.points.len(),
            });
        }
        self.editor = PolygonEditor::load(mask.points.clone());
        self.name = mask.name.clone();
        self.opacity = mask.opacity.clamp(0.0, 1.0);
        self.selected = Some(id);
        Ok(())
    }

    /// Back to an empty draft. The saved list, the warp and the grid toggle stay.
    pub fn reset(&mut self) {
        self.editor = PolygonEditor::new();
        self.name.clear();
        self.opacity = DEFAULT_OPACITY;
        self.selected = None;
    }

    pub fn export(&self) -> Option<ExportPayload> {
        if !self.has_polygon() {
            return None;
        }
        Some(ExportPayload {
            id: self.selected,
            name: self.name.clone(),
            kind: DEFAULT_MASK_TYPE.to_string(),
            opacity: self.opacity,
            points: rounded_points(self.editor.points()),
        })
    }
}
