use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlButtonElement, HtmlCanvasElement,
    HtmlElement, MouseEvent, Window,
};

use wallmask_shared::{Mask, MaskId, Point};

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing canvas context"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| JsValue::from_str("Invalid canvas context"))
}

/// Pointer position in canvas pixels. Follows CSS scaling of the element.
pub fn event_to_point(canvas: &HtmlCanvasElement, event: &MouseEvent) -> Point {
    let rect = canvas.get_bounding_client_rect();
    let scale_x = if rect.width() > 0.0 {
        canvas.width() as f64 / rect.width()
    } else {
        1.0
    };
    let scale_y = if rect.height() > 0.0 {
        canvas.height() as f64 / rect.height()
    } else {
        1.0
    };
    Point::new(
        (event.client_x() as f64 - rect.left()) * scale_x,
        (event.client_y() as f64 - rect.top()) * scale_y,
    )
}

pub fn set_enabled(button: &HtmlButtonElement, enabled: bool) {
    button.set_disabled(!enabled);
}

pub fn set_cursor(canvas: &HtmlCanvasElement, cursor: &str) {
    if let Ok(element) = canvas.clone().dyn_into::<HtmlElement>() {
        let _ = element.style().set_property("cursor", cursor);
    }
}

pub fn notify(window: &Window, message: &str) {
    let _ = window.alert_with_message(message);
}

pub fn api_base_attribute(document: &Document) -> Option<String> {
    document.body()?.get_attribute("data-api-base")
}

/// One line per saved mask, as shown in the list.
pub fn mask_summary(mask: &Mask) -> String {
    format!(
        "{} ({}) · {} pts · opacity {:.2}",
        mask.name,
        mask.kind,
        mask.points.len(),
        mask.opacity
    )
}

pub fn render_mask_list(
    document: &Document,
    list: &Element,
    masks: &[Mask],
    selected: Option<MaskId>,
) -> Result<(), JsValue> {
    list.set_inner_html("");
    if masks.is_empty() {
        let empty = document.create_element("li")?;
        empty.set_class_name("empty");
        empty.set_text_content(Some("No saved masks yet."));
        list.append_child(&empty)?;
        return Ok(());
    }
    for mask in masks {
        let item = document.create_element("li")?;
        item.set_attribute("data-mask-id", &mask.id.to_string())?;
        if selected == Some(mask.id) {
            item.set_class_name("selected");
        }
        let label = document.create_element("span")?;
        label.set_text_content(Some(&mask_summary(mask)));
        item.append_child(&label)?;

        let delete = document.create_element("button")?;
        delete.set_attribute("type", "button")?;
        delete.set_attribute("data-action", "delete")?;
        delete.set_text_content(Some("Delete"));
        item.append_child(&delete)?;

        list.append_child(&item)?;
    }
    Ok(())
}

pub enum ListAction {
    Select(MaskId),
    Delete(MaskId),
}

/// Resolves a click inside the mask list to the entry it targets.
pub fn list_action_from_event(event: &MouseEvent) -> Option<ListAction> {
    let target: Element = event.target()?.dyn_into().ok()?;
    let item = target.closest("[data-mask-id]").ok().flatten()?;
    let id = item.get_attribute("data-mask-id")?.parse::<MaskId>().ok()?;
    let on_delete = target
        .closest("[data-action=\"delete\"]")
        .ok()
        .flatten()
        .is_some();
    Some(if on_delete {
        ListAction::Delete(id)
    } else {
        ListAction::Select(id)
    })
}
