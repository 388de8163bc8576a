use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, HtmlButtonElement, HtmlCanvasElement,
    HtmlImageElement, HtmlInputElement, HtmlSpanElement, MouseEvent, WheelEvent, Window,
};

use wallmask_shared::MaskId;

use crate::api::{resolve_api_base, HttpFacade};
use crate::controller::{delete_mask, load_masks, save_new, update_selected};
use crate::dom::{
    api_base_attribute, context_2d, event_to_point, get_element, list_action_from_event, notify,
    render_mask_list, set_cursor, set_enabled, ListAction,
};
use crate::editor::{EditorEvent, EditorMode};
use crate::logging;
use crate::render::{draw_editor, draw_preview, draw_warp};
use crate::scene::{build_scene, Camera};
use crate::session::MaskSession;
use crate::warp::WarpEvent;

const PROJECTION_TEXTURE: &str = "/projection.jpg";

struct Ui {
    editor_canvas: HtmlCanvasElement,
    editor_ctx: CanvasRenderingContext2d,
    warp_canvas: HtmlCanvasElement,
    warp_ctx: CanvasRenderingContext2d,
    preview_canvas: HtmlCanvasElement,
    preview_ctx: CanvasRenderingContext2d,
    mode_button: HtmlButtonElement,
    grid_button: HtmlButtonElement,
    opacity_input: HtmlInputElement,
    opacity_value: HtmlSpanElement,
    name_input: HtmlInputElement,
    save_button: HtmlButtonElement,
    update_button: HtmlButtonElement,
    export_button: HtmlButtonElement,
    reset_button: HtmlButtonElement,
    mask_list: Element,
}

struct App {
    window: Window,
    document: Document,
    ui: Ui,
    session: RefCell<MaskSession>,
    facade: HttpFacade,
    camera: Cell<Camera>,
    /// Last pointer position of an orbit drag on the preview.
    orbit_from: Cell<Option<(i32, i32)>>,
    texture: RefCell<Option<HtmlImageElement>>,
}

impl App {
    fn render(&self) {
        let session = self.session.borrow();
        let ui = &self.ui;

        draw_editor(
            &ui.editor_ctx,
            session.editor(),
            session.opacity(),
            session.show_grid(),
        );
        draw_warp(&ui.warp_ctx, &session.warp().quad());
        self.render_preview(&session);

        let mode = session.editor().mode();
        ui.mode_button
            .set_text_content(Some(&format!("Mode: {}", mode.label())));
        ui.grid_button.set_text_content(Some(if session.show_grid() {
            "Test Grid: ON"
        } else {
            "Test Grid: OFF"
        }));
        let opacity = format!("{:.2}", session.opacity());
        ui.opacity_value.set_text_content(Some(&opacity));
        if ui.opacity_input.value_as_number() != session.opacity() {
            ui.opacity_input.set_value_as_number(session.opacity());
        }
        if ui.name_input.value() != session.name() {
            ui.name_input.set_value(session.name());
        }
        set_enabled(&ui.save_button, session.can_save_new());
        set_enabled(&ui.update_button, session.can_update());
        set_enabled(&ui.export_button, session.can_export());
        set_cursor(
            &ui.editor_canvas,
            match mode {
                EditorMode::Draw => "crosshair",
                EditorMode::Edit if session.editor().dragging().is_some() => "grabbing",
                EditorMode::Edit => "grab",
            },
        );

        if let Err(err) =
            render_mask_list(&self.document, &ui.mask_list, session.masks(), session.selected())
        {
            web_sys::console::error_1(&err);
        }
    }

    fn render_preview(&self, session: &MaskSession) {
        let scene = build_scene(
            session.editor().points(),
            session.opacity(),
            &session.warp().quad(),
            session.show_grid(),
        );
        let texture = self.texture.borrow();
        let camera = self.camera.get();
        if let Err(err) = draw_preview(&self.ui.preview_ctx, &scene, &camera, texture.as_ref()) {
            web_sys::console::error_1(&err);
        }
    }

    fn move_camera(&self, change: impl FnOnce(&mut Camera)) {
        let mut camera = self.camera.get();
        change(&mut camera);
        self.camera.set(camera);
        self.render_preview(&self.session.borrow());
    }

    fn edit(&self, event: EditorEvent) {
        self.session.borrow_mut().edit(event);
        self.render();
    }

    fn drag_warp(&self, event: WarpEvent) {
        self.session.borrow_mut().drag_warp(event);
        self.render();
    }

    fn reset(&self) {
        self.session.borrow_mut().reset();
        logging::debug("session reset");
        self.render();
    }

    fn select(&self, id: MaskId) {
        let result = self.session.borrow_mut().select(id);
        match result {
            Ok(()) => logging::debug(&format!("selected mask {id}")),
            Err(err) => {
                logging::error(&err.to_string());
                notify(&self.window, &format!("Cannot open this mask: {err}"));
            }
        }
        self.render();
    }

    fn export(&self) {
        let payload = self.session.borrow().export();
        let Some(payload) = payload else {
            return;
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(json) => {
                logging::info(&format!("MASK JSON: {json}"));
                notify(&self.window, "Mask JSON was written to the console.");
            }
            Err(err) => logging::error(&format!("Export failed: {err}")),
        }
    }
}

fn spawn_save(app: Rc<App>) {
    spawn_local(async move {
        match save_new(&app.session, &app.facade).await {
            Ok(Some(id)) => logging::info(&format!("saved mask {id}")),
            Ok(None) => {}
            Err(err) => {
                logging::error(&format!("save failed: {err}"));
                notify(&app.window, &format!("Could not save the mask.\n{err}"));
            }
        }
        app.render();
    });
}

fn spawn_update(app: Rc<App>) {
    spawn_local(async move {
        match update_selected(&app.session, &app.facade).await {
            Ok(Some(id)) => {
                logging::info(&format!("updated mask {id}"));
                notify(&app.window, "Mask updated.");
            }
            Ok(None) => {}
            Err(err) => {
                logging::error(&format!("update failed: {err}"));
                notify(&app.window, &format!("Could not update the mask.\n{err}"));
            }
        }
        app.render();
    });
}

fn spawn_delete(app: Rc<App>, id: MaskId) {
    spawn_local(async move {
        match delete_mask(&app.session, &app.facade, id).await {
            Ok(()) => logging::info(&format!("deleted mask {id}")),
            Err(err) => {
                logging::error(&format!("delete failed: {err}"));
                notify(&app.window, &format!("Could not delete the mask.\n{err}"));
            }
        }
        app.render();
    });
}

fn spawn_initial_load(app: Rc<App>) {
    spawn_local(async move {
        match load_masks(&app.session, &app.facade).await {
            Ok(count) => logging::info(&format!("loaded {count} masks")),
            Err(err) => {
                logging::error(&format!("loading masks failed: {err}"));
                notify(
                    &app.window,
                    &format!("Could not load masks from {}.\n{err}", app.facade.base()),
                );
            }
        }
        app.render();
    });
}

fn listen<E, F>(target: &web_sys::EventTarget, kind: &str, handler: F) -> Result<(), JsValue>
where
    E: FromWasmAbi + 'static,
    F: FnMut(E) + 'static,
{
    let closure = Closure::<dyn FnMut(E)>::new(handler);
    target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn on_click(
    button: &HtmlButtonElement,
    app: &Rc<App>,
    action: fn(&Rc<App>),
) -> Result<(), JsValue> {
    let app = app.clone();
    listen(button, "click", move |_: Event| action(&app))
}

fn load_texture(app: &Rc<App>) -> Result<(), JsValue> {
    let image = HtmlImageElement::new()?;
    {
        let app = app.clone();
        let loaded = image.clone();
        listen(&image, "load", move |_: Event| {
            logging::debug("projection texture loaded");
            app.texture.replace(Some(loaded.clone()));
            app.render();
        })?;
    }
    listen(&image, "error", move |_: Event| {
        logging::info(&format!(
            "{PROJECTION_TEXTURE} not available, using checker texture"
        ));
    })?;
    image.set_src(PROJECTION_TEXTURE);
    Ok(())
}

fn document_ready_state(document: &Document) -> Option<String> {
    Reflect::get(document.as_ref(), &JsValue::from_str("readyState"))
        .ok()?
        .as_string()
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let started = Rc::new(Cell::new(false));

    if document_ready_state(&document).as_deref() != Some("loading") {
        started.set(true);
        return start_app();
    }

    let onload_started = started.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        if onload_started.replace(true) {
            return;
        }
        if let Err(err) = start_app() {
            web_sys::console::error_1(&err);
        }
    });
    document.add_event_listener_with_callback("DOMContentLoaded", onload.as_ref().unchecked_ref())?;
    onload.forget();

    Ok(())
}

fn start_app() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;

    let search = window.location().search().unwrap_or_default();
    logging::set_debug(logging::debug_requested(&search));

    let editor_canvas: HtmlCanvasElement = get_element(&document, "editor")?;
    let warp_canvas: HtmlCanvasElement = get_element(&document, "warp")?;
    let preview_canvas: HtmlCanvasElement = get_element(&document, "preview")?;
    let ui = Ui {
        editor_ctx: context_2d(&editor_canvas)?,
        warp_ctx: context_2d(&warp_canvas)?,
        preview_ctx: context_2d(&preview_canvas)?,
        editor_canvas,
        warp_canvas,
        preview_canvas,
        mode_button: get_element(&document, "mode")?,
        grid_button: get_element(&document, "grid")?,
        opacity_input: get_element(&document, "opacity")?,
        opacity_value: get_element(&document, "opacityValue")?,
        name_input: get_element(&document, "name")?,
        save_button: get_element(&document, "saveNew")?,
        update_button: get_element(&document, "update")?,
        export_button: get_element(&document, "export")?,
        reset_button: get_element(&document, "reset")?,
        mask_list: get_element(&document, "maskList")?,
    };

    let base = resolve_api_base(api_base_attribute(&document));
    logging::info(&format!("API base {base}"));
    let app = Rc::new(App {
        window: window.clone(),
        document: document.clone(),
        ui,
        session: RefCell::new(MaskSession::new()),
        facade: HttpFacade::new(base),
        camera: Cell::new(Camera::default()),
        orbit_from: Cell::new(None),
        texture: RefCell::new(None),
    });

    let ui = &app.ui;
    {
        let app = app.clone();
        listen(&ui.editor_canvas, "click", move |event: MouseEvent| {
            let point = event_to_point(&app.ui.editor_canvas, &event);
            app.edit(EditorEvent::Click(point));
        })?;
    }
    {
        let app = app.clone();
        listen(&ui.editor_canvas, "mousedown", move |event: MouseEvent| {
            if event.button() != 0 {
                return;
            }
            let point = event_to_point(&app.ui.editor_canvas, &event);
            app.edit(EditorEvent::PointerDown(point));
        })?;
    }
    {
        let app = app.clone();
        listen(&ui.editor_canvas, "mousemove", move |event: MouseEvent| {
            if app.session.borrow().editor().dragging().is_none() {
                return;
            }
            let point = event_to_point(&app.ui.editor_canvas, &event);
            app.edit(EditorEvent::PointerMove(point));
        })?;
    }
    {
        let app = app.clone();
        listen(&ui.editor_canvas, "mouseup", move |_: MouseEvent| {
            app.edit(EditorEvent::PointerUp);
        })?;
    }
    {
        let app = app.clone();
        listen(&ui.editor_canvas, "mouseleave", move |_: MouseEvent| {
            app.edit(EditorEvent::PointerLeave);
        })?;
    }

    {
        let app = app.clone();
        listen(&ui.warp_canvas, "mousedown", move |event: MouseEvent| {
            if event.button() != 0 {
                return;
            }
            let point = event_to_point(&app.ui.warp_canvas, &event);
            app.drag_warp(WarpEvent::PointerDown(point));
        })?;
    }
    // Warp drags are tracked on the window so they survive leaving the canvas.
    {
        let app = app.clone();
        listen(&window, "mousemove", move |event: MouseEvent| {
            if app.session.borrow().warp().dragging().is_none() {
                return;
            }
            let point = event_to_point(&app.ui.warp_canvas, &event);
            app.drag_warp(WarpEvent::PointerMove(point));
        })?;
    }
    {
        let app = app.clone();
        listen(&window, "mouseup", move |_: MouseEvent| {
            if app.session.borrow().warp().dragging().is_some() {
                app.drag_warp(WarpEvent::PointerUp);
            }
        })?;
    }

    {
        let app = app.clone();
        listen(&ui.preview_canvas, "mousedown", move |event: MouseEvent| {
            if event.button() == 0 {
                app.orbit_from.set(Some((event.client_x(), event.client_y())));
            }
        })?;
    }
    {
        let app = app.clone();
        listen(&window, "mousemove", move |event: MouseEvent| {
            let Some((x, y)) = app.orbit_from.get() else {
                return;
            };
            let (next_x, next_y) = (event.client_x(), event.client_y());
            app.orbit_from.set(Some((next_x, next_y)));
            app.move_camera(|camera| camera.orbit((next_x - x) as f64, (next_y - y) as f64));
        })?;
    }
    {
        let app = app.clone();
        listen(&window, "mouseup", move |_: MouseEvent| app.orbit_from.set(None))?;
    }
    {
        let app = app.clone();
        listen(&ui.preview_canvas, "wheel", move |event: WheelEvent| {
            event.prevent_default();
            app.move_camera(|camera| camera.zoom(event.delta_y()));
        })?;
    }

    {
        let app = app.clone();
        listen(&document, "contextmenu", move |event: MouseEvent| {
            event.prevent_default();
            app.reset();
        })?;
    }

    on_click(&ui.mode_button, &app, |app| app.edit(EditorEvent::ToggleMode))?;
    on_click(&ui.grid_button, &app, |app| {
        app.session.borrow_mut().toggle_grid();
        app.render();
    })?;
    on_click(&ui.save_button, &app, |app| spawn_save(app.clone()))?;
    on_click(&ui.update_button, &app, |app| spawn_update(app.clone()))?;
    on_click(&ui.export_button, &app, |app| app.export())?;
    on_click(&ui.reset_button, &app, |app| app.reset())?;

    {
        let app = app.clone();
        listen(&ui.opacity_input, "input", move |_: Event| {
            let value = app.ui.opacity_input.value_as_number();
            app.session.borrow_mut().set_opacity(value);
            app.render();
        })?;
    }
    {
        let app = app.clone();
        listen(&ui.name_input, "input", move |_: Event| {
            let value = app.ui.name_input.value();
            app.session.borrow_mut().set_name(value);
            app.render();
        })?;
    }
    {
        let app = app.clone();
        listen(&ui.mask_list, "click", move |event: MouseEvent| {
            match list_action_from_event(&event) {
                Some(ListAction::Select(id)) => app.select(id),
                Some(ListAction::Delete(id)) => {
                    event.stop_propagation();
                    spawn_delete(app.clone(), id);
                }
                None => {}
            }
        })?;
    }

    load_texture(&app)?;
    app.render();
    spawn_initial_load(app.clone());
    Ok(())
}
