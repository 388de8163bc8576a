//! Console logging with a fixed prefix. Debug lines only show with `?debug=1`.

use std::cell::Cell;

const PREFIX: &str = "[wallmask]";

thread_local! {
    static DEBUG: Cell<bool> = const { Cell::new(false) };
}

pub fn set_debug(enabled: bool) {
    DEBUG.with(|debug| debug.set(enabled));
}

pub fn debug_enabled() -> bool {
    DEBUG.with(Cell::get)
}

/// True when the page query string asks for debug logging.
pub fn debug_requested(search: &str) -> bool {
    search
        .trim_start_matches('?')
        .split('&')
        .any(|pair| matches!(pair, "debug=1" | "debug=true"))
}

pub fn debug(message: &str) {
    if debug_enabled() {
        write(Level::Debug, message);
    }
}

pub fn info(message: &str) {
    write(Level::Info, message);
}

pub fn error(message: &str) {
    write(Level::Error, message);
}

#[derive(Clone, Copy)]
enum Level {
    Debug,
    Info,
    Error,
}

#[cfg(target_arch = "wasm32")]
fn write(level: Level, message: &str) {
    let line = wasm_bindgen::JsValue::from_str(&format!("{PREFIX} {message}"));
    match level {
        Level::Debug => web_sys::console::debug_1(&line),
        Level::Info => web_sys::console::info_1(&line),
        Level::Error => web_sys::console::error_1(&line),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn write(level: Level, message: &str) {
    if matches!(level, Level::Error) {
        eprintln!("{PREFIX} {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_from_query() {
        assert!(debug_requested("?debug=1"));
        assert!(debug_requested("?model=1&debug=true"));
        assert!(!debug_requested("?debug=0"));
        assert!(!debug_requested(""));
    }
}
