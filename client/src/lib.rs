pub mod api;
mod app;
pub mod controller;
mod dom;
pub mod editor;
mod logging;
mod render;
pub mod scene;
pub mod session;
pub mod warp;

pub use app::run;
