//! # Yosemite App
//!
//! Windowed mesh viewer built on the Yosemite renderer.
//!
//! ## Overview
//!
//! - [`Args`] - command line options
//! - [`AppWindow`] - winit window driven through `pump_app_events`
//! - [`App`] - loads the mesh, opens the device and runs the frame loop

mod app;
mod args;
mod window;

pub use app::App;
pub use args::{Args, DrawPathArg};
pub use window::AppWindow;

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the app subsystem.
pub fn init() {
    log::info!("Yosemite App v{} initialized", VERSION);
}
