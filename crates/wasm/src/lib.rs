//! Browser bindings for the cliffray raymarcher.
//!
//! Exposes `CliffRenderer` to JavaScript: it acquires a WebGL context on a
//! canvas, stacks a 2D overlay canvas on top and drives frames from a JS
//! state provider through `requestAnimationFrame`. DOM-free helpers live in
//! [`state`] and build on every target.

pub mod state;

#[cfg(target_arch = "wasm32")]
mod canvas;
#[cfg(target_arch = "wasm32")]
mod overlay;
#[cfg(target_arch = "wasm32")]
mod renderer;
#[cfg(target_arch = "wasm32")]
mod scheduler;

#[cfg(target_arch = "wasm32")]
pub use renderer::CliffRenderer;

/// Installs the panic hook and console logger once on module load.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_ok() {
        log::info!("cliffray wasm ready");
    }
}
