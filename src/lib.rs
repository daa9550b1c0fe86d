// HexFog Core - Rust/WASM Implementation
// Licensed under the Apache License, Version 2.0

//! # HexFog Core (Rust/WASM)
//!
//! The engine behind the HexFog map tool: a fog-of-war hex overlay on top of
//! a game-master's map image, compiled to WebAssembly. The JS host owns the
//! canvas, DOM and storage; this crate owns every piece of state and all the
//! geometry.
//!
//! ## Architecture
//!
//! - **MapSession**: single owner of all session state and the interop facade
//! - **grid**: hex grid generation from a clamped config
//! - **spatial**: uniform spatial hash over world space for hit candidates
//! - **transform**: screen/world mapping with anchor-preserving zoom
//! - **interaction**: pure press/release state machine
//! - **history**: bounded snapshot undo/redo
//! - **loader**: the image-load race (success/error/timeout, one fallback)
//! - **store**: persisted session document plus export/import codecs

use wasm_bindgen::prelude::*;

// Module declarations
mod grid;
mod history;
mod hit;
mod interaction;
mod loader;
mod session;
mod spatial;
mod store;
mod transform;
mod types;
mod utils;

// Re-exports
pub use history::HistoryManager;
pub use interaction::{InteractionMode, InteractionStateMachine, PointerButton};
pub use loader::{ImageLoader, LoadOutcome, LoadPhase, DEFAULT_MAP_URL};
pub use session::{ChangeEvent, MapSession};
pub use spatial::SpatialHashGrid;
pub use store::{ExportDocument, SessionDocument, SettingsDoc};
pub use types::{
    AppearanceSettings, GridConfig, Hex, HexFogError, Orientation, Point, Token, ViewState,
};

// WASM initialization
#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the browser console
    console_error_panic_hook::set_once();
}

// Version information
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Health check for WASM module
#[wasm_bindgen]
pub fn health_check() -> bool {
    true
}
