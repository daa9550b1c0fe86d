// Type definitions for HexFog Core

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

/// Result type for HexFog operations
pub type Result<T> = std::result::Result<T, HexFogError>;

/// Zoom bounds shared by the transform and the view document
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;

/// Error types for HexFog operations
#[derive(Debug, thiserror::Error, Clone, Serialize, Deserialize)]
pub enum HexFogError {
    #[error("Image load failed: {0}")]
    ImageLoad(String),

    #[error("Import rejected: {0}")]
    ImportRejected(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// Convert Rust errors to JsValue for the WASM boundary
impl From<HexFogError> for JsValue {
    fn from(err: HexFogError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Point in world or screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[wasm_bindgen]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[wasm_bindgen]
impl Point {
    #[wasm_bindgen(constructor)]
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }
}

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Bounds {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Bounds {
        Bounds { x_min, y_min, x_max, y_max }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// Hex grid orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Pointy,
    Flat,
}

/// Grid configuration. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    pub hex_size: f64,
    pub column_count: u32,
    pub row_count: u32,
    pub offset_x: f64,
    pub offset_y: f64,
    pub orientation: Orientation,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            hex_size: 40.0,
            column_count: 20,
            row_count: 15,
            offset_x: 0.0,
            offset_y: 0.0,
            orientation: Orientation::Pointy,
        }
    }
}

impl GridConfig {
    /// Clamp every field to its documented range
    pub fn clamped(mut self) -> GridConfig {
        self.hex_size = self.hex_size.clamp(10.0, 300.0);
        self.column_count = self.column_count.clamp(1, 200);
        self.row_count = self.row_count.clamp(1, 200);
        self.offset_x = self.offset_x.clamp(-1000.0, 1000.0);
        self.offset_y = self.offset_y.clamp(-1000.0, 1000.0);
        self
    }
}

/// Fog, grid and token appearance plus the map image scale.
/// Persisted alongside the grid config in the `settings` document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppearanceSettings {
    pub map_scale: f64,
    pub fog_color: String,
    pub fog_opacity: f64,
    pub grid_color: String,
    pub grid_thickness: f64,
    pub token_color: String,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        AppearanceSettings {
            map_scale: 100.0,
            fog_color: "#225522".to_string(),
            fog_opacity: 0.85,
            grid_color: "#FFFFFF".to_string(),
            grid_thickness: 1.0,
            token_color: "#FF0000".to_string(),
        }
    }
}

impl AppearanceSettings {
    pub fn clamped(mut self) -> AppearanceSettings {
        self.map_scale = self.map_scale.clamp(10.0, 500.0);
        self.fog_opacity = self.fog_opacity.clamp(0.0, 1.0);
        self.grid_thickness = self.grid_thickness.clamp(0.1, 10.0);
        self
    }
}

/// One cell of the generated grid.
///
/// Hexes are regenerated wholesale on every config change; `revealed` is a
/// cache re-derived from the [`RevealedSet`], never carried over by identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hex {
    pub id: String,
    pub center: Point,
    pub vertices: [Point; 6],
    pub row: u32,
    pub col: u32,
    pub revealed: bool,
}

/// The source of truth for what is revealed, keyed by hex id.
/// Hidden hexes are absent; present entries are always `true`, matching the
/// persisted `revealedHexes` object shape.
pub type RevealedSet = HashMap<String, bool>;

/// A token placed on the map, identified by a stable generated id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default = "crate::utils::generate_id")]
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Token {
    /// Create a token at a world position with a fresh id
    pub fn new(x: f64, y: f64, color: String) -> Token {
        Token {
            id: crate::utils::generate_id(),
            x,
            y,
            color,
            label: None,
            icon: None,
            notes: None,
        }
    }
}

/// Pan/zoom plus the current token selection.
/// Selection is runtime-only and keyed by token id, not array index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    pub zoom_level: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    #[serde(skip)]
    pub selected: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            zoom_level: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            selected: None,
        }
    }
}

/// Deep copy of the minimal state needed to restore a prior moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub revealed: RevealedSet,
    pub tokens: Vec<Token>,
    pub zoom_level: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}
