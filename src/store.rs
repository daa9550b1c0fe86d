// Persisted documents for HexFog Core
//
// Two codecs with deliberately different strictness:
//  - the session document (what the host keeps in its key-value store) is
//    lenient: each field defaults independently and the document is never
//    rejected wholesale;
//  - the export/import document is whole-or-nothing: a missing required
//    top-level shape rejects the import and leaves current state untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{
    AppearanceSettings, GridConfig, HexFogError, Result, RevealedSet, Token, ViewState,
};

/// The flat `settings` object: grid config and appearance side by side,
/// matching the persisted shape (`hexSize`, `columnCount`, `fogColor`, ...)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SettingsDoc {
    #[serde(flatten)]
    pub grid: GridConfig,
    #[serde(flatten)]
    pub appearance: AppearanceSettings,
}

impl SettingsDoc {
    pub fn clamped(self) -> SettingsDoc {
        SettingsDoc {
            grid: self.grid.clamped(),
            appearance: self.appearance.clamped(),
        }
    }
}

/// One JSON document per session in the host's key-value store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    pub revealed_hexes: RevealedSet,
    pub settings: SettingsDoc,
    pub view: ViewState,
    pub tokens: Vec<Token>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
}

/// Lenient parse: a malformed document or field falls back to defaults for
/// that field only, never rejecting the rest.
pub fn parse_session_document(json: &str) -> SessionDocument {
    let value: Value = serde_json::from_str(json).unwrap_or(Value::Null);

    SessionDocument {
        revealed_hexes: lenient_field(&value, "revealedHexes"),
        settings: lenient_field::<SettingsDoc>(&value, "settings").clamped(),
        view: lenient_field(&value, "view"),
        tokens: lenient_field(&value, "tokens"),
        map_url: value
            .get("mapUrl")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
    }
}

fn lenient_field<T: DeserializeOwned + Default>(value: &Value, key: &str) -> T {
    value
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// Full logical state for export: the session document fields plus a format
/// version and a timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub timestamp: String,
    pub map_url: String,
    pub settings: SettingsDoc,
    pub view: ViewState,
    pub tokens: Vec<Token>,
    pub revealed_hexes: RevealedSet,
}

pub const EXPORT_VERSION: u32 = 2;

/// Parsed import. `settings` and `revealedHexes` are the required top-level
/// shape; everything else falls back to current values when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    pub settings: SettingsDoc,
    pub revealed_hexes: RevealedSet,
    #[serde(default)]
    pub view: Option<ViewState>,
    #[serde(default)]
    pub tokens: Option<Vec<Token>>,
    #[serde(default)]
    pub map_url: Option<String>,
}

/// Strict parse for imports: rejected as a whole when the required shape is
/// missing or the JSON is malformed.
pub fn parse_import_document(json: &str) -> Result<ImportDocument> {
    serde_json::from_str(json).map_err(|e| HexFogError::ImportRejected(e.to_string()))
}
