// Map image loading for HexFog Core
//
// The JS host owns the actual Image object; the core owns the race. While a
// load is outstanding exactly one of success, error or timeout resolves it;
// later arrivals are ignored. A failed non-default URL gets one fallback
// attempt against the built-in default map before the failure is terminal.

use crate::types::{HexFogError, Result};

/// Built-in default map, an inline SVG data URI
pub const DEFAULT_MAP_URL: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' width='1200' height='800' viewBox='0 0 1200 800'%3E%3Crect width='1200' height='800' fill='%23567d46'/%3E%3Cpath d='M0,400 Q300,350 600,500 T1200,400' stroke='%234b93c8' stroke-width='30' fill='none'/%3E%3Cpath d='M800,100 Q850,350 700,600' stroke='%234b93c8' stroke-width='20' fill='none'/%3E%3Ccircle cx='600' cy='450' r='100' fill='%234b93c8'/%3E%3C/svg%3E";

pub const LOAD_TIMEOUT_MS: i64 = 15_000;

/// Reject user-supplied URLs before any load attempt; only http(s) schemes
/// are accepted from input (the built-in fallback is a data URI and never
/// passes through this check).
pub fn validate_map_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        Err(HexFogError::InvalidUrl(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadPhase {
    Idle,
    Loading {
        url: String,
        deadline: i64,
        is_fallback: bool,
    },
    Ready {
        url: String,
        width: u32,
        height: u32,
    },
    Failed {
        url: String,
    },
}

/// What the session must do after feeding an event into the loader
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Success: adopt dimensions, regenerate the grid, reset the view
    Loaded { width: u32, height: u32 },
    /// The host should start fetching this URL (the fallback attempt)
    FallbackRequested { url: String },
    /// Even the default map failed
    TerminalFailure,
    /// The race was already resolved; nothing to do
    Ignored,
}

#[derive(Debug, Default)]
pub struct ImageLoader {
    phase: LoadPhase,
}

impl Default for LoadPhase {
    fn default() -> Self {
        LoadPhase::Idle
    }
}

impl ImageLoader {
    pub fn new() -> ImageLoader {
        ImageLoader { phase: LoadPhase::Idle }
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    /// The URL the host should currently be fetching, if a load is pending
    pub fn pending_url(&self) -> Option<&str> {
        match &self.phase {
            LoadPhase::Loading { url, .. } => Some(url),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, LoadPhase::Ready { .. })
    }

    /// Dimensions of the loaded image, if present
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.phase {
            LoadPhase::Ready { width, height, .. } => Some((width, height)),
            _ => None,
        }
    }

    pub fn loaded_url(&self) -> Option<&str> {
        match &self.phase {
            LoadPhase::Ready { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Start loading a URL, arming the timeout. Replaces any outstanding load.
    pub fn begin(&mut self, url: &str, now_ms: i64) {
        self.phase = LoadPhase::Loading {
            url: url.to_string(),
            deadline: now_ms + LOAD_TIMEOUT_MS,
            is_fallback: url == DEFAULT_MAP_URL,
        };
    }

    /// The host's image fetch succeeded
    pub fn resolve_success(&mut self, width: u32, height: u32) -> LoadOutcome {
        match std::mem::take(&mut self.phase) {
            LoadPhase::Loading { url, .. } => {
                self.phase = LoadPhase::Ready { url, width, height };
                LoadOutcome::Loaded { width, height }
            }
            other => {
                self.phase = other;
                LoadOutcome::Ignored
            }
        }
    }

    /// The host's image fetch failed
    pub fn resolve_error(&mut self, now_ms: i64) -> LoadOutcome {
        self.fail(now_ms)
    }

    /// Drive the timeout deadline; a timed-out load counts as an error
    pub fn tick(&mut self, now_ms: i64) -> LoadOutcome {
        match &self.phase {
            LoadPhase::Loading { deadline, .. } if now_ms >= *deadline => self.fail(now_ms),
            _ => LoadOutcome::Ignored,
        }
    }

    fn fail(&mut self, now_ms: i64) -> LoadOutcome {
        match std::mem::take(&mut self.phase) {
            LoadPhase::Loading { url, is_fallback, .. } => {
                if is_fallback {
                    self.phase = LoadPhase::Failed { url };
                    LoadOutcome::TerminalFailure
                } else {
                    self.begin(DEFAULT_MAP_URL, now_ms);
                    LoadOutcome::FallbackRequested {
                        url: DEFAULT_MAP_URL.to_string(),
                    }
                }
            }
            other => {
                self.phase = other;
                LoadOutcome::Ignored
            }
        }
    }
}
