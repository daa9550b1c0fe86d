// Session controller for HexFog Core
//
// MapSession exclusively owns the hex and token stores plus every piece of
// mutable session state. The spatial indexes are derived, disposable caches
// rebuilt from the stores on structural change, never a source of truth.
// Every mutation goes through an explicit method that mutates, marks the
// dirty flag and notifies subscribers; there are no hidden globals.

use std::collections::VecDeque;

use wasm_bindgen::prelude::*;

use crate::grid;
use crate::hit::{self, TOKEN_RADIUS_FACTOR};
use crate::history::HistoryManager;
use crate::interaction::{
    InteractionMode, InteractionStateMachine, PointerButton, PressAction, PressHits, ReleaseAction,
};
use crate::loader::{self, ImageLoader, LoadOutcome};
use crate::spatial::SpatialHashGrid;
use crate::store::{
    parse_import_document, parse_session_document, ExportDocument, SessionDocument, SettingsDoc,
    EXPORT_VERSION,
};
use crate::transform;
use crate::types::{
    AppearanceSettings, Bounds, GridConfig, HexFogError, Point, Result, RevealedSet, Snapshot,
    Token, ViewState,
};
use crate::utils::{now, Debouncer};

/// Debounce window for persisting high-frequency slider input
const SAVE_DEBOUNCE_MS: i64 = 250;

/// Capped in-app debug log length
const DEBUG_LOG_CAP: usize = 50;

/// What changed, for subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Grid,
    Reveal,
    Tokens,
    PendingToken,
    View,
    Selection,
    Mode,
    Image,
    History,
}

impl ChangeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::Grid => "grid",
            ChangeEvent::Reveal => "reveal",
            ChangeEvent::Tokens => "tokens",
            ChangeEvent::PendingToken => "pendingToken",
            ChangeEvent::View => "view",
            ChangeEvent::Selection => "selection",
            ChangeEvent::Mode => "mode",
            ChangeEvent::Image => "image",
            ChangeEvent::History => "history",
        }
    }
}

#[wasm_bindgen]
pub struct MapSession {
    grid_config: GridConfig,
    appearance: AppearanceSettings,
    hexes: Vec<crate::types::Hex>,
    hex_index: SpatialHashGrid<usize>,
    revealed: RevealedSet,
    tokens: Vec<Token>,
    token_index: SpatialHashGrid<usize>,
    view: ViewState,
    reveal_mode: bool,
    machine: InteractionStateMachine,
    history: HistoryManager,
    loader: ImageLoader,
    map_url: String,
    pending_token: Option<Point>,
    last_pointer: Point,
    dirty: bool,
    save_requested: bool,
    save_debounce: Debouncer,
    status: Option<String>,
    debug_log: VecDeque<String>,
    subscribers: Vec<Box<dyn FnMut(ChangeEvent)>>,
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new()
    }
}

// Core API (native Rust; the WASM facade below delegates here)
impl MapSession {
    pub fn new() -> MapSession {
        let grid_config = GridConfig::default();
        let mut session = MapSession {
            grid_config,
            appearance: AppearanceSettings::default(),
            hexes: Vec::new(),
            hex_index: SpatialHashGrid::new(grid_config.hex_size * 2.0),
            revealed: RevealedSet::new(),
            tokens: Vec::new(),
            token_index: SpatialHashGrid::new(grid_config.hex_size * 2.0),
            view: ViewState::default(),
            reveal_mode: true,
            machine: InteractionStateMachine::new(),
            history: HistoryManager::new(),
            loader: ImageLoader::new(),
            map_url: String::new(),
            pending_token: None,
            last_pointer: Point::default(),
            dirty: false,
            save_requested: false,
            save_debounce: Debouncer::new(SAVE_DEBOUNCE_MS),
            status: None,
            debug_log: VecDeque::new(),
            subscribers: Vec::new(),
        };
        session.regenerate_grid();
        // The initial state is the undo floor
        session.history.push(session.snapshot());
        session.dirty = false;
        session
    }

    pub fn subscribe_fn(&mut self, subscriber: Box<dyn FnMut(ChangeEvent)>) {
        self.subscribers.push(subscriber);
    }

    fn notify(&mut self, event: ChangeEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn request_save(&mut self) {
        self.save_requested = true;
    }

    fn set_status(&mut self, message: &str) {
        self.status = Some(message.to_string());
        self.log(message);
    }

    /// Append a timestamped entry to the capped debug log
    pub fn log(&mut self, message: &str) {
        let stamp = chrono::Utc::now().format("%H:%M:%S");
        crate::utils::console_log(message);
        self.debug_log.push_front(format!("[{}] {}", stamp, message));
        while self.debug_log.len() > DEBUG_LOG_CAP {
            self.debug_log.pop_back();
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // Configuration
    // ──────────────────────────────────────────────────────────────────────

    pub fn grid_config(&self) -> &GridConfig {
        &self.grid_config
    }

    pub fn appearance(&self) -> &AppearanceSettings {
        &self.appearance
    }

    /// Adopt a (possibly out-of-range) grid config and regenerate the grid
    pub fn set_grid_config(&mut self, config: GridConfig) {
        self.grid_config = config.clamped();
        self.regenerate_grid();
        self.rebuild_token_index();
        self.mark_dirty();
        self.request_save();
        self.notify(ChangeEvent::Grid);
    }

    pub fn set_appearance(&mut self, appearance: AppearanceSettings) {
        self.appearance = appearance.clamped();
        self.mark_dirty();
        self.request_save();
    }

    /// Slider input: apply immediately, persist debounced (trailing edge)
    pub fn set_fog_opacity(&mut self, opacity: f64, now_ms: i64) {
        self.appearance.fog_opacity = opacity.clamp(0.0, 1.0);
        self.mark_dirty();
        self.save_debounce.schedule(now_ms);
    }

    pub fn set_grid_thickness(&mut self, thickness: f64, now_ms: i64) {
        self.appearance.grid_thickness = thickness.clamp(0.1, 10.0);
        self.mark_dirty();
        self.save_debounce.schedule(now_ms);
    }

    /// Rebuild the hex store and its index from the current config.
    /// `revealed` flags are re-derived from the RevealedSet, never carried
    /// over from the previous hex objects.
    fn regenerate_grid(&mut self) {
        self.hexes = grid::generate(&self.grid_config, &self.revealed);
        self.hex_index.clear(Some(self.grid_config.hex_size * 2.0));
        for (i, hex) in self.hexes.iter().enumerate() {
            self.hex_index.insert(i, &grid::hex_bounds(hex));
        }
        self.mark_dirty();
    }

    fn rebuild_token_index(&mut self) {
        self.token_index.clear(Some(self.grid_config.hex_size * 2.0));
        let radius = self.grid_config.hex_size * TOKEN_RADIUS_FACTOR;
        for (i, t) in self.tokens.iter().enumerate() {
            self.token_index.insert(
                i,
                &Bounds::new(t.x - radius, t.y - radius, t.x + radius, t.y + radius),
            );
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // Stores
    // ──────────────────────────────────────────────────────────────────────

    pub fn hexes(&self) -> &[crate::types::Hex] {
        &self.hexes
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn revealed(&self) -> &RevealedSet {
        &self.revealed
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn reveal_mode(&self) -> bool {
        self.reveal_mode
    }

    pub fn mode(&self) -> InteractionMode {
        self.machine.mode()
    }

    pub fn pending_token_position(&self) -> Option<Point> {
        self.pending_token
    }

    fn token_index_by_id(&self, id: &str) -> Option<usize> {
        self.tokens.iter().position(|t| t.id == id)
    }

    // ──────────────────────────────────────────────────────────────────────
    // History
    // ──────────────────────────────────────────────────────────────────────

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            revealed: self.revealed.clone(),
            tokens: self.tokens.clone(),
            zoom_level: self.view.zoom_level,
            pan_x: self.view.pan_x,
            pan_y: self.view.pan_y,
        }
    }

    fn push_history(&mut self) {
        let snapshot = self.snapshot();
        self.history.push(snapshot);
        self.notify(ChangeEvent::History);
    }

    /// Overwrite revealed/tokens/view from a snapshot. Hex geometry is
    /// untouched (it did not change); only the revealed flags are refreshed.
    fn restore(&mut self, snapshot: Snapshot) {
        self.revealed = snapshot.revealed;
        self.tokens = snapshot.tokens;
        self.view.zoom_level = snapshot.zoom_level;
        self.view.pan_x = snapshot.pan_x;
        self.view.pan_y = snapshot.pan_y;

        // Drop a selection whose token no longer exists after the restore
        if let Some(selected) = self.view.selected.clone() {
            if self.token_index_by_id(&selected).is_none() {
                self.view.selected = None;
                self.notify(ChangeEvent::Selection);
            }
        }

        self.rebuild_token_index();
        for hex in &mut self.hexes {
            hex.revealed = self.revealed.get(&hex.id).copied().unwrap_or(false);
        }

        self.mark_dirty();
        self.request_save();
        self.notify(ChangeEvent::Reveal);
        self.notify(ChangeEvent::Tokens);
        self.notify(ChangeEvent::View);
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                self.notify(ChangeEvent::History);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                self.notify(ChangeEvent::History);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ──────────────────────────────────────────────────────────────────────
    // Pointer input
    // ──────────────────────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, screen_x: f64, screen_y: f64, button: PointerButton) {
        if !self.loader.is_ready() {
            return;
        }

        let world = transform::screen_to_world(&self.view, Point { x: screen_x, y: screen_y });
        let hits = self.resolve_hits(world);
        let action = self.machine.on_press(button, &hits);
        self.notify(ChangeEvent::Mode);

        match action {
            PressAction::BeginPan => {
                self.last_pointer = Point { x: screen_x, y: screen_y };
            }
            PressAction::BeginTokenDrag { token_id } => {
                self.view.selected = Some(token_id);
                self.mark_dirty();
                self.notify(ChangeEvent::Selection);
            }
            PressAction::StagePendingToken => {
                self.pending_token = Some(world);
                self.notify(ChangeEvent::PendingToken);
            }
            PressAction::RemoveToken { token_id } => {
                // The machine only emits this for a confirmed hit
                if self.remove_token(&token_id).is_ok() {
                    self.set_status("Token removed");
                }
            }
            PressAction::RemoveMissed => {
                self.set_status("No token at that position");
            }
            PressAction::ToggleHex { hex_id } => {
                self.toggle_hex(&hex_id);
            }
            PressAction::ClearSelection => {
                if self.view.selected.take().is_some() {
                    self.mark_dirty();
                    self.notify(ChangeEvent::Selection);
                }
            }
            PressAction::None => {}
        }
    }

    pub fn pointer_move(&mut self, screen_x: f64, screen_y: f64) {
        if !self.loader.is_ready() {
            return;
        }

        match self.machine.mode() {
            InteractionMode::Panning => {
                let dx = screen_x - self.last_pointer.x;
                let dy = screen_y - self.last_pointer.y;
                transform::pan_by(&mut self.view, dx, dy);
                self.last_pointer = Point { x: screen_x, y: screen_y };
                self.mark_dirty();
                self.notify(ChangeEvent::View);
            }
            InteractionMode::DraggingToken => {
                // Live position update only; no index rebuild, no history
                let world =
                    transform::screen_to_world(&self.view, Point { x: screen_x, y: screen_y });
                if let Some(id) = self.machine.dragging_token().map(str::to_string) {
                    if let Some(i) = self.token_index_by_id(&id) {
                        self.tokens[i].x = world.x;
                        self.tokens[i].y = world.y;
                        self.mark_dirty();
                        self.notify(ChangeEvent::Tokens);
                    }
                }
            }
            _ => {}
        }
    }

    pub fn pointer_up(&mut self) {
        match self.machine.on_release() {
            ReleaseAction::EndPan => {
                self.request_save();
                self.notify(ChangeEvent::Mode);
            }
            ReleaseAction::EndTokenDrag { .. } => {
                // Exactly one history push for the whole drag
                self.rebuild_token_index();
                self.push_history();
                self.request_save();
                self.notify(ChangeEvent::Mode);
                self.notify(ChangeEvent::Tokens);
            }
            ReleaseAction::None => {}
        }
    }

    fn resolve_hits(&self, world: Point) -> PressHits {
        let token = hit::token_at(
            world.x,
            world.y,
            &self.tokens,
            &self.token_index,
            self.grid_config.hex_size,
        )
        .map(|i| self.tokens[i].id.clone());

        // Only a hex whose state disagrees with the active mode's target is
        // eligible; clicking an agreeing hex must not create history entries.
        let eligible_hex = if token.is_none() {
            hit::hex_at(world.x, world.y, &self.hexes, &self.hex_index)
                .filter(|&i| self.hexes[i].revealed != self.reveal_mode)
                .map(|i| self.hexes[i].id.clone())
        } else {
            None
        };

        PressHits { token, eligible_hex }
    }

    /// Query helpers for the presentation layer (hover display)
    pub fn hex_id_at(&self, screen_x: f64, screen_y: f64) -> Option<String> {
        let world = transform::screen_to_world(&self.view, Point { x: screen_x, y: screen_y });
        hit::hex_at(world.x, world.y, &self.hexes, &self.hex_index).map(|i| self.hexes[i].id.clone())
    }

    pub fn token_id_at(&self, screen_x: f64, screen_y: f64) -> Option<String> {
        let world = transform::screen_to_world(&self.view, Point { x: screen_x, y: screen_y });
        hit::token_at(
            world.x,
            world.y,
            &self.tokens,
            &self.token_index,
            self.grid_config.hex_size,
        )
        .map(|i| self.tokens[i].id.clone())
    }

    // ──────────────────────────────────────────────────────────────────────
    // Reveal / hide
    // ──────────────────────────────────────────────────────────────────────

    pub fn toggle_reveal_mode(&mut self) -> bool {
        self.reveal_mode = !self.reveal_mode;
        self.mark_dirty();
        self.notify(ChangeEvent::Mode);
        self.reveal_mode
    }

    fn toggle_hex(&mut self, hex_id: &str) {
        let Some(i) = self.hexes.iter().position(|h| h.id == hex_id) else {
            return;
        };

        if self.reveal_mode {
            self.revealed.insert(hex_id.to_string(), true);
            self.hexes[i].revealed = true;
        } else {
            self.revealed.remove(hex_id);
            self.hexes[i].revealed = false;
        }

        self.push_history();
        self.request_save();
        self.mark_dirty();
        self.notify(ChangeEvent::Reveal);
    }

    /// Hide everything again, regardless of current grid dimensions
    pub fn reset_map(&mut self) {
        self.revealed.clear();
        for hex in &mut self.hexes {
            hex.revealed = false;
        }
        self.push_history();
        self.request_save();
        self.mark_dirty();
        self.notify(ChangeEvent::Reveal);
        self.set_status("Map has been reset");
    }

    // ──────────────────────────────────────────────────────────────────────
    // Tokens
    // ──────────────────────────────────────────────────────────────────────

    pub fn toggle_add_token_mode(&mut self) -> bool {
        let adding = self.machine.toggle_adding();
        if !adding {
            // Leaving Adding mode discards any staged, uncommitted token
            self.pending_token = None;
        }
        self.notify(ChangeEvent::Mode);
        adding
    }

    pub fn toggle_remove_token_mode(&mut self) -> bool {
        self.pending_token = None;
        let removing = self.machine.toggle_removing();
        self.notify(ChangeEvent::Mode);
        removing
    }

    /// Commit the staged token with input from the presentation layer.
    /// Returns the new token's id.
    pub fn confirm_pending_token(
        &mut self,
        label: Option<String>,
        icon: Option<String>,
        notes: Option<String>,
    ) -> Result<String> {
        let position = self.pending_token.take().ok_or_else(|| {
            HexFogError::InvalidOperation("no pending token to confirm".to_string())
        })?;

        let mut token = Token::new(position.x, position.y, self.appearance.token_color.clone());
        token.label = label.filter(|s| !s.is_empty());
        token.icon = icon.filter(|s| !s.is_empty());
        token.notes = notes.filter(|s| !s.is_empty());
        let id = token.id.clone();

        self.tokens.push(token);
        self.view.selected = Some(id.clone());

        // One token per Adding session, like the original flow
        if self.machine.mode() == InteractionMode::AddingToken {
            self.machine.toggle_adding();
        }

        self.rebuild_token_index();
        self.push_history();
        self.request_save();
        self.mark_dirty();
        self.notify(ChangeEvent::Tokens);
        self.notify(ChangeEvent::Selection);
        self.notify(ChangeEvent::Mode);
        Ok(id)
    }

    /// Discard the staged token without mutating anything
    pub fn cancel_pending_token(&mut self) {
        self.pending_token = None;
        if self.machine.mode() == InteractionMode::AddingToken {
            self.machine.toggle_adding();
        }
        self.notify(ChangeEvent::PendingToken);
        self.notify(ChangeEvent::Mode);
    }

    pub fn remove_token(&mut self, token_id: &str) -> Result<()> {
        let i = self
            .token_index_by_id(token_id)
            .ok_or_else(|| HexFogError::TokenNotFound(token_id.to_string()))?;

        self.tokens.remove(i);
        if self.view.selected.as_deref() == Some(token_id) {
            self.view.selected = None;
            self.notify(ChangeEvent::Selection);
        }

        self.rebuild_token_index();
        self.push_history();
        self.request_save();
        self.mark_dirty();
        self.notify(ChangeEvent::Tokens);
        Ok(())
    }

    pub fn delete_selected_token(&mut self) -> bool {
        match self.view.selected.clone() {
            Some(id) => self.remove_token(&id).is_ok(),
            None => false,
        }
    }

    pub fn clear_tokens(&mut self) {
        if self.tokens.is_empty() {
            self.set_status("No tokens to clear");
            return;
        }

        self.tokens.clear();
        self.view.selected = None;
        self.rebuild_token_index();
        self.push_history();
        self.request_save();
        self.mark_dirty();
        self.notify(ChangeEvent::Tokens);
        self.notify(ChangeEvent::Selection);
        self.set_status("All tokens removed");
    }

    /// Escape: cancel Adding/Removing, else clear the selection
    pub fn press_escape(&mut self) {
        match self.machine.mode() {
            InteractionMode::AddingToken => {
                self.pending_token = None;
                self.machine.cancel();
                self.notify(ChangeEvent::Mode);
            }
            InteractionMode::RemovingToken => {
                self.machine.cancel();
                self.notify(ChangeEvent::Mode);
            }
            _ => {
                if self.view.selected.take().is_some() {
                    self.mark_dirty();
                    self.notify(ChangeEvent::Selection);
                }
            }
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // View
    // ──────────────────────────────────────────────────────────────────────

    pub fn zoom_at(&mut self, screen_x: f64, screen_y: f64, factor: f64) {
        transform::zoom_at(&mut self.view, screen_x, screen_y, factor);
        self.mark_dirty();
        self.request_save();
        self.notify(ChangeEvent::View);
    }

    /// Wheel input: one notch scales by 1.1 (up) or 0.9 (down)
    pub fn wheel_zoom(&mut self, screen_x: f64, screen_y: f64, delta_y: f64) {
        let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
        self.zoom_at(screen_x, screen_y, factor);
    }

    pub fn reset_view(&mut self) {
        self.view.zoom_level = 1.0;
        self.view.pan_x = 0.0;
        self.view.pan_y = 0.0;
        self.view.selected = None;
        self.pending_token = None;
        self.machine.cancel();
        self.mark_dirty();
        self.request_save();
        self.notify(ChangeEvent::View);
        self.notify(ChangeEvent::Selection);
        self.notify(ChangeEvent::Mode);
    }

    // ──────────────────────────────────────────────────────────────────────
    // Map image
    // ──────────────────────────────────────────────────────────────────────

    pub fn is_image_ready(&self) -> bool {
        self.loader.is_ready()
    }

    pub fn map_url(&self) -> &str {
        &self.map_url
    }

    pub fn pending_load_url(&self) -> Option<String> {
        self.loader.pending_url().map(str::to_string)
    }

    /// Validate a user-supplied URL and start loading it
    pub fn request_map_load(&mut self, url: &str, now_ms: i64) -> Result<()> {
        loader::validate_map_url(url).inspect_err(|_| {
            self.set_status("Invalid map URL; only http(s) is accepted");
        })?;

        self.loader.begin(url.trim(), now_ms);
        self.notify(ChangeEvent::Image);
        Ok(())
    }

    /// Begin the boot-time load: the persisted URL if any, else the default
    pub fn load_initial_map(&mut self, now_ms: i64) {
        let url = if self.map_url.trim().is_empty() {
            loader::DEFAULT_MAP_URL.to_string()
        } else {
            self.map_url.clone()
        };
        self.loader.begin(&url, now_ms);
        self.notify(ChangeEvent::Image);
    }

    /// The host's image fetch succeeded
    pub fn image_loaded(&mut self, width: u32, height: u32) {
        match self.loader.resolve_success(width, height) {
            LoadOutcome::Loaded { .. } => {
                if let Some(url) = self.loader.loaded_url() {
                    self.map_url = url.to_string();
                }
                self.regenerate_grid();
                self.rebuild_token_index();
                self.reset_view();
                self.request_save();
                self.notify(ChangeEvent::Image);
                self.notify(ChangeEvent::Grid);
                self.set_status("Map loaded successfully");
            }
            _ => {}
        }
    }

    /// The host's image fetch failed
    pub fn image_failed(&mut self, now_ms: i64) {
        let outcome = self.loader.resolve_error(now_ms);
        self.handle_load_failure(outcome);
    }

    fn handle_load_failure(&mut self, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::FallbackRequested { .. } => {
                self.set_status("Error loading map; falling back to the default map");
                self.notify(ChangeEvent::Image);
            }
            LoadOutcome::TerminalFailure => {
                self.set_status("Critical error: could not load any map");
                self.notify(ChangeEvent::Image);
            }
            _ => {}
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // Clock
    // ──────────────────────────────────────────────────────────────────────

    /// Drive deadlines: the image-load timeout and the debounced save flush
    pub fn tick(&mut self, now_ms: i64) {
        let outcome = self.loader.tick(now_ms);
        self.handle_load_failure(outcome);

        if self.save_debounce.tick(now_ms) {
            self.request_save();
        }
    }

    /// Force any pending debounced save through (page unload)
    pub fn flush_pending_save(&mut self) {
        if self.save_debounce.flush() {
            self.request_save();
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // Host drains
    // ──────────────────────────────────────────────────────────────────────

    /// Drain the dirty flag; the host redraws at most once per frame
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn take_save_request(&mut self) -> bool {
        std::mem::take(&mut self.save_requested)
    }

    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    // ──────────────────────────────────────────────────────────────────────
    // Persistence / export / import
    // ──────────────────────────────────────────────────────────────────────

    fn settings_doc(&self) -> SettingsDoc {
        SettingsDoc {
            grid: self.grid_config,
            appearance: self.appearance.clone(),
        }
    }

    pub fn to_session_document(&self) -> SessionDocument {
        SessionDocument {
            revealed_hexes: self.revealed.clone(),
            settings: self.settings_doc(),
            view: self.view.clone(),
            tokens: self.tokens.clone(),
            map_url: if self.map_url.trim().is_empty() {
                None
            } else {
                Some(self.map_url.clone())
            },
        }
    }

    /// Apply a persisted session document (lenient; boot time). Replaces the
    /// undo history, with the loaded state as the new floor.
    pub fn load_session_document(&mut self, json: &str) {
        let doc = parse_session_document(json);

        self.grid_config = doc.settings.grid;
        self.appearance = doc.settings.appearance;
        self.revealed = doc.revealed_hexes;
        self.tokens = doc.tokens;
        self.view.zoom_level = doc.view.zoom_level.clamp(crate::types::MIN_ZOOM, crate::types::MAX_ZOOM);
        self.view.pan_x = doc.view.pan_x;
        self.view.pan_y = doc.view.pan_y;
        self.view.selected = None;
        self.map_url = doc.map_url.unwrap_or_default();

        self.regenerate_grid();
        self.rebuild_token_index();

        self.history = HistoryManager::new();
        self.history.push(self.snapshot());

        self.mark_dirty();
        self.notify(ChangeEvent::Grid);
        self.notify(ChangeEvent::Tokens);
        self.notify(ChangeEvent::View);
        self.log("Loaded saved state");
    }

    pub fn export_json(&self) -> Result<String> {
        let export = ExportDocument {
            version: EXPORT_VERSION,
            timestamp: chrono::Utc::now().to_rfc3339(),
            map_url: self.map_url.clone(),
            settings: self.settings_doc(),
            view: self.view.clone(),
            tokens: self.tokens.clone(),
            revealed_hexes: self.revealed.clone(),
        };

        serde_json::to_string_pretty(&export).map_err(|e| HexFogError::Serialization(e.to_string()))
    }

    /// Whole-or-nothing import: a malformed document leaves state untouched
    /// and surfaces one error; missing optional fields keep current values.
    pub fn import_json(&mut self, json: &str, now_ms: i64) -> Result<()> {
        let doc = match parse_import_document(json) {
            Ok(doc) => doc,
            Err(e) => {
                self.set_status("Error importing file; please check the file format");
                return Err(e);
            }
        };

        let settings = doc.settings.clamped();
        self.grid_config = settings.grid;
        self.appearance = settings.appearance;
        self.revealed = doc.revealed_hexes;

        if let Some(view) = doc.view {
            self.view.zoom_level = view.zoom_level.clamp(crate::types::MIN_ZOOM, crate::types::MAX_ZOOM);
            self.view.pan_x = view.pan_x;
            self.view.pan_y = view.pan_y;
        }
        if let Some(tokens) = doc.tokens {
            self.tokens = tokens;
        }
        self.view.selected = None;

        self.regenerate_grid();
        self.rebuild_token_index();

        if let Some(url) = doc.map_url.filter(|u| !u.trim().is_empty()) {
            self.map_url = url.clone();
            self.loader.begin(&url, now_ms);
            self.notify(ChangeEvent::Image);
        }

        self.push_history();
        self.request_save();
        self.mark_dirty();
        self.notify(ChangeEvent::Grid);
        self.notify(ChangeEvent::Tokens);
        self.notify(ChangeEvent::View);
        self.set_status("Map state imported successfully");
        Ok(())
    }
}

// WASM facade: camelCase aliases over the core API, JSON strings at the
// boundary like the rest of the interop surface.
#[wasm_bindgen]
impl MapSession {
    #[wasm_bindgen(constructor)]
    pub fn create() -> MapSession {
        MapSession::new()
    }

    /// Register a subscriber invoked with the change kind name
    #[wasm_bindgen(js_name = subscribe)]
    pub fn subscribe_js(&mut self, callback: js_sys::Function) {
        self.subscribe_fn(Box::new(move |event| {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(event.name()));
        }));
    }

    /// Pointer press with a DOM button code (0 primary, 1 middle, 2 secondary)
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down_js(&mut self, screen_x: f64, screen_y: f64, button: u8) {
        let button = match button {
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => PointerButton::Primary,
        };
        self.pointer_down(screen_x, screen_y, button);
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move_js(&mut self, screen_x: f64, screen_y: f64) {
        self.pointer_move(screen_x, screen_y);
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up_js(&mut self) {
        self.pointer_up();
    }

    #[wasm_bindgen(js_name = wheelZoom)]
    pub fn wheel_zoom_js(&mut self, screen_x: f64, screen_y: f64, delta_y: f64) {
        self.wheel_zoom(screen_x, screen_y, delta_y);
    }

    #[wasm_bindgen(js_name = pressEscape)]
    pub fn press_escape_js(&mut self) {
        self.press_escape();
    }

    #[wasm_bindgen(js_name = deleteSelectedToken)]
    pub fn delete_selected_token_js(&mut self) -> bool {
        self.delete_selected_token()
    }

    #[wasm_bindgen(js_name = toggleRevealMode)]
    pub fn toggle_reveal_mode_js(&mut self) -> bool {
        self.toggle_reveal_mode()
    }

    #[wasm_bindgen(js_name = toggleAddTokenMode)]
    pub fn toggle_add_token_mode_js(&mut self) -> bool {
        self.toggle_add_token_mode()
    }

    #[wasm_bindgen(js_name = toggleRemoveTokenMode)]
    pub fn toggle_remove_token_mode_js(&mut self) -> bool {
        self.toggle_remove_token_mode()
    }

    #[wasm_bindgen(js_name = confirmPendingToken)]
    pub fn confirm_pending_token_js(
        &mut self,
        label: Option<String>,
        icon: Option<String>,
        notes: Option<String>,
    ) -> std::result::Result<String, JsValue> {
        self.confirm_pending_token(label, icon, notes).map_err(Into::into)
    }

    #[wasm_bindgen(js_name = cancelPendingToken)]
    pub fn cancel_pending_token_js(&mut self) {
        self.cancel_pending_token();
    }

    #[wasm_bindgen(js_name = pendingTokenPosition)]
    pub fn pending_token_position_js(&self) -> Option<Point> {
        self.pending_token_position()
    }

    #[wasm_bindgen(js_name = undo)]
    pub fn undo_js(&mut self) -> bool {
        self.undo()
    }

    #[wasm_bindgen(js_name = redo)]
    pub fn redo_js(&mut self) -> bool {
        self.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo_js(&self) -> bool {
        self.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo_js(&self) -> bool {
        self.can_redo()
    }

    #[wasm_bindgen(js_name = resetMap)]
    pub fn reset_map_js(&mut self) {
        self.reset_map();
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view_js(&mut self) {
        self.reset_view();
    }

    #[wasm_bindgen(js_name = clearTokens)]
    pub fn clear_tokens_js(&mut self) {
        self.clear_tokens();
    }

    #[wasm_bindgen(js_name = setGridConfigJson)]
    pub fn set_grid_config_json(&mut self, json: &str) -> std::result::Result<(), JsValue> {
        let config: GridConfig = serde_json::from_str(json)
            .map_err(|e| HexFogError::Serialization(e.to_string()))?;
        self.set_grid_config(config);
        Ok(())
    }

    #[wasm_bindgen(js_name = setAppearanceJson)]
    pub fn set_appearance_json(&mut self, json: &str) -> std::result::Result<(), JsValue> {
        let appearance: AppearanceSettings = serde_json::from_str(json)
            .map_err(|e| HexFogError::Serialization(e.to_string()))?;
        self.set_appearance(appearance);
        Ok(())
    }

    #[wasm_bindgen(js_name = setFogOpacity)]
    pub fn set_fog_opacity_js(&mut self, opacity: f64) {
        self.set_fog_opacity(opacity, now());
    }

    #[wasm_bindgen(js_name = setGridThickness)]
    pub fn set_grid_thickness_js(&mut self, thickness: f64) {
        self.set_grid_thickness(thickness, now());
    }

    #[wasm_bindgen(js_name = requestMapLoad)]
    pub fn request_map_load_js(&mut self, url: &str) -> std::result::Result<(), JsValue> {
        self.request_map_load(url, now()).map_err(Into::into)
    }

    #[wasm_bindgen(js_name = loadInitialMap)]
    pub fn load_initial_map_js(&mut self) {
        self.load_initial_map(now());
    }

    #[wasm_bindgen(js_name = imageLoaded)]
    pub fn image_loaded_js(&mut self, width: u32, height: u32) {
        self.image_loaded(width, height);
    }

    #[wasm_bindgen(js_name = imageFailed)]
    pub fn image_failed_js(&mut self) {
        self.image_failed(now());
    }

    #[wasm_bindgen(js_name = pendingLoadUrl)]
    pub fn pending_load_url_js(&self) -> Option<String> {
        self.pending_load_url()
    }

    #[wasm_bindgen(js_name = isImageReady)]
    pub fn is_image_ready_js(&self) -> bool {
        self.is_image_ready()
    }

    #[wasm_bindgen(js_name = tick)]
    pub fn tick_js(&mut self) {
        self.tick(now());
    }

    #[wasm_bindgen(js_name = flushPendingSave)]
    pub fn flush_pending_save_js(&mut self) {
        self.flush_pending_save();
    }

    #[wasm_bindgen(js_name = takeRedrawRequest)]
    pub fn take_redraw_request_js(&mut self) -> bool {
        self.take_redraw_request()
    }

    #[wasm_bindgen(js_name = takeSaveRequest)]
    pub fn take_save_request_js(&mut self) -> bool {
        self.take_save_request()
    }

    #[wasm_bindgen(js_name = takeStatus)]
    pub fn take_status_js(&mut self) -> Option<String> {
        self.take_status()
    }

    #[wasm_bindgen(js_name = hexIdAt)]
    pub fn hex_id_at_js(&self, screen_x: f64, screen_y: f64) -> Option<String> {
        self.hex_id_at(screen_x, screen_y)
    }

    #[wasm_bindgen(js_name = tokenIdAt)]
    pub fn token_id_at_js(&self, screen_x: f64, screen_y: f64) -> Option<String> {
        self.token_id_at(screen_x, screen_y)
    }

    #[wasm_bindgen(js_name = modeName)]
    pub fn mode_name(&self) -> String {
        serde_json::to_value(self.mode())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    #[wasm_bindgen(js_name = revealMode)]
    pub fn reveal_mode_js(&self) -> bool {
        self.reveal_mode()
    }

    #[wasm_bindgen(js_name = mapUrl)]
    pub fn map_url_js(&self) -> String {
        self.map_url.clone()
    }

    #[wasm_bindgen(js_name = hexesJson)]
    pub fn hexes_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(&self.hexes)
            .map_err(|e| HexFogError::Serialization(e.to_string()).into())
    }

    #[wasm_bindgen(js_name = tokensJson)]
    pub fn tokens_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(&self.tokens)
            .map_err(|e| HexFogError::Serialization(e.to_string()).into())
    }

    #[wasm_bindgen(js_name = viewJson)]
    pub fn view_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(&self.view)
            .map_err(|e| HexFogError::Serialization(e.to_string()).into())
    }

    #[wasm_bindgen(js_name = settingsJson)]
    pub fn settings_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(&self.settings_doc())
            .map_err(|e| HexFogError::Serialization(e.to_string()).into())
    }

    #[wasm_bindgen(js_name = selectedTokenId)]
    pub fn selected_token_id(&self) -> Option<String> {
        self.view.selected.clone()
    }

    #[wasm_bindgen(js_name = debugLogJson)]
    pub fn debug_log_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(&self.debug_log)
            .map_err(|e| HexFogError::Serialization(e.to_string()).into())
    }

    #[wasm_bindgen(js_name = saveDocumentJson)]
    pub fn save_document_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(&self.to_session_document())
            .map_err(|e| HexFogError::Serialization(e.to_string()).into())
    }

    #[wasm_bindgen(js_name = loadDocumentJson)]
    pub fn load_document_json(&mut self, json: &str) {
        self.load_session_document(json);
    }

    #[wasm_bindgen(js_name = exportJson)]
    pub fn export_json_js(&self) -> std::result::Result<String, JsValue> {
        self.export_json().map_err(Into::into)
    }

    #[wasm_bindgen(js_name = importJson)]
    pub fn import_json_js(&mut self, json: &str) -> std::result::Result<(), JsValue> {
        self.import_json(json, now()).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A session with the image already loaded, like after boot
    fn ready_session() -> MapSession {
        let mut session = MapSession::new();
        session.load_initial_map(0);
        session.image_loaded(1200, 800);
        session
    }

    fn press_at(session: &mut MapSession, x: f64, y: f64) {
        session.pointer_down(x, y, PointerButton::Primary);
        session.pointer_up();
    }

    #[test]
    fn test_pointer_input_guarded_until_image_present() {
        let mut session = MapSession::new();
        assert!(!session.is_image_ready());

        // Clicking hex "0-0" at world origin does nothing before the image
        session.pointer_down(0.0, 0.0, PointerButton::Primary);
        session.pointer_up();
        assert!(session.revealed().is_empty());

        session.load_initial_map(0);
        session.image_loaded(1200, 800);
        press_at(&mut session, 0.0, 0.0);
        assert_eq!(session.revealed().get("0-0"), Some(&true));
    }

    #[test]
    fn test_reveal_click_is_noop_when_already_revealed() {
        let mut session = ready_session();

        press_at(&mut session, 0.0, 0.0);
        assert!(session.hexes()[0].revealed);
        let history_len = session.history.len();

        // Second click in reveal mode: no state change, no history entry
        press_at(&mut session, 0.0, 0.0);
        assert_eq!(session.history.len(), history_len);
        assert!(session.hexes()[0].revealed);

        // Hide mode makes the same hex eligible again
        session.toggle_reveal_mode();
        press_at(&mut session, 0.0, 0.0);
        assert!(!session.hexes()[0].revealed);
        assert!(session.revealed().is_empty());
        assert_eq!(session.history.len(), history_len + 1);
    }

    #[test]
    fn test_add_token_via_pending_confirm() {
        let mut session = ready_session();
        assert!(session.toggle_add_token_mode());

        session.pointer_down(100.0, 100.0, PointerButton::Primary);
        assert_eq!(session.pending_token_position(), Some(Point { x: 100.0, y: 100.0 }));
        assert!(session.tokens().is_empty(), "staging must not mutate the store");

        let id = session
            .confirm_pending_token(Some("Hero".to_string()), None, None)
            .unwrap();
        assert_eq!(session.tokens().len(), 1);
        assert_eq!(session.tokens()[0].label.as_deref(), Some("Hero"));
        assert_eq!(session.view().selected.as_deref(), Some(id.as_str()));
        // Committing one token exits Adding mode
        assert_eq!(session.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_cancel_pending_token_discards() {
        let mut session = ready_session();
        session.toggle_add_token_mode();
        session.pointer_down(100.0, 100.0, PointerButton::Primary);

        session.cancel_pending_token();
        assert!(session.tokens().is_empty());
        assert!(session.pending_token_position().is_none());
        assert!(session.confirm_pending_token(None, None, None).is_err());
    }

    #[test]
    fn test_toggling_out_of_add_mode_discards_pending() {
        let mut session = ready_session();
        session.toggle_add_token_mode();
        session.pointer_down(100.0, 100.0, PointerButton::Primary);

        session.toggle_add_token_mode();
        assert!(session.pending_token_position().is_none());
    }

    #[test]
    fn test_drag_produces_exactly_one_history_entry() {
        let mut session = ready_session();
        session.toggle_add_token_mode();
        session.pointer_down(100.0, 100.0, PointerButton::Primary);
        session.confirm_pending_token(None, None, None).unwrap();
        let history_len = session.history.len();

        // Press on the token, drag through intermediate points, release
        session.pointer_down(100.0, 100.0, PointerButton::Primary);
        assert_eq!(session.mode(), InteractionMode::DraggingToken);
        for step in 1..=10 {
            let p = 100.0 + 5.0 * step as f64;
            session.pointer_move(p, p);
        }
        session.pointer_up();

        assert_eq!(session.history.len(), history_len + 1);
        assert_eq!(session.tokens()[0].x, 150.0);
        assert_eq!(session.tokens()[0].y, 150.0);

        // The index was rebuilt at the final position
        assert!(session.token_id_at(150.0, 150.0).is_some());
        assert!(session.token_id_at(100.0, 100.0).is_none());
    }

    #[test]
    fn test_remove_mode_hit_and_miss() {
        let mut session = ready_session();
        session.toggle_add_token_mode();
        session.pointer_down(200.0, 200.0, PointerButton::Primary);
        session.confirm_pending_token(None, None, None).unwrap();

        assert!(session.toggle_remove_token_mode());

        // Miss: no mutation, feedback surfaced
        session.pointer_down(500.0, 500.0, PointerButton::Primary);
        session.pointer_up();
        assert_eq!(session.tokens().len(), 1);
        assert!(session.take_status().is_some());

        // Hit: immediate deletion
        session.pointer_down(200.0, 200.0, PointerButton::Primary);
        session.pointer_up();
        assert!(session.tokens().is_empty());
    }

    #[test]
    fn test_undo_redo_restores_final_state() {
        let mut session = ready_session();

        press_at(&mut session, 0.0, 0.0); // reveal "0-0"
        session.toggle_add_token_mode();
        session.pointer_down(300.0, 300.0, PointerButton::Primary);
        session.confirm_pending_token(None, None, None).unwrap();

        assert!(session.undo());
        assert!(session.tokens().is_empty());
        assert_eq!(session.revealed().len(), 1);

        assert!(session.undo());
        assert!(session.revealed().is_empty());
        assert!(!session.hexes()[0].revealed, "hex flag refreshed on restore");

        // Floor reached
        assert!(!session.undo());

        assert!(session.redo());
        assert!(session.redo());
        assert_eq!(session.revealed().len(), 1);
        assert_eq!(session.tokens().len(), 1);
        assert!(!session.redo());
    }

    #[test]
    fn test_selection_survives_undo_only_if_token_exists() {
        let mut session = ready_session();
        session.toggle_add_token_mode();
        session.pointer_down(300.0, 300.0, PointerButton::Primary);
        let id = session.confirm_pending_token(None, None, None).unwrap();
        assert_eq!(session.view().selected.as_deref(), Some(id.as_str()));

        // Undo removes the token; the stale selection is dropped
        session.undo();
        assert_eq!(session.view().selected, None);
    }

    #[test]
    fn test_reset_map_clears_all_reveals() {
        let mut session = ready_session();
        press_at(&mut session, 0.0, 0.0);
        let h11 = session.hexes().iter().find(|h| h.id == "1-1").unwrap().center;
        press_at(&mut session, h11.x, h11.y);
        assert_eq!(session.revealed().len(), 2);

        session.reset_map();
        assert!(session.revealed().is_empty());
        assert!(session.hexes().iter().all(|h| !h.revealed));
    }

    #[test]
    fn test_empty_click_clears_selection() {
        let mut session = ready_session();
        session.toggle_add_token_mode();
        session.pointer_down(300.0, 300.0, PointerButton::Primary);
        session.confirm_pending_token(None, None, None).unwrap();
        assert!(session.view().selected.is_some());

        // Click far outside the grid and any token: selection cleared
        press_at(&mut session, -2000.0, -2000.0);
        assert!(session.view().selected.is_none());
    }

    #[test]
    fn test_pan_with_secondary_button() {
        let mut session = ready_session();
        session.pointer_down(50.0, 50.0, PointerButton::Secondary);
        session.pointer_move(80.0, 40.0);
        session.pointer_up();

        assert_eq!(session.view().pan_x, 30.0);
        assert_eq!(session.view().pan_y, -10.0);
        assert_eq!(session.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_config_change_rederives_reveals() {
        let mut session = ready_session();
        press_at(&mut session, 0.0, 0.0);

        let mut config = *session.grid_config();
        config.column_count = 30;
        session.set_grid_config(config);

        // New hex objects, same reveal truth
        assert_eq!(session.hexes().len(), 30 * 15);
        assert!(session.hexes().iter().find(|h| h.id == "0-0").unwrap().revealed);
    }

    #[test]
    fn test_session_document_round_trip() {
        let mut session = ready_session();
        press_at(&mut session, 0.0, 0.0);
        session.toggle_add_token_mode();
        session.pointer_down(123.0, 45.0, PointerButton::Primary);
        session.confirm_pending_token(Some("Orc".to_string()), None, None).unwrap();
        session.zoom_at(10.0, 10.0, 1.5);

        let json = serde_json::to_string(&session.to_session_document()).unwrap();

        let mut restored = MapSession::new();
        restored.load_session_document(&json);
        assert_eq!(restored.revealed().get("0-0"), Some(&true));
        assert_eq!(restored.tokens().len(), 1);
        assert_eq!(restored.tokens()[0].label.as_deref(), Some("Orc"));
        assert_eq!(restored.view().zoom_level, session.view().zoom_level);
        // The loaded state is the new undo floor
        assert!(!restored.can_undo());
    }

    #[test]
    fn test_import_rejects_and_leaves_state_untouched() {
        let mut session = ready_session();
        press_at(&mut session, 0.0, 0.0);
        let before_revealed = session.revealed().clone();

        let err = session.import_json(r#"{"tokens": []}"#, 0);
        assert!(err.is_err());
        assert_eq!(session.revealed(), &before_revealed);
        assert!(session.take_status().is_some());
    }

    #[test]
    fn test_import_missing_fields_keep_current_values() {
        let mut session = ready_session();
        session.zoom_at(10.0, 10.0, 2.0);
        let zoom_before = session.view().zoom_level;

        session
            .import_json(r#"{"settings": {"hexSize": 60}, "revealedHexes": {"2-2": true}}"#, 0)
            .unwrap();

        assert_eq!(session.grid_config().hex_size, 60.0);
        assert_eq!(session.revealed().get("2-2"), Some(&true));
        // No view in the document: current view preserved
        assert_eq!(session.view().zoom_level, zoom_before);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut session = ready_session();
        press_at(&mut session, 0.0, 0.0);
        session.toggle_add_token_mode();
        session.pointer_down(77.0, 88.0, PointerButton::Primary);
        session.confirm_pending_token(Some("Mage".to_string()), None, None).unwrap();

        let exported = session.export_json().unwrap();

        let mut other = ready_session();
        other.import_json(&exported, 0).unwrap();
        assert_eq!(other.revealed(), session.revealed());
        assert_eq!(other.tokens().len(), 1);
        assert_eq!(other.tokens()[0].label.as_deref(), Some("Mage"));
    }

    #[test]
    fn test_debounced_save_flushes_trailing_value() {
        let mut session = ready_session();
        let _ = session.take_save_request();

        session.set_fog_opacity(0.5, 1_000);
        session.set_fog_opacity(0.6, 1_100);
        session.tick(1_200);
        assert!(!session.take_save_request(), "save not due yet");

        session.tick(1_100 + SAVE_DEBOUNCE_MS);
        assert!(session.take_save_request());
        assert_eq!(session.appearance().fog_opacity, 0.6);
    }

    #[test]
    fn test_load_timeout_falls_back_then_terminal() {
        let mut session = MapSession::new();
        session.request_map_load("https://example.com/slow.png", 0).unwrap();

        session.tick(loader::LOAD_TIMEOUT_MS);
        assert_eq!(session.pending_load_url().as_deref(), Some(loader::DEFAULT_MAP_URL));
        assert!(session.take_status().is_some());

        session.image_failed(loader::LOAD_TIMEOUT_MS + 10);
        assert!(!session.is_image_ready());
        assert!(session.take_status().unwrap().contains("Critical"));
    }

    #[test]
    fn test_invalid_url_rejected_before_load() {
        let mut session = MapSession::new();
        assert!(session.request_map_load("file:///etc/passwd", 0).is_err());
        assert!(session.pending_load_url().is_none());
        assert!(session.take_status().is_some());
    }

    #[test]
    fn test_subscribers_notified_on_mutation() {
        let mut session = ready_session();
        let events: Rc<RefCell<Vec<ChangeEvent>>> = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&events);
        session.subscribe_fn(Box::new(move |event| sink.borrow_mut().push(event)));

        press_at(&mut session, 0.0, 0.0);
        assert!(events.borrow().contains(&ChangeEvent::Reveal));
        assert!(events.borrow().contains(&ChangeEvent::History));
    }

    #[test]
    fn test_redraw_requests_coalesce() {
        let mut session = ready_session();
        let _ = session.take_redraw_request();

        press_at(&mut session, 0.0, 0.0);
        session.zoom_at(5.0, 5.0, 1.1);

        // Multiple mutations, one drained redraw
        assert!(session.take_redraw_request());
        assert!(!session.take_redraw_request());
    }
}
