// Interaction state machine for HexFog Core
//
// Owns the current interaction mode and its legal transitions. The machine is
// pure: the session resolves what is under the pointer, feeds it in, and
// applies the returned action to the stores. No mutation happens here.

use serde::{Deserialize, Serialize};

/// Mutually exclusive interaction modes; `Idle` is the default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionMode {
    #[default]
    Idle,
    Panning,
    DraggingToken,
    AddingToken,
    RemovingToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// What the session resolved under the pointer before dispatching a press
#[derive(Debug, Clone, Default)]
pub struct PressHits {
    pub token: Option<String>,
    /// Hex under the pointer whose reveal state disagrees with the active
    /// reveal/hide mode target; agreeing hexes are not eligible (prevents
    /// redundant history entries).
    pub eligible_hex: Option<String>,
}

/// Action the session must apply after a press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressAction {
    BeginPan,
    BeginTokenDrag { token_id: String },
    /// Adding mode: stage a pending position and ask the presentation layer
    /// for label/appearance input. Hit testing is skipped entirely.
    StagePendingToken,
    RemoveToken { token_id: String },
    /// Removing mode miss: no mutation, but the user gets feedback
    RemoveMissed,
    ToggleHex { hex_id: String },
    ClearSelection,
    None,
}

/// Action the session must apply after a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseAction {
    EndPan,
    /// Exactly one history push happens here, reflecting the final position
    EndTokenDrag { token_id: String },
    None,
}

#[derive(Debug, Default)]
pub struct InteractionStateMachine {
    mode: InteractionMode,
    drag_token: Option<String>,
}

impl InteractionStateMachine {
    pub fn new() -> InteractionStateMachine {
        InteractionStateMachine::default()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn dragging_token(&self) -> Option<&str> {
        self.drag_token.as_deref()
    }

    pub fn on_press(&mut self, button: PointerButton, hits: &PressHits) -> PressAction {
        match (self.mode, button) {
            // Pan on secondary/middle press from Idle
            (InteractionMode::Idle, PointerButton::Middle)
            | (InteractionMode::Idle, PointerButton::Secondary) => {
                self.mode = InteractionMode::Panning;
                PressAction::BeginPan
            }

            (InteractionMode::AddingToken, PointerButton::Primary) => PressAction::StagePendingToken,

            (InteractionMode::RemovingToken, PointerButton::Primary) => match &hits.token {
                Some(id) => PressAction::RemoveToken { token_id: id.clone() },
                None => PressAction::RemoveMissed,
            },

            (InteractionMode::Idle, PointerButton::Primary) => {
                if let Some(id) = &hits.token {
                    self.mode = InteractionMode::DraggingToken;
                    self.drag_token = Some(id.clone());
                    PressAction::BeginTokenDrag { token_id: id.clone() }
                } else if let Some(hex_id) = &hits.eligible_hex {
                    PressAction::ToggleHex { hex_id: hex_id.clone() }
                } else {
                    PressAction::ClearSelection
                }
            }

            _ => PressAction::None,
        }
    }

    pub fn on_release(&mut self) -> ReleaseAction {
        match self.mode {
            InteractionMode::Panning => {
                self.mode = InteractionMode::Idle;
                ReleaseAction::EndPan
            }
            InteractionMode::DraggingToken => {
                self.mode = InteractionMode::Idle;
                let token_id = self.drag_token.take().unwrap_or_default();
                ReleaseAction::EndTokenDrag { token_id }
            }
            _ => ReleaseAction::None,
        }
    }

    /// Toggle Adding mode. Entering it exits Removing; the two are mutually
    /// exclusive. Returns true if Adding is now active.
    pub fn toggle_adding(&mut self) -> bool {
        self.mode = match self.mode {
            InteractionMode::AddingToken => InteractionMode::Idle,
            _ => InteractionMode::AddingToken,
        };
        self.drag_token = None;
        self.mode == InteractionMode::AddingToken
    }

    /// Toggle Removing mode, mutually exclusive with Adding
    pub fn toggle_removing(&mut self) -> bool {
        self.mode = match self.mode {
            InteractionMode::RemovingToken => InteractionMode::Idle,
            _ => InteractionMode::RemovingToken,
        };
        self.drag_token = None;
        self.mode == InteractionMode::RemovingToken
    }

    /// Drop out of any mode back to Idle (Escape, reset view, image reload)
    pub fn cancel(&mut self) {
        self.mode = InteractionMode::Idle;
        self.drag_token = None;
    }
}
