//! Interaction messages sent from an open device UI.

use crate::routing::{Channel, Direction};
use serde::{Deserialize, Serialize};

/// Button id that toggles split mode.
pub const SPLIT_BUTTON: i32 = 0;
/// Routing buttons are numbered from here, one per [`Direction`].
pub const ROUTING_BUTTON_BASE: i32 = 10;

/// A raw button press: which button, and which routing window it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: i32,
    #[serde(default)]
    pub window: Option<String>,
}

impl UiMessage {
    pub fn toggle_split() -> Self {
        Self {
            id: SPLIT_BUTTON,
            window: None,
        }
    }

    pub fn cycle(channel: Channel, direction: Direction) -> Self {
        Self {
            id: ROUTING_BUTTON_BASE + direction.index() as i32,
            window: Some(channel.window_name().to_string()),
        }
    }

    /// Decode the press into a device action.
    pub fn action(&self) -> Result<UiAction, UiError> {
        if self.id == SPLIT_BUTTON {
            return Ok(UiAction::ToggleSplit);
        }
        let direction = self
            .id
            .checked_sub(ROUTING_BUTTON_BASE)
            .and_then(|d| usize::try_from(d).ok())
            .and_then(Direction::from_index)
            .ok_or(UiError::UnknownButton(self.id))?;
        let window = self.window.as_deref().ok_or(UiError::MissingWindow(self.id))?;
        let channel =
            Channel::from_window_name(window).ok_or_else(|| UiError::UnknownWindow(window.into()))?;
        Ok(UiAction::CycleRouting { channel, direction })
    }
}

/// A decoded UI interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    ToggleSplit,
    /// Advance one routing cell to its next mode.
    CycleRouting {
        channel: Channel,
        direction: Direction,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UiError {
    #[error("unknown button id {0}")]
    UnknownButton(i32),
    #[error("button {0} needs a routing window")]
    MissingWindow(i32),
    #[error("unknown routing window '{0}'")]
    UnknownWindow(String),
}
