//! Self-reported AV state of a room's displays.
//!
//! A snapshot fetched from the room's control API; the verifier only
//! reads it.

use serde::{Deserialize, Serialize};

/// Power state value a display reports when it is off but listening.
pub const POWER_STANDBY: &str = "standby";

/// One display's reported state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Display {
    pub name: String,
    /// Name of the input the display is configured to show.
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub power: String,
    /// Whether the display is blanked. Control APIs omit the field when
    /// they cannot tell; unset is treated as blanked downstream.
    #[serde(default)]
    pub blanked: Option<bool>,
}

/// The displays of one room.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RoomState {
    #[serde(default)]
    pub displays: Vec<Display>,
}
