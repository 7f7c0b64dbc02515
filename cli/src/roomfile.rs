//! File-backed room fixtures.
//!
//! The real device directory and room control API are external services;
//! for diagnostics the CLI reads one JSON file describing a room and
//! serves it through the same traits the engine uses in production.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use roomprobe_common::device::Device;
use roomprobe_common::error::DirectoryError;
use roomprobe_common::state::{Display, RoomState};
use roomprobe_core::directory::{DeviceDirectory, RoomStateSource};

#[derive(Debug, Deserialize)]
pub struct RoomFile {
    pub room_id: String,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub displays: Vec<Display>,
}

impl RoomFile {
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| DirectoryError::Unavailable(format!("{}: {err}", path.display())))?;

        serde_json::from_str(&raw).map_err(|err| DirectoryError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl DeviceDirectory for RoomFile {
    async fn devices_by_room(&self, room_id: &str) -> Result<Vec<Device>, DirectoryError> {
        if room_id != self.room_id {
            return Err(DirectoryError::RoomNotFound {
                room: room_id.to_string(),
            });
        }

        Ok(self.devices.clone())
    }
}

#[async_trait]
impl RoomStateSource for RoomFile {
    async fn room_state(&self, room_id: &str) -> Result<RoomState, DirectoryError> {
        if room_id != self.room_id {
            return Err(DirectoryError::RoomNotFound {
                room: room_id.to_string(),
            });
        }

        Ok(RoomState {
            displays: self.displays.clone(),
        })
    }
}
