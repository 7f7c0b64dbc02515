//! Boundary traits for everything the engine reads but does not own.
//!
//! Device storage and the room control API are external collaborators.
//! High-level entry points depend on these traits only; concrete
//! implementations (database clients, file-backed fixtures) live outside
//! this crate and are injected by the caller.

use async_trait::async_trait;
use roomprobe_common::device::Device;
use roomprobe_common::error::DirectoryError;
use roomprobe_common::state::RoomState;

/// Read-only lookup of the devices wired into a room.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn devices_by_room(&self, room_id: &str) -> Result<Vec<Device>, DirectoryError>;
}

/// Snapshot of the self-reported AV state of a room's displays.
#[async_trait]
pub trait RoomStateSource: Send + Sync {
    async fn room_state(&self, room_id: &str) -> Result<RoomState, DirectoryError>;
}
