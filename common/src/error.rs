//! Typed failures shared across the probing crates.

use thiserror::Error;

/// Data-integrity violations found while building a wiring graph.
///
/// Wiring comes straight from the directory; a port that names a neighbor
/// the room does not contain, or a port the neighbor does not expose, is
/// bad data and is reported rather than silently dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("device {device} wires port {port} to unknown device {neighbor}")]
    UnknownNeighbor {
        device: String,
        port: String,
        neighbor: String,
    },

    #[error(
        "device {device} wires port {port} to {neighbor}:{neighbor_port}, \
         but {neighbor} has no port {neighbor_port}"
    )]
    MissingNeighborPort {
        device: String,
        port: String,
        neighbor: String,
        neighbor_port: String,
    },
}

/// Failures from the device directory or room-state source.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("room {room} not found")]
    RoomNotFound { room: String },

    #[error("failed to load room data: {0}")]
    Unavailable(String),

    #[error("malformed room data: {0}")]
    Malformed(String),
}

/// Failures constructing an ICMP prober.
///
/// Both are fatal at construction time; nothing here is a per-ping error.
#[derive(Debug, Error)]
pub enum PingerError {
    #[error("insufficient permissions to ping; must run as root")]
    InsufficientPrivilege,

    #[error("failed to bind to icmp socket: {0}")]
    Socket(#[from] std::io::Error),
}
