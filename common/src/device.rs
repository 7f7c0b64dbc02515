//! # Room Device Model
//!
//! Devices as the directory reports them: identity, network address,
//! physical port wiring and the remote commands each device supports.
//! The probing crates treat all of this as read-only input.

use serde::{Deserialize, Serialize};

/// A single AV device in a room.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Device {
    /// Room-scoped identifier, e.g. `ITB-1010-D1`.
    pub id: String,
    pub name: String,
    /// Network address (hostname or IP). May be empty for passive hardware.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// A physical port on a device and the neighbor wired into it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    /// Signal classes this port carries, e.g. `video`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The upstream neighbor whose output is wired into this port.
    /// Unwired jacks leave this unset.
    #[serde(default)]
    pub source: Option<PortRef>,
}

/// One end of a wire: a device and the port on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub device: String,
    pub port: String,
}

/// A remote command a device supports, as a templated address.
///
/// Templates may contain `:address` and `:port` placeholders which are
/// substituted when the command is issued.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    pub address: String,
}

impl Device {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_command(&self, id: &str) -> bool {
        self.commands.iter().any(|c| c.id == id)
    }

    /// The templated address of a supported command.
    pub fn command_template(&self, id: &str) -> Option<&str> {
        self.commands
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.address.as_str())
    }

    /// The port on this device that is wired from `source_id`.
    pub fn port_wired_from(&self, source_id: &str) -> Option<&Port> {
        self.ports
            .iter()
            .find(|p| p.source.as_ref().is_some_and(|s| s.device == source_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switcher() -> Device {
        serde_json::from_value(serde_json::json!({
            "id": "ITB-1010-SW1",
            "name": "SW1",
            "address": "10.6.20.4",
            "roles": ["VideoSwitcher"],
            "ports": [
                {
                    "id": "IN1",
                    "tags": ["video"],
                    "source": { "device": "ITB-1010-HDMI1", "port": "OUT" }
                },
                { "id": "IN2", "tags": ["video"] }
            ],
            "commands": [
                { "id": "ActiveSignal", "address": "http://:address/input/:port/active" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn role_and_command_lookups() {
        let dev = switcher();
        assert!(dev.has_role("VideoSwitcher"));
        assert!(!dev.has_role("Microphone"));
        assert!(dev.has_command("ActiveSignal"));
        assert!(!dev.has_command("SetVolume"));
        assert_eq!(
            dev.command_template("ActiveSignal"),
            Some("http://:address/input/:port/active")
        );
    }

    #[test]
    fn port_wired_from_matches_upstream_neighbor() {
        let dev = switcher();
        let port = dev.port_wired_from("ITB-1010-HDMI1").unwrap();
        assert_eq!(port.id, "IN1");

        // IN2 is an unwired jack and must not match anything
        assert!(dev.port_wired_from("ITB-1010-HDMI2").is_none());
    }
}
