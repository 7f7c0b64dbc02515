//! # Signal Path Verification
//!
//! Decides whether a display is truly showing its configured input by
//! walking the wiring path hop by hop and polling each device's
//! self-reported active-signal state over HTTP.
//!
//! The walk fails closed: a hop that cannot be queried, answers with a
//! non-2xx status, or returns an unparsable body counts as *inactive*.
//! The one deliberate exception is a device that exposes no ActiveSignal
//! command at all; such hardware cannot self-report and is assumed live
//! rather than failing every path through it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, info, warn};

use roomprobe_common::config::Config;
use roomprobe_common::device::{Device, Port};
use roomprobe_common::state::{Display, POWER_STANDBY};

use crate::directory::{DeviceDirectory, RoomStateSource};
use crate::graph::{PathNode, SignalGraph};

const ACTIVE_SIGNAL_COMMAND: &str = "ActiveSignal";
const ROLE_VIDEO_SWITCHER: &str = "VideoSwitcher";

#[derive(Debug, Deserialize)]
struct ActiveSignal {
    active: bool,
}

/// Walks reachability paths and queries each hop's active-signal state.
pub struct PathVerifier {
    client: reqwest::Client,
}

impl PathVerifier {
    /// A verifier whose per-hop requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Whether `display` is actually carrying signal from its configured
    /// input.
    ///
    /// Preconditions that yield an immediate `false`: no configured input
    /// or no name, power in standby, or a blanked flag that is set or
    /// unknown (unknown counts as blanked; better a false "no signal"
    /// than a false "all clear"). Otherwise the display must be reachable
    /// from its input in `graph`, and every hop along the path must
    /// report an active signal. The first inactive hop ends the walk.
    pub async fn is_path_active(
        &self,
        display: &Display,
        room_id: &str,
        graph: &SignalGraph,
    ) -> bool {
        if display.input.is_empty() || display.name.is_empty() {
            let name = &display.name;
            debug!(display = %name, "skipping display with no input or name");
            return false;
        }

        let display_id = format!("{room_id}-{}", display.name);
        let input_id = format!("{room_id}-{}", display.input);

        if display.power == POWER_STANDBY {
            debug!(display = %display_id, "input not active because power is standby");
            return false;
        }

        if display.blanked.unwrap_or(true) {
            debug!(display = %display_id, "input not active because blanked is true (or unset)");
            return false;
        }

        let Some(path) = graph.find_path(&input_id, &display_id) else {
            warn!(display = %display_id, input = %input_id, "input is not reachable from display");
            return false;
        };

        // Walk from the display back toward the source. Each hop is asked
        // about the port its upstream neighbor is wired into; the source
        // itself has no upstream and self-reports.
        for i in (0..path.len()).rev() {
            let upstream = i.checked_sub(1).map(|j| &path[j].device);

            if !self.hop_active(upstream, &path[i]).await {
                info!(display = %display_id, input = %input_id, "no active input signal");
                return false;
            }
        }

        info!(display = %display_id, input = %input_id, "input signal is active");
        true
    }

    /// Queries one hop. `upstream` is the device one hop closer to the
    /// source, or `None` when `node` is the source itself.
    async fn hop_active(&self, upstream: Option<&Device>, node: &PathNode) -> bool {
        let dest = &node.device;

        if !dest.has_command(ACTIVE_SIGNAL_COMMAND) {
            debug!(device = %dest.id, "cannot self-report, assuming signal is active");
            return true;
        }

        let Some(address) = command_address(dest, node.inbound.as_ref(), upstream.is_some())
        else {
            warn!(device = %dest.id, "unable to build active-signal address");
            return false;
        };

        debug!(device = %dest.id, address = %address, "checking for an active input signal");

        let response = match self.client.get(&address).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(device = %dest.id, error = %err, "unable to check if input is active");
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(
                device = %dest.id,
                status = %response.status(),
                "unable to check if input is active"
            );
            return false;
        }

        match response.json::<ActiveSignal>().await {
            Ok(signal) => signal.active,
            Err(err) => {
                warn!(device = %dest.id, error = %err, "malformed active-signal response");
                false
            }
        }
    }
}

/// Substitutes the `:address` and `:port` placeholders of the device's
/// ActiveSignal template.
///
/// The port is only relevant when the query concerns an upstream neighbor;
/// a self-reporting source keeps its template untouched beyond the
/// address. Video switchers take bare port numbers, so their `IN`/`OUT`
/// markers are stripped.
fn command_address(dest: &Device, inbound: Option<&Port>, from_upstream: bool) -> Option<String> {
    let template = dest.command_template(ACTIVE_SIGNAL_COMMAND)?;
    let mut address = template.replacen(":address", &dest.address, 1);

    if from_upstream && address.contains(":port") {
        // the path search guarantees an inbound port for every non-source hop
        let port = inbound?;

        let mut port_id = port.id.clone();
        if dest.has_role(ROLE_VIDEO_SWITCHER) {
            port_id = port_id.replacen("IN", "", 1);
            port_id = port_id.replacen("OUT", "", 1);
        }

        address = address.replacen(":port", &port_id, 1);
    }

    Some(address)
}

/// Checks every display in a room concurrently.
///
/// One task per display; each writes its verdict into a shared map keyed
/// `"<roomID>-<displayName>"`. The map is returned only after every task
/// has finished. Failures before the fan-out (directory, room state,
/// malformed wiring) are the only errors this returns.
pub async fn room_signal_map(
    directory: &dyn DeviceDirectory,
    states: &dyn RoomStateSource,
    verifier: &Arc<PathVerifier>,
    room_id: &str,
    config: &Config,
) -> anyhow::Result<HashMap<String, bool>> {
    let devices = directory
        .devices_by_room(room_id)
        .await
        .context("could not get devices in room")?;

    let graph = Arc::new(
        SignalGraph::build(&devices, &config.signal_class)
            .context("could not build input graph")?,
    );

    let state = states
        .room_state(room_id)
        .await
        .context("could not get room state")?;

    info!(
        room = room_id,
        displays = state.displays.len(),
        "checking each display for an active signal"
    );

    let active: Arc<Mutex<HashMap<String, bool>>> = Arc::new(Mutex::new(HashMap::new()));
    let mut handles = Vec::with_capacity(state.displays.len());

    for display in state.displays {
        let graph = Arc::clone(&graph);
        let verifier = Arc::clone(verifier);
        let active = Arc::clone(&active);
        let room = room_id.to_string();

        handles.push(tokio::spawn(async move {
            let key = format!("{room}-{}", display.name);
            let is_active = verifier.is_path_active(&display, &room, &graph).await;

            if let Ok(mut map) = active.lock() {
                map.insert(key, is_active);
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    let map = match Arc::try_unwrap(active) {
        Ok(mutex) => mutex.into_inner().unwrap_or_default(),
        Err(_) => HashMap::new(),
    };

    Ok(map)
}
