//! # Signal Wiring Graph
//!
//! Turns a room's device list into a directed graph of physical wiring,
//! restricted to one signal class, and answers reachability questions on
//! it.
//!
//! Edges point *upstream*: from a device to the neighbor wired into one of
//! its input ports. Displays name the input they are showing, not the other
//! way around, so path searches start at the display and chase the signal
//! back toward its source.
//!
//! The graph is rebuilt from the directory on every invocation. Nothing is
//! cached, so staleness is bounded by the caller's request rate.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use roomprobe_common::device::{Device, Port};
use roomprobe_common::error::TopologyError;

/// One hop of a reachability path: a device and the port the signal
/// arrives through. The source end of a path has no inbound port.
#[derive(Clone, Debug)]
pub struct PathNode {
    pub device: Device,
    pub inbound: Option<Port>,
}

#[derive(Debug)]
struct Edge {
    /// Upstream neighbor id.
    to: String,
    /// Port on the owning device that the neighbor is wired into.
    inbound: Port,
}

/// Directed wiring graph for one signal class.
#[derive(Debug)]
pub struct SignalGraph {
    devices: BTreeMap<String, Device>,
    upstream: BTreeMap<String, Vec<Edge>>,
}

impl SignalGraph {
    /// Builds the graph for `class` from a room's device list.
    ///
    /// Devices and ports are walked in sorted order so edge iteration, and
    /// therefore downstream path selection, is reproducible for the same
    /// input. Wiring that names a neighbor the room does not contain, or a
    /// port the neighbor does not expose, fails the whole build.
    pub fn build(room_devices: &[Device], class: &str) -> Result<Self, TopologyError> {
        let devices: BTreeMap<String, Device> = room_devices
            .iter()
            .map(|d| (d.id.clone(), d.clone()))
            .collect();

        let mut upstream: BTreeMap<String, Vec<Edge>> = BTreeMap::new();

        for device in devices.values() {
            let mut ports: Vec<&Port> = device
                .ports
                .iter()
                .filter(|p| p.tags.iter().any(|t| t == class))
                .collect();
            ports.sort_by(|a, b| a.id.cmp(&b.id));

            for port in ports {
                let Some(source) = &port.source else {
                    continue; // unwired jack
                };

                let neighbor = devices.get(&source.device).ok_or_else(|| {
                    TopologyError::UnknownNeighbor {
                        device: device.id.clone(),
                        port: port.id.clone(),
                        neighbor: source.device.clone(),
                    }
                })?;

                if !neighbor.ports.iter().any(|p| p.id == source.port) {
                    return Err(TopologyError::MissingNeighborPort {
                        device: device.id.clone(),
                        port: port.id.clone(),
                        neighbor: source.device.clone(),
                        neighbor_port: source.port.clone(),
                    });
                }

                upstream.entry(device.id.clone()).or_default().push(Edge {
                    to: source.device.clone(),
                    inbound: port.clone(),
                });
            }
        }

        Ok(Self { devices, upstream })
    }

    /// All wired edges as `(device, inbound port, upstream neighbor)`, in
    /// the graph's deterministic order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.upstream.iter().flat_map(|(from, edges)| {
            edges
                .iter()
                .map(move |e| (from.as_str(), e.inbound.id.as_str(), e.to.as_str()))
        })
    }

    /// Finds a wiring path carrying signal from `source_id` to `dest_id`.
    ///
    /// Searches breadth-first from the destination toward the source; the
    /// first path found under the deterministic edge order wins. The
    /// returned nodes are ordered source-first, destination-last, each
    /// carrying the port the signal arrives through. `source_id ==
    /// dest_id` yields the trivial one-node path. No wiring between the
    /// two is a normal outcome and yields `None`, not an error.
    pub fn find_path(&self, source_id: &str, dest_id: &str) -> Option<Vec<PathNode>> {
        let dest = self.devices.get(dest_id)?;

        if source_id == dest_id {
            return Some(vec![PathNode {
                device: dest.clone(),
                inbound: None,
            }]);
        }

        // BFS from the destination along upstream edges. `step` remembers,
        // for each discovered device, the downstream device it was reached
        // from and the port on that downstream device.
        let mut step: HashMap<String, (String, Port)> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::from([dest_id]);
        let mut queue: VecDeque<&str> = VecDeque::from([dest_id]);

        'search: while let Some(current) = queue.pop_front() {
            let Some(edges) = self.upstream.get(current) else {
                continue;
            };

            for edge in edges {
                if !visited.insert(&edge.to) {
                    continue;
                }
                step.insert(
                    edge.to.clone(),
                    (current.to_string(), edge.inbound.clone()),
                );
                if edge.to == source_id {
                    break 'search;
                }
                queue.push_back(&edge.to);
            }
        }

        if !step.contains_key(source_id) {
            return None;
        }

        // Unwind from the source back down to the destination.
        let mut path = vec![PathNode {
            device: self.devices.get(source_id)?.clone(),
            inbound: None,
        }];

        let mut walk = source_id;
        while walk != dest_id {
            let (down, inbound) = step.get(walk)?;
            path.push(PathNode {
                device: self.devices.get(down)?.clone(),
                inbound: Some(inbound.clone()),
            });
            walk = down.as_str();
        }

        Some(path)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
