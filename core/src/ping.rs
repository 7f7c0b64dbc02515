//! # ICMP Room Prober
//!
//! Network liveness for every device in a room, probed in parallel over
//! one shared raw socket.
//!
//! A [`Pinger`] owns the socket for its whole lifetime and runs a
//! background reader that demultiplexes inbound datagrams to per-host
//! reply queues by source address. Everything else — resolved addresses,
//! sequence counters, the queues themselves — exists only for the span of
//! one [`Pinger::ping`] call.
//!
//! The echo identifier is derived from the process id so replies can be
//! attributed without extra state. That scopes attribution to one live
//! `Pinger` per process; running two would let them steal each other's
//! replies.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use anyhow::Context;
use pnet::packet::icmp::IcmpPacket;
use pnet::transport::TransportSender;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use roomprobe_common::error::PingerError;
use roomprobe_protocols::icmp;

use crate::directory::DeviceDirectory;

mod transport;

/// Depth of each host's reply queue. One reply is expected per
/// outstanding request; anything beyond that is late or duplicated and
/// may be dropped.
const REPLY_CHANNEL_DEPTH: usize = 10;

#[derive(Clone, Debug)]
pub struct PingConfig {
    /// Echo requests to send per host.
    pub count: u16,
    /// How long to wait on each request before declaring the packet lost.
    pub delay: Duration,
    /// Deadline for the whole probing session.
    pub timeout: Duration,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            count: 3,
            delay: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

/// A device to probe: room-scoped id plus its network address.
#[derive(Clone, Debug)]
pub struct PingTarget {
    pub id: String,
    pub addr: String,
}

/// Per-target outcome of one probing session.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PingResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<Ipv4Addr>,
    pub packets_sent: u32,
    pub packets_received: u32,
    pub packets_lost: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_round_trip: Option<Duration>,
}

struct Reply {
    seq: u16,
    at: Instant,
}

struct HostEntry {
    replies: mpsc::Sender<Reply>,
}

struct HostSession {
    id: String,
    addr: String,
    ip: Ipv4Addr,
    seq: u16,
    replies: mpsc::Receiver<Reply>,
}

/// Owns the raw ICMP socket and the background reply demultiplexer.
pub struct Pinger {
    ident: u16,
    sender: Arc<Mutex<TransportSender>>,
    hosts: Arc<RwLock<HashMap<String, HostEntry>>>,
    dropped_replies: Arc<AtomicU64>,
    reader_stop: Arc<AtomicBool>,
    demux: tokio::task::JoinHandle<()>,
}

impl Pinger {
    /// Opens the shared socket and starts the background reader.
    ///
    /// Must be called from within a tokio runtime. Missing raw-socket
    /// privilege fails here, once, instead of on every ping.
    pub fn new() -> Result<Self, PingerError> {
        if !is_root::is_root() {
            return Err(PingerError::InsufficientPrivilege);
        }

        let handle = transport::start_packet_capture()?;
        let ident = std::process::id() as u16;

        let hosts: Arc<RwLock<HashMap<String, HostEntry>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let dropped_replies = Arc::new(AtomicU64::new(0));

        let demux_hosts = Arc::clone(&hosts);
        let demux_dropped = Arc::clone(&dropped_replies);
        let mut rx = handle.rx;
        let demux = tokio::spawn(async move {
            while let Some(inbound) = rx.recv().await {
                dispatch(&demux_hosts, ident, &demux_dropped, &inbound);
            }
        });

        Ok(Self {
            ident,
            sender: Arc::new(Mutex::new(handle.tx)),
            hosts,
            dropped_replies,
            reader_stop: handle.stop,
            demux,
        })
    }

    /// Probes every target concurrently and returns one result per
    /// target, keyed by target id.
    ///
    /// Resolution failures, duplicate resolved addresses and send errors
    /// all land in the failing target's own entry; they never abort
    /// sibling probes. The call returns once every host task has finished
    /// or the session deadline has cut it off.
    pub async fn ping(
        &self,
        config: &PingConfig,
        targets: &[PingTarget],
    ) -> HashMap<String, PingResult> {
        let deadline = tokio::time::Instant::now() + config.timeout;
        let (sessions, mut results) = register_targets(&self.hosts, targets).await;

        let shared: Arc<Mutex<HashMap<String, PingResult>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let mut registered: Vec<String> = Vec::with_capacity(sessions.len());
        let mut handles = Vec::with_capacity(sessions.len());

        for session in sessions {
            registered.push(session.ip.to_string());

            let sender = Arc::clone(&self.sender);
            let shared = Arc::clone(&shared);
            let config = config.clone();
            let ident = self.ident;

            handles.push(tokio::spawn(async move {
                let id = session.id.clone();
                let result = run_session(sender, ident, session, config, deadline).await;

                if let Ok(mut map) = shared.lock() {
                    map.insert(id, result);
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        // host entries are per-call; drop them before the next session
        if let Ok(mut guard) = self.hosts.write() {
            for ip in registered {
                guard.remove(&ip);
            }
        }

        if let Ok(mut map) = shared.lock() {
            results.extend(map.drain());
        }

        results
    }

    /// Replies discarded because a host's queue was already full.
    pub fn dropped_replies(&self) -> u64 {
        self.dropped_replies.load(Ordering::Relaxed)
    }

    /// Stops the reader thread and the demultiplexer. The socket closes
    /// once the last in-flight send has finished.
    pub fn close(&self) {
        self.reader_stop.store(true, Ordering::Relaxed);
        self.demux.abort();
    }
}

impl Drop for Pinger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pings every device in a room that has a usable address.
///
/// Devices with no address, or the `0.0.0.0` placeholder the directory
/// uses for unaddressed hardware, are skipped.
pub async fn room_ping(
    directory: &dyn DeviceDirectory,
    pinger: &Pinger,
    room_id: &str,
    config: &PingConfig,
) -> anyhow::Result<HashMap<String, PingResult>> {
    let devices = directory
        .devices_by_room(room_id)
        .await
        .with_context(|| format!("unable to list devices in room {room_id}"))?;

    let targets: Vec<PingTarget> = devices
        .iter()
        .filter(|d| !d.address.is_empty() && !d.address.eq_ignore_ascii_case("0.0.0.0"))
        .map(|d| PingTarget {
            id: d.id.clone(),
            addr: d.address.clone(),
        })
        .collect();

    info!(room = room_id, hosts = targets.len(), "pinging devices in room");

    Ok(pinger.ping(config, &targets).await)
}

/// Routes one inbound datagram to the host that sent the matching echo.
///
/// Replies carrying another process's identifier are discarded without
/// touching any queue. A full queue drops the reply and bumps the drop
/// counter; a late reply has nothing waiting on it anyway.
fn dispatch(
    hosts: &RwLock<HashMap<String, HostEntry>>,
    ident: u16,
    dropped: &AtomicU64,
    inbound: &transport::Inbound,
) {
    let Some(reply) = icmp::parse_reply(&inbound.bytes) else {
        trace!(source = %inbound.source, "discarding unparsable icmp datagram");
        return;
    };

    if reply.ident != ident {
        return; // another prober's session on this machine
    }

    let Ok(guard) = hosts.read() else {
        return;
    };

    if let Some(entry) = guard.get(&inbound.source.to_string()) {
        let delivered = entry.replies.try_send(Reply {
            seq: reply.seq,
            at: inbound.received_at,
        });
        if delivered.is_err() {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Resolves targets and registers a reply queue for each.
///
/// Targets that fail to resolve, or that resolve to an address already
/// claimed in this batch, get an error entry instead of a session. The
/// registry is keyed by resolved IP because that is all a reply carries;
/// letting two targets share a key would silently misattribute replies.
async fn register_targets(
    hosts: &RwLock<HashMap<String, HostEntry>>,
    targets: &[PingTarget],
) -> (Vec<HostSession>, HashMap<String, PingResult>) {
    let mut sessions = Vec::with_capacity(targets.len());
    let mut errors: HashMap<String, PingResult> = HashMap::new();
    let mut claimed: HashMap<Ipv4Addr, String> = HashMap::new();

    for target in targets {
        let ip = match resolve_ipv4(&target.addr).await {
            Ok(ip) => ip,
            Err(reason) => {
                errors.insert(
                    target.id.clone(),
                    PingResult {
                        error: Some(reason),
                        ..Default::default()
                    },
                );
                continue;
            }
        };

        if let Some(owner) = claimed.get(&ip) {
            warn!(
                target = %target.id,
                ip = %ip,
                owner = %owner,
                "duplicate resolved address in one batch"
            );
            errors.insert(
                target.id.clone(),
                PingResult {
                    error: Some(format!("resolves to {ip}, already probed as {owner}")),
                    ip: Some(ip),
                    ..Default::default()
                },
            );
            continue;
        }
        claimed.insert(ip, target.id.clone());

        let (reply_tx, reply_rx) = mpsc::channel(REPLY_CHANNEL_DEPTH);
        if let Ok(mut guard) = hosts.write() {
            guard.insert(ip.to_string(), HostEntry { replies: reply_tx });
        }

        sessions.push(HostSession {
            id: target.id.clone(),
            addr: target.addr.clone(),
            ip,
            seq: 0,
            replies: reply_rx,
        });
    }

    (sessions, errors)
}

async fn resolve_ipv4(addr: &str) -> Result<Ipv4Addr, String> {
    let resolved = tokio::net::lookup_host((addr, 0))
        .await
        .map_err(|err| format!("failed to resolve ip address: {err}"))?;

    for candidate in resolved {
        if let IpAddr::V4(ip) = candidate.ip() {
            return Ok(ip);
        }
    }

    Err("no ipv4 address found".to_string())
}

/// One host's request/reply loop.
async fn run_session(
    sender: Arc<Mutex<TransportSender>>,
    ident: u16,
    mut host: HostSession,
    config: PingConfig,
    deadline: tokio::time::Instant,
) -> PingResult {
    let mut result = PingResult {
        ip: Some(host.ip),
        ..Default::default()
    };
    let mut total_rtt = Duration::ZERO;

    let session_deadline = tokio::time::sleep_until(deadline);
    tokio::pin!(session_deadline);

    while host.seq < config.count {
        let bytes = match icmp::build_echo_request(ident, host.seq) {
            Ok(bytes) => bytes,
            Err(err) => {
                result.error = Some(format!("failed to marshal echo request: {err}"));
                break;
            }
        };

        let sent_at = Instant::now();
        match send_echo(&sender, &bytes, host.ip) {
            Ok(n) if n == bytes.len() => {}
            Ok(n) => {
                result.error = Some(format!(
                    "sending echo request failed: wrote {n} bytes, expected {}",
                    bytes.len()
                ));
                break;
            }
            Err(err) => {
                result.error = Some(format!("failed to send echo request: {err}"));
                break;
            }
        }
        result.packets_sent += 1;

        tokio::select! {
            _ = tokio::time::sleep(config.delay) => {
                debug!(seq = host.seq, addr = %host.addr, "lost packet");
                result.packets_lost += 1;
                host.seq += 1;
            }
            reply = host.replies.recv() => match reply {
                Some(reply) => {
                    if reply.seq != host.seq {
                        trace!(
                            addr = %host.addr,
                            seq = reply.seq,
                            expected = host.seq,
                            "reply for an earlier sequence"
                        );
                    }

                    host.seq += 1;
                    result.packets_received += 1;
                    total_rtt += reply.at.saturating_duration_since(sent_at);

                    // pace the next request
                    tokio::time::sleep(config.delay).await;
                }
                None => {
                    result.error = Some("reply channel closed".to_string());
                }
            },
            _ = &mut session_deadline => {
                result.error = Some(format!(
                    "timed out waiting for a response from {}",
                    host.addr
                ));
            }
        }

        if result.error.is_some() {
            break;
        }
    }

    finish(result, total_rtt)
}

/// Writes one echo request through the shared socket. The lock covers
/// only the write; reply waits happen outside it.
fn send_echo(
    sender: &Mutex<TransportSender>,
    bytes: &[u8],
    ip: Ipv4Addr,
) -> io::Result<usize> {
    let mut tx = sender
        .lock()
        .map_err(|_| io::Error::other("icmp sender lock poisoned"))?;

    let packet = IcmpPacket::new(bytes)
        .ok_or_else(|| io::Error::other("echo request buffer too short"))?;

    tx.send_to(packet, IpAddr::V4(ip))
}

fn finish(mut result: PingResult, total_rtt: Duration) -> PingResult {
    if result.packets_received > 0 {
        result.average_round_trip = Some(total_rtt / result.packets_received);
    } else if result.packets_sent == 0 && result.error.is_none() {
        result.error = Some("no packets were sent".to_string());
    }

    result
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
