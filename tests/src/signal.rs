#![cfg(test)]
//! End-to-end signal-path verification against fake device endpoints.
//!
//! Each "device" is a TcpListener serving one canned HTTP response and
//! counting how many times it was hit; the hit counters pin the
//! short-circuit behavior of the hop walk.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use roomprobe_common::config::Config;
use roomprobe_common::device::{Command, Device, Port, PortRef};
use roomprobe_common::error::DirectoryError;
use roomprobe_common::state::{Display, RoomState};
use roomprobe_core::directory::{DeviceDirectory, RoomStateSource};
use roomprobe_core::graph::SignalGraph;
use roomprobe_core::signal::{self, PathVerifier};

/// Serves the same HTTP response to every connection, counting hits.
async fn serve(status_line: &'static str, body: &'static str, hits: Arc<AtomicUsize>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            hits.fetch_add(1, Ordering::SeqCst);

            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;

                let response = format!(
                    "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len(),
                );
                let _ = stream.write_all(response.as_bytes()).await;
            });
        }
    });

    addr
}

fn display_device(id: &str, wired_from: (&str, &str)) -> Device {
    Device {
        id: id.to_string(),
        name: id.rsplit('-').next().unwrap().to_string(),
        address: String::new(),
        roles: Vec::new(),
        ports: vec![Port {
            id: "IN-A".to_string(),
            tags: vec!["video".to_string()],
            source: Some(PortRef {
                device: wired_from.0.to_string(),
                port: wired_from.1.to_string(),
            }),
        }],
        commands: Vec::new(),
    }
}

fn switcher_device(id: &str, address: SocketAddr, wired_from: (&str, &str)) -> Device {
    Device {
        id: id.to_string(),
        name: id.rsplit('-').next().unwrap().to_string(),
        address: address.to_string(),
        roles: vec!["VideoSwitcher".to_string()],
        ports: vec![
            Port {
                id: "IN1".to_string(),
                tags: vec!["video".to_string()],
                source: Some(PortRef {
                    device: wired_from.0.to_string(),
                    port: wired_from.1.to_string(),
                }),
            },
            Port {
                id: "OUT1".to_string(),
                tags: vec!["video".to_string()],
                source: None,
            },
        ],
        commands: vec![Command {
            id: "ActiveSignal".to_string(),
            address: "http://:address/input/:port/active".to_string(),
        }],
    }
}

fn source_device(id: &str, address: Option<SocketAddr>) -> Device {
    Device {
        id: id.to_string(),
        name: id.rsplit('-').next().unwrap().to_string(),
        address: address.map(|a| a.to_string()).unwrap_or_default(),
        roles: Vec::new(),
        ports: vec![Port {
            id: "OUT".to_string(),
            tags: vec!["video".to_string()],
            source: None,
        }],
        commands: address
            .map(|_| {
                vec![Command {
                    id: "ActiveSignal".to_string(),
                    address: "http://:address/active".to_string(),
                }]
            })
            .unwrap_or_default(),
    }
}

fn display_state(name: &str, input: &str) -> Display {
    Display {
        name: name.to_string(),
        input: input.to_string(),
        power: "on".to_string(),
        blanked: Some(false),
    }
}

fn verifier() -> PathVerifier {
    PathVerifier::new(Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn active_hops_verify_the_whole_path() {
    let switcher_hits = Arc::new(AtomicUsize::new(0));
    let source_hits = Arc::new(AtomicUsize::new(0));

    let switcher_addr = serve("HTTP/1.1 200 OK", r#"{"active":true}"#, switcher_hits.clone()).await;
    let source_addr = serve("HTTP/1.1 200 OK", r#"{"active":true}"#, source_hits.clone()).await;

    let devices = vec![
        source_device("R-HDMI1", Some(source_addr)),
        switcher_device("R-SW1", switcher_addr, ("R-HDMI1", "OUT")),
        display_device("R-D1", ("R-SW1", "OUT1")),
    ];
    let graph = SignalGraph::build(&devices, "video").unwrap();

    let verdict = verifier()
        .is_path_active(&display_state("D1", "HDMI1"), "R", &graph)
        .await;

    assert!(verdict);
    assert_eq!(switcher_hits.load(Ordering::SeqCst), 1);
    assert_eq!(source_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn first_inactive_hop_short_circuits_the_walk() {
    let switcher_hits = Arc::new(AtomicUsize::new(0));
    let source_hits = Arc::new(AtomicUsize::new(0));

    let switcher_addr = serve("HTTP/1.1 200 OK", r#"{"active":false}"#, switcher_hits.clone()).await;
    let source_addr = serve("HTTP/1.1 200 OK", r#"{"active":true}"#, source_hits.clone()).await;

    let devices = vec![
        source_device("R-HDMI1", Some(source_addr)),
        switcher_device("R-SW1", switcher_addr, ("R-HDMI1", "OUT")),
        display_device("R-D1", ("R-SW1", "OUT1")),
    ];
    let graph = SignalGraph::build(&devices, "video").unwrap();

    let verdict = verifier()
        .is_path_active(&display_state("D1", "HDMI1"), "R", &graph)
        .await;

    assert!(!verdict);
    assert_eq!(switcher_hits.load(Ordering::SeqCst), 1);
    // the walk must stop at the switcher; the source is never queried
    assert_eq!(source_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn error_statuses_and_malformed_bodies_fail_closed() {
    for (status, body) in [
        ("HTTP/1.1 500 Internal Server Error", r#"{"active":true}"#),
        ("HTTP/1.1 200 OK", "not json at all"),
    ] {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = serve(status, body, hits).await;

        let devices = vec![
            source_device("R-HDMI1", None),
            switcher_device("R-SW1", addr, ("R-HDMI1", "OUT")),
            display_device("R-D1", ("R-SW1", "OUT1")),
        ];
        let graph = SignalGraph::build(&devices, "video").unwrap();

        let verdict = verifier()
            .is_path_active(&display_state("D1", "HDMI1"), "R", &graph)
            .await;

        assert!(!verdict, "expected fail-closed for {status} / {body}");
    }
}

struct FixtureRoom {
    room_id: String,
    devices: Vec<Device>,
    displays: Vec<Display>,
}

#[async_trait]
impl DeviceDirectory for FixtureRoom {
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
impl RoomStateSource for FixtureRoom {
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

#[tokio::test]
async fn room_map_holds_one_verdict_per_display() {
    let switcher_hits = Arc::new(AtomicUsize::new(0));
    let switcher_addr = serve("HTTP/1.1 200 OK", r#"{"active":true}"#, switcher_hits).await;

    // D1 is wired to its input; D2 names an input that does not exist
    let room = FixtureRoom {
        room_id: "R".to_string(),
        devices: vec![
            source_device("R-HDMI1", None),
            switcher_device("R-SW1", switcher_addr, ("R-HDMI1", "OUT")),
            display_device("R-D1", ("R-SW1", "OUT1")),
            display_device("R-D2", ("R-SW1", "OUT1")),
        ],
        displays: vec![display_state("D1", "HDMI1"), display_state("D2", "GHOST")],
    };

    let verifier = Arc::new(verifier());
    let config = Config {
        signal_class: "video".to_string(),
        probe_timeout: Duration::from_secs(2),
    };
    let map = signal::room_signal_map(&room, &room, &verifier, "R", &config)
        .await
        .unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map["R-D1"], true);
    assert_eq!(map["R-D2"], false);
}
