//! # Roomprobe Core
//!
//! The concurrent device-health and signal-path verification engine.
//!
//! Two subsystems share one fan-out/aggregate pattern:
//!
//! * **[`ping`]**: a raw-socket ICMP prober that determines network
//!   liveness of many hosts in parallel under a bounded deadline.
//! * **[`graph`] + [`signal`]**: a reachability search over a room's
//!   port-wiring graph, and a hop-by-hop walk that polls each device's
//!   self-reported active-signal state to decide whether a source→display
//!   path is truly carrying signal.
//!
//! Both fail closed: when a device cannot be reached or answers garbage,
//! the result is "down" / "not active", never an assumption that things
//! are fine. Device and room-state lookup stay behind the traits in
//! [`directory`]; this crate never talks to storage.

pub mod directory;
pub mod graph;
pub mod ping;
pub mod signal;
