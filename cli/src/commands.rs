pub mod graph;
pub mod ping;
pub mod signal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "roomprobe")]
#[command(about = "Live health and signal-path checks for AV rooms.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ping every addressable device in a room
    #[command(alias = "p")]
    Ping {
        /// Path to the room topology file
        room: PathBuf,
        /// Echo requests per device
        #[arg(long, default_value_t = 3)]
        count: u16,
        /// Seconds to wait on each request before counting it lost
        #[arg(long, default_value_t = 1)]
        delay: u64,
        /// Overall session deadline in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
    /// Check which displays carry an active signal
    #[command(alias = "s")]
    Signal {
        /// Path to the room topology file
        room: PathBuf,
        /// Signal class to trace
        #[arg(long, default_value = "video")]
        class: String,
        /// Per-hop probe deadline in seconds
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },
    /// Print the wiring graph for a signal class
    #[command(alias = "g")]
    Graph {
        /// Path to the room topology file
        room: PathBuf,
        /// Signal class to trace
        #[arg(long, default_value = "video")]
        class: String,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
