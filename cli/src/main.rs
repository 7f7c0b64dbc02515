mod commands;
mod roomfile;
mod terminal;

use commands::{CommandLine, Commands, graph, ping, signal};
use terminal::print;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    terminal::logging::init();

    match commands.command {
        Commands::Ping {
            room,
            count,
            delay,
            timeout,
        } => {
            print::header("pinging room devices");
            ping::run(&room, count, delay, timeout).await
        }
        Commands::Signal {
            room,
            class,
            timeout,
        } => {
            print::header("checking signal paths");
            signal::run(&room, &class, timeout).await
        }
        Commands::Graph { room, class } => {
            print::header("room wiring");
            graph::run(&room, &class)
        }
    }
}
