use std::path::Path;

use roomprobe_core::graph::SignalGraph;

use crate::roomfile::RoomFile;
use crate::terminal::print;

pub fn run(room: &Path, class: &str) -> anyhow::Result<()> {
    let room = RoomFile::load(room)?;
    let graph = SignalGraph::build(&room.devices, class)?;

    let mut count = 0;
    for (device, port, upstream) in graph.edges() {
        // physical signal flow runs upstream -> device
        println!("{upstream} ─▶ {device} (into {port})");
        count += 1;
    }

    if count == 0 {
        println!("no {class} wiring in {}", room.room_id);
    }

    print::end_of_program();
    Ok(())
}
