use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use roomprobe_common::config::Config;
use roomprobe_core::signal::{self, PathVerifier};

use crate::roomfile::RoomFile;
use crate::terminal::print;

pub async fn run(room: &Path, class: &str, timeout: u64) -> anyhow::Result<()> {
    let room = RoomFile::load(room)?;
    let config = Config {
        signal_class: class.to_string(),
        probe_timeout: Duration::from_secs(timeout),
    };

    let verifier = Arc::new(PathVerifier::new(config.probe_timeout)?);
    let results =
        signal::room_signal_map(&room, &room, &verifier, &room.room_id, &config).await?;

    let mut ids: Vec<&String> = results.keys().collect();
    ids.sort();

    for id in ids {
        if results[id] {
            print::up_line(id, "signal active");
        } else {
            print::down_line(id, "no signal");
        }
    }

    print::end_of_program();
    Ok(())
}
