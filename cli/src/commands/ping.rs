use std::path::Path;
use std::time::Duration;

use roomprobe_core::ping::{self, PingConfig, Pinger};

use crate::roomfile::RoomFile;
use crate::terminal::print;

pub async fn run(room: &Path, count: u16, delay: u64, timeout: u64) -> anyhow::Result<()> {
    let room = RoomFile::load(room)?;
    let config = PingConfig {
        count,
        delay: Duration::from_secs(delay),
        timeout: Duration::from_secs(timeout),
    };

    let pinger = Pinger::new()?;
    let results = ping::room_ping(&room, &pinger, &room.room_id, &config).await?;

    let mut ids: Vec<&String> = results.keys().collect();
    ids.sort();

    for id in ids {
        let result = &results[id];
        match &result.error {
            Some(err) => print::down_line(id, err),
            None => {
                let rtt = result
                    .average_round_trip
                    .map(|d| format!("{d:?}"))
                    .unwrap_or_else(|| "-".to_string());
                print::up_line(
                    id,
                    &format!(
                        "{}/{} replies, avg rtt {rtt}",
                        result.packets_received, result.packets_sent
                    ),
                );
            }
        }
    }

    if pinger.dropped_replies() > 0 {
        tracing::warn!(
            dropped = pinger.dropped_replies(),
            "late replies were dropped from full queues"
        );
    }

    pinger.close();
    print::end_of_program();
    Ok(())
}
