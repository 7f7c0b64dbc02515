#![cfg(test)]
//! Live ICMP probing tests.
//!
//! These open a raw socket and put real packets on the wire, so they
//! need root and are only run explicitly with `--ignored`.

use std::time::{Duration, Instant};

use roomprobe_core::ping::{PingConfig, PingTarget, Pinger};

fn target(id: &str, addr: &str) -> PingTarget {
    PingTarget {
        id: id.to_string(),
        addr: addr.to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn loopback_replies_to_every_request() {
    let pinger = Pinger::new().unwrap();
    let config = PingConfig {
        count: 2,
        delay: Duration::from_millis(500),
        timeout: Duration::from_secs(5),
    };

    let results = pinger.ping(&config, &[target("R-SELF", "127.0.0.1")]).await;

    let result = &results["R-SELF"];
    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert!(result.packets_received >= 1);
    assert!(result.average_round_trip.is_some());
}

#[tokio::test]
#[ignore]
async fn unreachable_address_times_out_at_the_deadline() {
    let pinger = Pinger::new().unwrap();

    // more probing budget than the deadline allows, against TEST-NET-1
    let config = PingConfig {
        count: 10,
        delay: Duration::from_secs(1),
        timeout: Duration::from_secs(2),
    };

    let started = Instant::now();
    let results = pinger.ping(&config, &[target("R-GONE", "192.0.2.1")]).await;
    let elapsed = started.elapsed();

    let result = &results["R-GONE"];
    assert_eq!(result.packets_received, 0);
    assert!(result.error.is_some(), "expected a timeout error");

    // the deadline must be what ends the session: not before, and not
    // unboundedly after
    assert!(elapsed >= Duration::from_secs(2), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "returned late: {elapsed:?}");
}

#[tokio::test]
#[ignore]
async fn sibling_targets_survive_a_failing_one() {
    let pinger = Pinger::new().unwrap();
    let config = PingConfig {
        count: 1,
        delay: Duration::from_millis(500),
        timeout: Duration::from_secs(5),
    };

    let results = pinger
        .ping(
            &config,
            &[target("R-SELF", "127.0.0.1"), target("R-BAD", "")],
        )
        .await;

    assert_eq!(results.len(), 2);
    assert!(results["R-BAD"].error.is_some());
    assert!(results["R-SELF"].error.is_none());
}
