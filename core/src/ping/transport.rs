//! ICMP transport channel plumbing.
//!
//! pnet's transport receivers block in `recv`, so a dedicated OS thread
//! drains the shared socket and forwards raw datagrams into a tokio
//! channel the async demultiplexer can await on. The thread polls with a
//! short timeout so a shutdown flag is honored promptly, and exits on the
//! first non-temporary read failure.

use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use pnet::packet::Packet;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::{self, TransportChannelType, TransportProtocol, TransportSender, icmp_packet_iter};
use tokio::sync::mpsc;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));
const READ_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// An inbound ICMP datagram, its source, and when it was read.
pub struct Inbound {
    pub bytes: Vec<u8>,
    pub source: IpAddr,
    pub received_at: Instant,
}

pub struct IcmpHandle {
    pub tx: TransportSender,
    pub rx: mpsc::UnboundedReceiver<Inbound>,
    /// Set to make the reader thread exit after its current poll.
    pub stop: Arc<AtomicBool>,
}

/// Opens the shared ICMP socket and spawns the blocking reader thread.
///
/// Requires raw-socket privilege; the caller is expected to have checked
/// for it already so the error here is a plain IO error.
pub fn start_packet_capture() -> io::Result<IcmpHandle> {
    let (tx, mut rx_socket) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_ICMP)?;
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));

    let reader_stop = Arc::clone(&stop);
    std::thread::spawn(move || {
        let mut iterator = icmp_packet_iter(&mut rx_socket);
        loop {
            if reader_stop.load(Ordering::Relaxed) {
                break;
            }

            match iterator.next_with_timeout(READ_POLL_INTERVAL) {
                Ok(Some((packet, source))) => {
                    let inbound = Inbound {
                        bytes: packet.packet().to_vec(),
                        source,
                        received_at: Instant::now(),
                    };
                    if queue_tx.send(inbound).is_err() {
                        break; // demultiplexer is gone
                    }
                }
                Ok(None) => continue,
                Err(_) => break, // non-temporary read failure, socket is closing
            }
        }
    });

    Ok(IcmpHandle {
        tx,
        rx: queue_rx,
        stop,
    })
}
