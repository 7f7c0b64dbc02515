//! ICMPv4 echo marshalling and reply demultiplexing support.
//!
//! The prober shares one raw socket across every in-flight host session, so
//! inbound datagrams must be attributed from the packet alone: the echo
//! identifier ties a reply to one prober instance, the sequence number to
//! one outstanding request. Routers answering for a dead host wrap the
//! original echo inside a DestinationUnreachable message; that embedded
//! echo carries the same identifier and is parsed out here too.

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::icmp::destination_unreachable::DestinationUnreachablePacket;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet::packet::icmp::{IcmpCode, IcmpPacket, IcmpTypes, checksum};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;

pub const ICMP_HDR_LEN: usize = 8;
pub const ECHO_PAYLOAD_LEN: usize = 32;
pub const ECHO_REQ_LEN: usize = ICMP_HDR_LEN + ECHO_PAYLOAD_LEN;

/// Identifier and sequence recovered from an inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    pub ident: u16,
    pub seq: u16,
}

/// Builds an echo request carrying `ident` and `seq` with a zeroed payload.
pub fn build_echo_request(ident: u16, seq: u16) -> anyhow::Result<Vec<u8>> {
    let mut buffer = vec![0u8; ECHO_REQ_LEN];
    let mut echo = MutableEchoRequestPacket::new(&mut buffer)
        .context("failed to create echo request packet")?;

    echo.set_icmp_type(IcmpTypes::EchoRequest);
    echo.set_icmp_code(IcmpCode::new(0));
    echo.set_identifier(ident);
    echo.set_sequence_number(seq);

    echo.set_checksum(0);
    let csum = {
        let view = IcmpPacket::new(echo.packet())
            .context("failed to view echo request as an icmp packet")?;
        checksum(&view)
    };
    echo.set_checksum(csum);

    Ok(buffer)
}

/// Extracts the echo identifier and sequence from an inbound ICMP datagram.
///
/// Handles `EchoReply` directly and the original echo request embedded in a
/// `DestinationUnreachable` message. Every other type, and any truncated or
/// malformed datagram, yields `None`.
pub fn parse_reply(bytes: &[u8]) -> Option<EchoReply> {
    let icmp = IcmpPacket::new(bytes)?;

    match icmp.get_icmp_type() {
        IcmpTypes::EchoReply => {
            let echo = EchoReplyPacket::new(bytes)?;
            Some(EchoReply {
                ident: echo.get_identifier(),
                seq: echo.get_sequence_number(),
            })
        }
        IcmpTypes::DestinationUnreachable => {
            let unreachable = DestinationUnreachablePacket::new(bytes)?;
            let original = Ipv4Packet::new(unreachable.payload())?;
            if original.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
                return None;
            }

            let echo = EchoRequestPacket::new(original.payload())?;
            Some(EchoReply {
                ident: echo.get_identifier(),
                seq: echo.get_sequence_number(),
            })
        }
        _ => None,
    }
}
