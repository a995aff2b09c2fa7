//! Address resolution (RFC 826) for Ethernet / IPv4.
//!
//! ```text
//! offset  field
//!   14    hardware type (1)        16  protocol type (0x0800)
//!   18    hardware size (6)        19  protocol size (4)
//!   20    operation
//!   22    sender MAC               28  sender IP
//!   32    target MAC               38  target IP
//! ```

use crate::error::{NetworkError, Result};
use crate::types::{EtherType, Ipv4Addr, MacAddress, ETH_ALEN, ETH_HLEN};

use super::{ethernet, read_u16, swap_fields, write_u16};

/// ARP body length for Ethernet / IPv4.
pub const ARP_LEN: usize = 28;
/// Link header plus ARP body.
pub const FRAME_LEN: usize = ETH_HLEN + ARP_LEN;

const HTYPE: usize = ETH_HLEN;
const PTYPE: usize = ETH_HLEN + 2;
const HLEN: usize = ETH_HLEN + 4;
const PLEN: usize = ETH_HLEN + 5;
const OPER: usize = ETH_HLEN + 6;
const SHA: usize = ETH_HLEN + 8;
const SPA: usize = ETH_HLEN + 14;
const THA: usize = ETH_HLEN + 18;
const TPA: usize = ETH_HLEN + 24;

const HTYPE_ETHERNET: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ArpOperation {
    Request = 1,
    Reply = 2,
}

fn is_operation(frame: &[u8], local_ip: Ipv4Addr, op: ArpOperation) -> bool {
    frame.len() >= FRAME_LEN
        && ethernet::is_ethertype(frame, EtherType::Arp)
        && read_u16(frame, OPER) == Some(op as u16)
        && target_protocol_addr(frame) == Some(local_ip)
}

/// ARP request asking for `local_ip`.
pub fn is_request(frame: &[u8], local_ip: Ipv4Addr) -> bool {
    is_operation(frame, local_ip, ArpOperation::Request)
}

/// ARP reply addressed to `local_ip`.
pub fn is_reply(frame: &[u8], local_ip: Ipv4Addr) -> bool {
    is_operation(frame, local_ip, ArpOperation::Reply)
}

pub fn sender_hardware_addr(frame: &[u8]) -> Option<MacAddress> {
    MacAddress::from_bytes(frame.get(SHA..)?)
}

pub fn sender_protocol_addr(frame: &[u8]) -> Option<Ipv4Addr> {
    Ipv4Addr::from_bytes(frame.get(SPA..)?)
}

pub fn target_protocol_addr(frame: &[u8]) -> Option<Ipv4Addr> {
    Ipv4Addr::from_bytes(frame.get(TPA..)?)
}

/// Turn a received request into its reply, in place.
///
/// Returns the length to transmit.
pub fn build_reply(frame: &mut [u8], local_mac: MacAddress) -> Result<usize> {
    if frame.len() < FRAME_LEN {
        return Err(NetworkError::Truncated);
    }

    write_u16(frame, OPER, ArpOperation::Reply as u16);

    // Requester becomes the target
    frame.copy_within(SHA..SHA + ETH_ALEN, THA);
    frame.copy_within(SHA..SHA + ETH_ALEN, ethernet::DST_OFFSET);

    frame[SHA..SHA + ETH_ALEN].copy_from_slice(&local_mac.0);
    frame[ethernet::SRC_OFFSET..ethernet::SRC_OFFSET + ETH_ALEN].copy_from_slice(&local_mac.0);

    swap_fields(frame, SPA, TPA, 4);

    Ok(FRAME_LEN)
}

/// Broadcast a request for `target_ip`.
pub fn build_request(
    buf: &mut [u8],
    local_mac: MacAddress,
    local_ip: Ipv4Addr,
    target_ip: Ipv4Addr,
) -> Result<usize> {
    if buf.len() < FRAME_LEN {
        return Err(NetworkError::BufferTooSmall);
    }

    ethernet::build_header(buf, MacAddress::BROADCAST, local_mac, EtherType::Arp)?;

    write_u16(buf, HTYPE, HTYPE_ETHERNET);
    write_u16(buf, PTYPE, EtherType::Ipv4 as u16);
    buf[HLEN] = ETH_ALEN as u8;
    buf[PLEN] = 4;
    write_u16(buf, OPER, ArpOperation::Request as u16);
    buf[SHA..SHA + ETH_ALEN].copy_from_slice(&local_mac.0);
    buf[SPA..SPA + 4].copy_from_slice(&local_ip.0);
    buf[THA..THA + ETH_ALEN].copy_from_slice(&MacAddress::ZERO.0);
    buf[TPA..TPA + 4].copy_from_slice(&target_ip.0);

    Ok(FRAME_LEN)
}
