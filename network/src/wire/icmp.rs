//! ICMP echo responder (RFC 792).

use crate::checksum;
use crate::error::{NetworkError, Result};
use crate::types::IpProtocol;

use super::{ethernet, ipv4, write_u16};

/// ICMP message type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IcmpType {
    EchoReply = 0,
    DestUnreachable = 3,
    EchoRequest = 8,
    TimeExceeded = 11,
}

impl IcmpType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::EchoReply),
            3 => Some(Self::DestUnreachable),
            8 => Some(Self::EchoRequest),
            11 => Some(Self::TimeExceeded),
            _ => None,
        }
    }
}

const TYPE: usize = 0;
const CODE: usize = 1;
const CHECKSUM: usize = 2;

/// Minimum ICMP header (type, code, checksum, rest-of-header)
pub const HEADER_LEN: usize = 8;

pub fn message_type(frame: &[u8]) -> Option<IcmpType> {
    let range = ipv4::payload_range(frame)?;
    IcmpType::from_u8(*frame.get(range.start + TYPE)?)
}

pub fn is_echo_request(frame: &[u8]) -> bool {
    ipv4::protocol(frame) == Some(IpProtocol::Icmp as u8)
        && message_type(frame) == Some(IcmpType::EchoRequest)
}

/// Turn an echo request into the matching reply, in place.
///
/// Identifier, sequence and payload are echoed unchanged. Returns the
/// length to transmit.
pub fn build_echo_reply(frame: &mut [u8]) -> Result<usize> {
    let range = ipv4::payload_range(frame).ok_or(NetworkError::Truncated)?;
    if range.len() < HEADER_LEN {
        return Err(NetworkError::Truncated);
    }
    let end = range.end;

    ethernet::swap_addresses(frame)?;
    ipv4::swap_addresses(frame)?;
    ipv4::update_checksum(frame)?;

    let message = &mut frame[range];
    message[TYPE] = IcmpType::EchoReply as u8;
    message[CODE] = 0;
    write_u16(message, CHECKSUM, 0);
    let sum = checksum::checksum(message);
    write_u16(message, CHECKSUM, sum);

    // Link header + IP total length
    Ok(end)
}
