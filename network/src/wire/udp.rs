//! UDP responder (RFC 768).

use core::ops::Range;

use crate::checksum;
use crate::error::{NetworkError, Result};
use crate::types::{IpProtocol, ETH_HLEN};

use super::{ethernet, ipv4, read_u16, write_u16};

pub const HEADER_LEN: usize = 8;

const SRC_PORT: usize = 0;
const DST_PORT: usize = 2;
const LENGTH: usize = 4;
const CHECKSUM: usize = 6;

/// Datagram bytes bounded by the UDP length field.
fn datagram_range(frame: &[u8]) -> Option<Range<usize>> {
    if ipv4::protocol(frame)? != IpProtocol::Udp as u8 {
        return None;
    }
    let range = ipv4::payload_range(frame)?;
    let udp_len = read_u16(frame, range.start + LENGTH)? as usize;
    if udp_len < HEADER_LEN || udp_len > range.len() {
        return None;
    }
    Some(range.start..range.start + udp_len)
}

/// Pseudo-header plus datagram, checksum field included as stored.
fn datagram_sum(frame: &[u8], range: Range<usize>) -> Option<u32> {
    let src = ipv4::source(frame)?;
    let dst = ipv4::destination(frame)?;
    let len = u16::try_from(range.len()).ok()?;
    let sum = checksum::pseudo_header_sum(src, dst, IpProtocol::Udp, len);
    Some(checksum::accumulate(sum, &frame[range]))
}

/// UDP datagram with a valid checksum, or with checksum 0 (not computed by
/// the sender).
pub fn is_udp(frame: &[u8]) -> bool {
    let Some(range) = datagram_range(frame) else {
        return false;
    };
    if read_u16(frame, range.start + CHECKSUM) == Some(0) {
        return true;
    }
    matches!(datagram_sum(frame, range), Some(sum) if checksum::finalize(sum) == 0)
}

/// (source port, destination port)
pub fn ports(frame: &[u8]) -> Option<(u16, u16)> {
    let range = datagram_range(frame)?;
    Some((read_u16(frame, range.start + SRC_PORT)?, read_u16(frame, range.start + DST_PORT)?))
}

pub fn payload(frame: &[u8]) -> Option<&[u8]> {
    let range = datagram_range(frame)?;
    frame.get(range.start + HEADER_LEN..range.end)
}

/// Turn a received datagram into a reply carrying `data`, in place.
///
/// The reply's source port is the request's destination port and its
/// destination port is the request's source port. Returns the length to
/// transmit.
pub fn build_response(buf: &mut [u8], data: &[u8]) -> Result<usize> {
    let start = ETH_HLEN + ipv4::header_len(buf).ok_or(NetworkError::Truncated)?;
    let udp_len = HEADER_LEN + data.len();
    let end = start + udp_len;
    if buf.len() < end {
        return Err(NetworkError::BufferTooSmall);
    }
    let udp_len = u16::try_from(udp_len).map_err(|_| NetworkError::BufferTooSmall)?;

    ethernet::swap_addresses(buf)?;
    ipv4::swap_addresses(buf)?;
    ipv4::set_total_len(buf, end - ETH_HLEN)?;
    ipv4::update_checksum(buf)?;

    let remote_port = read_u16(buf, start + SRC_PORT).ok_or(NetworkError::Truncated)?;
    let local_port = read_u16(buf, start + DST_PORT).ok_or(NetworkError::Truncated)?;
    write_u16(buf, start + SRC_PORT, local_port);
    write_u16(buf, start + DST_PORT, remote_port);
    write_u16(buf, start + LENGTH, udp_len);
    buf[start + HEADER_LEN..end].copy_from_slice(data);

    update_checksum(buf)?;
    Ok(end)
}

/// Recompute the UDP checksum over pseudo-header and datagram.
pub fn update_checksum(frame: &mut [u8]) -> Result<()> {
    let range = datagram_range(frame).ok_or(NetworkError::Truncated)?;
    let field = range.start + CHECKSUM;
    write_u16(frame, field, 0);
    let sum = datagram_sum(frame, range).ok_or(NetworkError::Truncated)?;
    // Zero on the wire means "no checksum"
    let sum = match checksum::finalize(sum) {
        0 => 0xFFFF,
        sum => sum,
    };
    write_u16(frame, field, sum);
    Ok(())
}
