//! IPv4 header (RFC 791).

use core::ops::Range;

use crate::checksum;
use crate::error::{NetworkError, Result};
use crate::types::{EtherType, IpProtocol, Ipv4Addr, ETH_HLEN};

use super::{ethernet, read_u16, swap_fields, write_u16};

/// Header length without options.
pub const HEADER_LEN: usize = 20;
/// Don't Fragment flag in the flags/fragment-offset field.
pub const DONT_FRAGMENT: u16 = 0x4000;
pub const DEFAULT_TTL: u8 = 64;

const VER_IHL: usize = ETH_HLEN;
const TOTAL_LEN: usize = ETH_HLEN + 2;
const IDENT: usize = ETH_HLEN + 4;
const FLAGS: usize = ETH_HLEN + 6;
const TTL: usize = ETH_HLEN + 8;
const PROTOCOL: usize = ETH_HLEN + 9;
const CHECKSUM: usize = ETH_HLEN + 10;
const SRC: usize = ETH_HLEN + 12;
const DST: usize = ETH_HLEN + 16;

/// Build an IPv4 header after the link-layer header.
///
/// The `payload_len` bytes following the header must already fit in `buf`.
/// Returns the offset of the IP payload.
pub fn build_header(
    buf: &mut [u8],
    src: Ipv4Addr,
    dst: Ipv4Addr,
    payload_len: usize,
    protocol: IpProtocol,
    ttl: u8,
    id: u16,
) -> Result<usize> {
    let total_len = HEADER_LEN + payload_len;
    if buf.len() < ETH_HLEN + total_len {
        return Err(NetworkError::BufferTooSmall);
    }
    let total_len = u16::try_from(total_len).map_err(|_| NetworkError::BufferTooSmall)?;

    // Version (4) + IHL (5 = 20 bytes)
    buf[VER_IHL] = 0x45;
    // DSCP/ECN
    buf[VER_IHL + 1] = 0;
    write_u16(buf, TOTAL_LEN, total_len);
    write_u16(buf, IDENT, id);
    write_u16(buf, FLAGS, DONT_FRAGMENT);
    buf[TTL] = ttl;
    buf[PROTOCOL] = protocol as u8;
    buf[SRC..SRC + 4].copy_from_slice(&src.0);
    buf[DST..DST + 4].copy_from_slice(&dst.0);
    update_checksum(buf)?;

    Ok(ETH_HLEN + HEADER_LEN)
}

/// Header length from the IHL field, if the header is version 4 and fits.
pub fn header_len(frame: &[u8]) -> Option<usize> {
    let ver_ihl = *frame.get(VER_IHL)?;
    if ver_ihl >> 4 != 4 {
        return None;
    }
    let len = ((ver_ihl & 0x0F) as usize) * 4;
    if len < HEADER_LEN || frame.len() < ETH_HLEN + len {
        return None;
    }
    Some(len)
}

pub fn total_len(frame: &[u8]) -> Option<usize> {
    read_u16(frame, TOTAL_LEN).map(usize::from)
}

pub fn protocol(frame: &[u8]) -> Option<u8> {
    frame.get(PROTOCOL).copied()
}

pub fn ttl(frame: &[u8]) -> Option<u8> {
    frame.get(TTL).copied()
}

pub fn ident(frame: &[u8]) -> Option<u16> {
    read_u16(frame, IDENT)
}

pub fn source(frame: &[u8]) -> Option<Ipv4Addr> {
    Ipv4Addr::from_bytes(frame.get(SRC..)?)
}

pub fn destination(frame: &[u8]) -> Option<Ipv4Addr> {
    Ipv4Addr::from_bytes(frame.get(DST..)?)
}

/// IPv4 frame whose header checksum is intact.
pub fn is_ip(frame: &[u8]) -> bool {
    if !ethernet::is_ethertype(frame, EtherType::Ipv4) {
        return false;
    }
    match header_len(frame) {
        Some(len) => checksum::verify(&frame[ETH_HLEN..ETH_HLEN + len]),
        None => false,
    }
}

pub fn is_unicast(frame: &[u8], local_ip: Ipv4Addr) -> bool {
    destination(frame) == Some(local_ip)
}

/// Byte range of the IP payload, bounded by the total length field.
pub fn payload_range(frame: &[u8]) -> Option<Range<usize>> {
    let header_len = header_len(frame)?;
    let total_len = total_len(frame)?;
    if total_len < header_len || frame.len() < ETH_HLEN + total_len {
        return None;
    }
    Some(ETH_HLEN + header_len..ETH_HLEN + total_len)
}

/// Recompute the header checksum after a header field changed.
pub fn update_checksum(frame: &mut [u8]) -> Result<()> {
    let len = header_len(frame).ok_or(NetworkError::Truncated)?;
    write_u16(frame, CHECKSUM, 0);
    let sum = checksum::checksum(&frame[ETH_HLEN..ETH_HLEN + len]);
    write_u16(frame, CHECKSUM, sum);
    Ok(())
}

/// Set the total length field; the checksum is left for `update_checksum`.
pub fn set_total_len(frame: &mut [u8], total_len: usize) -> Result<()> {
    let total_len = u16::try_from(total_len).map_err(|_| NetworkError::BufferTooSmall)?;
    if frame.len() < TOTAL_LEN + 2 {
        return Err(NetworkError::Truncated);
    }
    write_u16(frame, TOTAL_LEN, total_len);
    Ok(())
}

/// Exchange source and destination addresses.
pub fn swap_addresses(frame: &mut [u8]) -> Result<()> {
    if frame.len() < ETH_HLEN + HEADER_LEN {
        return Err(NetworkError::Truncated);
    }
    swap_fields(frame, SRC, DST, 4);
    Ok(())
}
