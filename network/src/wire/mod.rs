//! Header codecs operating in place on a frame buffer.
//!
//! Every function takes the whole frame, link-layer header at offset 0.
//! Readers return `None` when the frame is too short; builders check the
//! buffer capacity up front and return `BufferTooSmall`.

pub mod arp;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod tcp;
pub mod udp;

use crate::types::ETH_HLEN;

/// Offset of the first byte after link, IPv4 and TCP headers without options.
pub const TCP_PAYLOAD_OFFSET: usize = ETH_HLEN + ipv4::HEADER_LEN + tcp::HEADER_LEN;

pub(crate) fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Caller guarantees `offset + 2 <= buf.len()`.
pub(crate) fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Caller guarantees `offset + 4 <= buf.len()`.
pub(crate) fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Swap two equally sized, non-overlapping fields.
pub(crate) fn swap_fields(buf: &mut [u8], a: usize, b: usize, len: usize) {
    for i in 0..len {
        buf.swap(a + i, b + i);
    }
}
