//! Internet checksum (RFC 1071)
//!
//! Shared by the IPv4 header, ICMP, UDP and TCP. Sums are carried as a
//! running `u32` so that discontiguous ranges (pseudo-header + segment) can be
//! added together before finalizing.

use crate::types::{IpProtocol, Ipv4Addr};

/// Add every big-endian 16-bit word of `data` to `sum`.
///
/// A trailing odd byte is padded with zero on the right.
pub fn accumulate(mut sum: u32, data: &[u8]) -> u32 {
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u16::from_be_bytes([word[0], word[1]]) as u32);
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }
    sum
}

/// Fold carries into 16 bits and return the one's complement.
pub fn finalize(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Checksum of a single contiguous range.
pub fn checksum(data: &[u8]) -> u16 {
    finalize(accumulate(0, data))
}

/// A range that embeds its own correct checksum sums to zero.
pub fn verify(data: &[u8]) -> bool {
    checksum(data) == 0
}

/// Running sum of the IPv4 pseudo-header covering a TCP or UDP segment.
pub fn pseudo_header_sum(src: Ipv4Addr, dst: Ipv4Addr, protocol: IpProtocol, length: u16) -> u32 {
    let mut sum = accumulate(0, src.as_bytes());
    sum = accumulate(sum, dst.as_bytes());
    sum += protocol as u32;
    sum + length as u32
}
