//! Link-layer header.

use crate::error::{NetworkError, Result};
use crate::types::{EtherType, MacAddress, ETH_ALEN, ETH_HLEN};

use super::{read_u16, swap_fields, write_u16};

pub const DST_OFFSET: usize = 0;
pub const SRC_OFFSET: usize = 6;
pub const TYPE_OFFSET: usize = 12;

/// Write destination, source and frame type at offset 0.
pub fn build_header(buf: &mut [u8], dst: MacAddress, src: MacAddress, ethertype: EtherType) -> Result<usize> {
    if buf.len() < ETH_HLEN {
        return Err(NetworkError::BufferTooSmall);
    }
    buf[DST_OFFSET..DST_OFFSET + ETH_ALEN].copy_from_slice(&dst.0);
    buf[SRC_OFFSET..SRC_OFFSET + ETH_ALEN].copy_from_slice(&src.0);
    write_u16(buf, TYPE_OFFSET, ethertype as u16);
    Ok(ETH_HLEN)
}

pub fn destination(frame: &[u8]) -> Option<MacAddress> {
    MacAddress::from_bytes(frame.get(DST_OFFSET..)?)
}

pub fn source(frame: &[u8]) -> Option<MacAddress> {
    MacAddress::from_bytes(frame.get(SRC_OFFSET..)?)
}

pub fn ethertype(frame: &[u8]) -> Option<u16> {
    read_u16(frame, TYPE_OFFSET)
}

pub fn is_ethertype(frame: &[u8], ethertype: EtherType) -> bool {
    self::ethertype(frame) == Some(ethertype as u16)
}

/// Exchange destination and source so the frame goes back where it came from.
pub fn swap_addresses(frame: &mut [u8]) -> Result<()> {
    if frame.len() < ETH_HLEN {
        return Err(NetworkError::Truncated);
    }
    swap_fields(frame, DST_OFFSET, SRC_OFFSET, ETH_ALEN);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: MacAddress = MacAddress::new(0x02, 0, 0, 0, 0, 0x0a);
    const B: MacAddress = MacAddress::new(0x02, 0, 0, 0, 0, 0x0b);

    #[test]
    fn test_build_and_read_header() {
        let mut buf = [0u8; 20];
        assert_eq!(build_header(&mut buf, A, B, EtherType::Arp), Ok(14));
        assert_eq!(destination(&buf), Some(A));
        assert_eq!(source(&buf), Some(B));
        assert_eq!(ethertype(&buf), Some(0x0806));
        assert!(is_ethertype(&buf, EtherType::Arp));
        assert!(!is_ethertype(&buf, EtherType::Ipv4));
    }

    #[test]
    fn test_build_rejects_short_buffer() {
        let mut buf = [0u8; 13];
        assert_eq!(build_header(&mut buf, A, B, EtherType::Ipv4), Err(NetworkError::BufferTooSmall));
    }

    #[test]
    fn test_swap_addresses() {
        let mut buf = [0u8; 14];
        build_header(&mut buf, A, B, EtherType::Ipv4).unwrap();
        swap_addresses(&mut buf).unwrap();
        assert_eq!(destination(&buf), Some(B));
        assert_eq!(source(&buf), Some(A));
    }

    #[test]
    fn test_short_frame_reads_none() {
        assert_eq!(ethertype(&[0u8; 12]), None);
        assert_eq!(source(&[0u8; 11]), None);
    }
}
