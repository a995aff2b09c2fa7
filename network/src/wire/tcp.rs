//! TCP segment codec (RFC 793).
//!
//! Connection bookkeeping lives in [`crate::tcp`]; this module only reads
//! and writes header bytes.

use core::fmt;
use core::ops::{BitOr, BitOrAssign, Range};

use crate::checksum;
use crate::error::{NetworkError, Result};
use crate::types::IpProtocol;

use super::{ipv4, read_u16, read_u32, write_u16, write_u32};

/// Header length without options.
pub const HEADER_LEN: usize = 20;
/// Maximum segment size option sent on SYN: kind 2, length 4, 1460.
pub const MSS_OPTION: [u8; 4] = [0x02, 0x04, 0x05, 0xB4];

const SRC_PORT: usize = 0;
const DST_PORT: usize = 2;
const SEQ: usize = 4;
const ACK: usize = 8;
const DATA_OFFSET: usize = 12;
const FLAGS: usize = 13;
const WINDOW: usize = 14;
const CHECKSUM: usize = 16;
const URGENT: usize = 18;

/// Control bits.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags(u8);

impl TcpFlags {
    pub const FIN: Self = Self(0x01);
    pub const SYN: Self = Self(0x02);
    pub const RST: Self = Self(0x04);
    pub const PSH: Self = Self(0x08);
    pub const ACK: Self = Self(0x10);
    pub const URG: Self = Self(0x20);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x3F)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TcpFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TcpFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(TcpFlags, &str); 6] = [
            (TcpFlags::URG, "URG"),
            (TcpFlags::ACK, "ACK"),
            (TcpFlags::PSH, "PSH"),
            (TcpFlags::RST, "RST"),
            (TcpFlags::SYN, "SYN"),
            (TcpFlags::FIN, "FIN"),
        ];
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

/// Decoded fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub window: u16,
    /// Header length in bytes, options included.
    pub header_len: usize,
}

/// Write the fixed header at the start of `segment`.
///
/// Option bytes (if `header_len > 20`) are left to the caller. The checksum
/// is zeroed; see [`update_checksum`].
pub fn write_header(segment: &mut [u8], header: &SegmentHeader) -> Result<()> {
    if header.header_len < HEADER_LEN || header.header_len > 60 || header.header_len % 4 != 0 {
        return Err(NetworkError::MalformedPacket);
    }
    if segment.len() < header.header_len {
        return Err(NetworkError::BufferTooSmall);
    }
    write_u16(segment, SRC_PORT, header.src_port);
    write_u16(segment, DST_PORT, header.dst_port);
    write_u32(segment, SEQ, header.seq);
    write_u32(segment, ACK, header.ack);
    // Data offset in 32-bit words, upper nibble
    segment[DATA_OFFSET] = ((header.header_len / 4) as u8) << 4;
    segment[FLAGS] = header.flags.bits();
    write_u16(segment, WINDOW, header.window);
    write_u16(segment, CHECKSUM, 0);
    write_u16(segment, URGENT, 0);
    Ok(())
}

/// Parse the fixed header at the start of `segment`.
pub fn parse_header(segment: &[u8]) -> Option<SegmentHeader> {
    let header_len = ((*segment.get(DATA_OFFSET)? >> 4) as usize) * 4;
    if header_len < HEADER_LEN || segment.len() < header_len {
        return None;
    }
    Some(SegmentHeader {
        src_port: read_u16(segment, SRC_PORT)?,
        dst_port: read_u16(segment, DST_PORT)?,
        seq: read_u32(segment, SEQ)?,
        ack: read_u32(segment, ACK)?,
        flags: TcpFlags::from_bits(*segment.get(FLAGS)?),
        window: read_u16(segment, WINDOW)?,
        header_len,
    })
}

/// Byte range of the TCP segment inside an IPv4 frame.
pub fn segment_range(frame: &[u8]) -> Option<Range<usize>> {
    if ipv4::protocol(frame)? != IpProtocol::Tcp as u8 {
        return None;
    }
    let range = ipv4::payload_range(frame)?;
    if range.len() < HEADER_LEN {
        return None;
    }
    Some(range)
}

fn segment_sum(frame: &[u8], range: Range<usize>) -> Option<u32> {
    let src = ipv4::source(frame)?;
    let dst = ipv4::destination(frame)?;
    let len = u16::try_from(range.len()).ok()?;
    let sum = checksum::pseudo_header_sum(src, dst, IpProtocol::Tcp, len);
    Some(checksum::accumulate(sum, &frame[range]))
}

/// Checksum over pseudo-header and segment reduces to zero.
pub fn verify_checksum(frame: &[u8]) -> bool {
    let Some(range) = segment_range(frame) else {
        return false;
    };
    matches!(segment_sum(frame, range), Some(sum) if checksum::finalize(sum) == 0)
}

/// TCP segment with a valid checksum.
pub fn is_tcp(frame: &[u8]) -> bool {
    verify_checksum(frame)
}

/// Recompute the checksum; IP length and addresses must already be final.
pub fn update_checksum(frame: &mut [u8]) -> Result<()> {
    let range = segment_range(frame).ok_or(NetworkError::Truncated)?;
    let field = range.start + CHECKSUM;
    write_u16(frame, field, 0);
    let sum = segment_sum(frame, range).ok_or(NetworkError::Truncated)?;
    write_u16(frame, field, checksum::finalize(sum));
    Ok(())
}
