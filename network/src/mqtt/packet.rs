//! Control packet encoding and decoding.
//!
//! ```text
//! byte 0   type << 4 | flags
//! byte 1   remaining length (< 128)
//! byte 2.. variable header + payload
//! ```

use super::{PacketType, CLEAN_SESSION, CONNECT_HEADER_LEN, MAX_REMAINING_LEN, PROTOCOL_LEVEL, PROTOCOL_NAME};
use crate::error::{NetworkError, Result};

/// PUBLISH flag bits for QoS 1.
const QOS1: u8 = 0x02;

/// A decoded (or to-be-encoded) control packet borrowing from a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    Connect {
        client_id: &'a str,
        keep_alive: u16,
        clean_session: bool,
    },
    ConnAck {
        session_present: bool,
        return_code: u8,
    },
    /// `packet_id` present means QoS 1. The payload is written with a
    /// two-byte length prefix.
    Publish {
        topic: &'a str,
        packet_id: Option<u16>,
        payload: &'a [u8],
    },
    PubAck { packet_id: u16 },
    PubRec { packet_id: u16 },
    PubRel { packet_id: u16 },
    PubComp { packet_id: u16 },
    Subscribe {
        packet_id: u16,
        topic: &'a str,
        qos: u8,
    },
    SubAck { packet_id: u16, return_code: u8 },
    Unsubscribe { packet_id: u16, topic: &'a str },
    UnsubAck { packet_id: u16 },
    PingReq,
    PingResp,
    Disconnect,
}

impl<'a> Packet<'a> {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Connect { .. } => PacketType::Connect,
            Self::ConnAck { .. } => PacketType::ConnAck,
            Self::Publish { .. } => PacketType::Publish,
            Self::PubAck { .. } => PacketType::PubAck,
            Self::PubRec { .. } => PacketType::PubRec,
            Self::PubRel { .. } => PacketType::PubRel,
            Self::PubComp { .. } => PacketType::PubComp,
            Self::Subscribe { .. } => PacketType::Subscribe,
            Self::SubAck { .. } => PacketType::SubAck,
            Self::Unsubscribe { .. } => PacketType::Unsubscribe,
            Self::UnsubAck { .. } => PacketType::UnsubAck,
            Self::PingReq => PacketType::PingReq,
            Self::PingResp => PacketType::PingResp,
            Self::Disconnect => PacketType::Disconnect,
        }
    }

    fn flags(&self) -> u8 {
        match self {
            Self::Publish { packet_id: Some(_), .. } => QOS1,
            other => other.packet_type().fixed_flags(),
        }
    }

    /// Length of everything after the remaining-length byte.
    pub fn remaining_len(&self) -> usize {
        match self {
            Self::Connect { client_id, .. } => CONNECT_HEADER_LEN + client_id.len(),
            Self::ConnAck { .. } => 2,
            Self::Publish { topic, packet_id, payload } => {
                2 + topic.len() + packet_id.map_or(0, |_| 2) + 2 + payload.len()
            }
            Self::PubAck { .. }
            | Self::PubRec { .. }
            | Self::PubRel { .. }
            | Self::PubComp { .. }
            | Self::UnsubAck { .. } => 2,
            Self::Subscribe { topic, .. } => 2 + 2 + topic.len() + 1,
            Self::SubAck { .. } => 3,
            Self::Unsubscribe { topic, .. } => 2 + 2 + topic.len(),
            Self::PingReq | Self::PingResp | Self::Disconnect => 0,
        }
    }
}

struct Writer<'b> {
    buf: &'b mut [u8],
    pos: usize,
}

impl<'b> Writer<'b> {
    fn new(buf: &'b mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, data: &[u8]) -> Result<()> {
        let end = self.pos + data.len();
        self.buf
            .get_mut(self.pos..end)
            .ok_or(NetworkError::BufferTooSmall)?
            .copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    fn u8(&mut self, value: u8) -> Result<()> {
        self.bytes(&[value])
    }

    fn u16(&mut self, value: u16) -> Result<()> {
        self.bytes(&value.to_be_bytes())
    }

    /// Two-byte big-endian length, then the bytes.
    fn prefixed(&mut self, data: &[u8]) -> Result<()> {
        let len = u16::try_from(data.len()).map_err(|_| NetworkError::PacketTooLarge)?;
        self.u16(len)?;
        self.bytes(data)
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self.buf.get(self.pos..self.pos + len).ok_or(NetworkError::Truncated)?;
        self.pos += len;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn string(&mut self) -> Result<&'a str> {
        let len = self.u16()? as usize;
        core::str::from_utf8(self.bytes(len)?).map_err(|_| NetworkError::MalformedPacket)
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }
}

/// Encode `packet` at the start of `buf`, returning its total length.
pub fn encode(buf: &mut [u8], packet: &Packet<'_>) -> Result<usize> {
    let remaining = packet.remaining_len();
    if remaining > MAX_REMAINING_LEN {
        return Err(NetworkError::PacketTooLarge);
    }

    let mut w = Writer::new(buf);
    w.u8((packet.packet_type() as u8) << 4 | packet.flags())?;
    w.u8(remaining as u8)?;

    match *packet {
        Packet::Connect { client_id, keep_alive, clean_session } => {
            w.prefixed(PROTOCOL_NAME.as_bytes())?;
            w.u8(PROTOCOL_LEVEL)?;
            w.u8(if clean_session { CLEAN_SESSION } else { 0 })?;
            w.u16(keep_alive)?;
            w.prefixed(client_id.as_bytes())?;
        }
        Packet::ConnAck { session_present, return_code } => {
            w.u8(session_present as u8)?;
            w.u8(return_code)?;
        }
        Packet::Publish { topic, packet_id, payload } => {
            w.prefixed(topic.as_bytes())?;
            if let Some(id) = packet_id {
                w.u16(id)?;
            }
            w.prefixed(payload)?;
        }
        Packet::PubAck { packet_id }
        | Packet::PubRec { packet_id }
        | Packet::PubRel { packet_id }
        | Packet::PubComp { packet_id }
        | Packet::UnsubAck { packet_id } => w.u16(packet_id)?,
        Packet::Subscribe { packet_id, topic, qos } => {
            w.u16(packet_id)?;
            w.prefixed(topic.as_bytes())?;
            w.u8(qos)?;
        }
        Packet::SubAck { packet_id, return_code } => {
            w.u16(packet_id)?;
            w.u8(return_code)?;
        }
        Packet::Unsubscribe { packet_id, topic } => {
            w.u16(packet_id)?;
            w.prefixed(topic.as_bytes())?;
        }
        Packet::PingReq | Packet::PingResp | Packet::Disconnect => {}
    }

    Ok(w.pos)
}

/// Decode the control packet at the start of `bytes`.
///
/// PUBLISH payloads are accepted both with a two-byte length prefix (as
/// [`encode`] writes them) and raw (as brokers forward them). A raw payload
/// whose first two bytes happen to equal the remaining payload length is
/// read as prefixed.
pub fn decode(bytes: &[u8]) -> Result<Packet<'_>> {
    let first = *bytes.first().ok_or(NetworkError::Truncated)?;
    let len_byte = *bytes.get(1).ok_or(NetworkError::Truncated)?;
    if len_byte & 0x80 != 0 {
        return Err(NetworkError::PacketTooLarge);
    }
    let body = bytes.get(2..2 + len_byte as usize).ok_or(NetworkError::Truncated)?;
    let kind = PacketType::from_u8(first >> 4).ok_or(NetworkError::MalformedPacket)?;
    let flags = first & 0x0F;
    let mut r = Reader::new(body);

    let packet = match kind {
        PacketType::Connect => {
            if r.string()? != PROTOCOL_NAME || r.u8()? != PROTOCOL_LEVEL {
                return Err(NetworkError::MalformedPacket);
            }
            let connect_flags = r.u8()?;
            let keep_alive = r.u16()?;
            Packet::Connect {
                client_id: r.string()?,
                keep_alive,
                clean_session: connect_flags & CLEAN_SESSION != 0,
            }
        }
        PacketType::ConnAck => Packet::ConnAck {
            session_present: r.u8()? & 0x01 != 0,
            return_code: r.u8()?,
        },
        PacketType::Publish => {
            let topic = r.string()?;
            let qos = (flags >> 1) & 0x03;
            let packet_id = if qos > 0 { Some(r.u16()?) } else { None };
            let rest = r.rest();
            let payload = match rest {
                [hi, lo, tail @ ..] if u16::from_be_bytes([*hi, *lo]) as usize == tail.len() => tail,
                raw => raw,
            };
            Packet::Publish { topic, packet_id, payload }
        }
        PacketType::PubAck => Packet::PubAck { packet_id: r.u16()? },
        PacketType::PubRec => Packet::PubRec { packet_id: r.u16()? },
        PacketType::PubRel => Packet::PubRel { packet_id: r.u16()? },
        PacketType::PubComp => Packet::PubComp { packet_id: r.u16()? },
        PacketType::Subscribe => {
            let packet_id = r.u16()?;
            let topic = r.string()?;
            Packet::Subscribe { packet_id, topic, qos: r.u8()? }
        }
        PacketType::SubAck => Packet::SubAck {
            packet_id: r.u16()?,
            return_code: r.u8()?,
        },
        PacketType::Unsubscribe => Packet::Unsubscribe {
            packet_id: r.u16()?,
            topic: r.string()?,
        },
        PacketType::UnsubAck => Packet::UnsubAck { packet_id: r.u16()? },
        PacketType::PingReq => Packet::PingReq,
        PacketType::PingResp => Packet::PingResp,
        PacketType::Disconnect => Packet::Disconnect,
    };

    Ok(packet)
}
