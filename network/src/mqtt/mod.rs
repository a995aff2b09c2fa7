//! MQTT 3.1.1 client over the single TCP connection.
//!
//! One control packet per TCP segment. The remaining length is always a
//! single byte, so a packet body is limited to 127 bytes; larger packets
//! are rejected with `PacketTooLarge` rather than split.

pub mod packet;
mod session;

pub use packet::{decode, encode, Packet};
pub use session::MqttSession;

/// Broker port (unencrypted).
pub const MQTT_PORT: u16 = 1883;
pub const PROTOCOL_NAME: &str = "MQTT";
/// Protocol level for 3.1.1
pub const PROTOCOL_LEVEL: u8 = 4;
/// Largest remaining length expressible in one byte.
pub const MAX_REMAINING_LEN: usize = 127;
/// CONNECT body before the client identifier bytes: protocol name, level,
/// flags, keep-alive and the identifier's length prefix.
pub const CONNECT_HEADER_LEN: usize = 2 + PROTOCOL_NAME.len() + 1 + 1 + 2 + 2;
/// Longest client identifier that still fits a CONNECT.
pub const MAX_CLIENT_ID_LEN: usize = MAX_REMAINING_LEN - CONNECT_HEADER_LEN;

/// CONNECT flag: start without stored session state.
pub const CLEAN_SESSION: u8 = 0x02;

/// Control packet type (upper nibble of the first byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl PacketType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Self::Connect,
            2 => Self::ConnAck,
            3 => Self::Publish,
            4 => Self::PubAck,
            5 => Self::PubRec,
            6 => Self::PubRel,
            7 => Self::PubComp,
            8 => Self::Subscribe,
            9 => Self::SubAck,
            10 => Self::Unsubscribe,
            11 => Self::UnsubAck,
            12 => Self::PingReq,
            13 => Self::PingResp,
            14 => Self::Disconnect,
            _ => return None,
        })
    }

    /// Fixed flags for types that mandate them.
    pub fn fixed_flags(self) -> u8 {
        match self {
            Self::PubRel | Self::Subscribe | Self::Unsubscribe => 0x02,
            _ => 0x00,
        }
    }
}

/// Packet identifiers run 1..=65535; zero is never used.
pub fn next_packet_id(id: u16) -> u16 {
    match id.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}
