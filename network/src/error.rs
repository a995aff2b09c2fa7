//! Network error types

use core::fmt;

use crate::driver::TxError;

pub type Result<T> = core::result::Result<T, NetworkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// Buffer too small for the frame being built.
    BufferTooSmall,
    /// Frame shorter than its headers claim.
    Truncated,
    /// Operation not allowed in the current TCP state.
    InvalidState,
    /// MQTT session is not connected.
    NotConnected,
    /// MQTT remaining length does not fit in a single byte.
    PacketTooLarge,
    /// MQTT packet body does not match its type.
    MalformedPacket,
    /// MQTT packet type not expected from a broker.
    UnexpectedPacket,
    /// Client identifier exceeds `MAX_CLIENT_ID_LEN`.
    ClientIdTooLong,
    /// Send operation failed.
    SendFailed,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "Buffer too small"),
            Self::Truncated => write!(f, "Truncated frame"),
            Self::InvalidState => write!(f, "Invalid connection state"),
            Self::NotConnected => write!(f, "Not connected"),
            Self::PacketTooLarge => write!(f, "MQTT packet too large"),
            Self::MalformedPacket => write!(f, "Malformed MQTT packet"),
            Self::UnexpectedPacket => write!(f, "Unexpected MQTT packet"),
            Self::ClientIdTooLong => write!(f, "Client identifier too long"),
            Self::SendFailed => write!(f, "Send failed"),
        }
    }
}

impl From<TxError> for NetworkError {
    fn from(_: TxError) -> Self {
        Self::SendFailed
    }
}
