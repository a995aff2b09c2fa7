//! Single-connection TCP client.
//!
//! # States
//! ```text
//! Closed ──open()──► SynSent ──SYN+ACK──► Established ──close()──► FinWait1
//!   ▲                                        │                        │
//!   └──────────────── FIN+ACK ◄──────────────┴────────────────────────┘
//! ```
//!
//! No retransmission, reordering or window enforcement. The segment
//! checksum is the only integrity check.

mod connection;

pub use connection::{SegmentAction, TcpConnection, EPHEMERAL_PORT_BASE, EPHEMERAL_PORT_SPAN};

/// TCP connection state (RFC 793 names).
///
/// A client only walks Closed, SynSent, Established and FinWait1; the rest
/// are kept so status output can name any state a peer might expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TcpState {
    /// Connection is closed
    #[default]
    Closed,
    /// Listening (server mode - not used here)
    Listen,
    /// SYN sent, waiting for SYN-ACK
    SynSent,
    /// SYN received (server mode - not used here)
    SynReceived,
    /// Connection established
    Established,
    /// FIN sent, waiting for the peer's FIN
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    LastAck,
    TimeWait,
}

impl TcpState {
    /// Check if the connection can carry data.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Established | Self::CloseWait)
    }

    /// Check if connection is closing.
    pub fn is_closing(self) -> bool {
        matches!(
            self,
            Self::FinWait1 | Self::FinWait2 | Self::Closing | Self::LastAck | Self::TimeWait
        )
    }
}
