//! Node error types.

use core::fmt;

use kestrel_network::{NetworkError, RxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// Error from the network stack.
    Network(NetworkError),
    /// Local or broker address not configured.
    NotProvisioned,
    /// A connection attempt is already underway.
    Busy,
    /// Driver failed to hand over a frame.
    Receive(RxError),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Network(e) => write!(f, "network: {}", e),
            NodeError::NotProvisioned => write!(f, "addresses not provisioned"),
            NodeError::Busy => write!(f, "connection already in progress"),
            NodeError::Receive(e) => write!(f, "receive failed: {:?}", e),
        }
    }
}

impl From<NetworkError> for NodeError {
    fn from(e: NetworkError) -> Self {
        NodeError::Network(e)
    }
}

impl From<RxError> for NodeError {
    fn from(e: RxError) -> Self {
        NodeError::Receive(e)
    }
}

pub type Result<T> = core::result::Result<T, NodeError>;
