//! Driver trait definitions.

use crate::types::MacAddress;

/// TX error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    /// Transmit buffer still busy with the previous frame.
    QueueFull,
    /// Device not ready.
    DeviceNotReady,
    /// Frame too large.
    FrameTooLarge,
}

/// RX error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxError {
    /// Provided buffer too small for frame.
    BufferTooSmall {
        /// Required buffer size.
        needed: usize,
    },
    /// Device error.
    DeviceError,
}

/// Ethernet controller as seen by the stack.
///
/// Implementations wrap the controller's frame primitives; link bring-up
/// and register access stay on the driver side.
pub trait NetworkDriver {
    /// Get MAC address.
    fn mac_address(&self) -> MacAddress;

    /// Check if device has a received frame ready.
    ///
    /// Returns true if `receive()` will return `Ok(Some(_))`.
    fn can_receive(&self) -> bool;

    /// Transmit a complete Ethernet frame.
    ///
    /// # Contract
    /// - MUST return immediately (no completion wait)
    fn transmit(&mut self, frame: &[u8]) -> Result<(), TxError>;

    /// Receive an Ethernet frame.
    ///
    /// # Returns
    /// - `Ok(Some(len))`: Frame received, `len` bytes copied
    /// - `Ok(None)`: No frame available (normal)
    /// - `Err(RxError)`: Receive error
    fn receive(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, RxError>;

    /// Check link status.
    fn link_up(&self) -> bool {
        true
    }

    /// Returns true once if the receive buffer overflowed since the last call.
    fn take_overflow(&mut self) -> bool {
        false
    }
}
