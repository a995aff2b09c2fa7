//! Kestrel Network Stack
//!
//! ARP, IPv4, ICMP echo, UDP echo, a single TCP client connection and an
//! MQTT 3.1.1 client for one Ethernet interface on a bare-metal node.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │        Interface (config, TCP, MQTT state)       │
//! ├──────────────┬───────────────────┬───────────────┤
//! │ ARP          │ IPv4              │ MQTT session  │
//! │ request/reply│ ICMP │ UDP │ TCP ─┼─► codec       │
//! ├──────────────┴───────────────────┴───────────────┤
//! │     wire::* codecs on one &mut [u8] frame        │
//! ├──────────────────────────────────────────────────┤
//! │            NetworkDriver (trait)                 │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Nothing allocates. Every header is read and written in place in the
//! caller's frame buffer (`MAX_FRAME_SIZE` bytes), and every reply is
//! transmitted before `process` returns.
//!
//! # Usage
//!
//! ```ignore
//! let mut iface = Interface::new(InterfaceConfig::new(mac, ip), MqttConfig::new("node-1")?);
//! let mut buf = [0u8; MAX_FRAME_SIZE];
//!
//! loop {
//!     if let Ok(Some(len)) = driver.receive(&mut buf) {
//!         iface.process(&mut buf, len, &mut driver, &mut app)?;
//!     }
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

pub mod checksum;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod host;
pub mod iface;
pub mod mqtt;
pub mod tcp;
pub mod types;
pub mod wire;

#[cfg(test)]
mod testing;

pub use config::{InterfaceConfig, MqttConfig};
pub use driver::{NetworkDriver, RxError, TxError};
pub use error::{NetworkError, Result};
pub use events::NetEvents;
pub use iface::{Interface, Received, TcpEvent};
pub use mqtt::{MqttSession, Packet, PacketType};
pub use tcp::{TcpConnection, TcpState};
pub use types::{Ipv4Addr, MacAddress, MAX_FRAME_SIZE};
