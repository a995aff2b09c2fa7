//! Kestrel Node
//!
//! Glue between a [`NetworkDriver`](kestrel_network::NetworkDriver), the
//! network stack and the board: persisted addressing, the receive loop
//! and the serial logger.
//!
//! ```ignore
//! logger::init(uart, log::LevelFilter::Info)?;
//!
//! let mut node = Node::new(driver, store, rng, MqttConfig::new("node-1")?);
//! node.connect()?;
//! loop {
//!     node.poll(&mut app)?;
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logger;
pub mod node;

pub use config::{ConfigStore, MemoryStore, NodeConfig};
pub use error::{NodeError, Result};
pub use node::{Node, NodeStatus, Phase};
