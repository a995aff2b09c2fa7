//! Interface and MQTT session configuration.

use heapless::String;

use crate::error::{NetworkError, Result};
use crate::mqtt::{MAX_CLIENT_ID_LEN, MQTT_PORT};
use crate::types::{Ipv4Addr, MacAddress};

/// Payload sent back for every accepted UDP datagram.
pub const DEFAULT_UDP_REPLY: &[u8] = b"Received\0";

/// Local addressing and header defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub mac: MacAddress,
    pub ip: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub gateway: Ipv4Addr,
    /// TTL stamped on every IPv4 header we build.
    pub ttl: u8,
    /// Advertised TCP receive window.
    pub window: u16,
    pub udp_reply: &'static [u8],
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            mac: MacAddress::new(0x02, 0x03, 0x04, 0x05, 0x06, 0x71),
            ip: Ipv4Addr::UNSPECIFIED,
            subnet: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(192, 168, 1, 1),
            ttl: 64,
            window: 1460,
            udp_reply: DEFAULT_UDP_REPLY,
        }
    }
}

impl InterfaceConfig {
    pub fn new(mac: MacAddress, ip: Ipv4Addr) -> Self {
        Self { mac, ip, ..Self::default() }
    }

    pub fn with_subnet(mut self, subnet: Ipv4Addr) -> Self {
        self.subnet = subnet;
        self
    }

    pub fn with_gateway(mut self, gateway: Ipv4Addr) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_udp_reply(mut self, reply: &'static [u8]) -> Self {
        self.udp_reply = reply;
        self
    }
}

/// MQTT session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    client_id: String<MAX_CLIENT_ID_LEN>,
    pub keep_alive: u16,
    pub broker_port: u16,
}

impl MqttConfig {
    pub fn new(client_id: &str) -> Result<Self> {
        let mut config = Self {
            client_id: String::new(),
            keep_alive: 0xFFFF,
            broker_port: MQTT_PORT,
        };
        config.set_client_id(client_id)?;
        Ok(config)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn set_client_id(&mut self, client_id: &str) -> Result<()> {
        let mut id = String::new();
        id.push_str(client_id).map_err(|_| NetworkError::ClientIdTooLong)?;
        self.client_id = id;
        Ok(())
    }

    pub fn with_keep_alive(mut self, seconds: u16) -> Self {
        self.keep_alive = seconds;
        self
    }
}

pub const DEFAULT_CLIENT_ID: &str = "kestrel";

const _: () = assert!(DEFAULT_CLIENT_ID.len() <= MAX_CLIENT_ID_LEN);

impl Default for MqttConfig {
    fn default() -> Self {
        let mut client_id = String::new();
        // Cannot fail: checked against the capacity at compile time.
        let _ = client_id.push_str(DEFAULT_CLIENT_ID);
        Self {
            client_id,
            keep_alive: 0xFFFF,
            broker_port: MQTT_PORT,
        }
    }
}
