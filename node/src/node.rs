//! The node: one driver, one interface, one frame buffer.

use rand_core::RngCore;

use kestrel_network::{
    Interface, Ipv4Addr, MacAddress, MqttConfig, NetEvents, NetworkDriver, Received, TcpEvent,
    TcpState, MAX_FRAME_SIZE,
};

use crate::config::{ConfigStore, NodeConfig};
use crate::error::{NodeError, Result};

/// Where the node is in bringing up its broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// ARP request for the broker sent, waiting for the reply.
    Resolving,
    /// Broker resolved and the MQTT session opened.
    Connected,
}

/// Snapshot for the console front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStatus {
    pub mac: MacAddress,
    pub ip: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub broker_ip: Ipv4Addr,
    pub broker_mac: MacAddress,
    pub link_up: bool,
    pub phase: Phase,
    pub tcp_state: TcpState,
    pub mqtt_connected: bool,
}

pub struct Node<D: NetworkDriver, S: ConfigStore, R: RngCore> {
    driver: D,
    store: S,
    rng: R,
    config: NodeConfig,
    iface: Interface,
    buf: [u8; MAX_FRAME_SIZE],
    broker_mac: MacAddress,
    phase: Phase,
}

impl<D: NetworkDriver, S: ConfigStore, R: RngCore> Node<D, S, R> {
    pub fn new(driver: D, mut store: S, rng: R, mqtt: MqttConfig) -> Self {
        let config = NodeConfig::load(&mut store);
        let iface = Interface::new(config.interface_config(driver.mac_address()), mqtt);
        log::info!(
            "[NODE] mac {} ip {} broker {}",
            driver.mac_address(),
            config.local_ip,
            config.broker_ip
        );
        Self {
            driver,
            store,
            rng,
            config,
            iface,
            buf: [0; MAX_FRAME_SIZE],
            broker_mac: MacAddress::ZERO,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn interface(&self) -> &Interface {
        &self.iface
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Receive and process at most one frame.
    ///
    /// Returns `Ok(None)` when the driver had nothing.
    pub fn poll<E: NetEvents>(&mut self, events: &mut E) -> Result<Option<Received>> {
        if self.driver.take_overflow() {
            log::warn!("[NODE] receive buffer overflow, frames lost");
        }
        if !self.driver.can_receive() {
            return Ok(None);
        }
        let Some(len) = self.driver.receive(&mut self.buf)? else {
            return Ok(None);
        };

        let received = self.iface.process(&mut self.buf, len, &mut self.driver, events)?;
        match received {
            Received::ArpReply { sender_mac, sender_ip }
                if self.phase == Phase::Resolving && sender_ip == self.config.broker_ip =>
            {
                self.broker_mac = sender_mac;
                log::info!("[NODE] broker {} at {}, opening session", sender_ip, sender_mac);
                if let Err(e) = self.iface.connect(
                    &mut self.buf,
                    &mut self.driver,
                    sender_mac,
                    sender_ip,
                    &mut self.rng,
                ) {
                    self.phase = Phase::Idle;
                    return Err(e.into());
                }
                self.phase = Phase::Connected;
            }
            Received::Tcp(TcpEvent::Closed) => {
                log::info!("[NODE] broker closed the connection");
                self.phase = Phase::Idle;
            }
            _ => {}
        }
        Ok(Some(received))
    }

    /// Start resolving the broker; the session opens from [`poll`](Self::poll).
    pub fn connect(&mut self) -> Result<()> {
        if !self.config.is_provisioned() {
            return Err(NodeError::NotProvisioned);
        }
        if self.phase != Phase::Idle {
            return Err(NodeError::Busy);
        }
        // A close the broker never answered.
        if self.iface.tcp().state() != TcpState::Closed {
            self.iface.abort();
        }
        self.iface
            .send_arp_request(&mut self.buf, &mut self.driver, self.config.broker_ip)?;
        self.phase = Phase::Resolving;
        Ok(())
    }

    /// Send DISCONNECT if a session is up, close TCP and return to `Idle`.
    pub fn disconnect(&mut self) -> Result<()> {
        self.phase = Phase::Idle;
        if self.iface.mqtt().is_connected() {
            self.iface.disconnect(&mut self.buf, &mut self.driver)?;
        }
        if self.iface.tcp().is_established() {
            self.iface.close(&mut self.buf, &mut self.driver)?;
        }
        Ok(())
    }

    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<u16> {
        Ok(self.iface.publish(&mut self.buf, &mut self.driver, topic, payload)?)
    }

    pub fn subscribe(&mut self, topic: &str) -> Result<u16> {
        Ok(self.iface.subscribe(&mut self.buf, &mut self.driver, topic)?)
    }

    pub fn unsubscribe(&mut self, topic: &str) -> Result<u16> {
        Ok(self.iface.unsubscribe(&mut self.buf, &mut self.driver, topic)?)
    }

    pub fn ping(&mut self) -> Result<()> {
        Ok(self.iface.ping(&mut self.buf, &mut self.driver)?)
    }

    pub fn set_local_ip(&mut self, ip: Ipv4Addr) {
        self.config.store_local_ip(&mut self.store, ip);
        self.iface.config_mut().ip = ip;
        log::info!("[NODE] local ip set to {}", ip);
    }

    pub fn set_broker_ip(&mut self, ip: Ipv4Addr) {
        self.config.store_broker_ip(&mut self.store, ip);
        log::info!("[NODE] broker ip set to {}", ip);
    }

    pub fn clear_config(&mut self) {
        self.config.clear(&mut self.store);
        self.iface.config_mut().ip = Ipv4Addr::UNSPECIFIED;
        log::info!("[NODE] configuration cleared");
    }

    pub fn status(&self) -> NodeStatus {
        let iface = self.iface.config();
        NodeStatus {
            mac: iface.mac,
            ip: iface.ip,
            subnet: iface.subnet,
            gateway: iface.gateway,
            broker_ip: self.config.broker_ip,
            broker_mac: self.broker_mac,
            link_up: self.driver.link_up(),
            phase: self.phase,
            tcp_state: self.iface.tcp().state(),
            mqtt_connected: self.iface.mqtt().is_connected(),
        }
    }
}
