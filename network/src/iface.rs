//! The interface context: local configuration, TCP connection and MQTT
//! session, plus frame dispatch.

use rand_core::RngCore;

use crate::config::{InterfaceConfig, MqttConfig};
use crate::driver::NetworkDriver;
use crate::error::{NetworkError, Result};
use crate::events::NetEvents;
use crate::host::{self, Host};
use crate::mqtt::{MqttSession, PacketType};
use crate::tcp::{SegmentAction, TcpConnection, TcpState};
use crate::types::{IpProtocol, Ipv4Addr, MacAddress};
use crate::wire::{arp, icmp, ipv4, udp};

/// What [`Interface::process`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// Not for us, malformed, or failed a checksum.
    Dropped,
    /// ARP request for our address; reply sent.
    ArpRequest,
    /// ARP reply addressed to us.
    ArpReply { sender_mac: MacAddress, sender_ip: Ipv4Addr },
    /// ICMP echo request; reply sent.
    EchoRequest,
    /// UDP datagram handed to `on_datagram`; reply sent.
    Datagram,
    Tcp(TcpEvent),
}

/// Outcome of a TCP segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpEvent {
    Ignored,
    /// Handshake done; ACK and CONNECT sent.
    Established,
    /// Payload acknowledged; `packet` is its MQTT type when it decoded.
    Data { len: usize, packet: Option<PacketType> },
    /// Peer closed; FIN acknowledged and connection reset.
    Closed,
}

/// Everything the stack keeps between frames.
#[derive(Debug, Clone)]
pub struct Interface {
    host: Host,
    tcp: TcpConnection,
    mqtt: MqttSession,
}

impl Interface {
    pub fn new(config: InterfaceConfig, mqtt: MqttConfig) -> Self {
        Self {
            host: Host::new(config),
            tcp: TcpConnection::new(),
            mqtt: MqttSession::new(mqtt),
        }
    }

    pub fn config(&self) -> &InterfaceConfig {
        self.host.config()
    }

    pub fn config_mut(&mut self) -> &mut InterfaceConfig {
        self.host.config_mut()
    }

    pub fn tcp(&self) -> &TcpConnection {
        &self.tcp
    }

    pub fn mqtt(&self) -> &MqttSession {
        &self.mqtt
    }

    pub fn mqtt_mut(&mut self) -> &mut MqttSession {
        &mut self.mqtt
    }

    /// Handle one received frame held in `buf[..len]`.
    ///
    /// Replies are built in `buf` and transmitted before returning.
    pub fn process<D: NetworkDriver, E: NetEvents>(
        &mut self,
        buf: &mut [u8],
        len: usize,
        driver: &mut D,
        events: &mut E,
    ) -> Result<Received> {
        let len = len.min(buf.len());
        let local_ip = self.host.ip();
        let frame = &buf[..len];

        if arp::is_request(frame, local_ip) {
            let reply_len = arp::build_reply(&mut buf[..len], self.host.mac())?;
            host::transmit(driver, &buf[..reply_len])?;
            log::debug!("[ARP] answered who-has {}", local_ip);
            return Ok(Received::ArpRequest);
        }

        if arp::is_reply(frame, local_ip) {
            return match (arp::sender_hardware_addr(frame), arp::sender_protocol_addr(frame)) {
                (Some(sender_mac), Some(sender_ip)) => {
                    log::debug!("[ARP] {} is at {}", sender_ip, sender_mac);
                    Ok(Received::ArpReply { sender_mac, sender_ip })
                }
                _ => Ok(Received::Dropped),
            };
        }

        if !ipv4::is_ip(frame) {
            log::trace!("[IP] dropped non-IPv4 frame ({} bytes)", len);
            return Ok(Received::Dropped);
        }
        if !ipv4::is_unicast(frame, local_ip) {
            log::trace!("[IP] dropped frame for {:?}", ipv4::destination(frame));
            return Ok(Received::Dropped);
        }

        match ipv4::protocol(frame).and_then(IpProtocol::from_u8) {
            Some(IpProtocol::Icmp) => self.on_icmp(buf, len, driver),
            Some(IpProtocol::Udp) => self.on_udp(buf, len, driver, events),
            Some(IpProtocol::Tcp) => self.on_tcp(buf, len, driver, events),
            None => Ok(Received::Dropped),
        }
    }

    fn on_icmp<D: NetworkDriver>(&mut self, buf: &mut [u8], len: usize, driver: &mut D) -> Result<Received> {
        if !icmp::is_echo_request(&buf[..len]) {
            return Ok(Received::Dropped);
        }
        let reply_len = icmp::build_echo_reply(&mut buf[..len])?;
        host::transmit(driver, &buf[..reply_len])?;
        log::debug!("[ICMP] echo reply to {:?}", ipv4::destination(&buf[..reply_len]));
        Ok(Received::EchoRequest)
    }

    fn on_udp<D: NetworkDriver, E: NetEvents>(
        &mut self,
        buf: &mut [u8],
        len: usize,
        driver: &mut D,
        events: &mut E,
    ) -> Result<Received> {
        let frame = &buf[..len];
        if !udp::is_udp(frame) {
            log::trace!("[UDP] dropped datagram with bad checksum");
            return Ok(Received::Dropped);
        }
        if let Some(payload) = udp::payload(frame) {
            log::debug!("[UDP] {} bytes from {:?}", payload.len(), ipv4::source(frame));
            events.on_datagram(payload);
        }

        let reply_len = udp::build_response(buf, self.host.config().udp_reply)?;
        host::transmit(driver, &buf[..reply_len])?;
        Ok(Received::Datagram)
    }

    fn on_tcp<D: NetworkDriver, E: NetEvents>(
        &mut self,
        buf: &mut [u8],
        len: usize,
        driver: &mut D,
        events: &mut E,
    ) -> Result<Received> {
        let event = match self.tcp.on_segment(&buf[..len]) {
            SegmentAction::Drop => return Ok(Received::Dropped),
            SegmentAction::Ignore => TcpEvent::Ignored,
            SegmentAction::Established => {
                self.tcp.ack(&mut self.host, buf, driver)?;
                self.mqtt.send_connect(&mut self.tcp, &mut self.host, buf, driver)?;
                TcpEvent::Established
            }
            SegmentAction::Deliver(range) => {
                let payload_len = range.len();
                let packet = match self.mqtt.on_payload(&buf[range], events) {
                    Ok(kind) => Some(kind),
                    Err(e) => {
                        log::warn!("[MQTT] undecodable payload: {}", e);
                        None
                    }
                };
                self.tcp.ack(&mut self.host, buf, driver)?;
                TcpEvent::Data { len: payload_len, packet }
            }
            SegmentAction::Closed => {
                self.tcp.ack(&mut self.host, buf, driver)?;
                self.tcp.reset();
                self.mqtt.on_transport_closed(events);
                TcpEvent::Closed
            }
        };
        Ok(Received::Tcp(event))
    }

    /// Broadcast an ARP request for `target_ip`.
    pub fn send_arp_request<D: NetworkDriver>(&mut self, buf: &mut [u8], driver: &mut D, target_ip: Ipv4Addr) -> Result<()> {
        let len = arp::build_request(buf, self.host.mac(), self.host.ip(), target_ip)?;
        host::transmit(driver, &buf[..len])?;
        log::debug!("[ARP] who-has {} tell {}", target_ip, self.host.ip());
        Ok(())
    }

    /// Open the MQTT session: TCP SYN now, CONNECT once established.
    pub fn connect<D: NetworkDriver, R: RngCore>(
        &mut self,
        buf: &mut [u8],
        driver: &mut D,
        broker_mac: MacAddress,
        broker_ip: Ipv4Addr,
        rng: &mut R,
    ) -> Result<()> {
        self.mqtt
            .connect(&mut self.tcp, &mut self.host, buf, driver, broker_mac, broker_ip, rng)
    }

    pub fn publish<D: NetworkDriver>(&mut self, buf: &mut [u8], driver: &mut D, topic: &str, payload: &[u8]) -> Result<u16> {
        self.mqtt
            .publish(&mut self.tcp, &mut self.host, buf, driver, topic, payload)
    }

    pub fn subscribe<D: NetworkDriver>(&mut self, buf: &mut [u8], driver: &mut D, topic: &str) -> Result<u16> {
        self.mqtt.subscribe(&mut self.tcp, &mut self.host, buf, driver, topic)
    }

    pub fn unsubscribe<D: NetworkDriver>(&mut self, buf: &mut [u8], driver: &mut D, topic: &str) -> Result<u16> {
        self.mqtt.unsubscribe(&mut self.tcp, &mut self.host, buf, driver, topic)
    }

    pub fn ping<D: NetworkDriver>(&mut self, buf: &mut [u8], driver: &mut D) -> Result<()> {
        self.mqtt.ping(&mut self.tcp, &mut self.host, buf, driver)
    }

    /// Send MQTT DISCONNECT; the broker is expected to close TCP.
    pub fn disconnect<D: NetworkDriver>(&mut self, buf: &mut [u8], driver: &mut D) -> Result<()> {
        self.mqtt.disconnect(&mut self.tcp, &mut self.host, buf, driver)
    }

    /// Actively close the TCP connection with FIN.
    pub fn close<D: NetworkDriver>(&mut self, buf: &mut [u8], driver: &mut D) -> Result<()> {
        if self.mqtt.is_connected() {
            return Err(NetworkError::InvalidState);
        }
        self.tcp.close(&mut self.host, buf, driver)
    }

    /// Forget the connection without telling the broker.
    ///
    /// Used when the broker never finishes a close; no callback fires.
    pub fn abort(&mut self) {
        if self.tcp.state() != TcpState::Closed {
            log::debug!("[TCP] dropping connection in {:?}", self.tcp.state());
        }
        self.tcp.reset();
        self.mqtt.on_transport_closed(&mut ());
    }
}
