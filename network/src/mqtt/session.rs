//! MQTT session state and the client operations.

use rand_core::RngCore;

use super::packet::{self, Packet};
use super::{next_packet_id, PacketType};
use crate::config::MqttConfig;
use crate::driver::NetworkDriver;
use crate::error::{NetworkError, Result};
use crate::events::NetEvents;
use crate::host::Host;
use crate::tcp::TcpConnection;
use crate::types::{Ipv4Addr, MacAddress};
use crate::wire::tcp::TcpFlags;
use crate::wire::TCP_PAYLOAD_OFFSET;

/// Client session riding on the TCP connection.
#[derive(Debug, Clone)]
pub struct MqttSession {
    config: MqttConfig,
    connected: bool,
    /// Identifier for the next PUBLISH, SUBSCRIBE or UNSUBSCRIBE.
    packet_id: u16,
}

impl MqttSession {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            connected: false,
            packet_id: 1,
        }
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MqttConfig {
        &mut self.config
    }

    /// CONNACK accepted and no DISCONNECT since.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn packet_id(&self) -> u16 {
        self.packet_id
    }

    /// Open TCP to the broker; CONNECT follows once the handshake completes.
    #[allow(clippy::too_many_arguments)]
    pub fn connect<D: NetworkDriver, R: RngCore>(
        &mut self,
        tcp: &mut TcpConnection,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
        broker_mac: MacAddress,
        broker_ip: Ipv4Addr,
        rng: &mut R,
    ) -> Result<()> {
        if self.connected {
            return Err(NetworkError::InvalidState);
        }
        tcp.open(host, buf, driver, broker_mac, broker_ip, self.config.broker_port, rng)
    }

    /// Send CONNECT on a freshly established connection.
    pub fn send_connect<D: NetworkDriver>(
        &mut self,
        tcp: &mut TcpConnection,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
    ) -> Result<()> {
        let packet = Packet::Connect {
            client_id: self.config.client_id(),
            keep_alive: self.config.keep_alive,
            clean_session: true,
        };
        send(tcp, host, buf, driver, &packet)?;
        log::info!("[MQTT] CONNECT sent as '{}'", self.config.client_id());
        Ok(())
    }

    /// Publish with QoS 1 framing. Returns the packet identifier used.
    pub fn publish<D: NetworkDriver>(
        &mut self,
        tcp: &mut TcpConnection,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
        topic: &str,
        payload: &[u8],
    ) -> Result<u16> {
        self.require_connected()?;
        let id = self.packet_id;
        let packet = Packet::Publish {
            topic,
            packet_id: Some(id),
            payload,
        };
        send(tcp, host, buf, driver, &packet)?;
        self.packet_id = next_packet_id(id);
        log::debug!("[MQTT] PUBLISH {} ({} bytes) id {}", topic, payload.len(), id);
        Ok(id)
    }

    /// Subscribe to `topic` at QoS 0. Returns the packet identifier used.
    pub fn subscribe<D: NetworkDriver>(
        &mut self,
        tcp: &mut TcpConnection,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
        topic: &str,
    ) -> Result<u16> {
        self.require_connected()?;
        let id = self.packet_id;
        send(tcp, host, buf, driver, &Packet::Subscribe { packet_id: id, topic, qos: 0 })?;
        self.packet_id = next_packet_id(id);
        log::debug!("[MQTT] SUBSCRIBE {} id {}", topic, id);
        Ok(id)
    }

    pub fn unsubscribe<D: NetworkDriver>(
        &mut self,
        tcp: &mut TcpConnection,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
        topic: &str,
    ) -> Result<u16> {
        self.require_connected()?;
        let id = self.packet_id;
        send(tcp, host, buf, driver, &Packet::Unsubscribe { packet_id: id, topic })?;
        self.packet_id = next_packet_id(id);
        log::debug!("[MQTT] UNSUBSCRIBE {} id {}", topic, id);
        Ok(id)
    }

    /// PINGREQ; the broker's PINGRESP fires `on_ping_response`.
    pub fn ping<D: NetworkDriver>(
        &mut self,
        tcp: &mut TcpConnection,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
    ) -> Result<()> {
        self.require_connected()?;
        send(tcp, host, buf, driver, &Packet::PingReq)?;
        log::debug!("[MQTT] PINGREQ");
        Ok(())
    }

    /// Send DISCONNECT and mark the session closed.
    pub fn disconnect<D: NetworkDriver>(
        &mut self,
        tcp: &mut TcpConnection,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
    ) -> Result<()> {
        self.require_connected()?;
        send(tcp, host, buf, driver, &Packet::Disconnect)?;
        self.connected = false;
        log::info!("[MQTT] DISCONNECT sent");
        Ok(())
    }

    /// Decode a TCP payload from the broker and raise the matching callback.
    pub fn on_payload<E: NetEvents>(&mut self, payload: &[u8], events: &mut E) -> Result<PacketType> {
        let packet = packet::decode(payload)?;
        let kind = packet.packet_type();

        match packet {
            Packet::ConnAck { return_code: 0, .. } => {
                self.connected = true;
                log::info!("[MQTT] connected");
                events.on_mqtt_connected();
            }
            Packet::ConnAck { return_code, .. } => {
                log::warn!("[MQTT] CONNACK refused, return code {}", return_code);
            }
            Packet::Publish { topic, payload, .. } => {
                log::debug!("[MQTT] message on {} ({} bytes)", topic, payload.len());
                events.on_publish(topic, payload);
            }
            Packet::PingResp => events.on_ping_response(),
            Packet::Disconnect => self.on_transport_closed(events),
            Packet::SubAck { packet_id, return_code } => {
                log::debug!("[MQTT] SUBACK id {} code {:#04x}", packet_id, return_code);
            }
            Packet::PubAck { packet_id } | Packet::UnsubAck { packet_id } => {
                log::debug!("[MQTT] {:?} id {}", kind, packet_id);
            }
            Packet::PubRec { .. } | Packet::PubRel { .. } | Packet::PubComp { .. } => {
                log::debug!("[MQTT] {:?} ignored", kind);
            }
            Packet::Connect { .. } | Packet::Subscribe { .. } | Packet::Unsubscribe { .. } | Packet::PingReq => {
                log::warn!("[MQTT] unexpected {:?} from broker", kind);
                return Err(NetworkError::UnexpectedPacket);
            }
        }

        Ok(kind)
    }

    /// The broker went away, by DISCONNECT or by closing TCP.
    pub fn on_transport_closed<E: NetEvents>(&mut self, events: &mut E) {
        if self.connected {
            self.connected = false;
            log::info!("[MQTT] disconnected");
            events.on_mqtt_disconnected();
        }
    }

    fn require_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(NetworkError::NotConnected)
        }
    }
}

/// Encode after the TCP header, send as PSH+ACK and advance the sequence.
fn send<D: NetworkDriver>(
    tcp: &mut TcpConnection,
    host: &mut Host,
    buf: &mut [u8],
    driver: &mut D,
    packet: &Packet<'_>,
) -> Result<usize> {
    let area = buf.get_mut(TCP_PAYLOAD_OFFSET..).ok_or(NetworkError::BufferTooSmall)?;
    let len = packet::encode(area, packet)?;
    tcp.send_data(host, buf, driver, TcpFlags::PSH | TcpFlags::ACK, len)?;
    tcp.increment_seq(len as u32);
    Ok(len)
}
