//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::vec::Vec;

use crate::checksum;
use crate::config::InterfaceConfig;
use crate::driver::{NetworkDriver, RxError, TxError};
use crate::host::Host;
use crate::types::{IpProtocol, Ipv4Addr, MacAddress};
use crate::wire::{arp, tcp, write_u16};

pub const LOCAL_MAC: MacAddress = MacAddress::new(0x02, 0x03, 0x04, 0x05, 0x06, 0x71);
pub const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 50);
pub const BROKER_MAC: MacAddress = MacAddress::new(0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee);
pub const BROKER_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);

pub fn local_config() -> InterfaceConfig {
    InterfaceConfig::new(LOCAL_MAC, LOCAL_IP)
}

/// Driver that records transmitted frames and replays queued ones.
pub struct CaptureDriver {
    pub mac: MacAddress,
    pub sent: Vec<Vec<u8>>,
    pub inbox: VecDeque<Vec<u8>>,
    pub fail_transmit: bool,
}

impl CaptureDriver {
    pub fn new(mac: MacAddress) -> Self {
        Self {
            mac,
            sent: Vec::new(),
            inbox: VecDeque::new(),
            fail_transmit: false,
        }
    }
}

impl NetworkDriver for CaptureDriver {
    fn mac_address(&self) -> MacAddress {
        self.mac
    }

    fn can_receive(&self) -> bool {
        !self.inbox.is_empty()
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<(), TxError> {
        if self.fail_transmit {
            return Err(TxError::DeviceNotReady);
        }
        self.sent.push(frame.to_vec());
        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, RxError> {
        let Some(frame) = self.inbox.pop_front() else {
            return Ok(None);
        };
        if frame.len() > buffer.len() {
            return Err(RxError::BufferTooSmall { needed: frame.len() });
        }
        buffer[..frame.len()].copy_from_slice(&frame);
        Ok(Some(frame.len()))
    }
}

fn broker() -> Host {
    Host::new(InterfaceConfig::new(BROKER_MAC, BROKER_IP))
}

/// Segment from the broker (port 1883) to the local node.
pub fn peer_tcp(dst_port: u16, seq: u32, ack: u32, flags: tcp::TcpFlags, payload: &[u8]) -> Vec<u8> {
    let mut buf = [0u8; 1522];
    let segment_len = tcp::HEADER_LEN + payload.len();
    let offset = broker()
        .build_ipv4(&mut buf, LOCAL_MAC, LOCAL_IP, IpProtocol::Tcp, segment_len)
        .unwrap();
    let header = tcp::SegmentHeader {
        src_port: 1883,
        dst_port,
        seq,
        ack,
        flags,
        window: 1460,
        header_len: tcp::HEADER_LEN,
    };
    tcp::write_header(&mut buf[offset..], &header).unwrap();
    buf[offset + tcp::HEADER_LEN..offset + segment_len].copy_from_slice(payload);
    tcp::update_checksum(&mut buf).unwrap();
    buf[..offset + segment_len].to_vec()
}

/// Datagram from the broker host to the local node.
pub fn peer_udp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = [0u8; 1522];
    let udp_len = 8 + payload.len();
    let offset = broker()
        .build_ipv4(&mut buf, LOCAL_MAC, LOCAL_IP, IpProtocol::Udp, udp_len)
        .unwrap();
    write_u16(&mut buf, offset, src_port);
    write_u16(&mut buf, offset + 2, dst_port);
    write_u16(&mut buf, offset + 4, udp_len as u16);
    buf[offset + 8..offset + udp_len].copy_from_slice(payload);
    crate::wire::udp::update_checksum(&mut buf).unwrap();
    buf[..offset + udp_len].to_vec()
}

/// Echo request from the broker host, identifier 1, sequence 1.
pub fn peer_echo_request(payload: &[u8]) -> Vec<u8> {
    let mut buf = [0u8; 1522];
    let icmp_len = 8 + payload.len();
    let offset = broker()
        .build_ipv4(&mut buf, LOCAL_MAC, LOCAL_IP, IpProtocol::Icmp, icmp_len)
        .unwrap();
    buf[offset] = 8;
    buf[offset + 4..offset + 8].copy_from_slice(&[0, 1, 0, 1]);
    buf[offset + 8..offset + icmp_len].copy_from_slice(payload);
    let sum = checksum::checksum(&buf[offset..offset + icmp_len]);
    write_u16(&mut buf, offset + 2, sum);
    buf[..offset + icmp_len].to_vec()
}

/// The broker asking who has `target`.
pub fn peer_arp_request(target: Ipv4Addr) -> Vec<u8> {
    let mut buf = [0u8; arp::FRAME_LEN];
    arp::build_request(&mut buf, BROKER_MAC, BROKER_IP, target).unwrap();
    buf.to_vec()
}

/// The broker answering a request from the local node.
pub fn peer_arp_reply() -> Vec<u8> {
    let mut buf = [0u8; arp::FRAME_LEN];
    arp::build_request(&mut buf, LOCAL_MAC, LOCAL_IP, BROKER_IP).unwrap();
    arp::build_reply(&mut buf, BROKER_MAC).unwrap();
    buf.to_vec()
}
