//! Common test utilities: a queue-backed driver, a broker that speaks raw
//! frames, and smoltcp-backed views for checking what the stack emitted.

#![allow(dead_code)]

use std::collections::VecDeque;

use kestrel_network::checksum;
use kestrel_network::types::IpProtocol;
use kestrel_network::{Ipv4Addr, MacAddress, NetworkDriver, RxError, TxError};
use smoltcp::wire::{
    ArpPacket, ArpRepr, EthernetFrame, EthernetProtocol, Icmpv4Packet, IpAddress, Ipv4Address,
    Ipv4Packet, TcpPacket, UdpPacket,
};

pub const LOCAL_MAC: MacAddress = MacAddress::new(0x02, 0x03, 0x04, 0x05, 0x06, 0x71);
pub const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 113);
pub const BROKER_MAC: MacAddress = MacAddress::new(0x02, 0x42, 0xac, 0x11, 0x00, 0x02);
pub const BROKER_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 199);
pub const BROKER_PORT: u16 = 1883;

pub const FIN: u8 = 0x01;
pub const SYN: u8 = 0x02;
pub const RST: u8 = 0x04;
pub const PSH: u8 = 0x08;
pub const ACK: u8 = 0x10;

/// In-memory NIC: frames pushed into `rx` are received, transmitted frames
/// land in `tx`.
#[derive(Debug, Default)]
pub struct MockDriver {
    pub rx: VecDeque<Vec<u8>>,
    pub tx: Vec<Vec<u8>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.tx)
    }
}

impl NetworkDriver for MockDriver {
    fn mac_address(&self) -> MacAddress {
        LOCAL_MAC
    }

    fn can_receive(&self) -> bool {
        !self.rx.is_empty()
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<(), TxError> {
        self.tx.push(frame.to_vec());
        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, RxError> {
        match self.rx.pop_front() {
            Some(frame) => {
                buffer[..frame.len()].copy_from_slice(&frame);
                Ok(Some(frame.len()))
            }
            None => Ok(None),
        }
    }
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Ethernet + IPv4 frame from the broker to the local node.
pub fn broker_ipv4(protocol: IpProtocol, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(34 + payload.len());
    frame.extend_from_slice(&LOCAL_MAC.0);
    frame.extend_from_slice(&BROKER_MAC.0);
    frame.extend_from_slice(&[0x08, 0x00]);

    let total = (20 + payload.len()) as u16;
    let mut header = [0u8; 20];
    header[0] = 0x45;
    put_u16(&mut header, 2, total);
    put_u16(&mut header, 4, 0x5151);
    header[8] = 128;
    header[9] = protocol as u8;
    header[12..16].copy_from_slice(&BROKER_IP.0);
    header[16..20].copy_from_slice(&LOCAL_IP.0);
    let sum = checksum::checksum(&header);
    put_u16(&mut header, 10, sum);

    frame.extend_from_slice(&header);
    frame.extend_from_slice(payload);
    frame
}

/// TCP segment from the broker's port 1883.
pub fn broker_tcp(dst_port: u16, seq: u32, ack: u32, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut segment = vec![0u8; 20 + payload.len()];
    put_u16(&mut segment, 0, BROKER_PORT);
    put_u16(&mut segment, 2, dst_port);
    segment[4..8].copy_from_slice(&seq.to_be_bytes());
    segment[8..12].copy_from_slice(&ack.to_be_bytes());
    segment[12] = 5 << 4;
    segment[13] = flags;
    put_u16(&mut segment, 14, 29200);
    segment[20..].copy_from_slice(payload);

    let pseudo = checksum::pseudo_header_sum(BROKER_IP, LOCAL_IP, IpProtocol::Tcp, segment.len() as u16);
    let sum = checksum::finalize(checksum::accumulate(pseudo, &segment));
    put_u16(&mut segment, 16, sum);

    broker_ipv4(IpProtocol::Tcp, &segment)
}

/// UDP datagram from the broker host.
pub fn broker_udp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut datagram = vec![0u8; 8 + payload.len()];
    put_u16(&mut datagram, 0, src_port);
    put_u16(&mut datagram, 2, dst_port);
    let len = datagram.len() as u16;
    put_u16(&mut datagram, 4, len);
    datagram[8..].copy_from_slice(payload);

    let pseudo = checksum::pseudo_header_sum(BROKER_IP, LOCAL_IP, IpProtocol::Udp, datagram.len() as u16);
    let sum = checksum::finalize(checksum::accumulate(pseudo, &datagram));
    put_u16(&mut datagram, 6, sum);

    broker_ipv4(IpProtocol::Udp, &datagram)
}

/// ICMP echo request from the broker host.
pub fn broker_ping(ident: u16, seq: u16, data: &[u8]) -> Vec<u8> {
    let mut message = vec![0u8; 8 + data.len()];
    message[0] = 8;
    put_u16(&mut message, 4, ident);
    put_u16(&mut message, 6, seq);
    message[8..].copy_from_slice(data);
    let sum = checksum::checksum(&message);
    put_u16(&mut message, 2, sum);

    broker_ipv4(IpProtocol::Icmp, &message)
}

/// ARP frame from the broker with the given operation and target IP.
pub fn broker_arp(operation: u16, target_mac: MacAddress, target_ip: Ipv4Addr) -> Vec<u8> {
    let dst = if operation == 1 { MacAddress::BROADCAST } else { target_mac };
    let mut frame = Vec::with_capacity(42);
    frame.extend_from_slice(&dst.0);
    frame.extend_from_slice(&BROKER_MAC.0);
    frame.extend_from_slice(&[0x08, 0x06, 0x00, 0x01, 0x08, 0x00, 0x06, 0x04]);
    frame.extend_from_slice(&operation.to_be_bytes());
    frame.extend_from_slice(&BROKER_MAC.0);
    frame.extend_from_slice(&BROKER_IP.0);
    frame.extend_from_slice(&target_mac.0);
    frame.extend_from_slice(&target_ip.0);
    frame
}

/// Parsed, checksum-verified view of an emitted TCP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpView {
    pub dst_mac: [u8; 6],
    pub src_ip: [u8; 4],
    pub dst_ip: [u8; 4],
    pub ident: u16,
    pub ttl: u8,
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub syn: bool,
    pub ack_flag: bool,
    pub psh: bool,
    pub fin: bool,
    pub rst: bool,
    pub window: u16,
    pub header_len: usize,
    pub payload: Vec<u8>,
}

fn ipv4_of(frame: &[u8]) -> Ipv4Packet<&[u8]> {
    let eth = EthernetFrame::new_checked(frame).expect("ethernet frame");
    assert_eq!(eth.ethertype(), EthernetProtocol::Ipv4);
    let ip = Ipv4Packet::new_checked(&frame[14..]).expect("ipv4 packet");
    assert!(ip.verify_checksum(), "IPv4 header checksum");
    assert_eq!(ip.total_len() as usize + 14, frame.len(), "IPv4 total length");
    ip
}

pub fn tcp_view(frame: &[u8]) -> TcpView {
    let ip = ipv4_of(frame);
    let src = IpAddress::Ipv4(ip.src_addr());
    let dst = IpAddress::Ipv4(ip.dst_addr());
    let tcp = TcpPacket::new_checked(ip.payload()).expect("tcp segment");
    assert!(tcp.verify_checksum(&src, &dst), "TCP checksum");

    TcpView {
        dst_mac: EthernetFrame::new_checked(frame).expect("ethernet frame").dst_addr().0,
        src_ip: ip.src_addr().0,
        dst_ip: ip.dst_addr().0,
        ident: ip.ident(),
        ttl: ip.hop_limit(),
        src_port: tcp.src_port(),
        dst_port: tcp.dst_port(),
        seq: tcp.seq_number().0 as u32,
        ack: tcp.ack_number().0 as u32,
        syn: tcp.syn(),
        ack_flag: tcp.ack(),
        psh: tcp.psh(),
        fin: tcp.fin(),
        rst: tcp.rst(),
        window: tcp.window_len(),
        header_len: tcp.header_len() as usize,
        payload: tcp.payload().to_vec(),
    }
}

/// (source port, destination port, payload) of a checksum-verified datagram.
pub fn udp_view(frame: &[u8]) -> (u16, u16, Vec<u8>) {
    let ip = ipv4_of(frame);
    let src = IpAddress::Ipv4(ip.src_addr());
    let dst = IpAddress::Ipv4(ip.dst_addr());
    let udp = UdpPacket::new_checked(ip.payload()).expect("udp datagram");
    assert!(udp.verify_checksum(&src, &dst), "UDP checksum");
    (udp.src_port(), udp.dst_port(), udp.payload().to_vec())
}

/// Checksum-verified ICMP message of an emitted frame.
pub fn icmp_view(frame: &[u8]) -> Icmpv4Packet<Vec<u8>> {
    let ip = ipv4_of(frame);
    let icmp = Icmpv4Packet::new_checked(ip.payload().to_vec()).expect("icmp message");
    assert!(icmp.verify_checksum(), "ICMP checksum");
    icmp
}

pub fn arp_view(frame: &[u8]) -> ArpRepr {
    let eth = EthernetFrame::new_checked(frame).expect("ethernet frame");
    assert_eq!(eth.ethertype(), EthernetProtocol::Arp);
    let arp = ArpPacket::new_checked(eth.payload()).expect("arp packet");
    ArpRepr::parse(&arp).expect("ethernet/ipv4 arp")
}

pub fn smol_ip(ip: Ipv4Addr) -> Ipv4Address {
    Ipv4Address(ip.0)
}
