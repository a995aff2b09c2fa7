//! Connection bookkeeping and segment emission.

use core::ops::Range;

use rand_core::RngCore;

use super::TcpState;
use crate::driver::NetworkDriver;
use crate::error::{NetworkError, Result};
use crate::host::{self, Host};
use crate::types::{IpProtocol, Ipv4Addr, MacAddress};
use crate::wire::tcp::{self as segment, SegmentHeader, TcpFlags, HEADER_LEN, MSS_OPTION};

/// First port of the dynamic range (RFC 6335).
pub const EPHEMERAL_PORT_BASE: u16 = 49152;
pub const EPHEMERAL_PORT_SPAN: u32 = 16383;

/// What the caller must do after [`TcpConnection::on_segment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentAction {
    /// Not a valid TCP segment.
    Drop,
    /// Valid segment that needs no reply.
    Ignore,
    /// Handshake completed: ACK it, then start the application protocol.
    Established,
    /// Payload at this frame range was accepted: deliver it, then ACK.
    Deliver(Range<usize>),
    /// Peer closed: ACK the FIN, then reset.
    Closed,
}

/// The one TCP connection this node keeps.
#[derive(Debug, Clone, Default)]
pub struct TcpConnection {
    state: TcpState,
    local_port: u16,
    remote_port: u16,
    remote_mac: MacAddress,
    remote_ip: Ipv4Addr,
    /// Next sequence number we send.
    seq: u32,
    /// Next sequence number expected from the peer.
    ack: u32,
}

impl TcpConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == TcpState::Established
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    pub fn remote_ip(&self) -> Ipv4Addr {
        self.remote_ip
    }

    pub fn remote_mac(&self) -> MacAddress {
        self.remote_mac
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn ack_number(&self) -> u32 {
        self.ack
    }

    /// Send SYN to `remote_ip:remote_port` from a random ephemeral port.
    #[allow(clippy::too_many_arguments)]
    pub fn open<D: NetworkDriver, R: RngCore>(
        &mut self,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
        remote_mac: MacAddress,
        remote_ip: Ipv4Addr,
        remote_port: u16,
        rng: &mut R,
    ) -> Result<()> {
        if self.state != TcpState::Closed {
            return Err(NetworkError::InvalidState);
        }

        self.remote_mac = remote_mac;
        self.remote_ip = remote_ip;
        self.remote_port = remote_port;
        self.local_port = EPHEMERAL_PORT_BASE + (rng.next_u32() % EPHEMERAL_PORT_SPAN) as u16;
        self.seq = rng.next_u32();
        self.ack = 0;

        self.emit(host, buf, driver, TcpFlags::SYN, &MSS_OPTION, 0)?;
        log::debug!(
            "[TCP] SYN {}:{} -> {}:{} isn {:#010x}",
            host.ip(),
            self.local_port,
            remote_ip,
            remote_port,
            self.seq
        );

        self.seq = self.seq.wrapping_add(1);
        self.state = TcpState::SynSent;
        Ok(())
    }

    /// Classify a received frame and apply its state transition.
    ///
    /// Nothing is transmitted here; the caller acts on the returned
    /// [`SegmentAction`] while the payload is still in the buffer.
    pub fn on_segment(&mut self, frame: &[u8]) -> SegmentAction {
        if !segment::is_tcp(frame) {
            log::trace!("[TCP] dropped segment with bad checksum");
            return SegmentAction::Drop;
        }
        let Some(range) = segment::segment_range(frame) else {
            return SegmentAction::Drop;
        };
        let Some(header) = segment::parse_header(&frame[range.clone()]) else {
            return SegmentAction::Drop;
        };

        if self.state == TcpState::Closed
            || header.dst_port != self.local_port
            || header.src_port != self.remote_port
        {
            log::trace!("[TCP] segment for {} not ours", header.dst_port);
            return SegmentAction::Ignore;
        }

        let flags = header.flags;
        if flags.contains(TcpFlags::RST) {
            log::debug!("[TCP] RST from peer ignored");
            return SegmentAction::Ignore;
        }

        if flags.contains(TcpFlags::SYN | TcpFlags::ACK) {
            if self.state != TcpState::SynSent {
                return SegmentAction::Ignore;
            }
            self.ack = header.seq.wrapping_add(1);
            self.state = TcpState::Established;
            log::info!("[TCP] established with {}:{}", self.remote_ip, self.remote_port);
            return SegmentAction::Established;
        }

        if flags.contains(TcpFlags::SYN) {
            log::trace!("[TCP] inbound SYN ignored");
            return SegmentAction::Ignore;
        }

        let payload = range.start + header.header_len..range.end;

        if flags.contains(TcpFlags::FIN | TcpFlags::ACK) {
            // Data riding on the FIN is acknowledged but not delivered.
            self.ack = self.ack.wrapping_add(payload.len() as u32).wrapping_add(1);
            self.state = TcpState::Closed;
            log::info!("[TCP] closed by {}", self.remote_ip);
            return SegmentAction::Closed;
        }

        if flags.contains(TcpFlags::ACK) && !payload.is_empty() && self.is_established() {
            self.ack = self.ack.wrapping_add(payload.len() as u32);
            return SegmentAction::Deliver(payload);
        }

        SegmentAction::Ignore
    }

    /// Send `payload_len` bytes already placed after the TCP header.
    ///
    /// Does not advance the sequence number; see [`Self::increment_seq`].
    pub fn send_data<D: NetworkDriver>(
        &self,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
        flags: TcpFlags,
        payload_len: usize,
    ) -> Result<()> {
        if !self.is_established() {
            return Err(NetworkError::InvalidState);
        }
        self.emit(host, buf, driver, flags, &[], payload_len)
    }

    /// Zero-payload ACK carrying the current sequence and acknowledgment.
    pub fn ack<D: NetworkDriver>(&self, host: &mut Host, buf: &mut [u8], driver: &mut D) -> Result<()> {
        self.emit(host, buf, driver, TcpFlags::ACK, &[], 0)
    }

    /// Start an active close with FIN+ACK.
    pub fn close<D: NetworkDriver>(&mut self, host: &mut Host, buf: &mut [u8], driver: &mut D) -> Result<()> {
        if !self.is_established() {
            return Err(NetworkError::InvalidState);
        }
        self.emit(host, buf, driver, TcpFlags::FIN | TcpFlags::ACK, &[], 0)?;
        self.seq = self.seq.wrapping_add(1);
        self.state = TcpState::FinWait1;
        log::debug!("[TCP] FIN sent");
        Ok(())
    }

    /// Advance the sequence number past `len` sent bytes.
    pub fn increment_seq(&mut self, len: u32) -> u32 {
        self.seq = self.seq.wrapping_add(len);
        self.seq
    }

    /// Forget the connection.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn emit<D: NetworkDriver>(
        &self,
        host: &mut Host,
        buf: &mut [u8],
        driver: &mut D,
        flags: TcpFlags,
        options: &[u8],
        payload_len: usize,
    ) -> Result<()> {
        let header_len = HEADER_LEN + options.len();
        let segment_len = header_len + payload_len;
        let offset = host.build_ipv4(buf, self.remote_mac, self.remote_ip, IpProtocol::Tcp, segment_len)?;

        let header = SegmentHeader {
            src_port: self.local_port,
            dst_port: self.remote_port,
            seq: self.seq,
            ack: self.ack,
            flags,
            window: host.config().window,
            header_len,
        };
        segment::write_header(&mut buf[offset..], &header)?;
        buf[offset + HEADER_LEN..offset + header_len].copy_from_slice(options);
        segment::update_checksum(buf)?;

        host::transmit(driver, &buf[..offset + segment_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, CaptureDriver, BROKER_IP, BROKER_MAC, LOCAL_IP};
    use crate::types::MAX_FRAME_SIZE;
    use crate::wire::{ipv4, tcp as wire_tcp, TCP_PAYLOAD_OFFSET};
    use rand::rngs::mock::StepRng;

    struct Fixture {
        host: Host,
        driver: CaptureDriver,
        buf: [u8; MAX_FRAME_SIZE],
        tcp: TcpConnection,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                host: Host::new(testing::local_config()),
                driver: CaptureDriver::new(testing::LOCAL_MAC),
                buf: [0u8; MAX_FRAME_SIZE],
                tcp: TcpConnection::new(),
            }
        }

        fn open(&mut self) {
            let mut rng = StepRng::new(1000, 1);
            self.tcp
                .open(&mut self.host, &mut self.buf, &mut self.driver, BROKER_MAC, BROKER_IP, 1883, &mut rng)
                .unwrap();
        }

        fn establish(&mut self) -> u32 {
            self.open();
            let frame = testing::peer_tcp(self.tcp.local_port(), 7000, self.tcp.seq(), TcpFlags::SYN | TcpFlags::ACK, &[]);
            assert_eq!(self.tcp.on_segment(&frame), SegmentAction::Established);
            7000
        }
    }

    fn header_of(frame: &[u8]) -> SegmentHeader {
        let range = wire_tcp::segment_range(frame).unwrap();
        wire_tcp::parse_header(&frame[range]).unwrap()
    }

    #[test]
    fn test_open_sends_syn_with_mss() {
        let mut fx = Fixture::new();
        fx.open();

        assert_eq!(fx.tcp.state(), TcpState::SynSent);
        assert_eq!(fx.tcp.local_port(), EPHEMERAL_PORT_BASE + (1000 % EPHEMERAL_PORT_SPAN) as u16);
        // ISN drawn second, then advanced past the SYN
        assert_eq!(fx.tcp.seq(), 1002);

        assert_eq!(fx.driver.sent.len(), 1);
        let syn = &fx.driver.sent[0];
        assert!(wire_tcp::is_tcp(syn));
        let header = header_of(syn);
        assert_eq!(header.flags, TcpFlags::SYN);
        assert_eq!(header.seq, 1001);
        assert_eq!(header.dst_port, 1883);
        assert_eq!(header.window, 1460);
        assert_eq!(header.header_len, 24);
        assert_eq!(&syn[54..58], &MSS_OPTION);
        assert_eq!(syn.len(), 58);
        assert_eq!(ipv4::destination(syn), Some(BROKER_IP));
        assert_eq!(ipv4::source(syn), Some(LOCAL_IP));
    }

    #[test]
    fn test_open_twice_rejected() {
        let mut fx = Fixture::new();
        fx.open();
        let mut rng = StepRng::new(0, 1);
        let result = fx.tcp.open(&mut fx.host, &mut fx.buf, &mut fx.driver, BROKER_MAC, BROKER_IP, 1883, &mut rng);
        assert_eq!(result, Err(NetworkError::InvalidState));
        assert_eq!(fx.driver.sent.len(), 1);
    }

    #[test]
    fn test_syn_ack_establishes() {
        let mut fx = Fixture::new();
        let peer_seq = fx.establish();
        assert_eq!(fx.tcp.state(), TcpState::Established);
        assert_eq!(fx.tcp.ack_number(), peer_seq + 1);

        fx.tcp.ack(&mut fx.host, &mut fx.buf, &mut fx.driver).unwrap();
        let ack = header_of(fx.driver.sent.last().unwrap());
        assert_eq!(ack.flags, TcpFlags::ACK);
        assert_eq!(ack.ack, peer_seq + 1);
        assert_eq!(ack.seq, fx.tcp.seq());
    }

    #[test]
    fn test_syn_ack_while_established_ignored() {
        let mut fx = Fixture::new();
        fx.establish();
        let frame = testing::peer_tcp(fx.tcp.local_port(), 9, 0, TcpFlags::SYN | TcpFlags::ACK, &[]);
        assert_eq!(fx.tcp.on_segment(&frame), SegmentAction::Ignore);
        assert_eq!(fx.tcp.ack_number(), 7001);
    }

    #[test]
    fn test_data_advances_ack() {
        let mut fx = Fixture::new();
        fx.establish();
        let frame = testing::peer_tcp(fx.tcp.local_port(), 7001, fx.tcp.seq(), TcpFlags::PSH | TcpFlags::ACK, b"\xd0\x00");
        assert_eq!(fx.tcp.on_segment(&frame), SegmentAction::Deliver(TCP_PAYLOAD_OFFSET..TCP_PAYLOAD_OFFSET + 2));
        assert_eq!(fx.tcp.ack_number(), 7003);
    }

    #[test]
    fn test_bare_ack_ignored() {
        let mut fx = Fixture::new();
        fx.establish();
        let frame = testing::peer_tcp(fx.tcp.local_port(), 7001, fx.tcp.seq(), TcpFlags::ACK, &[]);
        assert_eq!(fx.tcp.on_segment(&frame), SegmentAction::Ignore);
        assert_eq!(fx.tcp.ack_number(), 7001);
    }

    #[test]
    fn test_fin_closes() {
        let mut fx = Fixture::new();
        fx.establish();
        let frame = testing::peer_tcp(fx.tcp.local_port(), 7001, fx.tcp.seq(), TcpFlags::FIN | TcpFlags::ACK, &[]);
        assert_eq!(fx.tcp.on_segment(&frame), SegmentAction::Closed);
        assert_eq!(fx.tcp.state(), TcpState::Closed);
        assert_eq!(fx.tcp.ack_number(), 7002);
    }

    #[test]
    fn test_fin_with_data_acknowledges_data() {
        let mut fx = Fixture::new();
        fx.establish();
        let frame = testing::peer_tcp(fx.tcp.local_port(), 7001, fx.tcp.seq(), TcpFlags::FIN | TcpFlags::ACK, b"bye");
        assert_eq!(fx.tcp.on_segment(&frame), SegmentAction::Closed);
        assert_eq!(fx.tcp.ack_number(), 7001 + 3 + 1);
    }

    #[test]
    fn test_rst_and_bare_syn_ignored() {
        let mut fx = Fixture::new();
        fx.establish();
        let port = fx.tcp.local_port();
        assert_eq!(fx.tcp.on_segment(&testing::peer_tcp(port, 1, 0, TcpFlags::RST, &[])), SegmentAction::Ignore);
        assert_eq!(fx.tcp.on_segment(&testing::peer_tcp(port, 1, 0, TcpFlags::SYN, &[])), SegmentAction::Ignore);
        assert_eq!(fx.tcp.state(), TcpState::Established);
    }

    #[test]
    fn test_bad_checksum_dropped() {
        let mut fx = Fixture::new();
        fx.open();
        let mut frame = testing::peer_tcp(fx.tcp.local_port(), 7000, fx.tcp.seq(), TcpFlags::SYN | TcpFlags::ACK, &[]);
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert_eq!(fx.tcp.on_segment(&frame), SegmentAction::Drop);
        assert_eq!(fx.tcp.state(), TcpState::SynSent);
    }

    #[test]
    fn test_other_port_ignored() {
        let mut fx = Fixture::new();
        fx.open();
        let frame = testing::peer_tcp(fx.tcp.local_port().wrapping_add(1), 7000, 0, TcpFlags::SYN | TcpFlags::ACK, &[]);
        assert_eq!(fx.tcp.on_segment(&frame), SegmentAction::Ignore);
        assert_eq!(fx.tcp.state(), TcpState::SynSent);
    }

    #[test]
    fn test_send_data_requires_established() {
        let mut fx = Fixture::new();
        fx.open();
        let result = fx.tcp.send_data(&mut fx.host, &mut fx.buf, &mut fx.driver, TcpFlags::PSH | TcpFlags::ACK, 2);
        assert_eq!(result, Err(NetworkError::InvalidState));
        assert_eq!(fx.driver.sent.len(), 1);
    }

    #[test]
    fn test_send_data_then_increment() {
        let mut fx = Fixture::new();
        fx.establish();
        fx.buf[TCP_PAYLOAD_OFFSET..TCP_PAYLOAD_OFFSET + 2].copy_from_slice(&[0xC0, 0x00]);
        let seq = fx.tcp.seq();
        fx.tcp
            .send_data(&mut fx.host, &mut fx.buf, &mut fx.driver, TcpFlags::PSH | TcpFlags::ACK, 2)
            .unwrap();
        assert_eq!(fx.tcp.increment_seq(2), seq + 2);

        let sent = fx.driver.sent.last().unwrap();
        assert_eq!(sent.len(), TCP_PAYLOAD_OFFSET + 2);
        assert!(wire_tcp::is_tcp(sent));
        let header = header_of(sent);
        assert_eq!(header.flags, TcpFlags::PSH | TcpFlags::ACK);
        assert_eq!(header.seq, seq);
        assert_eq!(&sent[TCP_PAYLOAD_OFFSET..], &[0xC0, 0x00]);
    }

    #[test]
    fn test_close_sends_fin() {
        let mut fx = Fixture::new();
        fx.establish();
        let seq = fx.tcp.seq();
        fx.tcp.close(&mut fx.host, &mut fx.buf, &mut fx.driver).unwrap();
        assert_eq!(fx.tcp.state(), TcpState::FinWait1);
        assert_eq!(fx.tcp.seq(), seq.wrapping_add(1));
        assert_eq!(header_of(fx.driver.sent.last().unwrap()).flags, TcpFlags::FIN | TcpFlags::ACK);

        let frame = testing::peer_tcp(fx.tcp.local_port(), 7001, fx.tcp.seq(), TcpFlags::FIN | TcpFlags::ACK, &[]);
        assert_eq!(fx.tcp.on_segment(&frame), SegmentAction::Closed);
    }

    #[test]
    fn test_sequence_wraps() {
        let mut tcp = TcpConnection::new();
        tcp.seq = u32::MAX;
        assert_eq!(tcp.increment_seq(2), 1);
    }

    #[test]
    fn test_reset() {
        let mut fx = Fixture::new();
        fx.establish();
        fx.tcp.reset();
        assert_eq!(fx.tcp.state(), TcpState::Closed);
        assert_eq!(fx.tcp.local_port(), 0);
    }
}
