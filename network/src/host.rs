//! Local addressing shared by every outbound frame.

use crate::config::InterfaceConfig;
use crate::driver::NetworkDriver;
use crate::error::Result;
use crate::types::{EtherType, IpProtocol, Ipv4Addr, MacAddress};
use crate::wire::{ethernet, ipv4};

/// Interface configuration plus the IPv4 identification counter.
#[derive(Debug, Clone)]
pub struct Host {
    config: InterfaceConfig,
    next_ident: u16,
}

impl Host {
    pub fn new(config: InterfaceConfig) -> Self {
        Self { config, next_ident: 0 }
    }

    pub fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut InterfaceConfig {
        &mut self.config
    }

    pub fn mac(&self) -> MacAddress {
        self.config.mac
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.config.ip
    }

    /// Identification the next IPv4 header will carry.
    pub fn next_ident(&self) -> u16 {
        self.next_ident
    }

    /// Build link and IPv4 headers for a datagram of `payload_len` bytes.
    ///
    /// Consumes one identification value. Returns the payload offset.
    pub fn build_ipv4(
        &mut self,
        buf: &mut [u8],
        dst_mac: MacAddress,
        dst_ip: Ipv4Addr,
        protocol: IpProtocol,
        payload_len: usize,
    ) -> Result<usize> {
        ethernet::build_header(buf, dst_mac, self.config.mac, EtherType::Ipv4)?;
        let offset = ipv4::build_header(
            buf,
            self.config.ip,
            dst_ip,
            payload_len,
            protocol,
            self.config.ttl,
            self.next_ident,
        )?;
        self.next_ident = self.next_ident.wrapping_add(1);
        Ok(offset)
    }
}

/// Hand a finished frame to the driver.
pub fn transmit<D: NetworkDriver>(driver: &mut D, frame: &[u8]) -> Result<()> {
    driver.transmit(frame).map_err(|e| {
        log::warn!("[NET] transmit of {} bytes failed: {:?}", frame.len(), e);
        e.into()
    })
}
