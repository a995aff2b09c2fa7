//! Persisted node addressing.
//!
//! The local and broker addresses survive reboots in two 32-bit slots of
//! whatever non-volatile storage the board has (EEPROM, flash page,
//! battery-backed RAM). Each address is packed big-endian:
//! `a.b.c.d` is stored as `a<<24 | b<<16 | c<<8 | d`.

use kestrel_network::{InterfaceConfig, Ipv4Addr, MacAddress};

pub const LOCAL_IP_SLOT: u16 = 0;
pub const BROKER_IP_SLOT: u16 = 1;

/// Word-addressed non-volatile storage.
pub trait ConfigStore {
    fn read_slot(&mut self, slot: u16) -> u32;

    fn write_slot(&mut self, slot: u16, value: u32);
}

/// RAM-backed store for boards without non-volatile memory.
#[derive(Debug, Clone)]
pub struct MemoryStore<const N: usize> {
    slots: [u32; N],
}

impl<const N: usize> MemoryStore<N> {
    pub const fn new() -> Self {
        Self { slots: [0; N] }
    }
}

impl<const N: usize> Default for MemoryStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ConfigStore for MemoryStore<N> {
    /// Out-of-range slots read as zero.
    fn read_slot(&mut self, slot: u16) -> u32 {
        self.slots.get(slot as usize).copied().unwrap_or(0)
    }

    fn write_slot(&mut self, slot: u16, value: u32) {
        if let Some(s) = self.slots.get_mut(slot as usize) {
            *s = value;
        }
    }
}

/// Addressing assembled from the store plus board defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    pub local_ip: Ipv4Addr,
    pub broker_ip: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let iface = InterfaceConfig::default();
        Self {
            local_ip: Ipv4Addr::UNSPECIFIED,
            broker_ip: Ipv4Addr::UNSPECIFIED,
            subnet: iface.subnet,
            gateway: iface.gateway,
        }
    }
}

impl NodeConfig {
    pub fn load<S: ConfigStore>(store: &mut S) -> Self {
        Self {
            local_ip: Ipv4Addr::from_u32(store.read_slot(LOCAL_IP_SLOT)),
            broker_ip: Ipv4Addr::from_u32(store.read_slot(BROKER_IP_SLOT)),
            ..Self::default()
        }
    }

    pub fn store_local_ip<S: ConfigStore>(&mut self, store: &mut S, ip: Ipv4Addr) {
        self.local_ip = ip;
        store.write_slot(LOCAL_IP_SLOT, ip.to_u32());
    }

    pub fn store_broker_ip<S: ConfigStore>(&mut self, store: &mut S, ip: Ipv4Addr) {
        self.broker_ip = ip;
        store.write_slot(BROKER_IP_SLOT, ip.to_u32());
    }

    /// Both addresses have their network part set.
    ///
    /// Only the first three octets are checked; a host part of 0 is
    /// accepted.
    pub fn is_provisioned(&self) -> bool {
        has_network_part(self.local_ip) && has_network_part(self.broker_ip)
    }

    /// Zero both slots and forget the addresses.
    pub fn clear<S: ConfigStore>(&mut self, store: &mut S) {
        store.write_slot(LOCAL_IP_SLOT, 0);
        store.write_slot(BROKER_IP_SLOT, 0);
        self.local_ip = Ipv4Addr::UNSPECIFIED;
        self.broker_ip = Ipv4Addr::UNSPECIFIED;
    }

    pub fn interface_config(&self, mac: MacAddress) -> InterfaceConfig {
        InterfaceConfig::new(mac, self.local_ip)
            .with_subnet(self.subnet)
            .with_gateway(self.gateway)
    }
}

fn has_network_part(ip: Ipv4Addr) -> bool {
    ip.0[..3].iter().all(|&b| b != 0)
}
