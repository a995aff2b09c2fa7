//! Application callbacks.

/// Notifications raised while processing received frames.
///
/// Every method defaults to a no-op so applications implement only what
/// they care about.
pub trait NetEvents {
    /// CONNACK with return code 0 received.
    fn on_mqtt_connected(&mut self) {}

    /// Broker sent DISCONNECT or closed the TCP connection.
    fn on_mqtt_disconnected(&mut self) {}

    fn on_publish(&mut self, _topic: &str, _payload: &[u8]) {}

    fn on_ping_response(&mut self) {}

    /// Payload of an accepted UDP datagram, before the reply is sent.
    fn on_datagram(&mut self, _payload: &[u8]) {}
}

impl NetEvents for () {}
