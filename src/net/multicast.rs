//! UDP multicast transport.
//!
//! The emulated bus is one multicast group. Traffic is split over two roles
//! with separate sockets, so a receive loop and a sender can live on
//! different threads without locking:
//!
//! - [`MulticastReceive`]: bound to `0.0.0.0:port`, joined to one or more
//!   groups, returns whole datagrams with their sender.
//! - [`MulticastTransmit`]: bound to `local_address:local_port`, sends every
//!   frame to a fixed group destination and retries partial sends.
//!
//! [`MulticastSocket`] keeps both roles on one socket for older callers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use knx_fieldbus::config::MulticastConfig;
//! use knx_fieldbus::net::multicast::{MulticastReceive, MulticastTransmit};
//!
//! let config = MulticastConfig::default();
//! let mut rx = MulticastReceive::bind(config)?;
//! let mut tx = MulticastTransmit::bind(config)?;
//!
//! tx.transmit(&[0x06, 0x10, 0x05, 0x30, 0x00, 0x06])?;
//! match rx.receive() {
//!     Ok((frame, sender)) => println!("{} bytes from {sender}", frame.len()),
//!     Err(e) if e.is_timeout() => println!("bus idle"),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use std::net::UdpSocket;

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::config::MulticastConfig;
use crate::error::{KnxError, Result};
use crate::knx_log;
use crate::net::ensure_multicast;
use crate::net::socket::{open_receive_socket, open_transmit_socket, DatagramSocket};

// =============================================================================
// Receive role
// =============================================================================

/// Receive side of the multicast transport.
#[derive(Debug)]
pub struct MulticastReceive<S: DatagramSocket = UdpSocket> {
    socket: Option<S>,
    config: MulticastConfig,
    groups: Vec<Ipv4Addr>,
    buffer: Vec<u8>,
}

impl MulticastReceive<UdpSocket> {
    /// Open a receive socket and join `config.multicast_address`.
    ///
    /// # Errors
    ///
    /// Validation error for an invalid configuration, I/O error if the
    /// socket cannot be set up or the join is refused.
    pub fn bind(config: MulticastConfig) -> Result<Self> {
        config.validate()?;
        let socket = open_receive_socket(&config)?;
        Self::with_socket(socket, config)
    }
}

impl<S: DatagramSocket> MulticastReceive<S> {
    /// Wrap an already bound socket and join `config.multicast_address`.
    ///
    /// # Errors
    ///
    /// Same as [`MulticastReceive::bind`].
    pub fn with_socket(socket: S, config: MulticastConfig) -> Result<Self> {
        config.validate()?;
        let mut receive = Self {
            socket: Some(socket),
            config,
            groups: Vec::new(),
            buffer: vec![0; config.receive_buffer],
        };
        receive.join_group(config.multicast_address)?;
        Ok(receive)
    }

    /// Join another multicast group on `config.local_address`.
    ///
    /// Joining a group twice is a no-op.
    ///
    /// # Errors
    ///
    /// Validation error if `group` is not a multicast address (checked before
    /// the socket is touched), transport error after [`close`](Self::close).
    pub fn join_group(&mut self, group: Ipv4Addr) -> Result<()> {
        ensure_multicast(group)?;
        let interface = self.config.local_address;
        let socket = self.socket.as_mut().ok_or_else(KnxError::transport_closed)?;
        join(socket, &mut self.groups, group, interface)
    }

    /// Leave a previously joined group. Leaving an unknown group is a no-op.
    ///
    /// # Errors
    ///
    /// Validation error if `group` is not a multicast address, transport
    /// error after [`close`](Self::close).
    pub fn leave_group(&mut self, group: Ipv4Addr) -> Result<()> {
        ensure_multicast(group)?;
        let interface = self.config.local_address;
        let socket = self.socket.as_mut().ok_or_else(KnxError::transport_closed)?;
        leave(socket, &mut self.groups, group, interface)
    }

    /// Groups currently joined.
    pub fn groups(&self) -> &[Ipv4Addr] {
        &self.groups
    }

    /// Block up to the configured timeout for one datagram.
    ///
    /// # Errors
    ///
    /// [`KnxError::Timeout`] when nothing arrived in time, transport error
    /// after [`close`](Self::close), I/O error otherwise.
    pub fn receive(&mut self) -> Result<(Vec<u8>, SocketAddr)> {
        let socket = self.socket.as_mut().ok_or_else(KnxError::transport_closed)?;
        let (len, sender) = socket.recv_from(&mut self.buffer)?;
        knx_log!(trace, "received {} bytes from {}", len, sender);
        Ok((self.buffer[..len].to_vec(), sender))
    }

    /// Leave every group and release the socket. Calling it again does
    /// nothing.
    pub fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            leave_all(&mut socket, &mut self.groups, self.config.local_address);
            knx_log!(info, "multicast receiver closed");
        }
    }

    /// `true` once [`close`](Self::close) ran.
    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Settings this role was built with.
    pub fn config(&self) -> &MulticastConfig {
        &self.config
    }

    /// Underlying socket, `None` after [`close`](Self::close).
    pub fn socket(&self) -> Option<&S> {
        self.socket.as_ref()
    }
}

// =============================================================================
// Transmit role
// =============================================================================

/// Transmit side of the multicast transport.
#[derive(Debug)]
pub struct MulticastTransmit<S: DatagramSocket = UdpSocket> {
    socket: Option<S>,
    config: MulticastConfig,
    destination: SocketAddrV4,
}

impl MulticastTransmit<UdpSocket> {
    /// Open a transmit socket sending to `multicast_address:port`.
    ///
    /// # Errors
    ///
    /// Validation error for an invalid configuration, I/O error if the
    /// socket cannot be set up.
    pub fn bind(config: MulticastConfig) -> Result<Self> {
        config.validate()?;
        let socket = open_transmit_socket(&config)?;
        Self::with_socket(socket, config)
    }
}

impl<S: DatagramSocket> MulticastTransmit<S> {
    /// Wrap an already bound socket.
    ///
    /// # Errors
    ///
    /// Validation error for an invalid configuration.
    pub fn with_socket(socket: S, config: MulticastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            socket: Some(socket),
            config,
            destination: SocketAddrV4::new(config.multicast_address, config.port),
        })
    }

    /// Fixed destination of every frame.
    pub fn destination(&self) -> SocketAddrV4 {
        self.destination
    }

    /// Send all of `data`, retrying while the socket accepts only part of it.
    ///
    /// # Errors
    ///
    /// The socket's error, unmodified. A send accepting 0 bytes is a
    /// transport error, as is any call after [`close`](Self::close).
    pub fn transmit(&mut self, data: &[u8]) -> Result<()> {
        let socket = self.socket.as_mut().ok_or_else(KnxError::transport_closed)?;
        send_all(socket, data, self.destination)
    }

    /// Release the socket. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            knx_log!(info, "multicast transmitter closed");
        }
    }

    /// `true` once [`close`](Self::close) ran.
    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Settings this role was built with.
    pub fn config(&self) -> &MulticastConfig {
        &self.config
    }

    /// Underlying socket, `None` after [`close`](Self::close).
    pub fn socket(&self) -> Option<&S> {
        self.socket.as_ref()
    }

    /// Mutable access to the underlying socket.
    pub fn socket_mut(&mut self) -> Option<&mut S> {
        self.socket.as_mut()
    }
}

// =============================================================================
// Legacy combined socket
// =============================================================================

/// One socket doing both roles.
///
/// A sender when built with a destination, a receiver once a group has been
/// joined. New code should use [`MulticastReceive`] and
/// [`MulticastTransmit`].
#[derive(Debug)]
pub struct MulticastSocket<S: DatagramSocket = UdpSocket> {
    socket: Option<S>,
    config: MulticastConfig,
    destination: Option<SocketAddrV4>,
    groups: Vec<Ipv4Addr>,
    buffer: Vec<u8>,
}

impl MulticastSocket<UdpSocket> {
    /// Socket sending to `multicast_address:port`.
    ///
    /// # Errors
    ///
    /// Validation error for an invalid configuration, I/O error if the
    /// socket cannot be set up.
    pub fn sender(config: MulticastConfig) -> Result<Self> {
        config.validate()?;
        let socket = open_transmit_socket(&config)?;
        Self::with_socket(
            socket,
            config,
            Some(SocketAddrV4::new(config.multicast_address, config.port)),
        )
    }

    /// Socket bound to the multicast port; call
    /// [`join_group`](Self::join_group) before receiving.
    ///
    /// # Errors
    ///
    /// Same as [`MulticastSocket::sender`].
    pub fn receiver(config: MulticastConfig) -> Result<Self> {
        config.validate()?;
        let socket = open_receive_socket(&config)?;
        Self::with_socket(socket, config, None)
    }
}

impl<S: DatagramSocket> MulticastSocket<S> {
    /// Wrap an already bound socket.
    ///
    /// # Errors
    ///
    /// Validation error for an invalid configuration or a destination
    /// outside the multicast range.
    pub fn with_socket(
        socket: S,
        config: MulticastConfig,
        destination: Option<SocketAddrV4>,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(destination) = destination {
            ensure_multicast(*destination.ip())?;
        }
        Ok(Self {
            socket: Some(socket),
            config,
            destination,
            groups: Vec::new(),
            buffer: vec![0; config.receive_buffer],
        })
    }

    /// Destination set at construction, if any.
    pub fn destination(&self) -> Option<SocketAddrV4> {
        self.destination
    }

    /// See [`MulticastReceive::join_group`].
    ///
    /// # Errors
    ///
    /// Validation error if `group` is not a multicast address.
    pub fn join_group(&mut self, group: Ipv4Addr) -> Result<()> {
        ensure_multicast(group)?;
        let interface = self.config.local_address;
        let socket = self.socket.as_mut().ok_or_else(KnxError::transport_closed)?;
        join(socket, &mut self.groups, group, interface)
    }

    /// See [`MulticastReceive::leave_group`].
    ///
    /// # Errors
    ///
    /// Validation error if `group` is not a multicast address.
    pub fn leave_group(&mut self, group: Ipv4Addr) -> Result<()> {
        ensure_multicast(group)?;
        let interface = self.config.local_address;
        let socket = self.socket.as_mut().ok_or_else(KnxError::transport_closed)?;
        leave(socket, &mut self.groups, group, interface)
    }

    /// Groups currently joined.
    pub fn groups(&self) -> &[Ipv4Addr] {
        &self.groups
    }

    /// See [`MulticastTransmit::transmit`].
    ///
    /// # Errors
    ///
    /// Validation error when the socket was built without a destination.
    pub fn transmit(&mut self, data: &[u8]) -> Result<()> {
        let Some(destination) = self.destination else {
            knx_log!(warn, "transmit on a multicast socket without destination");
            return Err(KnxError::destination_not_set());
        };
        let socket = self.socket.as_mut().ok_or_else(KnxError::transport_closed)?;
        send_all(socket, data, destination)
    }

    /// See [`MulticastReceive::receive`].
    ///
    /// # Errors
    ///
    /// [`KnxError::Timeout`] when nothing arrived in time.
    pub fn receive(&mut self) -> Result<(Vec<u8>, SocketAddr)> {
        let socket = self.socket.as_mut().ok_or_else(KnxError::transport_closed)?;
        let (len, sender) = socket.recv_from(&mut self.buffer)?;
        knx_log!(trace, "received {} bytes from {}", len, sender);
        Ok((self.buffer[..len].to_vec(), sender))
    }

    /// Leave every group and release the socket. Calling it again does
    /// nothing.
    pub fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            leave_all(&mut socket, &mut self.groups, self.config.local_address);
            knx_log!(info, "multicast socket closed");
        }
    }

    /// `true` once [`close`](Self::close) ran.
    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Underlying socket, `None` after [`close`](Self::close).
    pub fn socket(&self) -> Option<&S> {
        self.socket.as_ref()
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

fn join<S: DatagramSocket>(
    socket: &mut S,
    groups: &mut Vec<Ipv4Addr>,
    group: Ipv4Addr,
    interface: Ipv4Addr,
) -> Result<()> {
    if groups.contains(&group) {
        return Ok(());
    }
    socket.join_multicast(group, interface)?;
    groups.push(group);
    knx_log!(info, "joined multicast group {} on {}", group, interface);
    Ok(())
}

fn leave<S: DatagramSocket>(
    socket: &mut S,
    groups: &mut Vec<Ipv4Addr>,
    group: Ipv4Addr,
    interface: Ipv4Addr,
) -> Result<()> {
    let Some(index) = groups.iter().position(|g| *g == group) else {
        return Ok(());
    };
    socket.leave_multicast(group, interface)?;
    groups.remove(index);
    knx_log!(info, "left multicast group {} on {}", group, interface);
    Ok(())
}

// Shutdown path: a failed drop of membership is logged, the socket goes away
// regardless.
fn leave_all<S: DatagramSocket>(socket: &mut S, groups: &mut Vec<Ipv4Addr>, interface: Ipv4Addr) {
    for group in groups.drain(..) {
        if let Err(e) = socket.leave_multicast(group, interface) {
            knx_log!(debug, "leaving {} failed: {}", group, e);
        }
    }
}

fn send_all<S: DatagramSocket>(socket: &mut S, data: &[u8], destination: SocketAddrV4) -> Result<()> {
    let mut sent = 0;
    while sent < data.len() {
        let accepted = socket.send_to(&data[sent..], destination)?;
        if accepted == 0 {
            knx_log!(warn, "send to {} stalled after {}/{} bytes", destination, sent, data.len());
            return Err(KnxError::send_failed());
        }
        sent += accepted;
    }
    knx_log!(trace, "sent {} bytes to {}", sent, destination);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::mock_transport::MockSocket;

    fn sender() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 50), 3671)
    }

    fn receiver() -> MulticastReceive<MockSocket> {
        MulticastReceive::with_socket(MockSocket::new(), MulticastConfig::default()).unwrap()
    }

    #[test]
    fn test_receive_joins_configured_group() {
        let rx = receiver();
        assert_eq!(rx.groups(), &[Ipv4Addr::new(224, 0, 23, 12)]);
        let socket = rx.socket().unwrap();
        assert_eq!(
            socket.memberships(),
            &[(Ipv4Addr::new(224, 0, 23, 12), Ipv4Addr::UNSPECIFIED)]
        );
    }

    #[test]
    fn test_join_rejects_unicast() {
        let mut rx = receiver();
        let err = rx.join_group(Ipv4Addr::new(10, 0, 0, 1)).unwrap_err();
        assert!(err.is_validation_error());
        assert_eq!(rx.socket().unwrap().memberships().len(), 1);
    }

    #[test]
    fn test_join_accepts_multicast_range() {
        let mut rx = receiver();
        for group in [
            Ipv4Addr::new(224, 0, 0, 0),
            Ipv4Addr::new(230, 1, 2, 3),
            Ipv4Addr::new(239, 255, 255, 255),
        ] {
            rx.join_group(group).unwrap();
            assert!(rx.socket().unwrap().is_member(group));
        }
        // Twice is fine
        rx.join_group(Ipv4Addr::new(224, 0, 0, 0)).unwrap();
        assert_eq!(rx.groups().len(), 4);
    }

    #[test]
    fn test_join_uses_local_interface() {
        let config = MulticastConfig::default().with_local_address(Ipv4Addr::new(192, 168, 1, 20));
        let rx = MulticastReceive::with_socket(MockSocket::new(), config).unwrap();
        assert_eq!(
            rx.socket().unwrap().memberships(),
            &[(config.multicast_address, Ipv4Addr::new(192, 168, 1, 20))]
        );
    }

    #[test]
    fn test_leave_group() {
        let mut rx = receiver();
        let group = Ipv4Addr::new(239, 1, 1, 1);
        rx.join_group(group).unwrap();
        rx.leave_group(group).unwrap();
        assert!(!rx.socket().unwrap().is_member(group));
        // Unknown group
        rx.leave_group(group).unwrap();
        assert!(rx.leave_group(Ipv4Addr::new(10, 0, 0, 1)).unwrap_err().is_validation_error());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MulticastConfig::default().with_multicast_address(Ipv4Addr::new(192, 168, 1, 1));
        let err = MulticastReceive::with_socket(MockSocket::new(), config).unwrap_err();
        assert!(err.is_validation_error());
        let err = MulticastTransmit::with_socket(MockSocket::new(), config).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_receive_returns_datagram_and_sender() {
        let mut mock = MockSocket::new();
        mock.add_datagram(vec![0x06, 0x10, 0x05, 0x30], sender());
        let mut rx = MulticastReceive::with_socket(mock, MulticastConfig::default()).unwrap();

        let (frame, from) = rx.receive().unwrap();
        assert_eq!(frame, vec![0x06, 0x10, 0x05, 0x30]);
        assert_eq!(from, SocketAddr::V4(sender()));
    }

    #[test]
    fn test_receive_timeout() {
        let mut rx = receiver();
        let err = rx.receive().unwrap_err();
        assert!(err.is_timeout());
        assert!(!err.is_validation_error());
    }

    #[test]
    fn test_receive_buffer_limits_datagram() {
        let mut mock = MockSocket::new();
        mock.add_datagram(vec![0xAB; 64], sender());
        let config = MulticastConfig::default().with_receive_buffer(16);
        let mut rx = MulticastReceive::with_socket(mock, config).unwrap();
        assert_eq!(rx.receive().unwrap().0.len(), 16);
    }

    #[test]
    fn test_receive_close_is_idempotent() {
        let mut rx = receiver();
        rx.close();
        assert!(rx.is_closed());
        rx.close();

        let err = rx.receive().unwrap_err();
        assert!(matches!(err, KnxError::Transport(ref e) if e.is_closed()));
        assert!(rx.groups().is_empty());
    }

    #[test]
    fn test_transmit_whole_frame() {
        let mut tx = MulticastTransmit::with_socket(MockSocket::new(), MulticastConfig::default()).unwrap();
        tx.transmit(&[1, 2, 3, 4]).unwrap();

        let socket = tx.socket().unwrap();
        assert_eq!(socket.sent().len(), 1);
        assert_eq!(socket.sent()[0].target, SocketAddrV4::new(Ipv4Addr::new(224, 0, 23, 12), 3671));
        assert_eq!(tx.destination(), socket.sent()[0].target);
    }

    #[test]
    fn test_transmit_partial_accept() {
        let mut mock = MockSocket::new();
        mock.set_send_limit(Some(3));
        let mut tx = MulticastTransmit::with_socket(mock, MulticastConfig::default()).unwrap();

        let data: Vec<u8> = (0..20).collect();
        tx.transmit(&data).unwrap();

        let socket = tx.socket().unwrap();
        assert_eq!(socket.sent().len(), 7);
        assert_eq!(socket.sent_bytes(), data);
    }

    #[test]
    fn test_transmit_stalled_socket() {
        let mut mock = MockSocket::new();
        mock.set_send_limit(Some(0));
        let mut tx = MulticastTransmit::with_socket(mock, MulticastConfig::default()).unwrap();

        let err = tx.transmit(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, KnxError::Transport(ref e) if e.is_send_failed()));
    }

    #[test]
    fn test_transmit_empty_frame_sends_nothing() {
        let mut tx = MulticastTransmit::with_socket(MockSocket::new(), MulticastConfig::default()).unwrap();
        tx.transmit(&[]).unwrap();
        assert!(tx.socket().unwrap().sent().is_empty());
    }

    #[test]
    fn test_transmit_after_close() {
        let mut tx = MulticastTransmit::with_socket(MockSocket::new(), MulticastConfig::default()).unwrap();
        tx.close();
        tx.close();
        assert!(tx.is_closed());
        assert!(tx.transmit(&[1]).is_err());
    }

    #[test]
    fn test_legacy_socket_without_destination() {
        let mut socket = MulticastSocket::with_socket(MockSocket::new(), MulticastConfig::default(), None).unwrap();
        let err = socket.transmit(&[1, 2]).unwrap_err();
        assert!(err.is_validation_error());

        socket.join_group(Ipv4Addr::new(224, 0, 23, 12)).unwrap();
        assert!(socket.receive().unwrap_err().is_timeout());
    }

    #[test]
    fn test_legacy_socket_sender() {
        let destination = SocketAddrV4::new(Ipv4Addr::new(224, 0, 23, 12), 3671);
        let mut mock = MockSocket::new();
        mock.set_send_limit(Some(1));
        let mut socket = MulticastSocket::with_socket(mock, MulticastConfig::default(), Some(destination)).unwrap();
        assert_eq!(socket.destination(), Some(destination));

        socket.transmit(&[9, 8, 7]).unwrap();
        assert_eq!(socket.socket().unwrap().sent_bytes(), vec![9, 8, 7]);

        socket.close();
        assert!(socket.is_closed());
    }

    #[test]
    fn test_legacy_socket_unicast_destination() {
        let destination = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 3671);
        let err = MulticastSocket::with_socket(MockSocket::new(), MulticastConfig::default(), Some(destination))
            .unwrap_err();
        assert!(err.is_validation_error());
    }
}
