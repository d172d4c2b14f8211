//! Datagram socket abstraction for the multicast transport.
//!
//! The transport roles in [`multicast`](super::multicast) never touch the OS
//! directly. They own something implementing [`DatagramSocket`], which is a
//! [`std::net::UdpSocket`] in production and a
//! [`MockSocket`](super::mock_transport::MockSocket) in tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use knx_fieldbus::config::MulticastConfig;
//! use knx_fieldbus::net::socket::{open_receive_socket, DatagramSocket};
//!
//! let config = MulticastConfig::default();
//! let mut socket = open_receive_socket(&config)?;
//! socket.join_multicast(config.multicast_address, config.local_address)?;
//!
//! let mut buf = [0u8; 1024];
//! let (len, sender) = socket.recv_from(&mut buf)?;
//! println!("{len} bytes from {sender}");
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::error::Result;

/// UDP-like datagram socket.
///
/// Implementations send whole datagrams where they can but may accept fewer
/// bytes than offered; callers loop on [`DatagramSocket::send_to`] until the
/// frame is written.
pub trait DatagramSocket {
    /// Send `data` to `target`, returning how many bytes were accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying socket rejects the datagram.
    fn send_to(&mut self, data: &[u8], target: SocketAddrV4) -> Result<usize>;

    /// Receive one datagram into `buf`.
    ///
    /// # Errors
    ///
    /// [`KnxError::Timeout`](crate::KnxError::Timeout) when nothing arrived
    /// within the socket read timeout.
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr)>;

    /// Join `group` on the interface identified by `interface`.
    ///
    /// # Errors
    ///
    /// Returns an error if the membership request fails.
    fn join_multicast(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> Result<()>;

    /// Leave `group` on the interface identified by `interface`.
    ///
    /// # Errors
    ///
    /// Returns an error if the membership drop fails.
    fn leave_multicast(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> Result<()>;
}

#[cfg(feature = "std")]
pub use self::udp::{open_receive_socket, open_transmit_socket};

#[cfg(feature = "std")]
mod udp {
    use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
    use std::net::UdpSocket;

    use socket2::{Domain, Protocol, Socket, Type};

    use super::DatagramSocket;
    use crate::config::MulticastConfig;
    use crate::error::Result;

    impl DatagramSocket for UdpSocket {
        fn send_to(&mut self, data: &[u8], target: SocketAddrV4) -> Result<usize> {
            Ok(UdpSocket::send_to(self, data, target)?)
        }

        fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
            Ok(UdpSocket::recv_from(self, buf)?)
        }

        fn join_multicast(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> Result<()> {
            Ok(self.join_multicast_v4(&group, &interface)?)
        }

        fn leave_multicast(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> Result<()> {
            Ok(self.leave_multicast_v4(&group, &interface)?)
        }
    }

    /// Socket for the receive role.
    ///
    /// Bound to the wildcard address on the multicast port so datagrams for
    /// any joined group are delivered. Outgoing multicast (if any) leaves
    /// through `config.local_address`. No group is joined yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created, configured or bound.
    pub fn open_receive_socket(config: &MulticastConfig) -> Result<UdpSocket> {
        let socket = new_socket(config)?;
        socket.set_multicast_if_v4(&config.local_address)?;
        bind(socket, SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port), config)
    }

    /// Socket for the transmit role, bound to `local_address:local_port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created, configured or bound.
    pub fn open_transmit_socket(config: &MulticastConfig) -> Result<UdpSocket> {
        let socket = new_socket(config)?;
        if !config.local_address.is_unspecified() {
            socket.set_multicast_if_v4(&config.local_address)?;
        }
        bind(
            socket,
            SocketAddrV4::new(config.local_address, config.local_port),
            config,
        )
    }

    fn new_socket(config: &MulticastConfig) -> Result<Socket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        reuse_port(&socket);
        socket.set_multicast_ttl_v4(config.ttl)?;
        socket.set_multicast_loop_v4(config.loopback)?;
        Ok(socket)
    }

    fn bind(socket: Socket, addr: SocketAddrV4, config: &MulticastConfig) -> Result<UdpSocket> {
        socket.bind(&addr.into())?;
        socket.set_read_timeout(Some(config.timeout))?;

        crate::knx_log!(
            debug,
            "UDP socket bound to {} (ttl={}, loop={})",
            addr,
            config.ttl,
            config.loopback
        );
        Ok(socket.into())
    }

    // SO_REUSEPORT lets several processes on one host share the bus port.
    // Not every platform has it, so a failure only gets logged.
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    fn reuse_port(socket: &Socket) {
        if let Err(e) = socket.set_reuse_port(true) {
            crate::knx_log!(debug, "SO_REUSEPORT unavailable: {}", e);
        }
    }

    #[cfg(not(all(unix, not(any(target_os = "solaris", target_os = "illumos")))))]
    fn reuse_port(_socket: &Socket) {}

}
