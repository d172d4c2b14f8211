//! In-memory socket for tests.
//!
//! [`MockSocket`] implements [`DatagramSocket`] without touching the network:
//! incoming datagrams are queued up front, sent bytes and group memberships
//! are recorded for inspection.
//!
//! ## Example
//!
//! ```rust
//! use knx_fieldbus::net::mock_transport::MockSocket;
//! use knx_fieldbus::net::socket::DatagramSocket;
//! use knx_fieldbus::net::{Ipv4Addr, SocketAddrV4};
//!
//! let mut mock = MockSocket::new();
//! mock.add_datagram(vec![0x06, 0x10], SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 7), 3671));
//!
//! let mut buf = [0u8; 16];
//! let (len, _) = mock.recv_from(&mut buf)?;
//! assert_eq!(&buf[..len], &[0x06, 0x10]);
//!
//! // Queue drained: the next receive times out
//! assert!(mock.recv_from(&mut buf).unwrap_err().is_timeout());
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use std::collections::VecDeque;

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::error::{KnxError, Result};
use crate::net::socket::DatagramSocket;

/// One accepted `send_to` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    /// Bytes accepted by this call
    pub data: Vec<u8>,
    /// Destination passed to `send_to`
    pub target: SocketAddrV4,
}

/// Mock datagram socket.
///
/// - Datagrams added with [`MockSocket::add_datagram`] are returned by
///   `recv_from()` in order; an empty queue behaves like a read timeout.
/// - [`MockSocket::set_send_limit`] caps how many bytes one `send_to()`
///   accepts, which exercises partial-send handling. A limit of 0 makes every
///   send accept nothing.
/// - Joined groups are tracked as `(group, interface)` pairs.
#[derive(Debug, Default)]
pub struct MockSocket {
    incoming: VecDeque<(Vec<u8>, SocketAddr)>,
    sent: Vec<SentDatagram>,
    send_limit: Option<usize>,
    memberships: Vec<(Ipv4Addr, Ipv4Addr)>,
}

impl MockSocket {
    /// Create an empty mock socket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a datagram for `recv_from()`.
    pub fn add_datagram(&mut self, data: impl Into<Vec<u8>>, from: SocketAddrV4) {
        self.incoming.push_back((data.into(), SocketAddr::V4(from)));
    }

    /// Datagrams still waiting to be received.
    pub fn pending(&self) -> usize {
        self.incoming.len()
    }

    /// Cap the bytes accepted per `send_to()` call (`None` accepts all).
    pub fn set_send_limit(&mut self, limit: Option<usize>) {
        self.send_limit = limit;
    }

    /// Every accepted `send_to()` call, oldest first.
    pub fn sent(&self) -> &[SentDatagram] {
        &self.sent
    }

    /// All bytes sent so far, concatenated.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent.iter().flat_map(|d| d.data.iter().copied()).collect()
    }

    /// Last accepted send, if any.
    pub fn last_sent(&self) -> Option<&SentDatagram> {
        self.sent.last()
    }

    /// Forget recorded sends.
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    /// Currently joined `(group, interface)` pairs.
    pub fn memberships(&self) -> &[(Ipv4Addr, Ipv4Addr)] {
        &self.memberships
    }

    /// `true` if `group` is joined on any interface.
    pub fn is_member(&self, group: Ipv4Addr) -> bool {
        self.memberships.iter().any(|(g, _)| *g == group)
    }
}

impl DatagramSocket for MockSocket {
    fn send_to(&mut self, data: &[u8], target: SocketAddrV4) -> Result<usize> {
        let accepted = self.send_limit.map_or(data.len(), |limit| limit.min(data.len()));
        if accepted > 0 {
            self.sent.push(SentDatagram {
                data: data[..accepted].to_vec(),
                target,
            });
        }
        Ok(accepted)
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let (data, from) = self.incoming.pop_front().ok_or(KnxError::Timeout)?;
        // Like UDP, the excess of an oversized datagram is dropped
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok((len, from))
    }

    fn join_multicast(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> Result<()> {
        if !self.memberships.contains(&(group, interface)) {
            self.memberships.push((group, interface));
        }
        Ok(())
    }

    fn leave_multicast(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> Result<()> {
        self.memberships.retain(|m| *m != (group, interface));
        Ok(())
    }
}
