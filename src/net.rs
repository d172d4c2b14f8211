//! Network layer for the emulated KNX bus.
//!
//! KNXnet/IP routing puts every bus telegram on one UDP multicast group. The
//! submodules split that into:
//!
//! - [`socket`]: the [`DatagramSocket`](socket::DatagramSocket) seam between
//!   the transport and the OS (or a test double)
//! - [`multicast`]: receive and transmit roles over an owned socket
//! - [`mock_transport`]: an in-memory socket for tests
//!
//! Only the address helpers below are available without `std`.

pub use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::error::{KnxError, Result};

pub mod socket;

#[cfg(feature = "std")]
pub mod mock_transport;
#[cfg(feature = "std")]
pub mod multicast;

/// Reject addresses outside 224.0.0.0-239.255.255.255.
///
/// # Examples
///
/// ```
/// use knx_fieldbus::net::{ensure_multicast, Ipv4Addr};
///
/// assert!(ensure_multicast(Ipv4Addr::new(224, 0, 23, 12)).is_ok());
/// assert!(ensure_multicast(Ipv4Addr::new(10, 0, 0, 1)).is_err());
/// ```
pub fn ensure_multicast(addr: Ipv4Addr) -> Result<()> {
    if addr.is_multicast() {
        Ok(())
    } else {
        Err(KnxError::not_multicast())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multicast_range_bounds() {
        assert!(ensure_multicast(Ipv4Addr::new(224, 0, 0, 0)).is_ok());
        assert!(ensure_multicast(Ipv4Addr::new(239, 255, 255, 255)).is_ok());
        assert!(ensure_multicast(Ipv4Addr::new(223, 255, 255, 255)).is_err());
        assert!(ensure_multicast(Ipv4Addr::new(240, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_unicast_is_validation_error() {
        let err = ensure_multicast(Ipv4Addr::new(10, 0, 0, 1)).unwrap_err();
        assert!(err.is_validation_error());
        assert!(matches!(err, KnxError::Validation(ref e) if e.is_not_multicast()));
    }
}
