//! Multicast transport configuration.
//!
//! Settings come from code (`Default` plus `with_*` builders), from a
//! `KEY=VALUE` text block, or, on hosted builds, from the process
//! environment. The recognised keys are:
//!
//! | key              | field               | default        |
//! |------------------|---------------------|----------------|
//! | `KNX_LOCAL_ADDR` | `local_address`     | `0.0.0.0`      |
//! | `KNX_MCAST_ADDR` | `multicast_address` | `224.0.23.12`  |
//! | `KNX_MCAST_PORT` | `port`              | `3671`         |
//! | `KNX_LOCAL_PORT` | `local_port`        | `0` (any)      |
//! | `KNX_TTL`        | `ttl`               | `32`           |
//! | `KNX_LOOP`       | `loopback`          | `true`         |
//! | `KNX_TIMEOUT_MS` | `timeout`           | `1000`         |
//!
//! ```rust
//! use knx_fieldbus::config::MulticastConfig;
//!
//! let config = MulticastConfig::parse(
//!     "
//!     ## bus emulation on the lab network
//!     KNX_LOCAL_ADDR=192.168.1.20
//!     KNX_TTL=4
//!     ",
//! )?;
//! assert_eq!(config.ttl, 4);
//! assert_eq!(config.port, 3671);
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use core::net::Ipv4Addr;
use core::time::Duration;

use crate::error::{KnxError, Result};
use crate::protocol::constants::{KNXNETIP_DEFAULT_PORT, KNXNETIP_MULTICAST_ADDR};

/// Default multicast TTL
pub const DEFAULT_TTL: u32 = 32;

/// Default receive timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default receive buffer size in bytes
pub const DEFAULT_RECEIVE_BUFFER: usize = 1024;

/// Socket settings shared by the receive and transmit roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastConfig {
    /// Interface used for multicast membership and outgoing datagrams
    pub local_address: Ipv4Addr,
    /// Multicast group the bus is emulated on
    pub multicast_address: Ipv4Addr,
    /// Multicast port (receive bind port and transmit destination port)
    pub port: u16,
    /// Local port of the transmit socket, 0 for any
    pub local_port: u16,
    /// `IP_MULTICAST_TTL`
    pub ttl: u32,
    /// `IP_MULTICAST_LOOP`
    pub loopback: bool,
    /// Longest a receive call blocks
    pub timeout: Duration,
    /// Largest datagram a receive call returns
    pub receive_buffer: usize,
}

impl Default for MulticastConfig {
    fn default() -> Self {
        Self {
            local_address: Ipv4Addr::UNSPECIFIED,
            multicast_address: KNXNETIP_MULTICAST_ADDR,
            port: KNXNETIP_DEFAULT_PORT,
            local_port: 0,
            ttl: DEFAULT_TTL,
            loopback: true,
            timeout: DEFAULT_TIMEOUT,
            receive_buffer: DEFAULT_RECEIVE_BUFFER,
        }
    }
}

impl MulticastConfig {
    /// Set the local interface address.
    #[must_use]
    pub fn with_local_address(mut self, local_address: Ipv4Addr) -> Self {
        self.local_address = local_address;
        self
    }

    /// Set the multicast group address.
    #[must_use]
    pub fn with_multicast_address(mut self, multicast_address: Ipv4Addr) -> Self {
        self.multicast_address = multicast_address;
        self
    }

    /// Set the multicast port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the local port of the transmit socket.
    #[must_use]
    pub fn with_local_port(mut self, local_port: u16) -> Self {
        self.local_port = local_port;
        self
    }

    /// Set the multicast TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable or disable loopback of our own datagrams.
    #[must_use]
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// Set the receive timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the receive buffer size.
    #[must_use]
    pub fn with_receive_buffer(mut self, receive_buffer: usize) -> Self {
        self.receive_buffer = receive_buffer;
        self
    }

    /// Check the settings before any socket is created.
    ///
    /// # Errors
    ///
    /// Validation error for a non-multicast group, a zero timeout (sockets
    /// would block forever) or an empty receive buffer.
    pub fn validate(&self) -> Result<()> {
        if !self.multicast_address.is_multicast() {
            return Err(KnxError::not_multicast());
        }
        if self.timeout.is_zero() || self.receive_buffer == 0 {
            return Err(KnxError::invalid_configuration());
        }
        Ok(())
    }

    /// Parse `KEY=VALUE` lines on top of the defaults.
    ///
    /// Blank lines and lines starting with `#` are skipped, unknown keys are
    /// ignored and the result is validated.
    ///
    /// # Errors
    ///
    /// Validation error for a line without `=`, a malformed value, or a
    /// configuration rejected by [`MulticastConfig::validate`].
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = Self::default();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(KnxError::invalid_configuration)?;
            config.apply(key.trim(), value.trim())?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Read the `KNX_*` environment variables on top of the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`MulticastConfig::parse`].
    #[cfg(feature = "std")]
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        for key in Self::KEYS {
            if let Ok(value) = std::env::var(key) {
                config.apply(key, value.trim())?;
            }
        }
        config.validate()?;
        Ok(config)
    }

    const KEYS: [&'static str; 7] = [
        "KNX_LOCAL_ADDR",
        "KNX_MCAST_ADDR",
        "KNX_MCAST_PORT",
        "KNX_LOCAL_PORT",
        "KNX_TTL",
        "KNX_LOOP",
        "KNX_TIMEOUT_MS",
    ];

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        fn parsed<T: core::str::FromStr>(value: &str) -> Result<T> {
            value.parse().map_err(|_| KnxError::invalid_configuration())
        }

        match key {
            "KNX_LOCAL_ADDR" => self.local_address = parsed(value)?,
            "KNX_MCAST_ADDR" => self.multicast_address = parsed(value)?,
            "KNX_MCAST_PORT" => self.port = parsed(value)?,
            "KNX_LOCAL_PORT" => self.local_port = parsed(value)?,
            "KNX_TTL" => self.ttl = parsed(value)?,
            "KNX_LOOP" => self.loopback = parse_flag(value)?,
            "KNX_TIMEOUT_MS" => self.timeout = Duration::from_millis(parsed(value)?),
            _ => {}
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(KnxError::invalid_configuration()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MulticastConfig::default();
        assert_eq!(config.multicast_address, Ipv4Addr::new(224, 0, 23, 12));
        assert_eq!(config.port, 3671);
        assert_eq!(config.ttl, 32);
        assert!(config.loopback);
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.receive_buffer, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = MulticastConfig::default()
            .with_local_address(Ipv4Addr::new(10, 0, 0, 2))
            .with_multicast_address(Ipv4Addr::new(239, 1, 2, 3))
            .with_port(4000)
            .with_local_port(4001)
            .with_ttl(1)
            .with_loopback(false)
            .with_timeout(Duration::from_millis(50))
            .with_receive_buffer(512);
        assert_eq!(config.local_address, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(config.multicast_address, Ipv4Addr::new(239, 1, 2, 3));
        assert_eq!((config.port, config.local_port, config.ttl), (4000, 4001, 1));
        assert!(!config.loopback);
        assert_eq!(config.timeout, Duration::from_millis(50));
        assert_eq!(config.receive_buffer, 512);
    }

    #[test]
    fn test_parse() {
        let config = MulticastConfig::parse(
            "KNX_LOCAL_ADDR=192.168.1.20\n\
             # comment\n\
             \n\
             KNX_MCAST_ADDR = 239.0.0.1\n\
             KNX_MCAST_PORT=3700\n\
             KNX_LOCAL_PORT=3701\n\
             KNX_TTL=4\n\
             KNX_LOOP=off\n\
             KNX_TIMEOUT_MS=250\n\
             WIFI_NETWORK=ignored\n",
        )
        .unwrap();

        assert_eq!(config.local_address, Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(config.multicast_address, Ipv4Addr::new(239, 0, 0, 1));
        assert_eq!(config.port, 3700);
        assert_eq!(config.local_port, 3701);
        assert_eq!(config.ttl, 4);
        assert!(!config.loopback);
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_malformed() {
        for text in [
            "KNX_TTL=many",
            "KNX_MCAST_PORT=70000",
            "KNX_LOCAL_ADDR=192.168.1",
            "KNX_LOOP=maybe",
            "KNX_TTL",
        ] {
            let err = MulticastConfig::parse(text).unwrap_err();
            assert!(err.is_validation_error(), "{text}");
        }
    }

    #[test]
    fn test_parse_rejects_unicast_group() {
        let err = MulticastConfig::parse("KNX_MCAST_ADDR=10.0.0.1").unwrap_err();
        assert!(matches!(err, KnxError::Validation(ref e) if e.is_not_multicast()));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(MulticastConfig::parse("KNX_TIMEOUT_MS=0").is_err());
        let config = MulticastConfig::default().with_receive_buffer(0);
        assert!(config.validate().unwrap_err().is_validation_error());
    }
}
