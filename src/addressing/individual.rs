//! KNX Individual Address implementation.
//!
//! Individual addresses identify single devices: Area.Line.Device
//! (4/4/8 bits), e.g. `1.1.5`. A transceiver stamps its own individual
//! address as the source of every telegram it emits.

use crate::error::{KnxError, Result};
use core::fmt;

/// KNX Individual Address (Area.Line.Device)
///
/// # Examples
///
/// ```
/// use knx_fieldbus::IndividualAddress;
///
/// let addr: IndividualAddress = "1.1.5".parse().unwrap();
/// assert_eq!(u16::from(addr), 0x1105);
/// assert_eq!(addr.to_string(), "1.1.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndividualAddress {
    raw: u16,
}

impl IndividualAddress {
    /// Maximum area value (4 bits)
    pub const MAX_AREA: u8 = 15;
    /// Maximum line value (4 bits)
    pub const MAX_LINE: u8 = 15;

    /// Create a new Individual Address from components.
    ///
    /// # Errors
    ///
    /// Returns an addressing error if area or line exceed 4 bits.
    pub fn new(area: u8, line: u8, device: u8) -> Result<Self> {
        if area > Self::MAX_AREA || line > Self::MAX_LINE {
            return Err(KnxError::address_out_of_range());
        }
        let raw = (u16::from(area) << 12) | (u16::from(line) << 8) | u16::from(device);
        Ok(Self { raw })
    }

    /// Get the raw u16 representation of the address.
    #[inline(always)]
    pub const fn raw(self) -> u16 {
        self.raw
    }

    /// Area component (0-15).
    #[inline(always)]
    pub const fn area(self) -> u8 {
        ((self.raw >> 12) & 0x0F) as u8
    }

    /// Line component (0-15).
    #[inline(always)]
    pub const fn line(self) -> u8 {
        ((self.raw >> 8) & 0x0F) as u8
    }

    /// Device component (0-255).
    #[inline(always)]
    pub const fn device(self) -> u8 {
        (self.raw & 0xFF) as u8
    }

    /// Big-endian wire form.
    #[inline(always)]
    pub const fn to_bytes(self) -> [u8; 2] {
        self.raw.to_be_bytes()
    }
}

impl fmt::Display for IndividualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area(), self.line(), self.device())
    }
}

impl From<u16> for IndividualAddress {
    #[inline(always)]
    fn from(raw: u16) -> Self {
        Self { raw }
    }
}

impl From<IndividualAddress> for u16 {
    #[inline(always)]
    fn from(addr: IndividualAddress) -> u16 {
        addr.raw
    }
}

impl core::str::FromStr for IndividualAddress {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u8>().ok())
                .ok_or_else(KnxError::invalid_individual_address)
        };

        let (area, line, device) = (next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(KnxError::invalid_individual_address());
        }
        Self::new(area, line, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        let addr = IndividualAddress::new(1, 2, 3).unwrap();
        assert_eq!((addr.area(), addr.line(), addr.device()), (1, 2, 3));
        assert_eq!(addr.raw(), 0x1203);
        assert_eq!(addr.to_bytes(), [0x12, 0x03]);
    }

    #[test]
    fn test_out_of_range() {
        assert!(IndividualAddress::new(16, 0, 0).is_err());
        assert!(IndividualAddress::new(0, 16, 0).is_err());
    }

    #[test]
    fn test_display_and_parse() {
        let addr: IndividualAddress = "15.15.255".parse().unwrap();
        assert_eq!(u16::from(addr), 0xFFFF);
        assert_eq!(addr.to_string(), "15.15.255");
    }

    #[test]
    fn test_from_str_invalid() {
        for text in ["", "1.2", "16.0.0", "1.2.3.4", "a.b.c", "1.1.256"] {
            assert!(text.parse::<IndividualAddress>().is_err(), "{text} should be rejected");
        }
    }
}
