//! KNX Group Address implementation.
//!
//! Group addresses are the multicast-style destinations of group telegrams.
//! Two notations exist for the same 16-bit value:
//! - 3-level: Main/Middle/Sub (5/3/8 bits), e.g. `1/2/3`
//! - 2-level: Main/Sub (5/11 bits), e.g. `1/515`

use crate::error::{KnxError, Result};
use core::fmt;

/// KNX Group Address
///
/// # Examples
///
/// ```
/// use knx_fieldbus::GroupAddress;
///
/// let addr = GroupAddress::new(1, 2, 3).unwrap();
/// assert_eq!(addr.to_string(), "1/2/3");
/// assert_eq!(u16::from(addr), 0x0A03);
///
/// let addr: GroupAddress = "1/515".parse().unwrap();
/// assert_eq!(addr, GroupAddress::new(1, 2, 3).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupAddress {
    raw: u16,
}

impl GroupAddress {
    /// Maximum main group value (5 bits)
    pub const MAX_MAIN: u8 = 31;
    /// Maximum middle group value (3 bits)
    pub const MAX_MIDDLE: u8 = 7;
    /// Maximum sub value for 2-level format (11 bits)
    pub const MAX_SUB_2LEVEL: u16 = 2047;

    /// Create a 3-level Group Address (Main/Middle/Sub).
    pub fn new(main: u8, middle: u8, sub: u8) -> Result<Self> {
        if main > Self::MAX_MAIN || middle > Self::MAX_MIDDLE {
            return Err(KnxError::address_out_of_range());
        }
        let raw = (u16::from(main) << 11) | (u16::from(middle) << 8) | u16::from(sub);
        Ok(Self { raw })
    }

    /// Create a 2-level Group Address (Main/Sub).
    pub fn new_2level(main: u8, sub: u16) -> Result<Self> {
        if main > Self::MAX_MAIN || sub > Self::MAX_SUB_2LEVEL {
            return Err(KnxError::address_out_of_range());
        }
        Ok(Self {
            raw: (u16::from(main) << 11) | sub,
        })
    }

    /// Get the raw u16 representation of the address.
    #[inline(always)]
    pub const fn raw(self) -> u16 {
        self.raw
    }

    /// Main group component (0-31).
    #[inline(always)]
    pub const fn main(self) -> u8 {
        ((self.raw >> 11) & 0x1F) as u8
    }

    /// Middle group component for 3-level format (0-7).
    #[inline(always)]
    pub const fn middle(self) -> u8 {
        ((self.raw >> 8) & 0x07) as u8
    }

    /// Sub group component for 3-level format (0-255).
    #[inline(always)]
    pub const fn sub(self) -> u8 {
        (self.raw & 0xFF) as u8
    }

    /// Sub group component for 2-level format (0-2047).
    #[inline(always)]
    pub const fn sub_2level(self) -> u16 {
        self.raw & 0x07FF
    }

    /// Big-endian wire form.
    #[inline(always)]
    pub const fn to_bytes(self) -> [u8; 2] {
        self.raw.to_be_bytes()
    }
}

impl From<u16> for GroupAddress {
    #[inline(always)]
    fn from(raw: u16) -> Self {
        Self { raw }
    }
}

impl From<GroupAddress> for u16 {
    #[inline(always)]
    fn from(addr: GroupAddress) -> u16 {
        addr.raw
    }
}

impl fmt::Display for GroupAddress {
    /// Formats with the 3-level notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.main(), self.middle(), self.sub())
    }
}

impl core::str::FromStr for GroupAddress {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        let mut next = || {
            parts
                .next()
                .map(|p| p.parse::<u16>().map_err(|_| KnxError::invalid_group_address()))
        };

        let main = next().ok_or_else(KnxError::invalid_group_address)??;
        let second = next().ok_or_else(KnxError::invalid_group_address)??;
        let third = next().transpose()?;
        if next().is_some() {
            return Err(KnxError::invalid_group_address());
        }

        let main = u8::try_from(main).map_err(|_| KnxError::address_out_of_range())?;
        match third {
            Some(sub) => {
                let middle = u8::try_from(second).map_err(|_| KnxError::address_out_of_range())?;
                let sub = u8::try_from(sub).map_err(|_| KnxError::address_out_of_range())?;
                Self::new(main, middle, sub)
            }
            None => Self::new_2level(main, second),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_3level() {
        let addr = GroupAddress::new(1, 2, 3).unwrap();
        assert_eq!((addr.main(), addr.middle(), addr.sub()), (1, 2, 3));
        assert_eq!(addr.raw(), 0x0A03);
        assert_eq!(addr.to_bytes(), [0x0A, 0x03]);
    }

    #[test]
    fn test_new_out_of_range() {
        assert!(GroupAddress::new(32, 0, 0).is_err());
        assert!(GroupAddress::new(0, 8, 0).is_err());
        assert!(GroupAddress::new_2level(0, 2048).is_err());
    }

    #[test]
    fn test_2level_shares_raw_value() {
        let addr = GroupAddress::new_2level(1, 515).unwrap();
        assert_eq!(addr, GroupAddress::new(1, 2, 3).unwrap());
        assert_eq!(addr.sub_2level(), 515);
    }

    #[test]
    fn test_display_and_parse() {
        let addr: GroupAddress = "31/7/255".parse().unwrap();
        assert_eq!(addr.to_string(), "31/7/255");
        assert_eq!(u16::from(addr), 0xFFFF);
    }

    #[test]
    fn test_from_str_invalid() {
        for text in ["", "1", "32/0/0", "1/8/0", "1/2/3/4", "a/b/c", "1/2048", "1/2/256"] {
            assert!(text.parse::<GroupAddress>().is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn test_ordering_follows_raw_value() {
        let low = GroupAddress::new(0, 0, 1).unwrap();
        let high = GroupAddress::new(1, 0, 0).unwrap();
        assert!(low < high);
    }
}
