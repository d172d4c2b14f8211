//! KNX frame priority.
//!
//! Every telegram carries a 2-bit priority in control field 1 of its cEMI
//! frame. The four levels convert both ways between their canonical name
//! and their wire code:
//!
//! | name     | code |
//! |----------|------|
//! | `system` | 0    |
//! | `normal` | 1    |
//! | `urgent` | 2    |
//! | `low`    | 3    |
//!
//! No ordering is defined on [`Priority`]: the numeric codes do not follow
//! the bus arbitration order, so comparing them would be misleading.

use core::fmt;
use core::str::FromStr;

use crate::error::{KnxError, Result};

/// KNX message priority levels
///
/// # Examples
///
/// ```
/// use knx_fieldbus::Priority;
///
/// let prio: Priority = "normal".parse().unwrap();
/// assert_eq!(prio.level(), 1);
/// assert_eq!(Priority::try_from(1u8).unwrap().name(), "normal");
/// assert!(Priority::try_from(15u8).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum Priority {
    /// System priority
    System = 0b00,
    /// Normal priority
    Normal = 0b01,
    /// Urgent priority
    Urgent = 0b10,
    /// Low priority (default)
    #[default]
    Low = 0b11,
}

impl Priority {
    /// All levels, in code order.
    pub const ALL: [Priority; 4] = [Self::System, Self::Normal, Self::Urgent, Self::Low];

    /// Look a priority up by its canonical name.
    ///
    /// # Errors
    ///
    /// Any name other than `system`, `normal`, `urgent` or `low` is a
    /// validation error.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|prio| prio.name() == name)
            .ok_or_else(KnxError::unknown_priority_name)
    }

    /// Look a priority up by its 2-bit code.
    ///
    /// # Errors
    ///
    /// Codes above 3 are a validation error.
    pub fn from_level(level: u8) -> Result<Self> {
        match level {
            0b00..=0b11 => Ok(Self::from_bits(level)),
            _ => Err(KnxError::priority_out_of_range()),
        }
    }

    /// Decode the priority bits of a control field, ignoring higher bits.
    #[inline(always)]
    pub(crate) const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::System,
            0b01 => Self::Normal,
            0b10 => Self::Urgent,
            _ => Self::Low,
        }
    }

    /// Wire code (0-3).
    #[inline(always)]
    pub const fn level(self) -> u8 {
        self as u8
    }

    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Priority {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl TryFrom<u8> for Priority {
    type Error = KnxError;

    fn try_from(level: u8) -> Result<Self> {
        Self::from_level(level)
    }
}

impl From<Priority> for u8 {
    #[inline(always)]
    fn from(prio: Priority) -> u8 {
        prio.level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Priority::from_name("normal").unwrap().level(), 1);
        assert_eq!("system".parse::<Priority>().unwrap(), Priority::System);
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
    }

    #[test]
    fn test_from_level() {
        assert_eq!(Priority::from_level(1).unwrap().name(), "normal");
        assert_eq!(Priority::try_from(2u8).unwrap(), Priority::Urgent);
    }

    #[test]
    fn test_invalid_inputs() {
        let err = Priority::from_name("dummy").unwrap_err();
        assert!(err.is_validation_error());
        assert!(matches!(err, KnxError::Validation(ref e) if e.is_invalid_priority()));

        let err = Priority::from_level(15).unwrap_err();
        assert!(err.is_validation_error());

        // Names are case-sensitive
        assert!(Priority::from_name("Normal").is_err());
        assert!(Priority::from_name("").is_err());
    }

    #[test]
    fn test_bijection() {
        for code in 0u8..=3 {
            let prio = Priority::from_level(code).unwrap();
            assert_eq!(prio.level(), code);
            assert_eq!(Priority::from_name(prio.name()).unwrap(), prio);
        }
    }

    #[test]
    fn test_from_bits_masks() {
        assert_eq!(Priority::from_bits(0b0111), Priority::Low);
        assert_eq!(Priority::from_bits(0b0100), Priority::System);
    }

    #[test]
    fn test_display_and_default() {
        assert_eq!(Priority::Urgent.to_string(), "urgent");
        assert_eq!(Priority::default(), Priority::Low);
        assert_eq!(u8::from(Priority::Low), 3);
    }
}
