//! DPT 5.xxx - 8-bit Unsigned Value (1 byte)
//!
//! 8-bit unsigned datapoint types carry a raw value from 0 to 255. The word
//! needs more than 6 bits, so the byte always follows the APCI instead of
//! travelling inline.
//!
//! ## Format
//!
//! - 8 bits: unsigned value (0-255)
//!
//! ## Subtypes
//!
//! - **5.004** - Percentage 0-255 (%)
//! - **5.005** - Ratio (0-255)
//! - **5.006** - Tariff (0-254)
//! - **5.010** - Counter pulses (0-255)
//!
//! ## Example
//!
//! ```rust
//! use knx_fieldbus::dpt::{Dpt5, DptConverter};
//!
//! let mut tariff = DptConverter::<Dpt5>::new(&Dpt5::TARIFF);
//! tariff.set_value(3)?;
//! assert_eq!(tariff.frame()?.as_slice(), &[0x03]);
//! assert!(tariff.set_value(255).is_err());
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use core::fmt::{self, Write};

use super::{Dpt, DptCodec, DptId};

/// Codec for DPT main type 5 (8-bit unsigned, unscaled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dpt5;

impl Dpt5 {
    /// DPT 5.xxx - Generic
    pub const GENERIC: Dpt<u8> = Dpt::new(DptId::generic(5), "Generic", (0, 255), None);
    /// DPT 5.004 - Percentage 0-255 (%)
    pub const PERCENT_U8: Dpt<u8> = Dpt::new(DptId::new(5, 4), "Percent (0..255)", (0, 255), Some("%"));
    /// DPT 5.005 - Ratio (0-255)
    pub const RATIO: Dpt<u8> = Dpt::new(DptId::new(5, 5), "Ratio", (0, 255), None);
    /// DPT 5.006 - Tariff (0-254)
    pub const TARIFF: Dpt<u8> = Dpt::new(DptId::new(5, 6), "Tariff", (0, 254), None);
    /// DPT 5.010 - Counter pulses (0-255)
    pub const COUNTER: Dpt<u8> = Dpt::new(DptId::new(5, 10), "Counter pulses", (0, 255), Some("pulses"));

    const DESCRIPTORS: &'static [&'static Dpt<u8>] = &[
        &Self::GENERIC,
        &Self::PERCENT_U8,
        &Self::RATIO,
        &Self::TARIFF,
        &Self::COUNTER,
    ];
}

impl DptCodec for Dpt5 {
    type Value = u8;

    const MAIN: u16 = 5;
    const DATA_BITS: u32 = 8;
    const FRAME_SIZE: usize = 1;

    fn descriptors() -> &'static [&'static Dpt<u8>] {
        Self::DESCRIPTORS
    }

    #[inline]
    fn decode(data: u32) -> u8 {
        (data & 0xFF) as u8
    }

    #[inline]
    fn encode(value: u8) -> u32 {
        u32::from(value)
    }

    fn write_value<W: Write>(_dpt: &Dpt<u8>, value: u8, out: &mut W) -> fmt::Result {
        write!(out, "{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpt::DptConverter;

    #[test]
    fn test_direct_mapping() {
        let mut conv = DptConverter::<Dpt5>::new(&Dpt5::RATIO);
        for value in [0u8, 1, 127, 255] {
            conv.set_value(value).unwrap();
            assert_eq!(conv.data().unwrap(), u32::from(value));
            assert_eq!(conv.frame().unwrap().as_slice(), &[value]);
        }
    }

    #[test]
    fn test_tariff_limit() {
        let mut conv = DptConverter::<Dpt5>::new(&Dpt5::TARIFF);
        assert!(conv.set_value(254).is_ok());
        assert!(conv.set_value(255).unwrap_err().is_range_error());
        assert_eq!(conv.value().unwrap(), 254);
    }

    #[test]
    fn test_data_domain() {
        let mut conv = DptConverter::<Dpt5>::new(&Dpt5::GENERIC);
        assert!(conv.set_data(0xFF).is_ok());
        assert!(conv.set_data(0x100).unwrap_err().is_range_error());
    }

    #[test]
    fn test_value_as_text() {
        let mut conv = DptConverter::<Dpt5>::new(&Dpt5::COUNTER);
        conv.set_frame(&[42]).unwrap();
        assert_eq!(conv.value_as_text().unwrap().as_str(), "42 pulses");

        let mut conv = DptConverter::<Dpt5>::new(&Dpt5::PERCENT_U8);
        conv.set_value(200).unwrap();
        assert_eq!(conv.value_as_text().unwrap().as_str(), "200 %");
    }

    #[test]
    fn test_apdu_size() {
        assert_eq!(Dpt5::APDU_SIZE, 1);
    }
}
