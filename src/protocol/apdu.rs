//! Application layer PDU (APDU) codec for group communication.
//!
//! A group-value APDU always starts with the 10-bit APCI spread over its
//! first two bytes. Payloads of 6 bits or less are OR'd into the low bits of
//! byte 1; anything wider follows from byte 2 onward:
//!
//! ```text
//! inline:   [ apci >> 8 ][ apci & 0xFF | value6 ]
//! explicit: [ apci >> 8 ][ apci & 0xFF ][ data... ]
//! ```
//!
//! The codec is stateless and never allocates: frames live in fixed-capacity
//! [`heapless::Vec`] buffers.
//!
//! ## Example
//!
//! ```rust
//! use knx_fieldbus::protocol::apdu::{Apci, Apdu};
//!
//! let apdu = Apdu::group_value(Apci::GroupValueWrite, &[0x0C, 0x33], 2)?;
//! assert_eq!(apdu.as_slice(), &[0x00, 0x80, 0x0C, 0x33]);
//! assert_eq!(Apdu::group_value_data(&apdu)?.as_slice(), &[0x0C, 0x33]);
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use crate::error::{KnxError, Result};
use crate::protocol::constants::MAX_APDU_SIZE;

/// Largest payload an APDU can carry after its APCI bytes.
pub const MAX_APDU_DATA: usize = MAX_APDU_SIZE - 2;

/// Encoded APDU.
pub type ApduBuffer = heapless::Vec<u8, MAX_APDU_SIZE>;

/// Payload extracted from an APDU.
pub type ApduData = heapless::Vec<u8, MAX_APDU_DATA>;

/// APCI (Application Layer Protocol Control Information)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Apci {
    /// Group Value Read (`A_GroupValue_Read`)
    GroupValueRead,
    /// Group Value Response (`A_GroupValue_Response`)
    GroupValueResponse,
    /// Group Value Write (`A_GroupValue_Write`)
    GroupValueWrite,
    /// Any other service (management, memory, ...)
    Other(u16),
}

impl Apci {
    /// Parse the APCI from the first two APDU bytes.
    ///
    /// The 6 low bits of `byte2` may hold inline data and are ignored unless
    /// the service is not a group-value one.
    pub const fn from_bytes(byte1: u8, byte2: u8) -> Self {
        let apci = ((byte1 as u16 & 0x03) << 8) | (byte2 as u16 & 0xC0);

        match apci {
            0x000 => Self::GroupValueRead,
            0x040 => Self::GroupValueResponse,
            0x080 => Self::GroupValueWrite,
            _ => Self::Other(((byte1 as u16 & 0x03) << 8) | byte2 as u16),
        }
    }

    /// 10-bit service code.
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::GroupValueRead => 0x000,
            Self::GroupValueResponse => 0x040,
            Self::GroupValueWrite => 0x080,
            Self::Other(val) => val,
        }
    }

    /// `true` for read, response and write.
    pub const fn is_group_value(self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Builder/parser for group-value APDUs.
#[derive(Debug, Clone, Copy)]
pub struct Apdu;

impl Apdu {
    /// Build a group-value APDU.
    ///
    /// With `size == 0` the single byte in `data` travels inline and must fit
    /// in 6 bits. Otherwise `data` must be exactly `size` bytes long and is
    /// appended after the APCI.
    ///
    /// # Errors
    ///
    /// Format errors for a service other than read/response/write, a payload
    /// that does not match `size`, an inline value above `0x3F`, or a payload
    /// longer than a standard frame can carry.
    pub fn group_value(apci: Apci, data: &[u8], size: usize) -> Result<ApduBuffer> {
        if !apci.is_group_value() {
            return Err(KnxError::unsupported_apci());
        }

        let code = apci.to_u16().to_be_bytes();
        let mut apdu = ApduBuffer::new();

        if size == 0 {
            let value = match data {
                [value] if value & 0x3F == *value => *value,
                _ => return Err(KnxError::payload_mismatch()),
            };
            apdu.extend_from_slice(&[code[0], code[1] | value])
                .map_err(|_| KnxError::payload_too_large())?;
        } else {
            if data.len() != size {
                return Err(KnxError::payload_mismatch());
            }
            apdu.extend_from_slice(&code)
                .map_err(|_| KnxError::payload_too_large())?;
            apdu.extend_from_slice(data)
                .map_err(|_| KnxError::payload_too_large())?;
        }

        Ok(apdu)
    }

    /// Build a `GroupValueRead` APDU (no payload, inline zero).
    pub fn group_value_read() -> ApduBuffer {
        let mut apdu = ApduBuffer::new();
        // Two bytes always fit
        let _ = apdu.extend_from_slice(&[0x00, 0x00]);
        apdu
    }

    /// Extract the payload of a group-value APDU.
    ///
    /// APDUs longer than 2 bytes yield everything from byte 2; 2-byte APDUs
    /// yield the inline value as a single byte. The service code is not
    /// checked, see [`Apdu::apci`].
    ///
    /// # Errors
    ///
    /// Format error if the APDU is shorter than 2 bytes or its payload does
    /// not fit a standard frame.
    pub fn group_value_data(apdu: &[u8]) -> Result<ApduData> {
        match apdu {
            [_, _, payload @ ..] if !payload.is_empty() => {
                ApduData::from_slice(payload).map_err(|_| KnxError::payload_too_large())
            }
            [_, byte1] => {
                let mut data = ApduData::new();
                let _ = data.push(byte1 & 0x3F);
                Ok(data)
            }
            _ => Err(KnxError::invalid_frame()),
        }
    }

    /// Service code of an APDU.
    ///
    /// # Errors
    ///
    /// Format error if the APDU is shorter than 2 bytes.
    pub fn apci(apdu: &[u8]) -> Result<Apci> {
        match apdu {
            [byte1, byte2, ..] => Ok(Apci::from_bytes(*byte1, *byte2)),
            _ => Err(KnxError::invalid_frame()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICES: [Apci; 3] = [Apci::GroupValueRead, Apci::GroupValueResponse, Apci::GroupValueWrite];

    #[test]
    fn test_inline_value() {
        let apdu = Apdu::group_value(Apci::GroupValueWrite, &[0x01], 0).unwrap();
        assert_eq!(apdu.as_slice(), &[0x00, 0x81]);
        assert_eq!(Apdu::group_value_data(&apdu).unwrap().as_slice(), &[0x01]);
    }

    #[test]
    fn test_inline_round_trip() {
        for service in SERVICES {
            for value in 0u8..=0x3F {
                let apdu = Apdu::group_value(service, &[value], 0).unwrap();
                assert_eq!(apdu.len(), 2);
                assert_eq!(Apdu::apci(&apdu).unwrap(), service);
                assert_eq!(Apdu::group_value_data(&apdu).unwrap().as_slice(), &[value]);
            }
        }
    }

    #[test]
    fn test_inline_value_too_wide() {
        let err = Apdu::group_value(Apci::GroupValueWrite, &[0x40], 0).unwrap_err();
        assert!(err.is_format_error());
        let err = Apdu::group_value(Apci::GroupValueWrite, &[0xFF], 0).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_inline_needs_exactly_one_byte() {
        assert!(Apdu::group_value(Apci::GroupValueWrite, &[], 0).unwrap_err().is_format_error());
        assert!(Apdu::group_value(Apci::GroupValueWrite, &[0x01, 0x02], 0)
            .unwrap_err()
            .is_format_error());
    }

    #[test]
    fn test_explicit_round_trip() {
        let payloads: [&[u8]; 3] = [&[0xA5], &[0x0C, 0x38], &[0xDE, 0xAD, 0xBE, 0xEF]];
        for service in SERVICES {
            for data in payloads {
                let apdu = Apdu::group_value(service, data, data.len()).unwrap();
                assert_eq!(apdu.len(), 2 + data.len());
                assert_eq!(&apdu[..2], &service.to_u16().to_be_bytes());
                assert_eq!(Apdu::group_value_data(&apdu).unwrap().as_slice(), data);
            }
        }
    }

    #[test]
    fn test_explicit_size_mismatch() {
        let err = Apdu::group_value(Apci::GroupValueResponse, &[0x01, 0x02], 4).unwrap_err();
        assert!(matches!(err, KnxError::Protocol(ref e) if e.is_payload_mismatch()));
    }

    #[test]
    fn test_payload_too_large() {
        let data = [0u8; MAX_APDU_DATA + 1];
        assert!(Apdu::group_value(Apci::GroupValueWrite, &data, data.len())
            .unwrap_err()
            .is_format_error());

        let data = [0u8; MAX_APDU_DATA];
        assert!(Apdu::group_value(Apci::GroupValueWrite, &data, data.len()).is_ok());
    }

    #[test]
    fn test_unsupported_service() {
        let err = Apdu::group_value(Apci::Other(0x0C0), &[0x00], 0).unwrap_err();
        assert!(matches!(err, KnxError::Protocol(ref e) if e.is_unsupported_apci()));
    }

    #[test]
    fn test_group_value_read() {
        let apdu = Apdu::group_value_read();
        assert_eq!(apdu.as_slice(), &[0x00, 0x00]);
        assert_eq!(Apdu::apci(&apdu).unwrap(), Apci::GroupValueRead);
    }

    #[test]
    fn test_parse_short_apdu() {
        assert!(Apdu::group_value_data(&[]).unwrap_err().is_format_error());
        assert!(Apdu::group_value_data(&[0x00]).unwrap_err().is_format_error());
        assert!(Apdu::apci(&[0x00]).unwrap_err().is_format_error());
    }

    #[test]
    fn test_apci_parse() {
        assert_eq!(Apci::from_bytes(0x00, 0x00), Apci::GroupValueRead);
        assert_eq!(Apci::from_bytes(0x00, 0x40), Apci::GroupValueResponse);
        assert_eq!(Apci::from_bytes(0x00, 0x80), Apci::GroupValueWrite);
        // Inline data bits do not change the service
        assert_eq!(Apci::from_bytes(0x00, 0xBF), Apci::GroupValueWrite);
        // Memory read
        assert_eq!(Apci::from_bytes(0x02, 0x00), Apci::Other(0x200));
    }
}
