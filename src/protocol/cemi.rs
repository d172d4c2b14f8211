//! Common External Message Interface (cEMI) adapter.
//!
//! cEMI is the frame a KNXnet/IP routing indication carries. For group
//! communication only the `L_Data` service matters: it wraps an APDU with the
//! source and destination addresses and the frame priority.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Message Code (1 byte)                    │
//! ├──────────────────────────────────────────┤
//! │ Additional Info Length (1 byte)          │
//! ├──────────────────────────────────────────┤
//! │ Additional Info (variable)               │
//! ├──────────────────────────────────────────┤
//! │ Service Information (L_Data)             │
//! │  ├─ Control Field 1 (1 byte)             │
//! │  ├─ Control Field 2 (1 byte)             │
//! │  ├─ Source Address (2 bytes)             │
//! │  ├─ Destination Address (2 bytes)        │
//! │  ├─ NPDU Length (1 byte)                 │
//! │  └─ APDU (NPDU Length + 1 bytes)         │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use knx_fieldbus::protocol::apdu::{Apci, Apdu};
//! use knx_fieldbus::protocol::cemi::{CEMIFrame, CemiFactory};
//! use knx_fieldbus::protocol::constants::CEMIMessageCode;
//! use knx_fieldbus::{GroupAddress, IndividualAddress, Priority};
//!
//! let apdu = Apdu::group_value(Apci::GroupValueWrite, &[0x01], 0)?;
//! let frame = CemiFactory::group_data(
//!     CEMIMessageCode::LDataInd,
//!     Priority::Normal,
//!     IndividualAddress::from(0x1101),
//!     GroupAddress::from(0x0A03),
//!     &apdu,
//! )?;
//!
//! let ldata = CEMIFrame::parse(&frame)?.as_ldata()?;
//! assert_eq!(ldata.destination_group(), Some(GroupAddress::from(0x0A03)));
//! assert_eq!(ldata.apdu, apdu.as_slice());
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use crate::addressing::{GroupAddress, IndividualAddress};
use crate::error::{KnxError, Result};
use crate::protocol::apdu::{Apci, Apdu};
use crate::protocol::constants::{CEMIMessageCode, MAX_APDU_SIZE, MAX_CEMI_SIZE};
use crate::protocol::priority::Priority;

/// Encoded cEMI frame.
pub type CemiBuffer = heapless::Vec<u8, MAX_CEMI_SIZE>;

/// Control Field 1 of `L_Data` frame
///
/// ```text
/// Bit 7: Frame Type (0=extended, 1=standard)
/// Bit 6: Reserved
/// Bit 5: Repeat (0=repeat, 1=do not repeat)
/// Bit 4: System Broadcast (0=system, 1=broadcast)
/// Bit 3-2: Priority (00=system, 01=normal, 10=urgent, 11=low)
/// Bit 1: Acknowledge Request (0=no ack, 1=ack requested)
/// Bit 0: Confirm (0=no error, 1=error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlField1 {
    raw: u8,
}

impl From<u8> for ControlField1 {
    #[inline(always)]
    fn from(raw: u8) -> Self {
        Self { raw }
    }
}

impl From<ControlField1> for u8 {
    #[inline(always)]
    fn from(ctrl: ControlField1) -> u8 {
        ctrl.raw
    }
}

impl ControlField1 {
    /// Get raw byte value
    #[inline(always)]
    pub const fn raw(self) -> u8 {
        self.raw
    }

    /// Check if frame is standard (true) or extended (false)
    #[inline(always)]
    pub const fn is_standard_frame(self) -> bool {
        (self.raw & 0x80) != 0
    }

    /// Check if repeat flag is set (do not repeat if true)
    #[inline(always)]
    pub const fn do_not_repeat(self) -> bool {
        (self.raw & 0x20) != 0
    }

    /// Check if this is a system broadcast
    #[inline(always)]
    pub const fn is_broadcast(self) -> bool {
        (self.raw & 0x10) != 0
    }

    /// Frame priority
    #[inline(always)]
    pub const fn priority(self) -> Priority {
        Priority::from_bits(self.raw >> 2)
    }

    /// Check if acknowledge is requested
    #[inline(always)]
    pub const fn ack_requested(self) -> bool {
        (self.raw & 0x02) != 0
    }

    /// Standard broadcast frame, repeats allowed, no ack request
    pub const fn with_priority(priority: Priority) -> Self {
        Self {
            raw: 0x80 | 0x10 | (priority.level() << 2),
        }
    }

    /// Same flags with the ack request bit set or cleared
    pub const fn with_ack_request(self, ack: bool) -> Self {
        if ack {
            Self { raw: self.raw | 0x02 }
        } else {
            Self { raw: self.raw & !0x02 }
        }
    }
}

impl Default for ControlField1 {
    #[inline]
    fn default() -> Self {
        // 0x94: standard frame, broadcast, normal priority
        Self::with_priority(Priority::Normal)
    }
}

/// Control Field 2 of `L_Data` frame
///
/// ```text
/// Bit 7: Destination Address Type (0=individual, 1=group)
/// Bit 6-4: Hop Count (0-7)
/// Bit 3-0: Extended Frame Format (0000=standard)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlField2 {
    raw: u8,
}

impl From<u8> for ControlField2 {
    #[inline(always)]
    fn from(raw: u8) -> Self {
        Self { raw }
    }
}

impl From<ControlField2> for u8 {
    #[inline(always)]
    fn from(ctrl: ControlField2) -> u8 {
        ctrl.raw
    }
}

impl ControlField2 {
    /// Hop count stamped on frames this crate emits
    pub const DEFAULT_HOP_COUNT: u8 = 6;

    /// Get raw byte value
    #[inline(always)]
    pub const fn raw(self) -> u8 {
        self.raw
    }

    /// Check if destination is group address (true) or individual (false)
    #[inline(always)]
    pub const fn is_group_address(self) -> bool {
        (self.raw & 0x80) != 0
    }

    /// Get hop count (0-7)
    #[inline(always)]
    pub const fn hop_count(self) -> u8 {
        (self.raw >> 4) & 0x07
    }

    /// Create a new Control Field 2 with standard frame format
    pub const fn new(is_group: bool, hop_count: u8) -> Self {
        let group = if is_group { 0x80 } else { 0x00 };
        Self {
            raw: group | ((hop_count & 0x07) << 4),
        }
    }
}

impl Default for ControlField2 {
    #[inline]
    fn default() -> Self {
        // 0xE0: group destination, hop count 6
        Self::new(true, Self::DEFAULT_HOP_COUNT)
    }
}

/// cEMI `L_Data` service information
///
/// Borrowed view over a received frame; the APDU is left encoded and can be
/// handed to [`Apdu::group_value_data`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LDataFrame<'a> {
    /// Control field 1
    pub ctrl1: ControlField1,
    /// Control field 2
    pub ctrl2: ControlField2,
    /// Source address (individual)
    pub source: IndividualAddress,
    /// Destination address (individual or group)
    pub destination_raw: u16,
    /// APDU, starting at the TPCI/APCI byte
    pub apdu: &'a [u8],
}

impl<'a> LDataFrame<'a> {
    /// Control fields, addresses and NPDU length
    pub const HEADER_SIZE: usize = 7;

    /// Header plus the two APCI bytes
    pub const MIN_SIZE: usize = Self::HEADER_SIZE + 2;

    /// Parse `L_Data` service information from bytes
    ///
    /// # Errors
    ///
    /// Format error if the buffer is shorter than the NPDU length announces,
    /// or if the NPDU length is zero (no room for the APCI).
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(KnxError::invalid_frame());
        }

        let npdu_length = usize::from(data[6]);
        if npdu_length == 0 {
            return Err(KnxError::invalid_frame());
        }
        let apdu_end = Self::HEADER_SIZE + npdu_length + 1;
        let apdu = data
            .get(Self::HEADER_SIZE..apdu_end)
            .ok_or_else(KnxError::invalid_frame)?;

        Ok(Self {
            ctrl1: ControlField1::from(data[0]),
            ctrl2: ControlField2::from(data[1]),
            source: IndividualAddress::from(u16::from_be_bytes([data[2], data[3]])),
            destination_raw: u16::from_be_bytes([data[4], data[5]]),
            apdu,
        })
    }

    /// Frame priority from control field 1
    #[inline(always)]
    pub const fn priority(&self) -> Priority {
        self.ctrl1.priority()
    }

    /// Get destination as group address (if applicable)
    #[inline]
    pub fn destination_group(&self) -> Option<GroupAddress> {
        self.ctrl2
            .is_group_address()
            .then(|| GroupAddress::from(self.destination_raw))
    }

    /// Get destination as individual address (if applicable)
    #[inline]
    pub fn destination_individual(&self) -> Option<IndividualAddress> {
        (!self.ctrl2.is_group_address()).then(|| IndividualAddress::from(self.destination_raw))
    }

    /// Service code of the carried APDU
    #[inline]
    pub fn apci(&self) -> Apci {
        // parse() guarantees at least two APDU bytes
        Apci::from_bytes(self.apdu[0], self.apdu[1])
    }
}

/// cEMI Frame wrapper
///
/// Represents a complete cEMI frame with message code and payload.
#[derive(Debug)]
pub struct CEMIFrame<'a> {
    message_code: CEMIMessageCode,
    data: &'a [u8],
}

impl<'a> CEMIFrame<'a> {
    /// Minimum cEMI frame size (message code + add info length)
    pub const MIN_SIZE: usize = 2;

    /// Parse a cEMI frame from bytes
    ///
    /// # Errors
    ///
    /// Format error if the buffer is too small or the message code is unknown.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(KnxError::invalid_frame());
        }

        let message_code =
            CEMIMessageCode::from_u8(data[0]).ok_or_else(KnxError::invalid_message_code)?;

        Ok(Self { message_code, data })
    }

    /// Get the message code
    #[inline(always)]
    pub const fn message_code(&self) -> CEMIMessageCode {
        self.message_code
    }

    /// Get additional info length
    #[inline(always)]
    pub fn additional_info_length(&self) -> u8 {
        self.data[1]
    }

    /// Service information, after message code and additional info
    pub fn service_info(&self) -> Result<&'a [u8]> {
        let service_start = 2 + usize::from(self.additional_info_length());
        self.data
            .get(service_start..)
            .ok_or_else(KnxError::invalid_frame)
    }

    /// Parse as `L_Data` frame (for `L_Data.req`, `L_Data.ind`, `L_Data.con`)
    ///
    /// # Errors
    ///
    /// Returns error if this is not an `L_Data` frame or parsing fails
    pub fn as_ldata(&self) -> Result<LDataFrame<'a>> {
        if !self.is_ldata() {
            return Err(KnxError::invalid_message_code());
        }
        LDataFrame::parse(self.service_info()?)
    }

    /// Check if this is an `L_Data` frame
    pub const fn is_ldata(&self) -> bool {
        self.message_code.is_ldata()
    }
}

/// Builds cEMI frames around APDUs.
#[derive(Debug, Clone, Copy)]
pub struct CemiFactory;

impl CemiFactory {
    /// Wrap an APDU into an `L_Data` frame addressed to a group.
    ///
    /// No additional info is emitted. Control field 1 carries `priority`
    /// with no ack request; control field 2 marks a group destination with
    /// hop count 6.
    ///
    /// # Errors
    ///
    /// Format errors for a non-`L_Data` message code or an APDU outside
    /// 2..=16 bytes.
    pub fn group_data(
        message_code: CEMIMessageCode,
        priority: Priority,
        source: IndividualAddress,
        destination: GroupAddress,
        apdu: &[u8],
    ) -> Result<CemiBuffer> {
        Self::group_data_with_ctrl(
            message_code,
            ControlField1::with_priority(priority),
            source,
            destination,
            apdu,
        )
    }

    /// Like [`CemiFactory::group_data`] with an explicit control field 1.
    pub fn group_data_with_ctrl(
        message_code: CEMIMessageCode,
        ctrl1: ControlField1,
        source: IndividualAddress,
        destination: GroupAddress,
        apdu: &[u8],
    ) -> Result<CemiBuffer> {
        if !message_code.is_ldata() {
            return Err(KnxError::invalid_message_code());
        }
        if apdu.len() > MAX_APDU_SIZE {
            return Err(KnxError::payload_too_large());
        }
        // Service code is checked for length only; routing by service is the
        // caller's business
        Apdu::apci(apdu)?;

        let src = source.to_bytes();
        let dst = destination.to_bytes();
        let header = [
            message_code.to_u8(),
            0x00,
            ctrl1.raw(),
            ControlField2::default().raw(),
            src[0],
            src[1],
            dst[0],
            dst[1],
            (apdu.len() - 1) as u8,
        ];

        let mut frame = CemiBuffer::new();
        frame
            .extend_from_slice(&header)
            .map_err(|_| KnxError::buffer_too_small())?;
        frame
            .extend_from_slice(apdu)
            .map_err(|_| KnxError::buffer_too_small())?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ga(raw: u16) -> GroupAddress {
        GroupAddress::from(raw)
    }

    #[test]
    fn test_control_field1_default() {
        let ctrl = ControlField1::default();
        assert_eq!(ctrl.raw(), 0x94);
        assert!(ctrl.is_standard_frame());
        assert!(!ctrl.do_not_repeat());
        assert!(ctrl.is_broadcast());
        assert_eq!(ctrl.priority(), Priority::Normal);
        assert!(!ctrl.ack_requested());
    }

    #[test]
    fn test_control_field1_raw() {
        // 0xBC = 0b10111100: standard, do not repeat, broadcast, low priority
        let ctrl = ControlField1::from(0xBCu8);
        assert!(ctrl.is_standard_frame());
        assert!(ctrl.do_not_repeat());
        assert!(ctrl.is_broadcast());
        assert_eq!(ctrl.priority(), Priority::Low);
        assert!(!ctrl.ack_requested());
    }

    #[test]
    fn test_control_field1_priorities() {
        for prio in Priority::ALL {
            assert_eq!(ControlField1::with_priority(prio).priority(), prio);
        }
        let ctrl = ControlField1::with_priority(Priority::System).with_ack_request(true);
        assert_eq!(ctrl.raw(), 0x92);
        assert_eq!(ctrl.with_ack_request(false).raw(), 0x90);
    }

    #[test]
    fn test_control_field2() {
        let ctrl = ControlField2::default();
        assert_eq!(ctrl.raw(), 0xE0);
        assert!(ctrl.is_group_address());
        assert_eq!(ctrl.hop_count(), 6);

        let ctrl = ControlField2::new(false, 5);
        assert!(!ctrl.is_group_address());
        assert_eq!(ctrl.hop_count(), 5);
    }

    #[test]
    fn test_group_data_layout() {
        let apdu = [0x00, 0x80, 0x0C, 0x33];
        let frame = CemiFactory::group_data(
            CEMIMessageCode::LDataInd,
            Priority::Low,
            IndividualAddress::from(0x1101),
            ga(0x0A03),
            &apdu,
        )
        .unwrap();

        assert_eq!(
            frame.as_slice(),
            &[0x29, 0x00, 0x9C, 0xE0, 0x11, 0x01, 0x0A, 0x03, 0x03, 0x00, 0x80, 0x0C, 0x33]
        );
    }

    #[test]
    fn test_group_data_round_trip() {
        let apdu = [0x00, 0x81];
        let frame = CemiFactory::group_data(
            CEMIMessageCode::LDataReq,
            Priority::Urgent,
            IndividualAddress::from(0x1203),
            ga(0x2E07),
            &apdu,
        )
        .unwrap();

        let cemi = CEMIFrame::parse(&frame).unwrap();
        assert_eq!(cemi.message_code(), CEMIMessageCode::LDataReq);
        let ldata = cemi.as_ldata().unwrap();
        assert_eq!(ldata.source, IndividualAddress::from(0x1203));
        assert_eq!(ldata.destination_group(), Some(ga(0x2E07)));
        assert_eq!(ldata.priority(), Priority::Urgent);
        assert_eq!(ldata.apci(), Apci::GroupValueWrite);
        assert_eq!(ldata.apdu, &apdu);
    }

    #[test]
    fn test_group_data_rejects_bad_input() {
        let src = IndividualAddress::from(0x1101);
        let err = CemiFactory::group_data(CEMIMessageCode::LBusmonInd, Priority::Low, src, ga(1), &[0, 0])
            .unwrap_err();
        assert!(err.is_format_error());

        let err = CemiFactory::group_data(CEMIMessageCode::LDataInd, Priority::Low, src, ga(1), &[0])
            .unwrap_err();
        assert!(err.is_format_error());

        let long = [0u8; MAX_APDU_SIZE + 1];
        let err = CemiFactory::group_data(CEMIMessageCode::LDataInd, Priority::Low, src, ga(1), &long)
            .unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_ldata_parse_group_write() {
        let data = [
            0xBC, // Control field 1
            0xE0, // Control field 2 (group address, hop count 6)
            0x11, 0x01, // Source: 1.1.1
            0x0A, 0x03, // Destination: 1/2/3
            0x01, // NPDU length
            0x00, // TPCI (unnumbered data)
            0x81, // APCI (group write) + 6-bit data (0x01)
        ];

        let frame = LDataFrame::parse(&data).unwrap();
        assert_eq!(frame.source, IndividualAddress::new(1, 1, 1).unwrap());
        assert_eq!(frame.destination_group(), Some(GroupAddress::new(1, 2, 3).unwrap()));
        assert_eq!(frame.destination_individual(), None);
        assert_eq!(frame.apci(), Apci::GroupValueWrite);
        assert_eq!(Apdu::group_value_data(frame.apdu).unwrap().as_slice(), &[0x01]);
    }

    #[test]
    fn test_ldata_parse_truncated() {
        // NPDU length announces 3 bytes after TPCI, only 1 present
        let data = [0xBC, 0xE0, 0x11, 0x01, 0x0A, 0x03, 0x03, 0x00, 0x80];
        assert!(LDataFrame::parse(&data).unwrap_err().is_format_error());

        let data = [0xBC, 0xE0, 0x11];
        assert!(LDataFrame::parse(&data).unwrap_err().is_format_error());
    }

    #[test]
    fn test_ldata_parse_zero_npdu_length() {
        // Enough bytes on the wire, but the length field leaves one APDU byte
        let data = [0xBC, 0xE0, 0x11, 0x01, 0x0A, 0x03, 0x00, 0x00, 0x81];
        assert!(LDataFrame::parse(&data).unwrap_err().is_format_error());

        let cemi = [0x29, 0x00, 0xBC, 0xE0, 0x11, 0x01, 0x0A, 0x03, 0x00, 0x00, 0x81];
        let frame = CEMIFrame::parse(&cemi).unwrap();
        assert!(frame.as_ldata().unwrap_err().is_format_error());
    }

    #[test]
    fn test_cemi_frame_with_additional_info() {
        let data = [
            0x11, // Message code: L_Data.req
            0x04, // Add info length: 4 bytes
            0x01, 0x02, 0x03, 0x04, // Additional info
            0xBC, 0xE0, 0x11, 0x01, 0x0A, 0x03, 0x01, 0x00, 0x80,
        ];

        let cemi = CEMIFrame::parse(&data).unwrap();
        assert_eq!(cemi.additional_info_length(), 4);
        assert_eq!(cemi.service_info().unwrap()[0], 0xBC);
        assert!(cemi.as_ldata().unwrap().apci() == Apci::GroupValueWrite);
    }

    #[test]
    fn test_cemi_invalid_message_code() {
        assert!(CEMIFrame::parse(&[0xFF, 0x00]).unwrap_err().is_format_error());
        assert!(CEMIFrame::parse(&[0x29]).unwrap_err().is_format_error());

        let busmon = CEMIFrame::parse(&[0x2B, 0x00]).unwrap();
        assert!(!busmon.is_ldata());
        assert!(busmon.as_ldata().is_err());
    }
}
