//! KNXnet/IP routing envelope.
//!
//! Every datagram on the bus multicast group is a KNXnet/IP frame: a 6-byte
//! header followed by a service body. For routing, the body of a
//! `ROUTING_INDICATION` is one cEMI frame.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌─────────────────────────────┐
//! │  Header (6 bytes)           │
//! │  - Header Length: 0x06      │
//! │  - Protocol Version: 0x10   │
//! │  - Service Type: 2 bytes    │
//! │  - Total Length: 2 bytes    │
//! ├─────────────────────────────┤
//! │  Body (variable)            │
//! │  - cEMI frame               │
//! └─────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use knx_fieldbus::protocol::constants::ServiceType;
//! use knx_fieldbus::protocol::frame::{FrameBuilder, KnxnetIpFrame};
//!
//! let cemi = [0x29, 0x00, 0xBC, 0xE0, 0x11, 0x01, 0x0A, 0x03, 0x01, 0x00, 0x81];
//! let datagram = FrameBuilder::routing_indication(&cemi)?;
//!
//! let frame = KnxnetIpFrame::parse(&datagram)?;
//! assert_eq!(frame.service_type(), ServiceType::RoutingIndication);
//! assert_eq!(frame.body(), &cemi);
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use crate::error::{KnxError, Result};
use crate::protocol::constants::{ServiceType, HEADER_SIZE_10, KNXNETIP_VERSION_10, MAX_FRAME_SIZE};

/// Encoded KNXnet/IP frame.
pub type FrameBuffer = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// KNXnet/IP frame header (6 bytes)
///
/// ```text
/// ┌──────────────┬──────────────┬─────────────────────┐
/// │ Header Len   │ Protocol Ver │  Service Type ID    │
/// │   (1 byte)   │   (1 byte)   │     (2 bytes)       │
/// ├──────────────┴──────────────┴─────────────────────┤
/// │           Total Length (2 bytes)                   │
/// └────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KnxnetIpHeader {
    /// Header length (0x06)
    pub header_length: u8,
    /// Protocol version (0x10 for v1.0)
    pub protocol_version: u8,
    /// Service type identifier
    pub service_type: ServiceType,
    /// Total length of frame (header + body)
    pub total_length: u16,
}

impl KnxnetIpHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = 6;

    /// Create a new header
    pub const fn new(service_type: ServiceType, body_length: u16) -> Self {
        Self {
            header_length: HEADER_SIZE_10,
            protocol_version: KNXNETIP_VERSION_10,
            service_type,
            total_length: Self::SIZE as u16 + body_length,
        }
    }

    /// Parse a header from a byte slice
    ///
    /// # Errors
    ///
    /// Format error if:
    /// - The buffer is shorter than 6 bytes
    /// - Header length or total length is inconsistent
    /// - Protocol version is not 1.0
    /// - Service type is not a routing service
    pub fn parse(data: &[u8]) -> Result<Self> {
        let [header_length, protocol_version, s0, s1, l0, l1, ..] = *data else {
            return Err(KnxError::invalid_frame());
        };

        if header_length != HEADER_SIZE_10 {
            return Err(KnxError::invalid_frame());
        }
        if protocol_version != KNXNETIP_VERSION_10 {
            return Err(KnxError::unsupported_version());
        }

        let service_type =
            ServiceType::from_u16(u16::from_be_bytes([s0, s1])).ok_or_else(KnxError::unsupported_service_type)?;

        let total_length = u16::from_be_bytes([l0, l1]);
        if (total_length as usize) < Self::SIZE {
            return Err(KnxError::invalid_frame());
        }

        Ok(Self {
            header_length,
            protocol_version,
            service_type,
            total_length,
        })
    }

    /// Encode the header into a byte buffer
    ///
    /// # Errors
    ///
    /// Returns `KnxError::BufferTooSmall` if buffer is too small
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < Self::SIZE {
            return Err(KnxError::buffer_too_small());
        }

        buf[0] = self.header_length;
        buf[1] = self.protocol_version;
        buf[2..4].copy_from_slice(&self.service_type.to_u16().to_be_bytes());
        buf[4..6].copy_from_slice(&self.total_length.to_be_bytes());

        Ok(Self::SIZE)
    }

    /// Body length announced by the header
    pub const fn body_length(&self) -> u16 {
        self.total_length.saturating_sub(Self::SIZE as u16)
    }
}

/// Borrowed view of a KNXnet/IP frame
#[derive(Debug)]
pub struct KnxnetIpFrame<'a> {
    data: &'a [u8],
    header: KnxnetIpHeader,
}

impl<'a> KnxnetIpFrame<'a> {
    /// Parse a KNXnet/IP frame from a datagram.
    ///
    /// Trailing bytes past the announced total length are ignored.
    ///
    /// # Errors
    ///
    /// Format error if the header is invalid or the datagram is shorter than
    /// the announced total length.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let header = KnxnetIpHeader::parse(data)?;

        if data.len() < header.total_length as usize {
            return Err(KnxError::invalid_frame());
        }

        Ok(Self { data, header })
    }

    /// Frame header
    pub const fn header(&self) -> &KnxnetIpHeader {
        &self.header
    }

    /// Service type
    pub const fn service_type(&self) -> ServiceType {
        self.header.service_type
    }

    /// Payload after the header
    pub fn body(&self) -> &'a [u8] {
        &self.data[KnxnetIpHeader::SIZE..self.header.total_length as usize]
    }

    /// Complete frame, header included
    pub fn data(&self) -> &'a [u8] {
        &self.data[..self.header.total_length as usize]
    }
}

/// Builder for creating KNXnet/IP frames
#[derive(Debug)]
pub struct FrameBuilder<'a> {
    service_type: ServiceType,
    body: &'a [u8],
}

impl<'a> FrameBuilder<'a> {
    /// Create a new frame builder
    pub const fn new(service_type: ServiceType, body: &'a [u8]) -> Self {
        Self { service_type, body }
    }

    /// Wrap a cEMI frame in a `ROUTING_INDICATION`.
    ///
    /// # Errors
    ///
    /// Format error if the frame would exceed [`MAX_FRAME_SIZE`].
    pub fn routing_indication(cemi: &[u8]) -> Result<FrameBuffer> {
        FrameBuilder::new(ServiceType::RoutingIndication, cemi).to_buffer()
    }

    /// Build the frame into a buffer
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Buffer is too small
    /// - Body is too large
    pub fn build(&self, buf: &mut [u8]) -> Result<usize> {
        let total_size = self.size();

        if total_size > MAX_FRAME_SIZE {
            return Err(KnxError::payload_too_large());
        }

        if buf.len() < total_size {
            return Err(KnxError::buffer_too_small());
        }

        let header = KnxnetIpHeader::new(self.service_type, self.body.len() as u16);
        header.encode(buf)?;
        buf[KnxnetIpHeader::SIZE..total_size].copy_from_slice(self.body);

        Ok(total_size)
    }

    /// Build the frame into an owned fixed-capacity buffer.
    ///
    /// # Errors
    ///
    /// Format error if the frame would exceed [`MAX_FRAME_SIZE`].
    pub fn to_buffer(&self) -> Result<FrameBuffer> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = self.build(&mut buf)?;
        FrameBuffer::from_slice(&buf[..len]).map_err(|_| KnxError::payload_too_large())
    }

    /// Total frame size
    pub const fn size(&self) -> usize {
        KnxnetIpHeader::SIZE + self.body.len()
    }
}
