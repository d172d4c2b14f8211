//! KNXnet/IP routing constants, service type identifiers and cEMI message codes.

use core::net::Ipv4Addr;

/// KNXnet/IP protocol version 1.0
pub const KNXNETIP_VERSION_10: u8 = 0x10;

/// Standard KNXnet/IP header length (6 bytes)
pub const HEADER_SIZE_10: u8 = 0x06;

/// Standard UDP port for KNXnet/IP communication
pub const KNXNETIP_DEFAULT_PORT: u16 = 3671;

/// KNXnet/IP multicast address for routing
pub const KNXNETIP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 23, 12);

/// Maximum size of a KNXnet/IP frame
pub const MAX_FRAME_SIZE: usize = 256;

/// Maximum size of a standard-frame APDU (TPCI/APCI byte pair + 14 data bytes)
pub const MAX_APDU_SIZE: usize = 16;

/// Maximum size of a cEMI frame built by this crate
pub const MAX_CEMI_SIZE: usize = 64;

// =============================================================================
// Service Type Identifiers
// =============================================================================

/// KNXnet/IP Routing Service Type Identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ServiceType {
    /// `ROUTING_INDICATION` - cEMI frame multicast to every router
    RoutingIndication = 0x0530,
    /// `ROUTING_LOST_MESSAGE` - Router dropped frames
    RoutingLostMessage = 0x0531,
    /// `ROUTING_BUSY` - Router asks senders to slow down
    RoutingBusy = 0x0532,
}

impl ServiceType {
    /// Convert a u16 to `ServiceType`
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0530 => Some(Self::RoutingIndication),
            0x0531 => Some(Self::RoutingLostMessage),
            0x0532 => Some(Self::RoutingBusy),
            _ => None,
        }
    }

    /// Convert `ServiceType` to u16
    pub const fn to_u16(self) -> u16 {
        self as u16
    }
}

// =============================================================================
// cEMI Message Codes
// =============================================================================

/// cEMI Message Codes of the data link layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CEMIMessageCode {
    /// `L_Data.req` - Data request
    LDataReq = 0x11,
    /// `L_Data.con` - Data confirmation
    LDataCon = 0x2E,
    /// `L_Data.ind` - Data indication
    LDataInd = 0x29,
    /// `L_Busmon.ind` - Bus monitor indication
    LBusmonInd = 0x2B,
    /// `L_Raw.req` - Raw frame request
    LRawReq = 0x10,
    /// `L_Raw.ind` - Raw frame indication
    LRawInd = 0x2D,
    /// `L_Raw.con` - Raw frame confirmation
    LRawCon = 0x2F,
}

impl CEMIMessageCode {
    /// Convert u8 to `CEMIMessageCode`
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x11 => Some(Self::LDataReq),
            0x2E => Some(Self::LDataCon),
            0x29 => Some(Self::LDataInd),
            0x2B => Some(Self::LBusmonInd),
            0x10 => Some(Self::LRawReq),
            0x2D => Some(Self::LRawInd),
            0x2F => Some(Self::LRawCon),
            _ => None,
        }
    }

    /// Convert `CEMIMessageCode` to u8
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// `L_Data` service primitive (request, confirmation or indication)
    pub const fn is_ldata(self) -> bool {
        matches!(self, Self::LDataReq | Self::LDataCon | Self::LDataInd)
    }
}
