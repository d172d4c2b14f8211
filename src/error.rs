//! Error types for fieldbus operations.
//!
//! Every fallible operation in the crate returns [`KnxError`]. The variants are
//! categories; the concrete reason lives in an opaque kind that callers query
//! through the `is_*` helpers:
//!
//! | helper                             | raised by                                            |
//! |------------------------------------|------------------------------------------------------|
//! | [`KnxError::is_range_error`]       | DPT value/data outside limits or binary domain       |
//! | [`KnxError::is_format_error`]      | wrong frame length, bad service code, size mismatch  |
//! | [`KnxError::is_validation_error`]  | bad priority, non-multicast group, missing target    |
//! | [`KnxError::is_timeout`]           | receive window elapsed without a datagram            |
//! | [`KnxError::is_not_found`]         | removing a group address that was never added        |

use core::fmt;

#[cfg(feature = "std")]
use std::backtrace::Backtrace;

/// Result type alias for KNX operations.
pub type Result<T> = core::result::Result<T, KnxError>;

// =============================================================================
// Error Kind Enums (Internal)
// =============================================================================

/// Protocol error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum ProtocolErrorKind {
    InvalidFrame,
    UnsupportedVersion,
    UnsupportedServiceType,
    UnsupportedApci,
    PayloadMismatch,
    PayloadTooLarge,
    InvalidMessageCode,
}

/// Transport error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum TransportErrorKind {
    SendFailed,
    BufferTooSmall,
    Closed,
}

/// Addressing error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum AddressingErrorKind {
    InvalidIndividualAddress,
    InvalidGroupAddress,
    OutOfRange,
    GroupAddressNotFound,
}

/// DPT error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum DptErrorKind {
    ValueOutOfRange,
    DataOutOfRange,
    InvalidFrameLength,
    NoData,
    InvalidIdentifier,
    UnsupportedType,
}

/// Validation error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum ValidationErrorKind {
    UnknownPriorityName,
    PriorityOutOfRange,
    NotMulticast,
    DestinationNotSet,
    InvalidConfiguration,
}

// =============================================================================
// Main Error Type
// =============================================================================

/// KNX error types.
///
/// This is the main error type returned by all operations of the crate.
/// It contains a backtrace (when std feature is enabled) and detailed
/// error information through helper methods.
#[derive(Debug)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub enum KnxError {
    /// Malformed frames: APDU, cEMI and KNXnet/IP level
    Protocol(ProtocolError),
    /// Transport-related errors (socket, send, buffer)
    Transport(TransportError),
    /// Addressing errors (invalid address format, unknown group, etc.)
    Addressing(AddressingError),
    /// Datapoint Type errors (range, frame width, etc.)
    Dpt(DptError),
    /// Invalid construction arguments
    Validation(ValidationError),
    /// Underlying socket I/O failure, propagated unmodified
    #[cfg(feature = "std")]
    Io(std::io::Error),
    /// Receive window elapsed without data
    Timeout,
}

// =============================================================================
// Structured Error Types
// =============================================================================

/// Protocol error with optional backtrace
#[derive(Debug)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub struct ProtocolError {
    kind: ProtocolErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl ProtocolError {
    pub(crate) fn new(kind: ProtocolErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if this is an invalid frame error
    pub fn is_invalid_frame(&self) -> bool {
        matches!(self.kind, ProtocolErrorKind::InvalidFrame)
    }

    /// Check if the service code is not a group-value service
    pub fn is_unsupported_apci(&self) -> bool {
        matches!(self.kind, ProtocolErrorKind::UnsupportedApci)
    }

    /// Check if the payload length does not match the announced size
    pub fn is_payload_mismatch(&self) -> bool {
        matches!(self.kind, ProtocolErrorKind::PayloadMismatch)
    }

    /// Check if a well-formed header carried a service outside the routing family
    pub fn is_unsupported_service_type(&self) -> bool {
        matches!(self.kind, ProtocolErrorKind::UnsupportedServiceType)
    }
}

/// Transport error with optional backtrace
#[derive(Debug)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub struct TransportError {
    kind: TransportErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl TransportError {
    pub(crate) fn new(kind: TransportErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if buffer is too small
    pub fn is_buffer_too_small(&self) -> bool {
        matches!(self.kind, TransportErrorKind::BufferTooSmall)
    }

    /// Check if the socket stopped accepting bytes
    pub fn is_send_failed(&self) -> bool {
        matches!(self.kind, TransportErrorKind::SendFailed)
    }

    /// Check if the transport was already cleaned up
    pub fn is_closed(&self) -> bool {
        matches!(self.kind, TransportErrorKind::Closed)
    }
}

/// Addressing error with optional backtrace
#[derive(Debug)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub struct AddressingError {
    kind: AddressingErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl AddressingError {
    pub(crate) fn new(kind: AddressingErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if address is out of range
    pub fn is_out_of_range(&self) -> bool {
        matches!(self.kind, AddressingErrorKind::OutOfRange)
    }

    /// Check if the group address is not registered
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, AddressingErrorKind::GroupAddressNotFound)
    }
}

/// DPT error with optional backtrace
#[derive(Debug)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub struct DptError {
    kind: DptErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl DptError {
    pub(crate) fn new(kind: DptErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if value or binary data is out of range
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self.kind,
            DptErrorKind::ValueOutOfRange | DptErrorKind::DataOutOfRange
        )
    }

    /// Check if the wire frame has the wrong width
    pub fn is_invalid_frame_length(&self) -> bool {
        matches!(self.kind, DptErrorKind::InvalidFrameLength)
    }

    /// Check if the converter was read before any data was set
    pub fn is_no_data(&self) -> bool {
        matches!(self.kind, DptErrorKind::NoData)
    }

    /// Check if the identifier names no known DPT
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self.kind,
            DptErrorKind::UnsupportedType | DptErrorKind::InvalidIdentifier
        )
    }
}

/// Validation error with optional backtrace
#[derive(Debug)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub struct ValidationError {
    kind: ValidationErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if the address is outside 224.0.0.0-239.255.255.255
    pub fn is_not_multicast(&self) -> bool {
        matches!(self.kind, ValidationErrorKind::NotMulticast)
    }

    /// Check if this is a rejected priority name or level
    pub fn is_invalid_priority(&self) -> bool {
        matches!(
            self.kind,
            ValidationErrorKind::UnknownPriorityName | ValidationErrorKind::PriorityOutOfRange
        )
    }
}

// =============================================================================
// Convenience Constructors for KnxError
// =============================================================================

impl KnxError {
    // Protocol errors
    #[inline]
    pub(crate) const fn invalid_frame() -> Self {
        Self::Protocol(ProtocolError { kind: ProtocolErrorKind::InvalidFrame, #[cfg(feature = "std")] backtrace: Backtrace::disabled() })
    }

    #[inline]
    pub(crate) const fn unsupported_version() -> Self {
        Self::Protocol(ProtocolError { kind: ProtocolErrorKind::UnsupportedVersion, #[cfg(feature = "std")] backtrace: Backtrace::disabled() })
    }

    #[inline]
    pub(crate) const fn unsupported_service_type() -> Self {
        Self::Protocol(ProtocolError { kind: ProtocolErrorKind::UnsupportedServiceType, #[cfg(feature = "std")] backtrace: Backtrace::disabled() })
    }

    #[inline]
    pub(crate) const fn payload_too_large() -> Self {
        Self::Protocol(ProtocolError { kind: ProtocolErrorKind::PayloadTooLarge, #[cfg(feature = "std")] backtrace: Backtrace::disabled() })
    }

    pub(crate) fn unsupported_apci() -> Self {
        Self::Protocol(ProtocolError::new(ProtocolErrorKind::UnsupportedApci))
    }

    pub(crate) fn payload_mismatch() -> Self {
        Self::Protocol(ProtocolError::new(ProtocolErrorKind::PayloadMismatch))
    }

    pub(crate) fn invalid_message_code() -> Self {
        Self::Protocol(ProtocolError::new(ProtocolErrorKind::InvalidMessageCode))
    }

    // Transport errors
    pub(crate) fn buffer_too_small() -> Self {
        Self::Transport(TransportError::new(TransportErrorKind::BufferTooSmall))
    }

    pub(crate) fn send_failed() -> Self {
        Self::Transport(TransportError::new(TransportErrorKind::SendFailed))
    }

    pub(crate) fn transport_closed() -> Self {
        Self::Transport(TransportError::new(TransportErrorKind::Closed))
    }

    // Addressing errors
    pub(crate) fn invalid_group_address() -> Self {
        Self::Addressing(AddressingError::new(AddressingErrorKind::InvalidGroupAddress))
    }

    pub(crate) fn invalid_individual_address() -> Self {
        Self::Addressing(AddressingError::new(AddressingErrorKind::InvalidIndividualAddress))
    }

    pub(crate) fn address_out_of_range() -> Self {
        Self::Addressing(AddressingError::new(AddressingErrorKind::OutOfRange))
    }

    pub(crate) fn group_address_not_found() -> Self {
        Self::Addressing(AddressingError::new(AddressingErrorKind::GroupAddressNotFound))
    }

    // DPT errors
    pub(crate) fn dpt_value_out_of_range() -> Self {
        Self::Dpt(DptError::new(DptErrorKind::ValueOutOfRange))
    }

    pub(crate) fn dpt_data_out_of_range() -> Self {
        Self::Dpt(DptError::new(DptErrorKind::DataOutOfRange))
    }

    pub(crate) fn dpt_invalid_frame_length() -> Self {
        Self::Dpt(DptError::new(DptErrorKind::InvalidFrameLength))
    }

    pub(crate) fn dpt_no_data() -> Self {
        Self::Dpt(DptError::new(DptErrorKind::NoData))
    }

    pub(crate) fn invalid_dpt_id() -> Self {
        Self::Dpt(DptError::new(DptErrorKind::InvalidIdentifier))
    }

    pub(crate) fn unsupported_dpt() -> Self {
        Self::Dpt(DptError::new(DptErrorKind::UnsupportedType))
    }

    // Validation errors
    pub(crate) fn unknown_priority_name() -> Self {
        Self::Validation(ValidationError::new(ValidationErrorKind::UnknownPriorityName))
    }

    pub(crate) fn priority_out_of_range() -> Self {
        Self::Validation(ValidationError::new(ValidationErrorKind::PriorityOutOfRange))
    }

    pub(crate) fn not_multicast() -> Self {
        Self::Validation(ValidationError::new(ValidationErrorKind::NotMulticast))
    }

    pub(crate) fn destination_not_set() -> Self {
        Self::Validation(ValidationError::new(ValidationErrorKind::DestinationNotSet))
    }

    pub(crate) fn invalid_configuration() -> Self {
        Self::Validation(ValidationError::new(ValidationErrorKind::InvalidConfiguration))
    }
}

// =============================================================================
// Classification
// =============================================================================

impl KnxError {
    /// Value or binary state outside the declared DPT limits or domain.
    pub fn is_range_error(&self) -> bool {
        matches!(self, KnxError::Dpt(e) if e.is_out_of_range())
    }

    /// Malformed frame: wrong byte length, unsupported service code or
    /// size/data mismatch.
    pub fn is_format_error(&self) -> bool {
        match self {
            KnxError::Protocol(_) => true,
            KnxError::Dpt(e) => e.is_invalid_frame_length(),
            _ => false,
        }
    }

    /// Well-formed KNXnet/IP header for a service other than routing
    /// (search, description, tunnelling).
    pub fn is_unsupported_service(&self) -> bool {
        matches!(self, KnxError::Protocol(e) if e.is_unsupported_service_type())
    }

    /// Invalid construction argument.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, KnxError::Validation(_))
    }

    /// Receive call exceeded its configured wait.
    pub fn is_timeout(&self) -> bool {
        matches!(self, KnxError::Timeout)
    }

    /// Group address removal for an address that was never registered.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KnxError::Addressing(e) if e.is_not_found())
    }
}

// =============================================================================
// Display Implementation
// =============================================================================

impl fmt::Display for KnxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnxError::Protocol(e) => write!(f, "Protocol error: {:?}", e.kind),
            KnxError::Transport(e) => write!(f, "Transport error: {:?}", e.kind),
            KnxError::Addressing(e) => write!(f, "Addressing error: {:?}", e.kind),
            KnxError::Dpt(e) => write!(f, "DPT error: {:?}", e.kind),
            KnxError::Validation(e) => write!(f, "Validation error: {:?}", e.kind),
            #[cfg(feature = "std")]
            KnxError::Io(e) => write!(f, "I/O error: {e}"),
            KnxError::Timeout => write!(f, "Operation timeout"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KnxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KnxError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Socket timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows;
/// both map to [`KnxError::Timeout`], everything else is carried as-is.
#[cfg(feature = "std")]
impl From<std::io::Error> for KnxError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => KnxError::Timeout,
            _ => KnxError::Io(err),
        }
    }
}
