//! KNX addressing system.
//!
//! KNX uses two types of addresses:
//! - Individual addresses for physical devices (Area.Line.Device)
//! - Group addresses for logical grouping (Main/Middle/Sub or Main/Sub)
//!
//! Open media (powerline, RF) additionally scope a device by a domain
//! address; twisted-pair and IP devices leave it unset.

pub mod group;
pub mod individual;

pub use group::GroupAddress;
pub use individual::IndividualAddress;

/// Domain address of an open-medium subnetwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DomainAddress(pub u16);
