//! Bus telegram layers.
//!
//! From the application outward: the group-value [`apdu`], the cEMI frame
//! that carries it with addressing and [`priority`], and the KNXnet/IP
//! routing [`frame`] that puts the cEMI frame on the multicast wire.

pub mod apdu;
pub mod cemi;
pub mod constants;
pub mod frame;
pub mod priority;

pub use apdu::{Apci, Apdu};
pub use cemi::{CEMIFrame, CemiFactory, LDataFrame};
pub use constants::*;
pub use frame::{FrameBuilder, KnxnetIpFrame, KnxnetIpHeader};
pub use priority::Priority;
