#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![doc = include_str!("../README.md")]

// Macro modules (must be declared before use)
#[macro_use]
pub mod logging;
#[macro_use]
pub mod macros;

pub mod addressing;
pub mod config;
pub mod dpt;
pub mod error;
pub mod net;
pub mod protocol;
#[cfg(feature = "std")]
pub mod transceiver;

// Re-export commonly used types
#[doc(inline)]
pub use addressing::{DomainAddress, GroupAddress, IndividualAddress};
#[doc(inline)]
pub use config::MulticastConfig;
#[doc(inline)]
pub use dpt::{Dpt, Dpt1, Dpt5, Dpt9, DptCodec, DptConverter, DptId};
#[doc(inline)]
pub use error::{KnxError, Result};
#[doc(inline)]
pub use protocol::priority::Priority;
#[cfg(feature = "std")]
#[doc(inline)]
pub use transceiver::{GroupTelegram, MulticastTransceiver, Transceiver};
