//! Unified logging macro for the crate.
//!
//! `knx_log!` forwards to the `log` facade on hosted builds and to `defmt`
//! on `no_std` builds that enable the `defmt` feature. Nothing in the crate
//! depends on a logger being installed: without one every call is a no-op.
//!
//! # Usage
//!
//! ```rust,ignore
//! knx_log!(info, "joined {} on {}", group, interface);
//! knx_log!(debug, "SO_REUSEPORT unsupported: {}", err);
//! knx_log!(trace, "rx {} bytes", n);
//! ```

/// Unified logging macro - selects `log::` or `defmt::` based on features.
#[macro_export]
#[cfg(any(feature = "std", not(feature = "defmt")))]
macro_rules! knx_log {
    (info, $($arg:tt)*) => { log::info!($($arg)*) };
    (debug, $($arg:tt)*) => { log::debug!($($arg)*) };
    (warn, $($arg:tt)*) => { log::warn!($($arg)*) };
    (error, $($arg:tt)*) => { log::error!($($arg)*) };
    (trace, $($arg:tt)*) => { log::trace!($($arg)*) };
}

#[macro_export]
#[cfg(all(not(feature = "std"), feature = "defmt"))]
macro_rules! knx_log {
    (info, $($arg:tt)*) => { defmt::info!($($arg)*) };
    (debug, $($arg:tt)*) => { defmt::debug!($($arg)*) };
    (warn, $($arg:tt)*) => { defmt::warn!($($arg)*) };
    (error, $($arg:tt)*) => { defmt::error!($($arg)*) };
    (trace, $($arg:tt)*) => { defmt::trace!($($arg)*) };
}
