//! Convenience macros for KNX addresses.

/// Creates a [`GroupAddress`](crate::addressing::GroupAddress) from 3-level notation.
///
/// # Syntax
///
/// ```text
/// ga!(main/middle/sub)
/// ```
///
/// Where:
/// - `main`: Main group (0-31)
/// - `middle`: Middle group (0-7)
/// - `sub`: Sub group (0-255)
///
/// # Examples
///
/// ```rust
/// use knx_fieldbus::{ga, GroupAddress};
///
/// let addr = ga!(1/2/3);
/// assert_eq!(addr, GroupAddress::new(1, 2, 3).unwrap());
/// assert_eq!(u16::from(addr), 0x0A03);
/// ```
///
/// # Compile-Time Validation
///
/// ```compile_fail
/// // main group > 31
/// let addr = knx_fieldbus::ga!(32/0/0);
/// ```
///
/// ```compile_fail
/// // middle group > 7
/// let addr = knx_fieldbus::ga!(1/8/0);
/// ```
#[macro_export]
macro_rules! ga {
    ($main:literal / $middle:literal / $sub:literal) => {{
        const _: () = {
            if $main > 31 {
                panic!("Main group must be 0-31");
            }
            if $middle > 7 {
                panic!("Middle group must be 0-7");
            }
            if $sub > 255 {
                panic!("Sub group must be 0-255");
            }
        };

        // MMMMMIII SSSSSSSS (5 bits main, 3 bits middle, 8 bits sub)
        const RAW: u16 = (($main & 0x1F) << 11) | (($middle & 0x07) << 8) | ($sub & 0xFF);
        $crate::addressing::GroupAddress::from(RAW)
    }};
}

/// Adds several group addresses to a [`Transceiver`](crate::transceiver::Transceiver).
///
/// Each entry is `main/middle/sub`, optionally followed by `=> ack` to
/// request layer-2 acknowledgment. Stops at the first failing address.
///
/// # Examples
///
/// ```rust
/// use knx_fieldbus::config::MulticastConfig;
/// use knx_fieldbus::net::mock_transport::MockSocket;
/// use knx_fieldbus::transceiver::MulticastTransceiver;
/// use knx_fieldbus::{add_group_addresses, ga, IndividualAddress};
///
/// let mut bus = MulticastTransceiver::with_sockets(
///     MockSocket::new(),
///     MockSocket::new(),
///     MulticastConfig::default(),
///     IndividualAddress::new(1, 1, 10)?,
/// )?;
///
/// add_group_addresses! {
///     bus,
///     1/2/3,
///     1/2/4 => ack,
/// }?;
///
/// assert_eq!(bus.group_address_entry(ga!(1/2/3)), Some(false));
/// assert_eq!(bus.group_address_entry(ga!(1/2/4)), Some(true));
/// # Ok::<(), knx_fieldbus::KnxError>(())
/// ```
#[macro_export]
macro_rules! add_group_addresses {
    (@ack ack) => { true };
    (@ack) => { false };
    ($transceiver:expr, $( $main:literal / $middle:literal / $sub:literal $(=> $ack:ident)? ),* $(,)?) => {{
        use $crate::transceiver::Transceiver as _;

        (|| -> $crate::Result<()> {
            $(
                $transceiver.add_group_address(
                    $crate::ga!($main / $middle / $sub),
                    $crate::add_group_addresses!(@ack $($ack)?),
                )?;
            )*
            Ok(())
        })()
    }};
}
