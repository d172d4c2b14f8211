//! DPT 1.xxx - Boolean (1-bit)
//!
//! Boolean datapoint types represent binary states (on/off, true/false, etc.)
//! encoded as a single bit. The bit travels inline in the low 6 bits of the
//! APDU, so group telegrams for these types are only 2 bytes long.
//!
//! ## Format
//!
//! - 7 bits: unused (always 0)
//! - 1 bit: data
//!   - `0` = false/off/disable/...
//!   - `1` = true/on/enable/...
//!
//! ## Common Subtypes
//!
//! - **1.001** - Switch (Off/On)
//! - **1.002** - Boolean (False/True)
//! - **1.003** - Enable (Disable/Enable)
//! - **1.008** - Up/Down
//! - **1.009** - Open/Close
//! - **1.010** - Start (Stop/Start)
//!
//! ## Example
//!
//! ```rust
//! use knx_fieldbus::dpt::{Dpt1, DptConverter};
//!
//! let mut switch = DptConverter::<Dpt1>::new(&Dpt1::SWITCH);
//! switch.set_frame(&[0x01])?;
//! assert_eq!(switch.value()?, true);
//! assert_eq!(switch.value_as_text()?.as_str(), "On");
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use core::fmt::{self, Write};

use super::{Dpt, DptCodec, DptId};

/// Codec for DPT main type 1 (boolean).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dpt1;

const LIMITS: (bool, bool) = (false, true);

impl Dpt1 {
    /// DPT 1.xxx - Generic
    pub const GENERIC: Dpt<bool> = Dpt::new(DptId::generic(1), "Generic", LIMITS, None);
    /// DPT 1.001 - Switch (Off/On)
    pub const SWITCH: Dpt<bool> = Dpt::new(DptId::new(1, 1), "Switch", LIMITS, None);
    /// DPT 1.002 - Boolean (False/True)
    pub const BOOL: Dpt<bool> = Dpt::new(DptId::new(1, 2), "Boolean", LIMITS, None);
    /// DPT 1.003 - Enable (Disable/Enable)
    pub const ENABLE: Dpt<bool> = Dpt::new(DptId::new(1, 3), "Enable", LIMITS, None);
    /// DPT 1.004 - Ramp (No ramp/Ramp)
    pub const RAMP: Dpt<bool> = Dpt::new(DptId::new(1, 4), "Ramp", LIMITS, None);
    /// DPT 1.005 - Alarm (No alarm/Alarm)
    pub const ALARM: Dpt<bool> = Dpt::new(DptId::new(1, 5), "Alarm", LIMITS, None);
    /// DPT 1.006 - Binary value (Low/High)
    pub const BINARY_VALUE: Dpt<bool> = Dpt::new(DptId::new(1, 6), "Binary value", LIMITS, None);
    /// DPT 1.007 - Step (Decrease/Increase)
    pub const STEP: Dpt<bool> = Dpt::new(DptId::new(1, 7), "Step", LIMITS, None);
    /// DPT 1.008 - Up/Down
    pub const UP_DOWN: Dpt<bool> = Dpt::new(DptId::new(1, 8), "Up/Down", LIMITS, None);
    /// DPT 1.009 - Open/Close
    pub const OPEN_CLOSE: Dpt<bool> = Dpt::new(DptId::new(1, 9), "Open/Close", LIMITS, None);
    /// DPT 1.010 - Start (Stop/Start)
    pub const START: Dpt<bool> = Dpt::new(DptId::new(1, 10), "Start", LIMITS, None);
    /// DPT 1.011 - State (Inactive/Active)
    pub const STATE: Dpt<bool> = Dpt::new(DptId::new(1, 11), "State", LIMITS, None);
    /// DPT 1.012 - Invert (Not inverted/Inverted)
    pub const INVERT: Dpt<bool> = Dpt::new(DptId::new(1, 12), "Invert", LIMITS, None);

    const DESCRIPTORS: &'static [&'static Dpt<bool>] = &[
        &Self::GENERIC,
        &Self::SWITCH,
        &Self::BOOL,
        &Self::ENABLE,
        &Self::RAMP,
        &Self::ALARM,
        &Self::BINARY_VALUE,
        &Self::STEP,
        &Self::UP_DOWN,
        &Self::OPEN_CLOSE,
        &Self::START,
        &Self::STATE,
        &Self::INVERT,
    ];

    /// Semantic labels `(false_label, true_label)` for a subtype.
    ///
    /// The generic descriptor falls back to the plain digits.
    pub const fn labels(id: DptId) -> (&'static str, &'static str) {
        match id.sub() {
            Some(1) => ("Off", "On"),
            Some(2) => ("False", "True"),
            Some(3) => ("Disable", "Enable"),
            Some(4) => ("No ramp", "Ramp"),
            Some(5) => ("No alarm", "Alarm"),
            Some(6) => ("Low", "High"),
            Some(7) => ("Decrease", "Increase"),
            Some(8) => ("Up", "Down"),
            Some(9) => ("Open", "Close"),
            Some(10) => ("Stop", "Start"),
            Some(11) => ("Inactive", "Active"),
            Some(12) => ("Not inverted", "Inverted"),
            _ => ("0", "1"),
        }
    }
}

impl DptCodec for Dpt1 {
    type Value = bool;

    const MAIN: u16 = 1;
    const DATA_BITS: u32 = 1;
    const FRAME_SIZE: usize = 1;

    fn descriptors() -> &'static [&'static Dpt<bool>] {
        Self::DESCRIPTORS
    }

    #[inline]
    fn decode(data: u32) -> bool {
        data & 0x01 != 0
    }

    #[inline]
    fn encode(value: bool) -> u32 {
        u32::from(value)
    }

    fn write_value<W: Write>(dpt: &Dpt<bool>, value: bool, out: &mut W) -> fmt::Result {
        let (off, on) = Self::labels(dpt.id);
        out.write_str(if value { on } else { off })
    }
}
