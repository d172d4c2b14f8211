//! KNX Datapoint Types (DPT)
//!
//! A DPT fixes how one typed application value is laid out on the bus.
//! Every DPT belongs to a *main type* (the number before the dot) that owns
//! the bit layout and the encode/decode algorithm; the *subtypes* under it
//! (`9.001` temperature, `9.004` illuminance, ...) only narrow the permitted
//! range and attach a unit.
//!
//! The module is split accordingly:
//!
//! - [`Dpt`] is the static descriptor of one subtype (id, name, limits, unit).
//! - [`DptCodec`] is implemented once per main type ([`Dpt1`], [`Dpt5`],
//!   [`Dpt9`]) and converts between value, normalized binary word and wire
//!   bytes.
//! - [`DptConverter`] binds a codec to one descriptor and keeps the three
//!   representations of a datapoint consistent, validating every mutation.
//! - [`lookup`] resolves a textual identifier to its descriptor.
//!
//! ## Supported DPT Families
//!
//! - **DPT 1.xxx** - Boolean (1 bit): switches, buttons, binary sensors
//! - **DPT 5.xxx** - 8-bit unsigned: ratios, tariffs, counters
//! - **DPT 9.xxx** - 2-byte float: temperature, illuminance, pressure
//!
//! ## Usage
//!
//! ```rust
//! use knx_fieldbus::dpt::{Dpt9, DptConverter};
//!
//! let mut temp = DptConverter::<Dpt9>::new(&Dpt9::TEMPERATURE);
//! temp.set_value(21.5)?;
//! assert_eq!(temp.data()?, 0x0C33);
//! assert_eq!(temp.frame()?.as_slice(), &[0x0C, 0x33]);
//! assert_eq!(temp.value_as_text()?.as_str(), "21.50 °C");
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use core::fmt::{self, Write};
use core::marker::PhantomData;
use core::str::FromStr;

use crate::error::{KnxError, Result};

pub mod dpt1;
pub mod dpt5;
pub mod dpt9;

#[doc(inline)]
pub use dpt1::Dpt1;
#[doc(inline)]
pub use dpt5::Dpt5;
#[doc(inline)]
pub use dpt9::Dpt9;

/// Largest wire width of any supported main type, in bytes.
pub const MAX_FRAME_SIZE: usize = 4;

/// Wire bytes of one datapoint value.
pub type DptFrame = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// Rendered datapoint value, unit included.
pub type DptText = heapless::String<32>;

// =============================================================================
// Identifier and descriptor
// =============================================================================

/// Dotted DPT identifier: `"9.001"` for a subtype, `"9.xxx"` for the generic
/// descriptor of a main type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DptId {
    main: u16,
    sub: Option<u16>,
}

impl DptId {
    /// Identifier of a concrete subtype.
    pub const fn new(main: u16, sub: u16) -> Self {
        Self {
            main,
            sub: Some(sub),
        }
    }

    /// Wildcard identifier (`main.xxx`) covering every subtype of a main type.
    pub const fn generic(main: u16) -> Self {
        Self { main, sub: None }
    }

    /// Main type number.
    pub const fn main(&self) -> u16 {
        self.main
    }

    /// Subtype number, `None` for the generic identifier.
    pub const fn sub(&self) -> Option<u16> {
        self.sub
    }

    /// `true` for `main.xxx`.
    pub const fn is_generic(&self) -> bool {
        self.sub.is_none()
    }
}

impl fmt::Display for DptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub {
            Some(sub) => write!(f, "{}.{:03}", self.main, sub),
            None => write!(f, "{}.xxx", self.main),
        }
    }
}

impl FromStr for DptId {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self> {
        let (main, sub) = s.split_once('.').ok_or_else(KnxError::invalid_dpt_id)?;
        let main = main.parse::<u16>().map_err(|_| KnxError::invalid_dpt_id())?;

        if sub == "xxx" {
            return Ok(Self::generic(main));
        }
        if sub.len() != 3 || !sub.bytes().all(|b| b.is_ascii_digit()) {
            return Err(KnxError::invalid_dpt_id());
        }
        let sub = sub.parse::<u16>().map_err(|_| KnxError::invalid_dpt_id())?;
        Ok(Self::new(main, sub))
    }
}

/// Static metadata of one datapoint type.
///
/// Descriptors are plain constants; all of them for one main type share the
/// same [`DptCodec`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dpt<T: 'static> {
    /// Dotted identifier
    pub id: DptId,
    /// Display name
    pub name: &'static str,
    /// Inclusive value range `(min, max)`
    pub limits: (T, T),
    /// Unit appended to the text rendering
    pub unit: Option<&'static str>,
}

impl<T> Dpt<T> {
    /// Create a descriptor.
    pub const fn new(id: DptId, name: &'static str, limits: (T, T), unit: Option<&'static str>) -> Self {
        Self {
            id,
            name,
            limits,
            unit,
        }
    }
}

// =============================================================================
// Codec trait
// =============================================================================

/// Encode/decode rules of one DPT main type.
///
/// The normalized binary word is a `u32` holding [`DptCodec::DATA_BITS`]
/// significant bits; the wire form is that word in big-endian order on
/// [`DptCodec::FRAME_SIZE`] bytes.
pub trait DptCodec {
    /// Application value type
    type Value: Copy + PartialOrd + fmt::Debug + 'static;

    /// Main type number handled by this codec
    const MAIN: u16;

    /// Significant bits of the normalized binary word
    const DATA_BITS: u32;

    /// Fixed wire width in bytes
    const FRAME_SIZE: usize;

    /// Payload size announced to the APDU codec: words of 6 bits or less
    /// travel inline in the APCI byte.
    const APDU_SIZE: usize = if Self::DATA_BITS <= 6 { 0 } else { Self::FRAME_SIZE };

    /// Every descriptor handled by this codec, generic one first.
    fn descriptors() -> &'static [&'static Dpt<Self::Value>];

    /// Decode a word already known to be inside the binary domain.
    fn decode(data: u32) -> Self::Value;

    /// Encode a value already known to be inside the descriptor limits.
    fn encode(value: Self::Value) -> u32;

    /// Render a value without unit.
    fn write_value<W: Write>(dpt: &Dpt<Self::Value>, value: Self::Value, out: &mut W) -> fmt::Result;

    /// Largest representable binary word.
    #[inline]
    fn max_data() -> u32 {
        ((1u64 << Self::DATA_BITS) - 1) as u32
    }

    /// Reject words outside `[0, max_data()]`.
    fn check_data(data: u32) -> Result<()> {
        if data > Self::max_data() {
            return Err(KnxError::dpt_data_out_of_range());
        }
        Ok(())
    }

    /// Reject values outside the descriptor limits. Unordered values (NaN)
    /// are outside.
    fn check_value(dpt: &Dpt<Self::Value>, value: Self::Value) -> Result<()> {
        let (min, max) = dpt.limits;
        if !(min <= value && value <= max) {
            return Err(KnxError::dpt_value_out_of_range());
        }
        Ok(())
    }

    /// Big-endian wire bytes of a word.
    fn to_frame(data: u32) -> DptFrame {
        let bytes = data.to_be_bytes();
        let mut frame = DptFrame::new();
        for &b in &bytes[bytes.len() - Self::FRAME_SIZE..] {
            // FRAME_SIZE <= MAX_FRAME_SIZE for every codec, push cannot fail
            let _ = frame.push(b);
        }
        frame
    }

    /// Parse big-endian wire bytes of exactly [`DptCodec::FRAME_SIZE`] bytes.
    fn from_frame(frame: &[u8]) -> Result<u32> {
        if frame.len() != Self::FRAME_SIZE {
            return Err(KnxError::dpt_invalid_frame_length());
        }
        Ok(frame.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }

    /// Find a descriptor of this main type by identifier.
    fn find(id: DptId) -> Option<&'static Dpt<Self::Value>> {
        if id.main() != Self::MAIN {
            return None;
        }
        Self::descriptors().iter().copied().find(|dpt| dpt.id == id)
    }
}

// =============================================================================
// Converter
// =============================================================================

/// One datapoint value bound to a descriptor.
///
/// The normalized binary word is the canonical state; value and frame are
/// derived from it. Setters validate first and leave the state untouched on
/// error. Until a setter succeeds the converter holds no data and every
/// getter fails with a "no data" DPT error.
#[derive(Debug, Clone)]
pub struct DptConverter<C: DptCodec> {
    dpt: &'static Dpt<C::Value>,
    data: Option<u32>,
    display_unit: bool,
    _codec: PhantomData<C>,
}

impl<C: DptCodec> DptConverter<C> {
    /// Bind a converter to a descriptor.
    pub fn new(dpt: &'static Dpt<C::Value>) -> Self {
        Self {
            dpt,
            data: None,
            display_unit: true,
            _codec: PhantomData,
        }
    }

    /// Bind a converter to the descriptor named by a dotted identifier.
    ///
    /// # Errors
    ///
    /// Malformed identifiers and identifiers this codec does not handle fail
    /// with a DPT "unsupported" error.
    pub fn from_id(id: &str) -> Result<Self> {
        let id = id.parse::<DptId>()?;
        C::find(id).map(Self::new).ok_or_else(KnxError::unsupported_dpt)
    }

    /// Bound descriptor.
    pub fn dpt(&self) -> &'static Dpt<C::Value> {
        self.dpt
    }

    /// Whether [`Self::value_as_text`] appends the unit.
    pub fn display_unit(&self) -> bool {
        self.display_unit
    }

    /// Enable or disable the unit suffix in text renderings.
    pub fn set_display_unit(&mut self, display_unit: bool) {
        self.display_unit = display_unit;
    }

    /// Payload size to pass to the APDU codec for this converter's frame.
    pub const fn apdu_size(&self) -> usize {
        C::APDU_SIZE
    }

    /// Normalized binary word.
    pub fn data(&self) -> Result<u32> {
        self.data.ok_or_else(KnxError::dpt_no_data)
    }

    /// Store a binary word verbatim.
    pub fn set_data(&mut self, data: u32) -> Result<()> {
        C::check_data(data)?;
        self.data = Some(data);
        Ok(())
    }

    /// Decoded application value.
    pub fn value(&self) -> Result<C::Value> {
        self.data().map(C::decode)
    }

    /// Encode and store an application value.
    pub fn set_value(&mut self, value: C::Value) -> Result<()> {
        C::check_value(self.dpt, value)?;
        let data = C::encode(value);
        C::check_data(data)?;
        self.data = Some(data);
        Ok(())
    }

    /// Wire bytes.
    pub fn frame(&self) -> Result<DptFrame> {
        self.data().map(C::to_frame)
    }

    /// Parse and store wire bytes.
    pub fn set_frame(&mut self, frame: &[u8]) -> Result<()> {
        let data = C::from_frame(frame)?;
        self.set_data(data)
    }

    /// Text rendering of the value, followed by the unit when one exists and
    /// unit display is enabled.
    pub fn value_as_text(&self) -> Result<DptText> {
        let value = self.value()?;
        let mut text = DptText::new();
        C::write_value(self.dpt, value, &mut text).map_err(|_| KnxError::buffer_too_small())?;
        if let (true, Some(unit)) = (self.display_unit, self.dpt.unit) {
            write!(text, " {unit}").map_err(|_| KnxError::buffer_too_small())?;
        }
        Ok(text)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// A descriptor of any supported main type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DptDescriptor {
    /// DPT 1.xxx
    Boolean(&'static Dpt<bool>),
    /// DPT 5.xxx
    Unsigned8(&'static Dpt<u8>),
    /// DPT 9.xxx
    Float16(&'static Dpt<f64>),
}

impl DptDescriptor {
    /// Dotted identifier.
    pub fn id(&self) -> DptId {
        match self {
            Self::Boolean(dpt) => dpt.id,
            Self::Unsigned8(dpt) => dpt.id,
            Self::Float16(dpt) => dpt.id,
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean(dpt) => dpt.name,
            Self::Unsigned8(dpt) => dpt.name,
            Self::Float16(dpt) => dpt.name,
        }
    }

    /// Unit, if any.
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Boolean(dpt) => dpt.unit,
            Self::Unsigned8(dpt) => dpt.unit,
            Self::Float16(dpt) => dpt.unit,
        }
    }

    /// Wire width in bytes.
    pub fn frame_size(&self) -> usize {
        match self {
            Self::Boolean(_) => Dpt1::FRAME_SIZE,
            Self::Unsigned8(_) => Dpt5::FRAME_SIZE,
            Self::Float16(_) => Dpt9::FRAME_SIZE,
        }
    }

    /// Payload size announced to the APDU codec.
    pub fn apdu_size(&self) -> usize {
        match self {
            Self::Boolean(_) => Dpt1::APDU_SIZE,
            Self::Unsigned8(_) => Dpt5::APDU_SIZE,
            Self::Float16(_) => Dpt9::APDU_SIZE,
        }
    }
}

/// Resolve a dotted identifier (`"9.001"`, `"1.xxx"`, ...) to its descriptor.
///
/// # Errors
///
/// Malformed or unknown identifiers fail with a DPT "unsupported" error.
pub fn lookup(id: &str) -> Result<DptDescriptor> {
    let id = id.parse::<DptId>()?;
    let found = match id.main() {
        Dpt1::MAIN => Dpt1::find(id).map(DptDescriptor::Boolean),
        Dpt5::MAIN => Dpt5::find(id).map(DptDescriptor::Unsigned8),
        Dpt9::MAIN => Dpt9::find(id).map(DptDescriptor::Float16),
        _ => None,
    };
    found.ok_or_else(KnxError::unsupported_dpt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpt_id_parse_and_display() {
        let id: DptId = "9.001".parse().unwrap();
        assert_eq!((id.main(), id.sub()), (9, Some(1)));
        assert_eq!(id.to_string(), "9.001");

        let id: DptId = "1.xxx".parse().unwrap();
        assert!(id.is_generic());
        assert_eq!(id.to_string(), "1.xxx");
    }

    #[test]
    fn test_dpt_id_parse_invalid() {
        for text in ["", "9", "9.1", "9.0001", "x.001", "9.abc", "9.-01"] {
            let err = text.parse::<DptId>().unwrap_err();
            assert!(matches!(err, KnxError::Dpt(ref e) if e.is_unsupported()), "{text}");
        }
    }

    #[test]
    fn test_lookup() {
        let desc = lookup("9.001").unwrap();
        assert_eq!(desc.name(), "Temperature");
        assert_eq!(desc.unit(), Some("°C"));
        assert_eq!(desc.frame_size(), 2);
        assert_eq!(desc.apdu_size(), 2);

        let desc = lookup("1.001").unwrap();
        assert!(matches!(desc, DptDescriptor::Boolean(_)));
        assert_eq!(desc.apdu_size(), 0);

        let desc = lookup("5.010").unwrap();
        assert_eq!(desc.id(), DptId::new(5, 10));
        assert_eq!(desc.apdu_size(), 1);
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(lookup("9.999").is_err());
        assert!(lookup("42.001").is_err());
        assert!(lookup("garbage").is_err());
    }

    #[test]
    fn test_converter_from_id_checks_main_type() {
        assert!(DptConverter::<Dpt9>::from_id("9.004").is_ok());
        assert!(DptConverter::<Dpt9>::from_id("1.001").is_err());
    }

    #[test]
    fn test_unset_converter_reports_no_data() {
        let conv = DptConverter::<Dpt9>::new(&Dpt9::GENERIC);
        assert!(matches!(conv.data(), Err(KnxError::Dpt(ref e)) if e.is_no_data()));
        assert!(conv.value().is_err());
        assert!(conv.frame().is_err());
        assert!(conv.value_as_text().is_err());
    }

    #[test]
    fn test_failed_setters_keep_state() {
        let mut conv = DptConverter::<Dpt9>::new(&Dpt9::TEMPERATURE);
        conv.set_value(1.0).unwrap();

        assert!(conv.set_value(-300.0).unwrap_err().is_range_error());
        assert!(conv.set_data(0x1_0000).unwrap_err().is_range_error());
        assert!(conv.set_frame(&[0x00]).unwrap_err().is_format_error());

        assert_eq!(conv.data().unwrap(), 0x0064);
        assert_eq!(conv.value().unwrap(), 1.0);
    }

    #[test]
    fn test_representations_agree() {
        let mut conv = DptConverter::<Dpt9>::new(&Dpt9::GENERIC);
        conv.set_frame(&[0xA1, 0x56]).unwrap();
        assert_eq!(conv.data().unwrap(), 0xA156);
        assert_eq!(conv.value().unwrap(), -272.96);

        let value = conv.value().unwrap();
        conv.set_value(value).unwrap();
        assert_eq!(conv.frame().unwrap().as_slice(), &[0xA1, 0x56]);
    }

    #[test]
    fn test_value_as_text_unit_toggle() {
        let mut conv = DptConverter::<Dpt9>::new(&Dpt9::HUMIDITY);
        conv.set_value(45.0).unwrap();
        assert_eq!(conv.value_as_text().unwrap().as_str(), "45.00 %");

        conv.set_display_unit(false);
        assert_eq!(conv.value_as_text().unwrap().as_str(), "45.00");

        let mut generic = DptConverter::<Dpt9>::new(&Dpt9::GENERIC);
        generic.set_value(-1.0).unwrap();
        assert_eq!(generic.value_as_text().unwrap().as_str(), "-1.00");
    }
}
