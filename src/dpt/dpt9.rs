//! DPT 9.xxx - 2-byte Float (16-bit floating point)
//!
//! 2-byte floating point datapoint types represent values using a custom
//! 16-bit floating point format with 1 sign bit, 4 exponent bits, and 11 mantissa bits.
//!
//! ## Format
//!
//! ```text
//! Byte 0: SEEE EMMM
//! Byte 1: MMMM MMMM
//!
//! S = Sign bit (bit 15: 0 = positive, 1 = negative)
//! E = Exponent (bits 14-11: 4 bits, unsigned, range 0-15)
//! M = Mantissa (bits 10-0, two's complement over 12 bits together with S)
//!
//! Value = 0.01 * M * 2^E
//! ```
//!
//! ## Range
//!
//! - Min: -671088.64
//! - Max: +670760.96
//! - Resolution: 0.01 at exponent 0
//!
//! The word `0x7FFF` is reserved for "invalid data". It still decodes to
//! its numeric value (670760.96); [`Dpt9::is_invalid_data`] tells the two
//! apart.
//!
//! ## Example
//!
//! ```rust
//! use knx_fieldbus::dpt::{Dpt9, DptCodec};
//!
//! assert_eq!(Dpt9::encode(-1.0), 0x879C);
//! assert_eq!(Dpt9::decode(0x0C38), 21.6);
//! ```

use core::fmt::{self, Write};

use super::{Dpt, DptCodec, DptConverter, DptId};

/// Codec for DPT main type 9 (2-byte float).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dpt9;

impl Dpt9 {
    /// Reserved word denoting "invalid data".
    pub const INVALID_DATA: u32 = 0x7FFF;

    /// Representable mantissa range at any exponent.
    const MANTISSA_MIN: i64 = -2048;
    const MANTISSA_MAX: i64 = 2047;
    const EXPONENT_MAX: u32 = 15;

    /// DPT 9.xxx - Generic
    pub const GENERIC: Dpt<f64> =
        Dpt::new(DptId::generic(9), "Generic", (-670_760.96, 670_760.96), None);
    /// DPT 9.001 - Temperature (°C)
    pub const TEMPERATURE: Dpt<f64> =
        Dpt::new(DptId::new(9, 1), "Temperature", (-273.0, 670_760.0), Some("°C"));
    /// DPT 9.002 - Temperature difference (K)
    pub const TEMPERATURE_DIFFERENCE: Dpt<f64> = Dpt::new(
        DptId::new(9, 2),
        "Temperature difference",
        (-670_760.0, 670_760.0),
        Some("K"),
    );
    /// DPT 9.003 - Temperature gradient (K/h)
    pub const KELVIN_PER_HOUR: Dpt<f64> = Dpt::new(
        DptId::new(9, 3),
        "Temperature gradient",
        (-670_760.0, 670_760.0),
        Some("K/h"),
    );
    /// DPT 9.004 - Illuminance (lx)
    pub const ILLUMINANCE: Dpt<f64> =
        Dpt::new(DptId::new(9, 4), "Luminous emittance", (0.0, 670_760.0), Some("lx"));
    /// DPT 9.005 - Wind speed (m/s)
    pub const WIND_SPEED: Dpt<f64> =
        Dpt::new(DptId::new(9, 5), "Wind speed", (0.0, 670_760.0), Some("m/s"));
    /// DPT 9.006 - Pressure (Pa)
    pub const PRESSURE: Dpt<f64> =
        Dpt::new(DptId::new(9, 6), "Air pressure", (0.0, 670_760.0), Some("Pa"));
    /// DPT 9.007 - Humidity (%)
    pub const HUMIDITY: Dpt<f64> =
        Dpt::new(DptId::new(9, 7), "Humidity", (0.0, 670_760.0), Some("%"));
    /// DPT 9.008 - Air quality (ppm)
    pub const AIR_QUALITY: Dpt<f64> =
        Dpt::new(DptId::new(9, 8), "Air quality", (0.0, 670_760.0), Some("ppm"));
    /// DPT 9.010 - Time difference (s)
    pub const TIME_DIFFERENCE: Dpt<f64> = Dpt::new(
        DptId::new(9, 10),
        "Time difference 1",
        (-670_760.0, 670_760.0),
        Some("s"),
    );
    /// DPT 9.011 - Time difference (ms)
    pub const TIME_DIFFERENCE_MS: Dpt<f64> = Dpt::new(
        DptId::new(9, 11),
        "Time difference 2",
        (-670_760.0, 670_760.0),
        Some("ms"),
    );
    /// DPT 9.020 - Voltage (mV)
    pub const VOLTAGE: Dpt<f64> = Dpt::new(
        DptId::new(9, 20),
        "Electrical voltage",
        (-670_760.0, 670_760.0),
        Some("mV"),
    );
    /// DPT 9.021 - Current (mA)
    pub const CURRENT: Dpt<f64> = Dpt::new(
        DptId::new(9, 21),
        "Electric current",
        (-670_760.0, 670_760.0),
        Some("mA"),
    );
    /// DPT 9.022 - Power density (W/m²)
    pub const POWER_DENSITY: Dpt<f64> = Dpt::new(
        DptId::new(9, 22),
        "Power density",
        (-670_760.0, 670_760.0),
        Some("W/m²"),
    );
    /// DPT 9.023 - Kelvin per percent (K/%)
    pub const KELVIN_PER_PERCENT: Dpt<f64> = Dpt::new(
        DptId::new(9, 23),
        "Kelvin/percent",
        (-670_760.0, 670_760.0),
        Some("K/%"),
    );
    /// DPT 9.024 - Power (kW)
    pub const POWER: Dpt<f64> =
        Dpt::new(DptId::new(9, 24), "Power", (-670_760.0, 670_760.0), Some("kW"));
    /// DPT 9.025 - Volume flow (l/h)
    pub const VOLUME_FLOW: Dpt<f64> =
        Dpt::new(DptId::new(9, 25), "Volume flow", (-670_760.0, 670_760.0), Some("l/h"));
    /// DPT 9.026 - Rain amount (l/m²)
    pub const RAIN_AMOUNT: Dpt<f64> =
        Dpt::new(DptId::new(9, 26), "Rain amount", (-670_760.0, 670_760.0), Some("l/m²"));
    /// DPT 9.027 - Temperature (°F)
    pub const TEMPERATURE_F: Dpt<f64> =
        Dpt::new(DptId::new(9, 27), "Temperature (°F)", (-459.6, 670_760.0), Some("°F"));
    /// DPT 9.028 - Wind speed (km/h)
    pub const WIND_SPEED_KMH: Dpt<f64> =
        Dpt::new(DptId::new(9, 28), "Wind speed (km/h)", (0.0, 670_760.0), Some("km/h"));

    const DESCRIPTORS: &'static [&'static Dpt<f64>] = &[
        &Self::GENERIC,
        &Self::TEMPERATURE,
        &Self::TEMPERATURE_DIFFERENCE,
        &Self::KELVIN_PER_HOUR,
        &Self::ILLUMINANCE,
        &Self::WIND_SPEED,
        &Self::PRESSURE,
        &Self::HUMIDITY,
        &Self::AIR_QUALITY,
        &Self::TIME_DIFFERENCE,
        &Self::TIME_DIFFERENCE_MS,
        &Self::VOLTAGE,
        &Self::CURRENT,
        &Self::POWER_DENSITY,
        &Self::KELVIN_PER_PERCENT,
        &Self::POWER,
        &Self::VOLUME_FLOW,
        &Self::RAIN_AMOUNT,
        &Self::TEMPERATURE_F,
        &Self::WIND_SPEED_KMH,
    ];

    /// `true` for the reserved "invalid data" word.
    #[inline(always)]
    pub const fn is_invalid_data(data: u32) -> bool {
        data == Self::INVALID_DATA
    }
}

impl DptCodec for Dpt9 {
    type Value = f64;

    const MAIN: u16 = 9;
    const DATA_BITS: u32 = 16;
    const FRAME_SIZE: usize = 2;

    fn descriptors() -> &'static [&'static Dpt<f64>] {
        Self::DESCRIPTORS
    }

    fn decode(data: u32) -> f64 {
        // Extract fields: SEEE EMMM MMMM MMMM
        let sign = (data >> 15) & 0x01;
        let exponent = (data >> 11) & 0x0F;
        let mantissa_raw = (data & 0x07FF) as i32;

        // Sign bit extends the 11-bit mantissa to 12-bit two's complement
        let mantissa = if sign == 1 {
            mantissa_raw - 2048
        } else {
            mantissa_raw
        };

        // Exact integer count of hundredths, divided once
        f64::from(mantissa << exponent) / 100.0
    }

    /// Rounds `value * 100` half away from zero (not truncation) and takes
    /// the sign from the rounded mantissa, so 0.01-grid values such as 0.29
    /// survive a round trip and tiny negatives encode as `0x0000`.
    fn encode(value: f64) -> u32 {
        // Round to nearest integer (manual rounding for no_std)
        let scaled = value * 100.0;
        let mut mantissa = if scaled >= 0.0 {
            (scaled + 0.5) as i64
        } else {
            (scaled - 0.5) as i64
        };

        let mut exponent = 0u32;
        while !(Self::MANTISSA_MIN..=Self::MANTISSA_MAX).contains(&mantissa)
            && exponent < Self::EXPONENT_MAX
        {
            mantissa >>= 1;
            exponent += 1;
        }

        // Taken from the rounded mantissa so that -0.001 encodes as zero
        let sign = u32::from(mantissa < 0);
        (sign << 15) | (exponent << 11) | ((mantissa as u32) & 0x07FF)
    }

    fn write_value<W: Write>(_dpt: &Dpt<f64>, value: f64, out: &mut W) -> fmt::Result {
        write!(out, "{value:.2}")
    }
}

impl DptConverter<Dpt9> {
    /// `true` when the stored word is the reserved "invalid data" marker.
    pub fn is_invalid_data(&self) -> bool {
        matches!(self.data(), Ok(data) if Dpt9::is_invalid_data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (value, word, wire bytes)
    const VECTORS: [(f64, u32, [u8; 2]); 7] = [
        (0.0, 0x0000, [0x00, 0x00]),
        (0.01, 0x0001, [0x00, 0x01]),
        (-0.01, 0x87FF, [0x87, 0xFF]),
        (-1.0, 0x879C, [0x87, 0x9C]),
        (1.0, 0x0064, [0x00, 0x64]),
        (-272.96, 0xA156, [0xA1, 0x56]),
        (670_760.96, 0x7FFF, [0x7F, 0xFF]),
    ];

    fn converter() -> DptConverter<Dpt9> {
        DptConverter::new(&Dpt9::GENERIC)
    }

    #[test]
    fn test_vectors_value_to_data() {
        for (value, data, _) in VECTORS {
            let mut conv = converter();
            conv.set_value(value).unwrap();
            assert_eq!(conv.data().unwrap(), data, "encode {value}");
        }
    }

    #[test]
    fn test_vectors_data_to_value() {
        for (value, data, _) in VECTORS {
            let mut conv = converter();
            conv.set_data(data).unwrap();
            assert_eq!(conv.value().unwrap(), value, "decode {data:#06X}");
        }
    }

    #[test]
    fn test_vectors_data_to_frame() {
        for (_, data, frame) in VECTORS {
            let mut conv = converter();
            conv.set_data(data).unwrap();
            assert_eq!(conv.frame().unwrap().as_slice(), &frame);
        }
    }

    #[test]
    fn test_vectors_frame_to_data() {
        for (_, data, frame) in VECTORS {
            let mut conv = converter();
            conv.set_frame(&frame).unwrap();
            assert_eq!(conv.data().unwrap(), data);
        }
    }

    #[test]
    fn test_round_trip_exponent_zero_grid() {
        // Every hundredth with |v| < 20.48
        for hundredths in -2047i32..=2047 {
            let value = f64::from(hundredths) / 100.0;
            let data = Dpt9::encode(value);
            assert_eq!(Dpt9::decode(data), value, "round trip {value}");
        }
    }

    #[test]
    fn test_decode_real_knx_bus_value() {
        // Sign: 0, Exponent: 1, Mantissa: 1080
        assert_eq!(Dpt9::decode(0x0C38), 21.6);
        // Sign: 0, Exponent: 1, Mantissa: 752
        assert_eq!(Dpt9::decode(0x0AF0), 15.04);
    }

    #[test]
    fn test_decode_most_negative() {
        assert_eq!(Dpt9::decode(0x8000), -20.48);
        assert_eq!(Dpt9::decode(0xF800), -671_088.64);
    }

    #[test]
    fn test_encode_needs_exponent() {
        // 2150 hundredths -> 1075 at exponent 1
        assert_eq!(Dpt9::encode(21.5), 0x0C33);
        assert_eq!(Dpt9::encode(-670_760.96), 0xF801);
    }

    #[test]
    fn test_encode_tiny_negative_is_zero() {
        assert_eq!(Dpt9::encode(-0.001), 0x0000);
        assert_eq!(Dpt9::encode(-0.0), 0x0000);
        assert_eq!(Dpt9::encode(-0.006), 0x87FF);
    }

    #[test]
    fn test_encode_is_lossy_above_grid() {
        // -27300 hundredths -> -1707 at exponent 4 -> -273.12
        let data = Dpt9::encode(-273.0);
        assert_eq!(data, 0xA155);
        assert_eq!(Dpt9::decode(data), -273.12);
    }

    #[test]
    fn test_temperature_limits() {
        let mut conv = DptConverter::<Dpt9>::new(&Dpt9::TEMPERATURE);
        assert!(conv.set_value(-273.0).is_ok());
        assert!(conv.set_value(670_760.0).is_ok());

        let err = conv.set_value(-273.01).unwrap_err();
        assert!(err.is_range_error());
        let err = conv.set_value(670_760.01).unwrap_err();
        assert!(err.is_range_error());
    }

    #[test]
    fn test_nan_is_out_of_range() {
        let mut conv = converter();
        assert!(conv.set_value(f64::NAN).unwrap_err().is_range_error());
    }

    #[test]
    fn test_data_domain() {
        let mut conv = converter();
        assert!(conv.set_data(0xFFFF).is_ok());
        assert!(conv.set_data(0x1_0000).unwrap_err().is_range_error());
    }

    #[test]
    fn test_frame_width() {
        let mut conv = converter();
        assert!(conv.set_frame(&[]).unwrap_err().is_format_error());
        assert!(conv.set_frame(&[0x0C]).unwrap_err().is_format_error());
        assert!(conv.set_frame(&[0x0C, 0x38, 0x00]).unwrap_err().is_format_error());
    }

    #[test]
    fn test_invalid_data_marker() {
        let mut conv = converter();
        conv.set_data(0x7FFF).unwrap();
        assert!(conv.is_invalid_data());
        assert_eq!(conv.value().unwrap(), 670_760.96);
        assert_eq!(conv.value_as_text().unwrap().as_str(), "670760.96");

        conv.set_value(21.6).unwrap();
        assert!(!conv.is_invalid_data());
    }

    #[test]
    fn test_value_as_text() {
        let mut conv = DptConverter::<Dpt9>::new(&Dpt9::TEMPERATURE);
        conv.set_frame(&[0x0C, 0x38]).unwrap();
        assert_eq!(conv.value_as_text().unwrap().as_str(), "21.60 °C");

        conv.set_value(-1.0).unwrap();
        assert_eq!(conv.value_as_text().unwrap().as_str(), "-1.00 °C");
    }

    #[test]
    fn test_descriptor_table() {
        assert_eq!(Dpt9::descriptors().len(), 20);
        assert!(Dpt9::descriptors()[0].id.is_generic());
        assert_eq!(Dpt9::find(DptId::new(9, 4)).unwrap().unit, Some("lx"));
        assert!(Dpt9::find(DptId::new(9, 9)).is_none());
        assert!(Dpt9::find(DptId::new(1, 1)).is_none());
    }

    #[test]
    fn test_apdu_size() {
        assert_eq!(Dpt9::APDU_SIZE, 2);
        assert_eq!(converter().apdu_size(), 2);
    }
}
