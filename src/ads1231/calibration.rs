//! Averaging and the two-point mass calibration.
//!
//! The load cell is treated as linear between the zero-load code `Czs` and
//! the code `Cfs` read with a known mass `Wfs` applied:
//!
//! ```text
//! mass = (code - Czs) / ((Cfs - Czs) / Wfs)
//! ```
//!
//! Codes below `Czs` clamp to zero; the scale never reports negative mass.

use core::num::NonZeroU32;

/// How many conversions [`crate::ads1231::Ads1231::read_code`] averages.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Averages {
    X1 = 1,
    X2 = 2,
    X4 = 4,
    X8 = 8,
    X10 = 10,
    X16 = 16,
    X32 = 32,
    X50 = 50,
    X64 = 64,
    X100 = 100,
    X128 = 128,
}

impl Averages {
    pub const fn count(self) -> u32 {
        self as u32
    }
}

/// Linear calibration mapping an ADC code to mass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Calibration {
    zero_offset: u32,
    slope_divisor: NonZeroU32,
}

impl Calibration {
    /// Reference load cell: 12500 at zero load, 19600 with 100g applied.
    pub const REFERENCE: Calibration = Calibration {
        zero_offset: 12500,
        slope_divisor: match NonZeroU32::new(71) {
            Some(d) => d,
            None => unreachable!(),
        },
    };

    pub const fn new(zero_offset: u32, slope_divisor: NonZeroU32) -> Self {
        Self {
            zero_offset,
            slope_divisor,
        }
    }

    /// Derive the calibration from a zero-load reading and a reading taken
    /// with `known_mass` applied.
    ///
    /// Returns `None` if the loaded code does not sit at least `known_mass`
    /// codes above the zero code, since no positive integer divisor exists.
    pub fn from_reference(zero_code: u32, loaded_code: u32, known_mass: u32) -> Option<Self> {
        let span = loaded_code.checked_sub(zero_code)?;
        let divisor = span.checked_div(known_mass)?;
        Some(Self::new(zero_code, NonZeroU32::new(divisor)?))
    }

    pub const fn zero_offset(&self) -> u32 {
        self.zero_offset
    }

    pub const fn slope_divisor(&self) -> NonZeroU32 {
        self.slope_divisor
    }

    pub fn set_zero_offset(&mut self, zero_offset: u32) {
        self.zero_offset = zero_offset;
    }

    pub fn set_slope_divisor(&mut self, slope_divisor: NonZeroU32) {
        self.slope_divisor = slope_divisor;
    }

    /// Convert an averaged ADC code to mass.
    pub const fn mass(&self, code: u32) -> u32 {
        if code >= self.zero_offset {
            (code - self.zero_offset) / self.slope_divisor.get()
        } else {
            0
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// The 4-byte little-endian value a mass notification carries.
pub const fn mass_payload(mass: u32) -> [u8; 4] {
    mass.to_le_bytes()
}

/// Integer mean, remainder discarded.
pub(crate) fn average(sum: u64, count: u32) -> u32 {
    // 128 samples of 24 bits fit comfortably; the mean is again 24 bits.
    (sum / u64::from(count)) as u32
}
