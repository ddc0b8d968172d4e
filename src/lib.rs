#![cfg_attr(not(test), no_std)]

pub mod ads1231;

pub use ads1231::calibration::{mass_payload, Averages, Calibration};
pub use ads1231::timing::DataRate;
pub use ads1231::{Ads1231, Config, Error, Line, Mode};

pub trait LoadCell {
    type Code;
    type Offset;
    type Scale;
    type Error;

    /// Read the averaged raw code from the load cell
    fn read(&mut self) -> Result<Self::Code, Self::Error>;

    /// Read the value after applying the calibration, as mass.
    fn read_scaled(&mut self) -> Result<u32, Self::Error>;

    /// Zero the load cell offset by averaging `num_samples` readings
    fn tare(&mut self, num_samples: usize) -> Result<(), Self::Error>;

    /// Get the load cell offset.
    fn get_offset(&self) -> Self::Offset;

    /// Set the scale (AKA calibrate the scale).
    /// Use this to ensure that 1kg ~ 1kg
    fn set_scale(&mut self, scale: Self::Scale);

    /// Get the scale.
    fn get_scale(&self) -> Self::Scale;
}
