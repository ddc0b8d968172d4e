//! ADS1231 24-bit analog-to-digital converter for bridge sensors.
//!
//! The converter has no register interface. It is driven through four lines:
//!
//! * DRDY/DOUT, an input. Low means a result is ready, and the result is then
//!   shifted out on it.
//! * SCLK, an output. Clocks the result out. Held high after data ready it
//!   puts the converter in standby.
//! * PDWN, an active-low output. Low powers the converter down and resets it.
//! * SPEED, an output selecting 10 or 80 samples per second.
//!
//! Every mode change is followed by a datasheet settle delay and a readback
//! of the commanded line. A readback that disagrees is reported, never
//! retried.

pub mod calibration;
mod protocol;
#[cfg(test)]
mod sim;
pub mod timing;

use core::fmt;
use core::num::NonZeroU32;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use log::{debug, trace, warn};

use crate::LoadCell;
use calibration::{average, Averages, Calibration};
use protocol::Shifter;
use timing::{DataRate, Timing, DATA_READY_POLL_US};

pub use protocol::{CODE_BITS, CODE_MASK};

/// Operating mode of the converter, as last commanded and verified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    PoweredDown,
    /// Converting continuously; results can be read.
    Active,
    Standby,
}

/// Line whose level is read back from the wire after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    Clock,
    Power,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// The HAL reported an error on one of the pins.
    Pin(E),
    /// A commanded level was not observed on readback.
    Mismatch { line: Line, expected: PinState },
    /// The converter never signalled data ready.
    Timeout,
    /// The operation is not valid in the current mode.
    InvalidMode { mode: Mode },
    /// A tare was requested over zero samples.
    NoSamples,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Pin(e) => write!(f, "pin error: {e:?}"),
            Error::Mismatch { line, expected } => {
                write!(f, "{line:?} line did not read back {expected:?}")
            }
            Error::Timeout => f.write_str("converter never signalled data ready"),
            Error::InvalidMode { mode } => write!(f, "operation not allowed in {mode:?} mode"),
            Error::NoSamples => f.write_str("tare needs at least one sample"),
        }
    }
}

/// Settings fixed when the driver is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub data_rate: DataRate,
    pub averages: Averages,
    pub calibration: Calibration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_rate: DataRate::Fast,
            averages: Averages::X1,
            calibration: Calibration::REFERENCE,
        }
    }
}

pub struct Ads1231<Data, Clock, Power, Speed, Delay> {
    data: Data,
    clock: Clock,
    power: Power,
    speed: Speed,
    delay: Delay,
    config: Config,
    mode: Mode,
}

impl<Data, Clock, Power, Speed, Delay, E> Ads1231<Data, Clock, Power, Speed, Delay>
where
    Data: InputPin<Error = E>,
    Clock: OutputPin<Error = E> + InputPin<Error = E>,
    Power: OutputPin<Error = E> + InputPin<Error = E>,
    Speed: OutputPin<Error = E>,
    Delay: DelayNs,
{
    /// Take ownership of the pins and drive them to a known state.
    ///
    /// SPEED is set for the configured data rate and never changed again.
    /// SCLK idles low and PDWN is pulled low, so the converter starts out
    /// powered down; call [`Self::reset`] or [`Self::power_down_exit`]
    /// before reading.
    pub fn new(
        data: Data,
        mut clock: Clock,
        mut power: Power,
        mut speed: Speed,
        delay: Delay,
        config: Config,
    ) -> Result<Self, Error<E>> {
        speed
            .set_state(config.data_rate.speed_level())
            .map_err(Error::Pin)?;
        clock.set_low().map_err(Error::Pin)?;
        power.set_low().map_err(Error::Pin)?;
        trace!("ads1231 init, {:?}", config.data_rate);

        Ok(Self {
            data,
            clock,
            power,
            speed,
            delay,
            config,
            mode: Mode::PoweredDown,
        })
    }

    /// Destruct the driver and hand back the pins and delay.
    pub fn release(self) -> (Data, Clock, Power, Speed, Delay) {
        (self.data, self.clock, self.power, self.speed, self.delay)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data_rate(&self) -> DataRate {
        self.config.data_rate
    }

    pub fn calibration(&self) -> Calibration {
        self.config.calibration
    }

    /// Replace the calibration used by [`Self::read_mass`].
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.config.calibration = calibration;
    }

    fn timing(&self) -> Timing {
        self.config.data_rate.timing()
    }

    fn expect_mode(&self, expected: Mode) -> Result<(), Error<E>> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(Error::InvalidMode { mode: self.mode })
        }
    }

    /// True when the data line is low and a result can be shifted out.
    pub fn is_ready(&mut self) -> Result<bool, Error<E>> {
        self.data.is_low().map_err(Error::Pin)
    }

    /// Hold PDWN low. Allowed from any mode.
    pub fn power_down_enter(&mut self) -> Result<(), Error<E>> {
        self.power.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(self.timing().power_down_pulse_us);
        verify(&mut self.power, Line::Power, PinState::Low)?;

        self.mode = Mode::PoweredDown;
        trace!("ads1231 powered down");
        Ok(())
    }

    /// Release PDWN and return to [`Mode::Active`].
    pub fn power_down_exit(&mut self) -> Result<(), Error<E>> {
        self.expect_mode(Mode::PoweredDown)?;
        self.wake()?;

        self.mode = Mode::Active;
        trace!("ads1231 active");
        Ok(())
    }

    /// Pulse PDWN and wait until the first conversion can be trusted.
    ///
    /// Allowed from any mode. A failed readback of either edge is returned
    /// immediately and the ready delay is skipped; `Ok` means the full
    /// sequence ran and both edges verified.
    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.power_down_enter()?;
        self.wake()?;
        self.delay.delay_ms(self.timing().ready_ms);

        self.mode = Mode::Active;
        trace!("ads1231 reset");
        Ok(())
    }

    fn wake(&mut self) -> Result<(), Error<E>> {
        // SCLK high on wake-up would drop the converter straight into standby
        self.clock.set_low().map_err(Error::Pin)?;
        self.power.set_high().map_err(Error::Pin)?;
        self.delay.delay_us(self.timing().wakeup_us);
        verify(&mut self.power, Line::Power, PinState::High)
    }

    /// Wait for the current conversion to finish, then hold SCLK high.
    ///
    /// Polling gives up after the data-ready timeout of the configured rate,
    /// in which case SCLK is left low and the mode stays [`Mode::Active`].
    pub fn standby_enter(&mut self) -> Result<(), Error<E>> {
        self.expect_mode(Mode::Active)?;
        let timing = self.timing();

        let mut polls = timing.standby_poll_budget();
        while self.data.is_high().map_err(Error::Pin)? {
            if polls == 0 {
                warn!("ads1231 data ready not seen, standby not entered");
                return Err(Error::Timeout);
            }
            polls -= 1;
            self.delay.delay_ms(timing.standby_poll_ms);
        }

        self.clock.set_high().map_err(Error::Pin)?;
        self.delay.delay_ms(timing.standby_activation_ms);
        verify(&mut self.clock, Line::Clock, PinState::High)?;

        self.mode = Mode::Standby;
        trace!("ads1231 standby");
        Ok(())
    }

    /// Drop SCLK to leave standby.
    ///
    /// The converter restarts its conversion; the first result follows after
    /// the ready time of the configured rate.
    pub fn standby_exit(&mut self) -> Result<(), Error<E>> {
        self.expect_mode(Mode::Standby)?;

        self.clock.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(self.timing().wakeup_us);
        verify(&mut self.clock, Line::Clock, PinState::Low)?;

        self.mode = Mode::Active;
        trace!("ads1231 active");
        Ok(())
    }

    /// Poll the data line until a result is ready.
    ///
    /// Returns the number of poll ticks that were left over.
    pub fn wait_data_ready(&mut self) -> Result<u32, Error<E>> {
        self.expect_mode(Mode::Active)?;

        let mut ticks = self.timing().data_ready_budget();
        while self.data.is_high().map_err(Error::Pin)? {
            if ticks == 0 {
                warn!("ads1231 data ready timeout");
                return Err(Error::Timeout);
            }
            ticks -= 1;
            self.delay.delay_us(DATA_READY_POLL_US);
        }
        Ok(ticks)
    }

    /// Read and average the configured number of conversion results.
    ///
    /// Each sample is preceded by one conversion period rather than a
    /// data-ready poll, so the converter must already be converting
    /// steadily. Use [`Self::wait_data_ready`] first after a mode change.
    pub fn read_code(&mut self) -> Result<u32, Error<E>> {
        self.expect_mode(Mode::Active)?;
        let count = self.config.averages.count();
        let conversion_ms = self.timing().conversion_ms;

        let mut sum: u64 = 0;
        for _ in 0..count {
            self.delay.delay_ms(conversion_ms);
            let sample = critical_section::with(|_| {
                Shifter::new(&mut self.clock, &mut self.data).run()
            })
            .map_err(Error::Pin)?;
            sum += u64::from(sample);
        }

        let code = average(sum, count);
        debug!("ads1231 adc code = {}", code);
        Ok(code)
    }

    /// Read a code and convert it to mass with the current calibration.
    pub fn read_mass(&mut self) -> Result<u32, Error<E>> {
        let code = self.read_code()?;
        let mass = self.config.calibration.mass(code);
        debug!("ads1231 mass = {}", mass);
        Ok(mass)
    }
}

/// Read the pad level back, not the output latch, so a shorted or
/// miswired line is caught.
fn verify<P, E>(pin: &mut P, line: Line, expected: PinState) -> Result<(), Error<E>>
where
    P: InputPin<Error = E>,
{
    let observed = match expected {
        PinState::High => pin.is_high(),
        PinState::Low => pin.is_low(),
    }
    .map_err(Error::Pin)?;

    if observed {
        Ok(())
    } else {
        warn!("ads1231 {:?} line did not read back {:?}", line, expected);
        Err(Error::Mismatch { line, expected })
    }
}

impl<Data, Clock, Power, Speed, Delay, E> LoadCell for Ads1231<Data, Clock, Power, Speed, Delay>
where
    Data: InputPin<Error = E>,
    Clock: OutputPin<Error = E> + InputPin<Error = E>,
    Power: OutputPin<Error = E> + InputPin<Error = E>,
    Speed: OutputPin<Error = E>,
    Delay: DelayNs,
{
    type Code = u32;
    type Offset = u32;
    type Scale = NonZeroU32;
    type Error = Error<E>;

    fn read(&mut self) -> Result<u32, Error<E>> {
        self.read_code()
    }

    fn read_scaled(&mut self) -> Result<u32, Error<E>> {
        self.read_mass()
    }

    fn tare(&mut self, num_samples: usize) -> Result<(), Error<E>> {
        if num_samples == 0 {
            return Err(Error::NoSamples);
        }
        let mut sum: u64 = 0;
        for _ in 0..num_samples {
            sum += u64::from(self.read_code()?);
        }
        let offset = (sum / num_samples as u64) as u32;
        debug!("ads1231 tare offset = {}", offset);
        self.config.calibration.set_zero_offset(offset);
        Ok(())
    }

    fn get_offset(&self) -> u32 {
        self.config.calibration.zero_offset()
    }

    fn set_scale(&mut self, scale: NonZeroU32) {
        self.config.calibration.set_slope_divisor(scale);
    }

    fn get_scale(&self) -> NonZeroU32 {
        self.config.calibration.slope_divisor()
    }
}
