//! Datasheet timing for the two data rates.
//!
//! Every operational delay is a datasheet bound scaled by [`SAFETY_FACTOR`],
//! except where the scaled value would be needlessly long and a fixed margin
//! is added instead.

use embedded_hal::digital::PinState;

/// Multiplier applied to datasheet minimum/typical timings.
pub const SAFETY_FACTOR: u32 = 2;

/// Interval between data line polls in [`crate::ads1231::Ads1231::wait_data_ready`].
pub const DATA_READY_POLL_US: u32 = 100;

const WAKEUP_TYP_US: u32 = 8;
const PDWN_MIN_US: u32 = 26;

/// Conversion rate, selected by the SPEED pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataRate {
    /// 10 samples per second, SPEED low. Lower noise.
    Slow,
    /// 80 samples per second, SPEED high.
    Fast,
}

impl DataRate {
    /// Level the SPEED pin must hold for this rate.
    pub const fn speed_level(self) -> PinState {
        match self {
            DataRate::Slow => PinState::Low,
            DataRate::Fast => PinState::High,
        }
    }

    pub const fn timing(self) -> Timing {
        match self {
            DataRate::Fast => Timing {
                wakeup_us: SAFETY_FACTOR * WAKEUP_TYP_US,
                power_down_pulse_us: SAFETY_FACTOR * PDWN_MIN_US,
                // tDSS max 12.44ms
                standby_poll_ms: SAFETY_FACTOR * 13,
                // t_STANDBY min 12.5ms
                standby_activation_ms: SAFETY_FACTOR * 13,
                // t_S_RDY typ 52.6ms
                ready_ms: SAFETY_FACTOR * 53,
                conversion_ms: SAFETY_FACTOR * 13,
            },
            DataRate::Slow => Timing {
                wakeup_us: SAFETY_FACTOR * WAKEUP_TYP_US,
                power_down_pulse_us: SAFETY_FACTOR * PDWN_MIN_US,
                // tDSS max 99.94ms
                standby_poll_ms: 100 + 10,
                // t_STANDBY min 100ms
                standby_activation_ms: SAFETY_FACTOR * 100,
                // t_S_RDY typ 401.8ms
                ready_ms: 402 + 100,
                conversion_ms: SAFETY_FACTOR * 100,
            },
        }
    }
}

/// Operational delays for one data rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Wake-up after PDWN or SCLK is released.
    pub wakeup_us: u32,
    /// Time PDWN is held low to power down / reset.
    pub power_down_pulse_us: u32,
    /// Sleep between data-ready polls before entering standby.
    pub standby_poll_ms: u32,
    /// SCLK held high this long to activate standby.
    pub standby_activation_ms: u32,
    /// Data ready after leaving standby or a reset.
    pub ready_ms: u32,
    /// One conversion period, waited before each sample is shifted.
    pub conversion_ms: u32,
}

impl Timing {
    /// Number of data-ready polls `standby_enter` makes before giving up.
    pub const fn standby_poll_budget(&self) -> u32 {
        self.ready_ms.div_ceil(self.standby_poll_ms)
    }

    /// The data-ready timeout as a count of [`DATA_READY_POLL_US`] ticks.
    pub const fn data_ready_budget(&self) -> u32 {
        self.ready_ms * 1000 / DATA_READY_POLL_US
    }
}
