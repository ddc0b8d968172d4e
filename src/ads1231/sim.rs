//! Host-side simulated converter for tests.
//!
//! All pins share one state so a test can script the samples the converter
//! will shift out, short a line so its wire level disagrees with what was
//! driven, make the HAL fail, and inspect the edges and delays the driver
//! produced.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

use super::protocol::{CODE_BITS, CODE_MASK};

/// Clock held high longer than this puts the simulated device in standby.
const STANDBY_HOLD_NS: u64 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Clock(bool),
    Power(bool),
    Speed(bool),
    Delay(u64),
}

/// Error returned by every simulated pin once the failure budget runs out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimError;

impl digital::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Default)]
struct State {
    clock: bool,
    power: bool,
    speed: bool,
    samples: VecDeque<u32>,
    bit: u8,
    held_high_ns: u64,
    busy: bool,
    stuck_clock: Option<bool>,
    stuck_power: Option<bool>,
    fail_after: Option<u32>,
    rising_edges: u32,
    elapsed_ns: u64,
    events: Vec<Event>,
}

impl State {
    fn access(&mut self) -> Result<(), SimError> {
        match self.fail_after.as_mut() {
            Some(0) => Err(SimError),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn data_high(&self) -> bool {
        match self.bit {
            0 => self.busy || self.samples.is_empty(),
            bit if bit <= CODE_BITS => {
                let sample = self.samples.front().copied().unwrap_or(CODE_MASK);
                (sample >> (CODE_BITS - bit)) & 1 == 1
            }
            _ => true,
        }
    }

    fn drive_clock(&mut self, high: bool) {
        self.events.push(Event::Clock(high));
        match (self.clock, high) {
            (false, true) => {
                self.rising_edges += 1;
                self.held_high_ns = 0;
                if self.bit > 0 || !self.data_high() {
                    self.bit += 1;
                }
                if self.bit > CODE_BITS {
                    self.samples.pop_front();
                    self.bit = 0;
                }
            }
            (true, false) if self.held_high_ns >= STANDBY_HOLD_NS => {
                // leaving standby restarts the conversion
                self.bit = 0;
            }
            _ => {}
        }
        self.clock = high;
    }

    fn drive_power(&mut self, high: bool) {
        self.events.push(Event::Power(high));
        if !high {
            self.bit = 0;
        }
        self.power = high;
    }
}

#[derive(Clone, Default)]
pub struct Sim(Rc<RefCell<State>>);

pub struct SimData(Rc<RefCell<State>>);
pub struct SimClock(Rc<RefCell<State>>);
pub struct SimPower(Rc<RefCell<State>>);
pub struct SimSpeed(Rc<RefCell<State>>);
pub struct SimDelay(Rc<RefCell<State>>);

impl Sim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parts(&self) -> (SimData, SimClock, SimPower, SimSpeed, SimDelay) {
        (
            SimData(self.0.clone()),
            SimClock(self.0.clone()),
            SimPower(self.0.clone()),
            SimSpeed(self.0.clone()),
            SimDelay(self.0.clone()),
        )
    }

    pub fn push_sample(&self, code: u32) {
        self.0.borrow_mut().samples.push_back(code & CODE_MASK);
    }

    pub fn push_samples(&self, codes: &[u32]) {
        for &code in codes {
            self.push_sample(code);
        }
    }

    /// Hold DRDY/DOUT high as if no conversion ever completes.
    pub fn hold_busy(&self, busy: bool) {
        self.0.borrow_mut().busy = busy;
    }

    /// Short SCLK at the pad: writes still land in the latch but the wire
    /// reads back `level`.
    pub fn stick_clock(&self, level: Option<bool>) {
        self.0.borrow_mut().stuck_clock = level;
    }

    pub fn stick_power(&self, level: Option<bool>) {
        self.0.borrow_mut().stuck_power = level;
    }

    /// Let `ops` more pin operations succeed, then fail every one after.
    pub fn fail_after(&self, ops: Option<u32>) {
        self.0.borrow_mut().fail_after = ops;
    }

    pub fn remaining_samples(&self) -> usize {
        self.0.borrow().samples.len()
    }

    pub fn rising_edges(&self) -> u32 {
        self.0.borrow().rising_edges
    }

    pub fn clock_level(&self) -> bool {
        self.0.borrow().clock
    }

    pub fn power_level(&self) -> bool {
        self.0.borrow().power
    }

    pub fn speed_level(&self) -> bool {
        self.0.borrow().speed
    }

    pub fn elapsed_us(&self) -> u64 {
        self.0.borrow().elapsed_ns / 1000
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        let mut state = self.0.borrow_mut();
        state.events.clear();
        state.rising_edges = 0;
        state.elapsed_ns = 0;
    }
}

impl ErrorType for SimData {
    type Error = SimError;
}

impl InputPin for SimData {
    fn is_high(&mut self) -> Result<bool, SimError> {
        let mut state = self.0.borrow_mut();
        state.access()?;
        Ok(state.data_high())
    }

    fn is_low(&mut self) -> Result<bool, SimError> {
        self.is_high().map(|high| !high)
    }
}

impl ErrorType for SimClock {
    type Error = SimError;
}

impl OutputPin for SimClock {
    fn set_low(&mut self) -> Result<(), SimError> {
        let mut state = self.0.borrow_mut();
        state.access()?;
        state.drive_clock(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimError> {
        let mut state = self.0.borrow_mut();
        state.access()?;
        state.drive_clock(true);
        Ok(())
    }
}

impl InputPin for SimClock {
    fn is_high(&mut self) -> Result<bool, SimError> {
        let mut state = self.0.borrow_mut();
        state.access()?;
        Ok(state.stuck_clock.unwrap_or(state.clock))
    }

    fn is_low(&mut self) -> Result<bool, SimError> {
        self.is_high().map(|high| !high)
    }
}

impl ErrorType for SimPower {
    type Error = SimError;
}

impl OutputPin for SimPower {
    fn set_low(&mut self) -> Result<(), SimError> {
        let mut state = self.0.borrow_mut();
        state.access()?;
        state.drive_power(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimError> {
        let mut state = self.0.borrow_mut();
        state.access()?;
        state.drive_power(true);
        Ok(())
    }
}

impl InputPin for SimPower {
    fn is_high(&mut self) -> Result<bool, SimError> {
        let mut state = self.0.borrow_mut();
        state.access()?;
        Ok(state.stuck_power.unwrap_or(state.power))
    }

    fn is_low(&mut self) -> Result<bool, SimError> {
        self.is_high().map(|high| !high)
    }
}

impl ErrorType for SimSpeed {
    type Error = SimError;
}

impl OutputPin for SimSpeed {
    fn set_low(&mut self) -> Result<(), SimError> {
        let mut state = self.0.borrow_mut();
        state.access()?;
        state.events.push(Event::Speed(false));
        state.speed = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimError> {
        let mut state = self.0.borrow_mut();
        state.access()?;
        state.events.push(Event::Speed(true));
        state.speed = true;
        Ok(())
    }
}

impl SimDelay {
    fn record(&mut self, ns: u64) {
        let mut state = self.0.borrow_mut();
        state.events.push(Event::Delay(ns));
        state.elapsed_ns += ns;
        if state.clock {
            state.held_high_ns += ns;
        }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.record(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(u64::from(ms) * 1_000_000);
    }
}
