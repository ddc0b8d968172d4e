//! Bit-banged read-out of one conversion result.
//!
//! The converter shifts its result out on DRDY/DOUT, one bit per SCLK
//! pulse, MSB first. A 25th pulse forces DOUT high until the next
//! conversion completes. SCLK pulses must be at least 100ns wide, which
//! plain GPIO writes satisfy, and must stay short, so no delay is ever
//! inserted between edges.

use embedded_hal::digital::{InputPin, OutputPin};

/// Bits in one conversion result.
pub const CODE_BITS: u8 = 24;

/// Mask of a valid code.
pub const CODE_MASK: u32 = (1 << CODE_BITS) - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Clocking { remaining: u8, acc: u32 },
    Settle { code: u32 },
    Done { code: u32 },
}

/// Shifts a single result out of the converter.
///
/// The caller is expected to hold a critical section for the whole call;
/// once clocking has started it must run to the end.
pub(crate) struct Shifter<'a, Clock, Data> {
    clock: &'a mut Clock,
    data: &'a mut Data,
    phase: Phase,
}

impl<'a, Clock, Data, E> Shifter<'a, Clock, Data>
where
    Clock: OutputPin<Error = E>,
    Data: InputPin<Error = E>,
{
    pub fn new(clock: &'a mut Clock, data: &'a mut Data) -> Self {
        Self {
            clock,
            data,
            phase: Phase::Idle,
        }
    }

    /// Run all phases and return the 24-bit code.
    pub fn run(mut self) -> Result<u32, E> {
        loop {
            if let Phase::Done { code } = self.phase {
                return Ok(code);
            }
            self.phase = self.step()?;
        }
    }

    fn step(&mut self) -> Result<Phase, E> {
        Ok(match self.phase {
            Phase::Idle => Phase::Clocking {
                remaining: CODE_BITS,
                acc: 0,
            },
            Phase::Clocking { remaining: 0, acc } => Phase::Settle { code: acc },
            Phase::Clocking { remaining, acc } => {
                self.clock.set_high()?;
                let mut acc = acc << 1;
                self.clock.set_low()?;
                if self.data.is_high()? {
                    acc |= 1;
                }
                Phase::Clocking {
                    remaining: remaining - 1,
                    acc,
                }
            }
            Phase::Settle { code } => {
                // 25th pulse, DOUT goes high until the next result
                self.clock.set_high()?;
                self.clock.set_low()?;
                Phase::Done { code }
            }
            Phase::Done { code } => Phase::Done { code },
        })
    }
}
