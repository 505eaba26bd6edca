//! Forwarding driver outputs to physical pins.

use embedded_hal::digital::{OutputPin, PinState};

use crate::driver::Outputs;

/// The four pins of the chip's control interface.
#[derive(Debug)]
pub struct PinBank<SER, SRCLK, RCLK, OE> {
    /// Serial data (SER).
    pub ser: SER,
    /// Shift register clock (SRCLK).
    pub srclk: SRCLK,
    /// Storage register clock (RCLK).
    pub rclk: RCLK,
    /// Active-low output enable (/OE).
    pub oe_n: OE,
}

impl<SER, SRCLK, RCLK, OE, E> PinBank<SER, SRCLK, RCLK, OE>
where
    SER: OutputPin<Error = E>,
    SRCLK: OutputPin<Error = E>,
    RCLK: OutputPin<Error = E>,
    OE: OutputPin<Error = E>,
{
    /// Takes the pins and drives them to the driver's power-up levels: strobes and data low,
    /// outputs disabled.
    pub fn new(ser: SER, srclk: SRCLK, rclk: RCLK, oe_n: OE) -> Result<Self, E> {
        let mut bank = Self { ser, srclk, rclk, oe_n };
        bank.oe_n.set_high()?;
        bank.ser.set_low()?;
        bank.srclk.set_low()?;
        bank.rclk.set_low()?;
        Ok(bank)
    }

    /// Drives every pin to the level in `outputs`.
    ///
    /// Serial data is written before the strobes so a strobe edge on the same tick already sees it.
    pub fn apply(&mut self, outputs: &Outputs) -> Result<(), E> {
        self.ser.set_state(PinState::from(outputs.serial_out))?;
        self.srclk.set_state(PinState::from(outputs.shift_strobe))?;
        self.rclk.set_state(PinState::from(outputs.latch_strobe))?;
        self.oe_n.set_state(PinState::from(outputs.output_enable_n()))
    }

    /// Releases the pins.
    pub fn release(self) -> (SER, SRCLK, RCLK, OE) { (self.ser, self.srclk, self.rclk, self.oe_n) }
}
