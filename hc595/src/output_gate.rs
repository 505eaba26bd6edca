//! Output enable gate.
//!
//! Starts disabled, holding the chip's outputs in high impedance until the first byte has been
//! latched, then stays enabled.

use crate::fsm::Fsm;

/// One-way output enable latch. The input is the sequencer's transfer-complete strobe.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutputGate {
    enabled: bool,
}

impl OutputGate {
    /// Whether the chip's outputs are driven.
    pub fn enabled(&self) -> bool { self.enabled }

    /// Level of the chip's active-low output enable pin.
    pub fn output_enable_n(&self) -> bool { !self.enabled }
}

impl Fsm for OutputGate {
    type Input = bool;

    fn next(&self, done: bool) -> Self { Self { enabled: self.enabled || done } }
}
