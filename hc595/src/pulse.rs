//! Strobe pulse generator.
//!
//! One instance drives the shift strobe (SRCLK), another the latch strobe (RCLK). On request the
//! line stays low for the setup time, goes high for the pulse duration, and then stays low until
//! the requester withdraws the request.

use crate::config::Timing;
use crate::fsm::Fsm;

/// Generator state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseState {
    /// Waiting for a request.
    #[default]
    Idle,
    /// Request seen, waiting out the setup time.
    Armed,
    /// Line high, waiting out the pulse duration.
    Active,
    /// Pulse done, waiting for the request to be withdrawn.
    Released,
}

/// Pulse generator. The input is the requester's committed pulse request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseGenerator {
    setup_ticks: u32,
    pulse_ticks: u32,
    state: PulseState,
    elapsed: u32,
    line: bool,
}

impl PulseGenerator {
    /// Creates an idle generator with a low line.
    pub fn new(timing: &Timing) -> Self {
        Self {
            setup_ticks: timing.setup_ticks(),
            pulse_ticks: timing.pulse_ticks(),
            state: PulseState::Idle,
            elapsed: 0,
            line: false,
        }
    }

    /// Level of the driven strobe line.
    pub fn line(&self) -> bool { self.line }

    /// Current state.
    pub fn state(&self) -> PulseState { self.state }
}

impl Fsm for PulseGenerator {
    type Input = bool;

    fn next(&self, request: bool) -> Self {
        let mut next = *self;

        match self.state {
            PulseState::Idle => {
                if request {
                    next.state = PulseState::Armed;
                    next.line = false;
                    next.elapsed = 0;
                }
            }
            PulseState::Armed => {
                if self.elapsed + 1 >= self.setup_ticks {
                    next.state = PulseState::Active;
                    next.line = true;
                    next.elapsed = 0;
                } else {
                    next.elapsed = self.elapsed + 1;
                }
            }
            PulseState::Active => {
                if self.elapsed + 1 >= self.pulse_ticks {
                    next.state = PulseState::Released;
                    next.line = false;
                    next.elapsed = 0;
                } else {
                    next.elapsed = self.elapsed + 1;
                }
            }
            PulseState::Released => {
                if !request {
                    next.state = PulseState::Idle;
                }
            }
        }

        next
    }
}
