//! Transfer sequencer.
//!
//! Accepts a byte while idle, then for each of its eight bits (most significant first) presents the
//! bit on the serial line and requests one shift strobe, and finally requests one latch strobe.
//! Every strobe goes through the same two-edge handshake: the request is withdrawn only after the
//! line has been seen high, and the next step starts only after the line has been seen low again.

use std::fmt;

use thiserror::Error;

use crate::config::RequestMode;
use crate::fsm::Fsm;
use crate::shift_buffer::{ShiftBuffer, BYTE_BITS};

/// Step of the per-bit shift handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShiftStep {
    /// Present the next bit on the serial line.
    Inject,
    /// Assert the shift strobe request.
    Request,
    /// Wait for the shift strobe to rise, then withdraw the request.
    Withdraw,
    /// Wait for the shift strobe to fall, then count the bit.
    Settle,
}

/// Step of the latch handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LatchStep {
    /// Assert the latch strobe request.
    Request,
    /// Wait for the latch strobe to rise, then withdraw the request.
    Withdraw,
    /// Wait for the latch strobe to fall, then finish the transfer.
    Settle,
}

/// Sequencer phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Ready for a new byte.
    #[default]
    Idle,
    /// Shifting the pending byte out.
    Shift(ShiftStep),
    /// Latching the shifted byte onto the chip's outputs.
    Latch(LatchStep),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Shift(step) => write!(f, "shift/{step:?}"),
            Self::Latch(step) => write!(f, "latch/{step:?}"),
        }
    }
}

/// Inconsistent committed sequencer state. Each one resets the sequencer to idle.
#[allow(missing_docs)]
#[allow(variant_size_differences)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerFault {
    #[error("bit counter {bit} out of range while shifting")]
    BitCountOutOfRange { bit: u8 },

    #[error("pulse requests (shift {shift_request}, latch {latch_request}) do not match phase {phase}")]
    RequestMismatch { phase: Phase, shift_request: bool, latch_request: bool },
}

/// Values the sequencer samples each tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SequencerInput {
    /// Byte presented by the caller.
    pub byte: u8,
    /// Whether the caller requests a transfer.
    pub request: bool,
    /// Committed shift strobe level.
    pub shift_line: bool,
    /// Committed latch strobe level.
    pub latch_line: bool,
}

/// Transfer sequencer. Sole writer of the pending byte, the shift buffer, the ready flag, and both
/// pulse requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequencer {
    mode: RequestMode,
    phase: Phase,
    pending: u8,
    bit: u8,
    buffer: ShiftBuffer,
    ready: bool,
    shift_request: bool,
    latch_request: bool,
    last_request: bool,
    done: bool,
    fault: Option<SequencerFault>,
}

impl Sequencer {
    /// Creates an idle, ready sequencer.
    pub fn new(mode: RequestMode) -> Self {
        Self {
            mode,
            phase: Phase::Idle,
            pending: 0,
            bit: 0,
            buffer: ShiftBuffer::default(),
            ready: true,
            shift_request: false,
            latch_request: false,
            last_request: false,
            done: false,
            fault: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase { self.phase }

    /// Byte latched from the caller when the current (or last) transfer was accepted.
    pub fn pending(&self) -> u8 { self.pending }

    /// Bits of the current transfer fully shifted so far.
    pub fn bit(&self) -> u8 { self.bit }

    /// Shift buffer contents.
    pub fn buffer(&self) -> ShiftBuffer { self.buffer }

    /// Whether a new byte is accepted.
    pub fn ready(&self) -> bool { self.ready }

    /// Request to the shift strobe generator.
    pub fn shift_request(&self) -> bool { self.shift_request }

    /// Request to the latch strobe generator.
    pub fn latch_request(&self) -> bool { self.latch_request }

    /// Request level sampled by the last tick. Edge mode accepts only once this has been low.
    pub fn last_request(&self) -> bool { self.last_request }

    /// High for the one tick on which a transfer finished.
    pub fn done(&self) -> bool { self.done }

    /// Fault detected by the tick that produced this state.
    pub fn fault(&self) -> Option<SequencerFault> { self.fault }

    /// Level of the serial data line.
    pub fn serial_out(&self) -> bool { self.buffer.serial_out() }

    /// Checks that the committed state is one the sequencer can reach.
    fn check(&self) -> Result<(), SequencerFault> {
        if matches!(self.phase, Phase::Shift(_)) && self.bit >= BYTE_BITS {
            return Err(SequencerFault::BitCountOutOfRange { bit: self.bit });
        }

        // Each request is high exactly while its handshake waits for the rising edge.
        let shift_expected = self.phase == Phase::Shift(ShiftStep::Withdraw);
        let latch_expected = self.phase == Phase::Latch(LatchStep::Withdraw);
        if self.shift_request != shift_expected || self.latch_request != latch_expected {
            return Err(SequencerFault::RequestMismatch {
                phase: self.phase,
                shift_request: self.shift_request,
                latch_request: self.latch_request,
            });
        }

        Ok(())
    }

    /// Abandons whatever was in progress. The shift buffer is left as is so the serial line holds.
    fn reset(&self, fault: SequencerFault) -> Self {
        Self {
            phase: Phase::Idle,
            bit: 0,
            ready: true,
            shift_request: false,
            latch_request: false,
            done: false,
            fault: Some(fault),
            ..*self
        }
    }

    #[cfg(test)]
    pub(crate) fn corrupt(self, phase: Phase, bit: u8, shift_request: bool, latch_request: bool) -> Self {
        Self { phase, bit, shift_request, latch_request, ready: false, ..self }
    }
}

impl Fsm for Sequencer {
    type Input = SequencerInput;

    fn next(&self, input: SequencerInput) -> Self {
        if let Err(fault) = self.check() {
            return Self { last_request: input.request, ..self.reset(fault) };
        }

        let mut next = Self { last_request: input.request, done: false, fault: None, ..*self };

        match self.phase {
            Phase::Idle => {
                let requested = match self.mode {
                    RequestMode::Level => input.request,
                    RequestMode::Edge => input.request && !self.last_request,
                };

                if requested {
                    next.pending = input.byte;
                    next.buffer = ShiftBuffer::load(input.byte);
                    next.ready = false;
                    next.bit = 0;
                    next.shift_request = false;
                    next.latch_request = false;
                    next.phase = Phase::Shift(ShiftStep::Inject);
                } else {
                    next.ready = true;
                }
            }
            Phase::Shift(ShiftStep::Inject) => {
                next.buffer = self.buffer.shift();
                next.phase = Phase::Shift(ShiftStep::Request);
            }
            Phase::Shift(ShiftStep::Request) => {
                next.shift_request = true;
                next.phase = Phase::Shift(ShiftStep::Withdraw);
            }
            Phase::Shift(ShiftStep::Withdraw) => {
                if input.shift_line {
                    next.shift_request = false;
                    next.phase = Phase::Shift(ShiftStep::Settle);
                }
            }
            Phase::Shift(ShiftStep::Settle) => {
                if !input.shift_line {
                    next.bit = self.bit + 1;
                    next.phase = if next.bit == BYTE_BITS {
                        Phase::Latch(LatchStep::Request)
                    } else {
                        Phase::Shift(ShiftStep::Inject)
                    };
                }
            }
            Phase::Latch(LatchStep::Request) => {
                next.latch_request = true;
                next.phase = Phase::Latch(LatchStep::Withdraw);
            }
            Phase::Latch(LatchStep::Withdraw) => {
                if input.latch_line {
                    next.latch_request = false;
                    next.phase = Phase::Latch(LatchStep::Settle);
                }
            }
            Phase::Latch(LatchStep::Settle) => {
                if !input.latch_line {
                    next.bit = 0;
                    next.ready = true;
                    next.done = true;
                    next.phase = Phase::Idle;
                }
            }
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(request: bool) -> SequencerInput { SequencerInput { byte: 0xA5, request, ..Default::default() } }

    #[test]
    fn idle_holds_ready_without_request() {
        let sequencer = Sequencer::new(RequestMode::Level);
        let next = sequencer.next(input(false));
        assert_eq!(next.phase(), Phase::Idle);
        assert!(next.ready());
        assert!(!next.shift_request() && !next.latch_request());
    }

    #[test]
    fn accepting_latches_byte_and_drops_ready() {
        let next = Sequencer::new(RequestMode::Level).next(input(true));
        assert_eq!(next.phase(), Phase::Shift(ShiftStep::Inject));
        assert_eq!(next.pending(), 0xA5);
        assert_eq!(next.buffer(), ShiftBuffer::load(0xA5));
        assert!(!next.ready());
        assert_eq!(next.bit(), 0);
    }

    #[test]
    fn withdraw_waits_for_rising_edge() {
        let mut sequencer = Sequencer::new(RequestMode::Level).next(input(true));
        sequencer = sequencer.next(input(false));
        sequencer = sequencer.next(input(false));
        assert_eq!(sequencer.phase(), Phase::Shift(ShiftStep::Withdraw));
        assert!(sequencer.shift_request());
        assert!(sequencer.serial_out());

        for _ in 0..10 {
            sequencer = sequencer.next(input(false));
            assert_eq!(sequencer.phase(), Phase::Shift(ShiftStep::Withdraw));
            assert!(sequencer.shift_request());
        }

        sequencer = sequencer.next(SequencerInput { shift_line: true, ..input(false) });
        assert_eq!(sequencer.phase(), Phase::Shift(ShiftStep::Settle));
        assert!(!sequencer.shift_request());

        sequencer = sequencer.next(SequencerInput { shift_line: true, ..input(false) });
        assert_eq!(sequencer.phase(), Phase::Shift(ShiftStep::Settle));
        assert_eq!(sequencer.bit(), 0);

        sequencer = sequencer.next(input(false));
        assert_eq!(sequencer.phase(), Phase::Shift(ShiftStep::Inject));
        assert_eq!(sequencer.bit(), 1);
    }

    #[test]
    fn edge_mode_needs_fresh_rising_edge() {
        let sequencer = Sequencer::new(RequestMode::Edge);

        let held = sequencer.next(input(true));
        assert_eq!(held.phase(), Phase::Shift(ShiftStep::Inject));

        let mut idle = sequencer.next(input(true));
        idle.phase = Phase::Idle;
        idle.ready = true;
        assert_eq!(idle.next(input(true)).phase(), Phase::Idle);
        assert_eq!(idle.next(input(false)).next(input(true)).phase(), Phase::Shift(ShiftStep::Inject));
    }

    #[test]
    fn bit_counter_out_of_range_resets() {
        let corrupt = Sequencer::new(RequestMode::Level).corrupt(Phase::Shift(ShiftStep::Inject), 9, false, false);
        let next = corrupt.next(input(false));
        assert_eq!(next.phase(), Phase::Idle);
        assert_eq!(next.bit(), 0);
        assert!(next.ready());
        assert_eq!(next.fault(), Some(SequencerFault::BitCountOutOfRange { bit: 9 }));

        // The fault is reported once; a later tick is clean.
        assert_eq!(next.next(input(false)).fault(), None);
    }

    #[test]
    fn overlapping_requests_reset() {
        let corrupt =
            Sequencer::new(RequestMode::Level).corrupt(Phase::Shift(ShiftStep::Withdraw), 3, true, true);
        let next = corrupt.next(input(true));
        assert_eq!(
            next.fault(),
            Some(SequencerFault::RequestMismatch {
                phase: Phase::Shift(ShiftStep::Withdraw),
                shift_request: true,
                latch_request: true,
            })
        );
        assert_eq!(next.phase(), Phase::Idle);
        assert!(!next.shift_request() && !next.latch_request());
        assert!(next.ready());
    }

    #[test]
    fn fault_message() {
        let fault = SequencerFault::RequestMismatch { phase: Phase::Idle, shift_request: true, latch_request: false };
        assert_eq!(fault.to_string(), "pulse requests (shift true, latch false) do not match phase idle");
    }
}
