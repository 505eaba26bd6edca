//! Tick dispatcher and boundary surface.

use static_assertions::*;
use thiserror::Error;

use crate::config::{Config, ConfigError, Timing};
use crate::fsm::Fsm;
use crate::output_gate::OutputGate;
use crate::pulse::PulseGenerator;
use crate::sequencer::*;

/// Inputs presented by the caller. They persist across ticks until the next [`Driver::load`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Inputs {
    /// Byte to transfer.
    pub byte: u8,
    /// Whether a transfer is requested.
    pub request: bool,
}

/// Line levels committed by the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outputs {
    /// A new byte is accepted.
    pub ready: bool,
    /// Shift register clock (SRCLK).
    pub shift_strobe: bool,
    /// Storage register clock (RCLK).
    pub latch_strobe: bool,
    /// The chip's outputs are driven. The physical pin is active-low, see [`Outputs::output_enable_n`].
    pub output_enable: bool,
    /// Serial data (SER).
    pub serial_out: bool,
}

impl Outputs {
    /// Level of the chip's inverted output enable pin (/OE).
    pub fn output_enable_n(&self) -> bool { !self.output_enable }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Index of the tick, starting from 0.
    pub tick: u64,
    /// Outputs committed by the tick.
    pub outputs: Outputs,
    /// Byte accepted for transfer on this tick.
    pub accepted: Option<u8>,
    /// A transfer finished on this tick.
    pub completed: bool,
    /// The sequencer found itself in an invalid state and reset.
    pub fault: Option<SequencerFault>,
}

#[allow(missing_docs)]
#[allow(variant_size_differences)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("sequencer fault: {0}")]
    Fault(#[from] SequencerFault),

    #[error("transfer did not complete within {ticks} ticks")]
    Stalled { ticks: u64 },
}

/// Shift register driver.
///
/// Owns the sequencer, the shift and latch strobe generators, and the output gate. Each
/// [`Driver::tick`] computes every component's next state from the states committed by the
/// previous tick, then commits all of them together.
#[derive(Debug, Clone)]
pub struct Driver {
    timing: Timing,
    inputs: Inputs,
    sequencer: Sequencer,
    shift: PulseGenerator,
    latch: PulseGenerator,
    gate: OutputGate,
    ticks: u64,
    faults: u64,
}

assert_impl_all!(Driver: Send, Sync);

impl Driver {
    /// Creates a driver, rejecting timing the chip cannot follow.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let timing = config.validate()?;
        Ok(Self {
            timing,
            inputs: Inputs::default(),
            sequencer: Sequencer::new(config.request_mode),
            shift: PulseGenerator::new(&timing),
            latch: PulseGenerator::new(&timing),
            gate: OutputGate::default(),
            ticks: 0,
            faults: 0,
        })
    }

    /// Validated timing.
    pub fn timing(&self) -> &Timing { &self.timing }

    /// Presents `byte` and the transfer request for the following ticks.
    ///
    /// A request made while not ready is ignored; the byte is sampled only on the tick a transfer
    /// is accepted.
    pub fn load(&mut self, byte: u8, request: bool) { self.inputs = Inputs { byte, request }; }

    /// Currently presented inputs.
    pub fn inputs(&self) -> Inputs { self.inputs }

    /// Line levels committed by the last tick.
    pub fn outputs(&self) -> Outputs {
        Outputs {
            ready: self.sequencer.ready(),
            shift_strobe: self.shift.line(),
            latch_strobe: self.latch.line(),
            output_enable: self.gate.enabled(),
            serial_out: self.sequencer.serial_out(),
        }
    }

    /// Sequencer state.
    pub fn sequencer(&self) -> &Sequencer { &self.sequencer }

    /// Ticks evaluated so far.
    pub fn ticks(&self) -> u64 { self.ticks }

    /// Time covered by the ticks evaluated so far.
    pub fn elapsed_ns(&self) -> u64 { self.timing.ticks_to_ns(self.ticks) }

    /// Sequencer resets since construction.
    pub fn faults(&self) -> u64 { self.faults }

    /// Advances every component by one tick.
    pub fn tick(&mut self) -> TickReport {
        let sequencer = self.sequencer.next(SequencerInput {
            byte: self.inputs.byte,
            request: self.inputs.request,
            shift_line: self.shift.line(),
            latch_line: self.latch.line(),
        });
        let shift = self.shift.next(self.sequencer.shift_request());
        let latch = self.latch.next(self.sequencer.latch_request());
        let gate = self.gate.next(self.sequencer.done());

        let accepted = (self.sequencer.phase() == Phase::Idle && sequencer.phase() != Phase::Idle)
            .then_some(sequencer.pending());
        #[cfg(feature = "defmt")]
        let enabled = !self.gate.enabled() && gate.enabled();

        self.sequencer = sequencer;
        self.shift = shift;
        self.latch = latch;
        self.gate = gate;
        let tick = self.ticks;
        self.ticks += 1;
        if sequencer.fault().is_some() {
            self.faults += 1;
        }

        let report =
            TickReport { tick, outputs: self.outputs(), accepted, completed: sequencer.done(), fault: sequencer.fault() };
        #[cfg(feature = "defmt")]
        log(&report, sequencer.pending(), enabled);
        report
    }

    /// Transfers `byte` and waits until the chip has latched it. Returns the ticks spent, including
    /// any spent waiting for a previous transfer.
    ///
    /// The request is released once the byte is accepted. Outputs become enabled on the tick after
    /// the first transfer completes.
    pub fn transfer(&mut self, byte: u8) -> Result<u64, DriverError> {
        let start = self.ticks;
        let budget = 2 * self.timing.transfer_ticks() + 2;
        let step = |driver: &mut Self| {
            let report = driver.tick();
            if let Some(fault) = report.fault {
                return Err(DriverError::Fault(fault));
            }
            if driver.ticks - start > budget {
                return Err(DriverError::Stalled { ticks: driver.ticks - start });
            }
            Ok(report)
        };

        // A request still held from the caller, or sampled high by the last tick, would hide the
        // rising edge edge-mode waits for.
        if self.inputs.request || self.sequencer.last_request() {
            self.load(byte, false);
            step(self)?;
        }
        while !self.outputs().ready {
            step(self)?;
        }

        self.load(byte, true);
        loop {
            let report = step(self)?;
            if report.accepted.is_some() {
                break;
            }
        }

        self.load(byte, false);
        loop {
            let report = step(self)?;
            if report.completed {
                return Ok(self.ticks - start);
            }
        }
    }
}

#[cfg(feature = "defmt")]
fn log(report: &TickReport, latched: u8, enabled: bool) {
    if let Some(fault) = report.fault {
        defmt::error!("tick {}: {}, sequencer reset to idle", report.tick, fault);
    }
    if let Some(byte) = report.accepted {
        defmt::debug!("tick {}: accepted {=u8:#x}", report.tick, byte);
    }
    if report.completed {
        defmt::info!("tick {}: latched {=u8:#x}", report.tick, latched);
    }
    if enabled {
        defmt::info!("tick {}: outputs enabled", report.tick);
    }
}
