//! Waveform capture.
//!
//! A [`Trace`] records the driver's [`Outputs`] after every tick and answers edge and pulse-width
//! questions about them. It can also be written out as a Value Change Dump for a waveform viewer.

use std::fmt;
use std::io::{self, Write};

use itertools::Itertools;

use crate::driver::{Outputs, TickReport};

/// Observable line.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Ready,
    ShiftStrobe,
    LatchStrobe,
    OutputEnable,
    SerialOut,
}

impl Signal {
    /// All signals, in dump order.
    pub const ALL: [Signal; 5] =
        [Signal::Ready, Signal::ShiftStrobe, Signal::LatchStrobe, Signal::OutputEnable, Signal::SerialOut];

    /// Wire name in dumps.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::ShiftStrobe => "srclk",
            Self::LatchStrobe => "rclk",
            Self::OutputEnable => "output_enable",
            Self::SerialOut => "ser",
        }
    }

    /// Level of this signal in `outputs`.
    pub fn level(self, outputs: &Outputs) -> bool {
        match self {
            Self::Ready => outputs.ready,
            Self::ShiftStrobe => outputs.shift_strobe,
            Self::LatchStrobe => outputs.latch_strobe,
            Self::OutputEnable => outputs.output_enable,
            Self::SerialOut => outputs.serial_out,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Outputs committed by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Tick index.
    pub tick: u64,
    /// Committed outputs.
    pub outputs: Outputs,
}

impl Sample {
    /// Level of `signal`.
    pub fn level(&self, signal: Signal) -> bool { signal.level(&self.outputs) }
}

/// Consecutive ticks on which a signal was high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// First high tick.
    pub start: u64,
    /// Number of high ticks.
    pub len: u64,
}

/// Recorded waveform.
#[derive(Debug, Clone)]
pub struct Trace {
    tick_period_ns: u32,
    samples: Vec<Sample>,
}

impl Trace {
    /// Creates an empty trace for a driver ticking every `tick_period_ns`.
    pub fn new(tick_period_ns: u32) -> Self { Self { tick_period_ns, samples: Vec::new() } }

    /// Appends the outputs committed by one tick.
    pub fn record(&mut self, report: &TickReport) {
        self.samples.push(Sample { tick: report.tick, outputs: report.outputs });
    }

    /// Recorded samples.
    pub fn samples(&self) -> &[Sample] { &self.samples }

    /// Level of `signal` after `tick`, if recorded.
    pub fn level_at(&self, signal: Signal, tick: u64) -> Option<bool> {
        self.samples.iter().find(|sample| sample.tick == tick).map(|sample| sample.level(signal))
    }

    /// Ticks on which `signal` went from low to high.
    pub fn rising_edges(&self, signal: Signal) -> Vec<u64> { self.edges(signal, true) }

    /// Ticks on which `signal` went from high to low.
    pub fn falling_edges(&self, signal: Signal) -> Vec<u64> { self.edges(signal, false) }

    fn edges(&self, signal: Signal, rising: bool) -> Vec<u64> {
        self.samples
            .iter()
            .tuple_windows()
            .filter(|(prev, sample)| prev.level(signal) != rising && sample.level(signal) == rising)
            .map(|(_, sample)| sample.tick)
            .collect()
    }

    /// Maximal runs of ticks on which `signal` was high.
    pub fn high_runs(&self, signal: Signal) -> Vec<Run> {
        self.samples
            .iter()
            .group_by(|sample| sample.level(signal))
            .into_iter()
            .filter(|(level, _)| *level)
            .filter_map(|(_, run)| {
                let ticks = run.map(|sample| sample.tick).collect_vec();
                Some(Run { start: *ticks.first()?, len: ticks.len() as u64 })
            })
            .collect()
    }

    /// Writes the trace as a Value Change Dump with a nanosecond timescale.
    ///
    /// Besides every [`Signal`], the dump carries the physical active-low `oe_n` wire.
    pub fn write_vcd<W: Write>(&self, mut out: W) -> io::Result<()> {
        let ids = ['!', '"', '#', '$', '%'];
        let oe_n = '&';

        writeln!(out, "$timescale 1ns $end")?;
        writeln!(out, "$scope module hc595 $end")?;
        for (signal, id) in Signal::ALL.iter().zip(ids) {
            writeln!(out, "$var wire 1 {id} {signal} $end")?;
        }
        writeln!(out, "$var wire 1 {oe_n} oe_n $end")?;
        writeln!(out, "$upscope $end")?;
        writeln!(out, "$enddefinitions $end")?;

        let mut last: Option<&Outputs> = None;
        for sample in &self.samples {
            let changed = Signal::ALL
                .iter()
                .zip(ids)
                .filter(|(signal, _)| last.map_or(true, |last| signal.level(last) != sample.level(**signal)))
                .collect_vec();
            let oe_changed = last.map_or(true, |last| last.output_enable != sample.outputs.output_enable);
            if changed.is_empty() && !oe_changed {
                continue;
            }

            writeln!(out, "#{}", sample.tick * u64::from(self.tick_period_ns))?;
            for (signal, id) in changed {
                writeln!(out, "{}{id}", u8::from(sample.level(*signal)))?;
            }
            if oe_changed {
                writeln!(out, "{}{oe_n}", u8::from(sample.outputs.output_enable_n()))?;
            }
            last = Some(&sample.outputs);
        }

        Ok(())
    }
}
