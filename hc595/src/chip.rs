//! Simulated SN74HC595.
//!
//! Consumes the driver's lines the way the chip does: serial data is clocked into the 8-bit shift
//! register on each SRCLK rising edge, the shift register is copied to the storage register on each
//! RCLK rising edge, and the storage register drives the parallel outputs while /OE is low. Line
//! timing is checked against [`ChipTiming`] and every violation is recorded.

use std::fmt;

use arrayvec::ArrayVec;
use thiserror::Error;

use crate::config::{ChipTiming, Timing};
use crate::driver::{Outputs, TickReport};
use crate::shift_buffer::BYTE_BITS;

/// Strobe named in a [`TimingViolation`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strobe {
    Shift,
    Latch,
}

impl fmt::Display for Strobe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift => write!(f, "SRCLK"),
            Self::Latch => write!(f, "RCLK"),
        }
    }
}

#[allow(missing_docs)]
#[allow(variant_size_differences)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimingViolation {
    #[error("at {at_ns} ns: SER stable for {setup_ns} ns before SRCLK rose, {required_ns} ns required")]
    SetupTooShort { at_ns: u64, setup_ns: u64, required_ns: u32 },

    #[error("at {at_ns} ns: {strobe} high for {width_ns} ns, {required_ns} ns required")]
    PulseTooShort { strobe: Strobe, at_ns: u64, width_ns: u64, required_ns: u32 },

    #[error("at {at_ns} ns: SRCLK and RCLK high together")]
    StrobeOverlap { at_ns: u64 },

    #[error("at {at_ns} ns: latched after {bits} shifted bits")]
    ShortFrame { at_ns: u64, bits: usize },

    #[error("at {at_ns} ns: more than 8 bits shifted before latching")]
    FrameOverrun { at_ns: u64 },
}

/// Chip model fed with the driver's committed outputs.
#[derive(Debug, Clone)]
pub struct Sn74hc595 {
    timing: ChipTiming,
    shift_register: u8,
    storage: u8,
    /// Bits shifted in since the last latch, oldest first.
    frame: ArrayVec<bool, { BYTE_BITS as usize }>,
    last: Option<Outputs>,
    ser_changed_ns: u64,
    srclk_rise_ns: u64,
    rclk_rise_ns: u64,
    latches: u64,
    violations: Vec<TimingViolation>,
}

impl Sn74hc595 {
    /// Creates a powered-up chip. Its registers start cleared.
    pub fn new(timing: ChipTiming) -> Self {
        Self {
            timing,
            shift_register: 0,
            storage: 0,
            frame: ArrayVec::new(),
            last: None,
            ser_changed_ns: 0,
            srclk_rise_ns: 0,
            rclk_rise_ns: 0,
            latches: 0,
            violations: Vec::new(),
        }
    }

    /// Feeds the outputs committed by one tick of a driver running with `timing`.
    pub fn observe_report(&mut self, timing: &Timing, report: &TickReport) {
        self.observe(timing.ticks_to_ns(report.tick), &report.outputs);
    }

    /// Feeds the line levels holding from `time_ns` on.
    ///
    /// Times are expected to be non-decreasing. A time earlier than the previous one counts as no
    /// elapsed time.
    pub fn observe(&mut self, time_ns: u64, lines: &Outputs) {
        let Some(last) = self.last.replace(*lines) else {
            self.ser_changed_ns = time_ns;
            return;
        };

        if lines.shift_strobe && lines.latch_strobe {
            self.violations.push(TimingViolation::StrobeOverlap { at_ns: time_ns });
        }

        match (last.shift_strobe, lines.shift_strobe) {
            (false, true) => self.shift_in(time_ns, lines.serial_out, last.serial_out != lines.serial_out),
            (true, false) => self.check_width(Strobe::Shift, self.srclk_rise_ns, time_ns),
            _ => {}
        }

        match (last.latch_strobe, lines.latch_strobe) {
            (false, true) => self.latch(time_ns),
            (true, false) => self.check_width(Strobe::Latch, self.rclk_rise_ns, time_ns),
            _ => {}
        }

        if last.serial_out != lines.serial_out {
            self.ser_changed_ns = time_ns;
        }
    }

    fn shift_in(&mut self, time_ns: u64, ser: bool, ser_changed: bool) {
        self.srclk_rise_ns = time_ns;

        let setup_ns = if ser_changed { 0 } else { time_ns.saturating_sub(self.ser_changed_ns) };
        if setup_ns < u64::from(self.timing.min_setup_ns) {
            self.violations.push(TimingViolation::SetupTooShort {
                at_ns: time_ns,
                setup_ns,
                required_ns: self.timing.min_setup_ns,
            });
        }

        if self.frame.is_full() {
            self.violations.push(TimingViolation::FrameOverrun { at_ns: time_ns });
            self.frame.remove(0);
        }
        self.frame.push(ser);
        self.shift_register = (self.shift_register << 1) | u8::from(ser);
    }

    fn latch(&mut self, time_ns: u64) {
        self.rclk_rise_ns = time_ns;

        if !self.frame.is_full() {
            self.violations.push(TimingViolation::ShortFrame { at_ns: time_ns, bits: self.frame.len() });
        }
        self.frame.clear();
        self.storage = self.shift_register;
        self.latches += 1;
    }

    fn check_width(&mut self, strobe: Strobe, rise_ns: u64, time_ns: u64) {
        let width_ns = time_ns.saturating_sub(rise_ns);
        if width_ns < u64::from(self.timing.min_pulse_width_ns) {
            self.violations.push(TimingViolation::PulseTooShort {
                strobe,
                at_ns: time_ns,
                width_ns,
                required_ns: self.timing.min_pulse_width_ns,
            });
        }
    }

    /// Shift register contents.
    pub fn shift_register(&self) -> u8 { self.shift_register }

    /// Storage register contents.
    pub fn storage(&self) -> u8 { self.storage }

    /// Bits shifted in since the last latch, oldest first.
    pub fn frame(&self) -> &[bool] { &self.frame }

    /// Parallel outputs QA..QH as a byte (QA being the most recently shifted bit, bit 0), or `None`
    /// while /OE is high and the outputs are in high impedance.
    pub fn parallel_out(&self) -> Option<u8> {
        self.last.filter(|lines| lines.output_enable).map(|_| self.storage)
    }

    /// Latch strobes seen.
    pub fn latches(&self) -> u64 { self.latches }

    /// Timing violations seen, in order.
    pub fn violations(&self) -> &[TimingViolation] { &self.violations }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(shift_strobe: bool, latch_strobe: bool, serial_out: bool) -> Outputs {
        Outputs { ready: false, shift_strobe, latch_strobe, output_enable: false, serial_out }
    }

    /// Clocks `byte` in MSB first at 100 ns per step with ample margins, then latches.
    fn clock_in(chip: &mut Sn74hc595, mut time_ns: u64, byte: u8) -> u64 {
        for i in (0..8).rev() {
            let ser = (byte >> i) & 1 == 1;
            chip.observe(time_ns, &lines(false, false, ser));
            chip.observe(time_ns + 200, &lines(true, false, ser));
            chip.observe(time_ns + 400, &lines(false, false, ser));
            time_ns += 600;
        }
        let ser = byte & 1 == 1;
        chip.observe(time_ns, &lines(false, true, ser));
        chip.observe(time_ns + 200, &lines(false, false, ser));
        time_ns + 400
    }

    #[test]
    fn clocks_and_latches_a_byte() {
        let mut chip = Sn74hc595::new(ChipTiming::SN74HC595);
        chip.observe(0, &lines(false, false, false));
        clock_in(&mut chip, 100, 0xA5);

        assert_eq!(chip.storage(), 0xA5);
        assert_eq!(chip.latches(), 1);
        assert!(chip.frame().is_empty());
        assert!(chip.violations().is_empty(), "{:?}", chip.violations());
    }

    #[test]
    fn outputs_follow_output_enable() {
        let mut chip = Sn74hc595::new(ChipTiming::SN74HC595);
        chip.observe(0, &lines(false, false, false));
        let time_ns = clock_in(&mut chip, 100, 0x3C);
        assert_eq!(chip.parallel_out(), None);

        chip.observe(time_ns, &Outputs { output_enable: true, ..lines(false, false, false) });
        assert_eq!(chip.parallel_out(), Some(0x3C));
    }

    #[test]
    fn detects_short_setup_and_pulse() {
        let mut chip = Sn74hc595::new(ChipTiming::SN74HC595);
        chip.observe(0, &lines(false, false, false));
        chip.observe(50, &lines(false, false, true));
        chip.observe(100, &lines(true, false, true));
        chip.observe(150, &lines(false, false, true));

        assert_eq!(chip.violations(), [
            TimingViolation::SetupTooShort { at_ns: 100, setup_ns: 50, required_ns: 125 },
            TimingViolation::PulseTooShort { strobe: Strobe::Shift, at_ns: 150, width_ns: 50, required_ns: 100 },
        ]);
    }

    #[test]
    fn data_changing_with_the_clock_has_no_setup() {
        let mut chip = Sn74hc595::new(ChipTiming::SN74HC595);
        chip.observe(0, &lines(false, false, false));
        chip.observe(1000, &lines(true, false, true));

        assert_eq!(chip.violations(), [TimingViolation::SetupTooShort { at_ns: 1000, setup_ns: 0, required_ns: 125 }]);
        assert_eq!(chip.shift_register(), 1);
    }

    #[test]
    fn time_going_backwards_counts_as_zero() {
        let mut chip = Sn74hc595::new(ChipTiming::SN74HC595);
        chip.observe(0, &lines(false, false, false));
        chip.observe(1000, &lines(false, false, true));
        chip.observe(500, &lines(true, false, true));
        chip.observe(400, &lines(false, false, true));

        assert_eq!(chip.violations(), [
            TimingViolation::SetupTooShort { at_ns: 500, setup_ns: 0, required_ns: 125 },
            TimingViolation::PulseTooShort { strobe: Strobe::Shift, at_ns: 400, width_ns: 0, required_ns: 100 },
        ]);
        assert_eq!(chip.shift_register(), 1);
    }

    #[test]
    fn detects_overlap_and_frame_errors() {
        let mut chip = Sn74hc595::new(ChipTiming { min_setup_ns: 0, min_pulse_width_ns: 0 });
        chip.observe(0, &lines(false, false, false));
        chip.observe(10, &lines(true, true, false));
        chip.observe(20, &lines(false, false, false));

        assert_eq!(chip.violations(), [
            TimingViolation::StrobeOverlap { at_ns: 10 },
            TimingViolation::ShortFrame { at_ns: 10, bits: 1 },
        ]);

        let mut chip = Sn74hc595::new(ChipTiming { min_setup_ns: 0, min_pulse_width_ns: 0 });
        chip.observe(0, &lines(false, false, false));
        for step in 0..9 {
            chip.observe(20 * step + 10, &lines(true, false, true));
            chip.observe(20 * step + 20, &lines(false, false, true));
        }
        assert_eq!(chip.violations(), [TimingViolation::FrameOverrun { at_ns: 170 }]);
        assert_eq!(chip.frame().len(), 8);
        assert_eq!(chip.shift_register(), 0xFF);
    }
}
