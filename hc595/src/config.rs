//! Construction-time configuration and its validation.

use std::fmt;

use thiserror::Error;

/// Minimum timing the driven chip requires, from its datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipTiming {
    /// Serial data must be stable this long before the shift strobe rises.
    pub min_setup_ns: u32,
    /// Each strobe must stay high at least this long.
    pub min_pulse_width_ns: u32,
}

impl ChipTiming {
    /// SN74HC595 at its lowest rated supply voltage.
    pub const SN74HC595: Self = Self { min_setup_ns: 125, min_pulse_width_ns: 100 };
}

impl Default for ChipTiming {
    fn default() -> Self { Self::SN74HC595 }
}

/// How the sequencer interprets a request input while idle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestMode {
    /// A request held high starts a transfer every time the sequencer is idle.
    #[default]
    Level,
    /// Only a low-to-high transition of the request starts a transfer.
    Edge,
}

/// Timing parameter named in a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimingParam {
    /// `setup_time_ticks`.
    Setup,
    /// `pulse_duration_ticks`.
    PulseDuration,
}

impl fmt::Display for TimingParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup time"),
            Self::PulseDuration => write!(f, "pulse duration"),
        }
    }
}

#[allow(missing_docs)]
#[allow(variant_size_differences)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("tick period must be non-zero")]
    ZeroTickPeriod,

    #[error("{param} must be at least one tick")]
    ZeroTicks { param: TimingParam },

    #[error("{param} of {ticks} ticks lasts {actual_ns} ns, the chip requires {required_ns} ns")]
    TooShort { param: TimingParam, ticks: u32, actual_ns: u64, required_ns: u32 },
}

/// Driver configuration, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Period of the driving tick.
    pub tick_period_ns: u32,
    /// Ticks a pulse generator waits between request and rising edge.
    pub setup_time_ticks: u32,
    /// Ticks a strobe is held high.
    pub pulse_duration_ticks: u32,
    /// Minimums the tick counts are validated against.
    pub chip: ChipTiming,
    /// Request interpretation while idle.
    pub request_mode: RequestMode,
}

impl Default for Config {
    /// 42 ns tick (24 MHz) with three-tick setup and pulse width.
    fn default() -> Self { Self::new(42, 3, 3) }
}

impl Config {
    /// Creates a configuration for the SN74HC595 in level-triggered mode.
    pub fn new(tick_period_ns: u32, setup_time_ticks: u32, pulse_duration_ticks: u32) -> Self {
        Self {
            tick_period_ns,
            setup_time_ticks,
            pulse_duration_ticks,
            chip: ChipTiming::default(),
            request_mode: RequestMode::default(),
        }
    }

    /// Derives the smallest tick counts that satisfy `chip` at the given tick period.
    pub fn for_tick_period(tick_period_ns: u32, chip: ChipTiming) -> Self {
        let ticks = |min_ns: u32| if tick_period_ns == 0 { 0 } else { min_ns.div_ceil(tick_period_ns).max(1) };
        Self::new(tick_period_ns, ticks(chip.min_setup_ns), ticks(chip.min_pulse_width_ns)).with_chip(chip)
    }

    /// Replaces the chip minimums.
    pub fn with_chip(self, chip: ChipTiming) -> Self { Self { chip, ..self } }

    /// Replaces the request mode.
    pub fn with_request_mode(self, request_mode: RequestMode) -> Self { Self { request_mode, ..self } }

    /// Checks the tick counts against the chip minimums.
    pub fn validate(&self) -> Result<Timing, ConfigError> {
        if self.tick_period_ns == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }

        let check = |param, ticks: u32, required_ns: u32| {
            if ticks == 0 {
                return Err(ConfigError::ZeroTicks { param });
            }
            let actual_ns = u64::from(self.tick_period_ns) * u64::from(ticks);
            if actual_ns < u64::from(required_ns) {
                return Err(ConfigError::TooShort { param, ticks, actual_ns, required_ns });
            }
            Ok(ticks)
        };

        Ok(Timing {
            tick_period_ns: self.tick_period_ns,
            setup_ticks: check(TimingParam::Setup, self.setup_time_ticks, self.chip.min_setup_ns)?,
            pulse_ticks: check(TimingParam::PulseDuration, self.pulse_duration_ticks, self.chip.min_pulse_width_ns)?,
        })
    }
}

/// Validated timing. Only [`Config::validate`] creates one, so both tick counts are non-zero and
/// meet the chip minimums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    tick_period_ns: u32,
    setup_ticks: u32,
    pulse_ticks: u32,
}

impl Timing {
    /// Period of one tick.
    pub fn tick_period_ns(&self) -> u32 { self.tick_period_ns }

    /// Ticks between a pulse request being seen and the strobe rising.
    pub fn setup_ticks(&self) -> u32 { self.setup_ticks }

    /// Ticks a strobe stays high.
    pub fn pulse_ticks(&self) -> u32 { self.pulse_ticks }

    /// Ticks the sequencer spends on one shifted bit.
    ///
    /// Four handshake ticks (inject, request, rising edge seen, falling edge seen) around the
    /// generator's setup and pulse.
    pub fn bit_ticks(&self) -> u64 { u64::from(self.setup_ticks) + u64::from(self.pulse_ticks) + 4 }

    /// Ticks from the tick a transfer is accepted through the tick `ready` is reasserted.
    pub fn transfer_ticks(&self) -> u64 {
        // accept + 8 bits + latch (one tick shorter than a bit, it has no inject step)
        1 + 8 * self.bit_ticks() + self.bit_ticks() - 1
    }

    /// Converts a tick count into nanoseconds.
    pub fn ticks_to_ns(&self, ticks: u64) -> u64 { ticks * u64::from(self.tick_period_ns) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_scenario_is_valid() {
        let timing = Config::default().validate().unwrap();
        assert_eq!(timing.setup_ticks(), 3);
        assert_eq!(timing.pulse_ticks(), 3);
        assert_eq!(timing.bit_ticks(), 10);
        assert_eq!(timing.transfer_ticks(), 90);
    }

    #[test]
    fn two_ticks_at_42ns_are_too_short() {
        assert_eq!(
            Config::new(42, 2, 3).validate(),
            Err(ConfigError::TooShort { param: TimingParam::Setup, ticks: 2, actual_ns: 84, required_ns: 125 })
        );
        assert_eq!(
            Config::new(42, 3, 2).validate(),
            Err(ConfigError::TooShort { param: TimingParam::PulseDuration, ticks: 2, actual_ns: 84, required_ns: 100 })
        );
    }

    #[test]
    fn zero_values_are_rejected() {
        assert_eq!(Config::new(0, 3, 3).validate(), Err(ConfigError::ZeroTickPeriod));

        let relaxed = ChipTiming { min_setup_ns: 0, min_pulse_width_ns: 0 };
        assert_eq!(
            Config::new(10, 0, 1).with_chip(relaxed).validate(),
            Err(ConfigError::ZeroTicks { param: TimingParam::Setup })
        );
        assert_eq!(
            Config::new(10, 1, 0).with_chip(relaxed).validate(),
            Err(ConfigError::ZeroTicks { param: TimingParam::PulseDuration })
        );
    }

    #[test]
    fn derived_tick_counts_meet_minimums() {
        let config = Config::for_tick_period(42, ChipTiming::SN74HC595);
        assert_eq!((config.setup_time_ticks, config.pulse_duration_ticks), (3, 3));
        assert!(config.validate().is_ok());

        let config = Config::for_tick_period(10, ChipTiming::SN74HC595);
        assert_eq!((config.setup_time_ticks, config.pulse_duration_ticks), (13, 10));

        let config = Config::for_tick_period(1000, ChipTiming::SN74HC595);
        assert_eq!((config.setup_time_ticks, config.pulse_duration_ticks), (1, 1));

        assert_eq!(Config::for_tick_period(0, ChipTiming::SN74HC595).validate(), Err(ConfigError::ZeroTickPeriod));
    }

    #[test]
    fn error_messages_name_the_parameter() {
        let error = Config::new(42, 2, 3).validate().unwrap_err();
        assert_eq!(error.to_string(), "setup time of 2 ticks lasts 84 ns, the chip requires 125 ns");
    }
}
