use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use hc595::chip::Sn74hc595;
use hc595::trace::{Signal, Trace};
use hc595::{Config, ConfigError, Driver};
use itertools::Itertools;
use thiserror::Error;

#[derive(Debug, Error)]
enum DemoError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("file system error: {0}")]
    Fs(#[from] io::Error),

    #[error("chip model reported {0} timing violations")]
    Violations(usize),
}

const BYTES: [u8; 4] = [0xA5, 0x3C, 0xFF, 0x00];

fn main() -> Result<(), DemoError> {
    let config = Config::default();
    let mut driver = Driver::new(config)?;
    let mut trace = Trace::new(config.tick_period_ns);
    let mut chip = Sn74hc595::new(config.chip);

    for byte in BYTES {
        driver.load(byte, true);
        loop {
            let report = driver.tick();
            trace.record(&report);
            chip.observe_report(driver.timing(), &report);
            if report.accepted.is_some() {
                driver.load(byte, false);
            }
            if report.completed {
                break;
            }
        }
        println!("{:#04x} latched at {} ns (tick {})", byte, driver.elapsed_ns(), driver.ticks() - 1);
    }

    let report = driver.tick();
    trace.record(&report);
    chip.observe_report(driver.timing(), &report);
    println!("parallel outputs: {:?}", chip.parallel_out().map(|byte| format!("{byte:#04x}")));

    let bits = trace
        .rising_edges(Signal::ShiftStrobe)
        .into_iter()
        .filter_map(|tick| trace.level_at(Signal::SerialOut, tick))
        .map(|bit| if bit { '1' } else { '0' })
        .chunks(8);
    println!("serial bits: {}", bits.into_iter().map(|byte| byte.collect::<String>()).join(" "));

    for violation in chip.violations() {
        eprintln!("{violation}");
    }
    if !chip.violations().is_empty() {
        return Err(DemoError::Violations(chip.violations().len()));
    }

    let dir = Path::new("./build");
    fs::create_dir_all(dir)?;
    let mut out = BufWriter::new(File::create(dir.join("hc595.vcd"))?);
    trace.write_vcd(&mut out)?;
    out.flush()?;
    println!("waveform written to {}", dir.join("hc595.vcd").display());
    Ok(())
}
