//! Cycle-accurate driver core for SN74HC595-class serial-in, parallel-out shift registers.
//!
//! Three synchronous state machines (two pulse generators and a sequencer) plus a one-way output
//! gate advance together on a fixed-period tick. Every component reads the values committed by
//! the previous tick and its writes become visible only on the next one; [`Driver::tick`] is the
//! barrier that commits them.

// # Tries to deny all lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(deprecated_in_future)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(trivial_numeric_casts)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
#![deny(variant_size_differences)]
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::invalid_rust_codeblocks)]
#![deny(rustdoc::bare_urls)]
#![deny(unreachable_pub)]
//
#![allow(clippy::needless_lifetimes)]
#![allow(elided_lifetimes_in_paths)]

pub mod chip;
mod config;
mod driver;
mod fsm;
mod output_gate;
pub mod pins;
mod pulse;
mod sequencer;
mod shift_buffer;
pub mod trace;

pub use config::*;
pub use driver::*;
pub use fsm::Fsm;
pub use output_gate::OutputGate;
pub use pulse::{PulseGenerator, PulseState};
pub use sequencer::*;
pub use shift_buffer::*;
