//! Serialization buffer.

use static_assertions::*;

/// Bits in a transfer.
pub const BYTE_BITS: u8 = 8;

/// Width of [`ShiftBuffer`]: the byte plus the output tap.
pub const SHIFT_BUFFER_WIDTH: u32 = 9;

const_assert_eq!(SHIFT_BUFFER_WIDTH, BYTE_BITS as u32 + 1);
const_assert!(SHIFT_BUFFER_WIDTH <= u16::BITS);

const TAP: u32 = SHIFT_BUFFER_WIDTH - 1;
const MASK: u16 = (1 << SHIFT_BUFFER_WIDTH) - 1;

/// Nine-bit shift buffer. Bit 8 is the output tap, driven on the serial data line; bits 7..0 hold
/// the part of the pending byte not yet presented, most significant first.
///
/// Only the sequencer changes it: [`ShiftBuffer::load`] when a transfer is accepted, and
/// [`ShiftBuffer::shift`] once per shifted bit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShiftBuffer(u16);

impl ShiftBuffer {
    /// Queues `byte` below the tap. The tap is cleared.
    pub fn load(byte: u8) -> Self { Self(u16::from(byte)) }

    /// Moves every bit one position toward the tap and fills the vacated low bit with zero.
    #[must_use]
    pub fn shift(self) -> Self { Self((self.0 << 1) & MASK) }

    /// Level of the serial data line.
    pub fn serial_out(self) -> bool { (self.0 >> TAP) & 1 == 1 }

    /// Raw contents, bit 8 being the tap.
    pub fn bits(self) -> u16 { self.0 }
}
