//! 6502 CPU emulation for the NES.
//!
//! Official instruction set plus the stable undocumented opcodes, decoded
//! through one static [`opcodes::OPCODES`] table. Decimal mode is ignored,
//! as on the 2A03. Memory and I/O go through the [`crate::bus::Bus`] trait.

pub mod cpu;
pub mod flags;
pub mod opcodes;
