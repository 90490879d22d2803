//! Tandem: a cycle-stepped NES (Nintendo Entertainment System) core written in Rust.
//!
//! Implements the NES chipset as documented on the
//! [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide): the Ricoh 2A03 CPU
//! (audio is stubbed), the 2C02 PPU, cartridge mappers, and controller I/O. The CPU and PPU
//! advance in lockstep, one CPU cycle for every three PPU cycles.
//!
//! ## Modules (NESdev references)
//!
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): RAM, PPU registers,
//!   OAM DMA, controllers, APU stub, cartridge
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) loading; [Mapper](https://www.nesdev.org/wiki/Mapper)
//!   NROM (0), MMC1 (1), UxROM (2), CNROM (3)
//! - **controller** – [Controller reading](https://www.nesdev.org/wiki/Controller_reading): strobe, shift-out
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) / 2A03: official + stable undocumented opcodes,
//!   [NMI](https://www.nesdev.org/wiki/NMI), IRQ, OAM DMA stall
//! - **nes** – the 1:3 CPU/PPU scheduler and frame callback
//! - **ppu** – [PPU](https://www.nesdev.org/wiki/PPU), [PPU registers](https://www.nesdev.org/wiki/PPU_registers),
//!   OAM, nametables, 256×240 palette-index output

pub mod bus;
pub mod cartridge;
pub mod controller;
pub mod cpu;
pub mod nes;
pub mod ppu;
