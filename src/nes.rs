//! Console scheduler: one CPU cycle for every three PPU cycles.
//!
//! The CPU owns the [`NesBus`], which owns the PPU and cartridge, so every
//! step runs on the caller's thread in a fixed order. An NMI raised by the
//! PPU is latched and picked up by the CPU at its next instruction boundary.

use crate::{
    bus::NesBus,
    cartridge::cartridge::Cartridge,
    controller::Controller,
    cpu::cpu::{CPU, CpuError},
};

pub struct Nes {
    pub cpu: CPU<NesBus>,
    // PPU cycles since the last CPU cycle (0..3).
    ppu_phase: u8,
}

impl Nes {
    /// Builds the console around a cartridge and runs the reset sequence.
    pub fn new(cart: Cartridge) -> Self {
        let mut cpu = CPU::new(NesBus::new(cart));
        cpu.reset();
        Self { cpu, ppu_phase: 0 }
    }

    pub fn reset(&mut self) {
        self.cpu.reset();
        self.ppu_phase = 0;
    }

    pub fn controller(&mut self, port: usize) -> &mut Controller {
        &mut self.cpu.bus.controllers[port]
    }

    pub fn frame_buffer(&self) -> &[u8] {
        &self.cpu.bus.ppu.frame_buffer
    }

    /// Advances one PPU cycle, clocking the CPU first on every third call.
    /// Returns true when the PPU completed a frame on this cycle.
    pub fn tick(&mut self) -> Result<bool, CpuError> {
        if self.ppu_phase == 0 {
            self.cpu.clock()?;
        }
        self.ppu_phase = (self.ppu_phase + 1) % 3;

        Ok(self.cpu.bus.clock_ppu())
    }

    /// Runs until the PPU finishes a frame, then hands its palette-index
    /// buffer to `on_frame`. The next frame does not start until it returns.
    pub fn run_frame(&mut self, mut on_frame: impl FnMut(&[u8])) -> Result<(), CpuError> {
        while !self.tick()? {}
        on_frame(self.frame_buffer());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::{Chr, Mirroring, mapper0::Mapper0};

    /// 32 KiB NROM image whose reset vector points at `program` placed at $8000.
    fn nes_with(program: &[u8]) -> Nes {
        let mut prg = vec![0xEA; 0x8000];
        prg[..program.len()].copy_from_slice(program);
        prg[0x7FFC] = 0x00;
        prg[0x7FFD] = 0x80;
        // NMI handler at $9000: RTI
        prg[0x1000] = 0x40;
        prg[0x7FFA] = 0x00;
        prg[0x7FFB] = 0x90;
        let mapper = Mapper0::new(prg, Chr::new(Vec::new()), Mirroring::Horizontal);
        Nes::new(Cartridge::with_mapper(Box::new(mapper)))
    }

    #[test]
    fn one_cpu_cycle_per_three_ppu_cycles() {
        // JMP $8000
        let mut nes = nes_with(&[0x4C, 0x00, 0x80]);
        let start = nes.cpu.cycles;

        for _ in 0..3 * 300 {
            nes.tick().unwrap();
        }

        assert_eq!(nes.cpu.cycles - start, 300);
        assert_eq!(nes.cpu.bus.ppu.cycle, 300 * 3 % 341);
    }

    #[test]
    fn frame_callback_runs_once_per_frame() {
        let mut nes = nes_with(&[0x4C, 0x00, 0x80]);
        let mut calls = 0;

        nes.run_frame(|frame| {
            assert_eq!(frame.len(), 256 * 240);
            calls += 1;
        })
        .unwrap();

        assert_eq!(calls, 1);
        let ppu = &nes.cpu.bus.ppu;
        assert_eq!((ppu.scanline, ppu.cycle, ppu.frame), (0, 0, 1));
    }

    #[test]
    fn exact_frame_of_ticks_completes_one_frame() {
        let mut nes = nes_with(&[0x4C, 0x00, 0x80]);

        let frames = (0..262 * 341).filter(|_| nes.tick().unwrap()).count();

        assert_eq!(frames, 1);
        assert_eq!(nes.cpu.bus.ppu.frame, 1);
    }

    #[test]
    fn vblank_nmi_reaches_cpu() {
        // LDA #$80; STA $2000; JMP $8005
        let mut nes = nes_with(&[0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x05, 0x80]);

        nes.run_frame(|_| {}).unwrap();

        // the handler's RTI ran at least once, and pushed our loop address
        assert_eq!(nes.cpu.bus.ram[0x01FC], 0x05);
        assert_eq!(nes.cpu.bus.ram[0x01FD], 0x80);
    }

    #[test]
    fn unknown_opcode_stops_the_frame() {
        let mut nes = nes_with(&[0xEA, 0x02]);

        let err = nes.run_frame(|_| panic!("frame should not complete")).unwrap_err();

        assert_eq!(err, CpuError::UnknownOpcode { opcode: 0x02, pc: 0x8001 });
    }

    #[test]
    fn controller_is_reachable_from_the_cpu() {
        // LDA #1; STA $4016; LDA #0; STA $4016; LDA $4016; STA $10; JMP *
        let mut nes = nes_with(&[
            0xA9, 0x01, 0x8D, 0x16, 0x40, 0xA9, 0x00, 0x8D, 0x16, 0x40, 0xAD, 0x16, 0x40, 0x85,
            0x10, 0x4C, 0x0F, 0x80,
        ]);
        nes.controller(0).press(crate::controller::Button::A);

        nes.run_frame(|_| {}).unwrap();

        assert_eq!(nes.cpu.bus.ram[0x10], 0x41);
    }
}
