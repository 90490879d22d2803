use std::{error::Error, fmt};

use crate::{
    bus::Bus,
    cpu::{
        flags::Flags,
        opcodes::{self, AddressingMode, Instruction, Opcode},
    },
};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Fault raised when the CPU cannot continue executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    /// The byte at `pc` has no entry in the opcode table.
    UnknownOpcode { opcode: u8, pc: u16 },
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuError::UnknownOpcode { opcode, pc } => {
                write!(f, "unknown opcode ${opcode:02X} at ${pc:04X}")
            }
        }
    }
}

impl Error for CpuError {}

/// Interrupt latched for service at the start of the next instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interrupt {
    #[default]
    None,
    Nmi,
    Irq,
}

pub struct CPU<B: Bus> {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: Flags,
    pub cycles: u64,
    pub bus: B,
    /// CPU cycles left to burn for an OAM DMA transfer.
    pub stall: u16,
    pub interrupt: Interrupt,
    // Cycles still owed by the instruction last executed by `clock`.
    wait: u8,
}

impl<B: Bus> CPU<B> {
    pub fn new(bus: B) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: Flags::from_bits(0x24),
            cycles: 0,
            bus,
            stall: 0,
            interrupt: Interrupt::None,
            wait: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pc = self.read_word(RESET_VECTOR);

        self.sp = 0xFD; // resets at 0xFD instead of 0xFF for some reason
        self.status = Flags::from_bits(0x24);

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.stall = 0;
        self.wait = 0;
        self.interrupt = Interrupt::None;

        self.cycles = 7;
    }

    pub fn trigger_nmi(&mut self) {
        self.interrupt = Interrupt::Nmi;
    }

    /// Requests an IRQ. Ignored if an NMI is already latched.
    pub fn trigger_irq(&mut self) {
        if self.interrupt == Interrupt::None {
            self.interrupt = Interrupt::Irq;
        }
    }

    /// Advances the CPU by a single clock cycle.
    ///
    /// A whole instruction executes on the first cycle it owns; the rest of
    /// its cost (and any DMA stall) is then consumed one cycle per call.
    pub fn clock(&mut self) -> Result<(), CpuError> {
        if self.wait > 0 {
            self.wait -= 1;
            return Ok(());
        }

        if self.stall > 0 {
            self.stall -= 1;
            self.cycles += 1;
            return Ok(());
        }

        let spent = self.step()?;
        self.wait = spent.saturating_sub(1);
        Ok(())
    }

    /// Services a pending interrupt or executes one instruction, returning
    /// the number of cycles it cost.
    pub fn step(&mut self) -> Result<u8, CpuError> {
        if self.bus.poll_nmi() {
            self.trigger_nmi();
        }
        if self.bus.poll_irq() {
            self.trigger_irq();
        }

        match std::mem::take(&mut self.interrupt) {
            Interrupt::Nmi => {
                self.interrupt_to(NMI_VECTOR);
                self.cycles += 7;
                return Ok(7);
            }
            Interrupt::Irq if !self.status.interrupt_disable => {
                self.interrupt_to(IRQ_VECTOR);
                self.cycles += 7;
                return Ok(7);
            }
            // masked IRQs are dropped
            Interrupt::Irq | Interrupt::None => {}
        }

        let pc = self.pc;
        let byte = self.bus.read(pc);
        let Some(op) = opcodes::decode(byte) else {
            log::error!("unknown opcode ${byte:02X} at ${pc:04X}");
            return Err(CpuError::UnknownOpcode { opcode: byte, pc });
        };

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", self.trace_line(byte));
        }

        let start = self.cycles;
        self.pc = pc.wrapping_add(op.len as u16);

        let (addr, page_crossed) = self.resolve(op.mode, pc.wrapping_add(1));
        let mut spent = op.cycles + self.execute(op, addr);
        if page_crossed && op.instruction.pays_page_cross() {
            spent += 1;
        }

        if let Some(page) = self.bus.take_dma_request() {
            self.oam_dma(page, start);
        }

        self.cycles += spent as u64;
        Ok(spent)
    }

    /// Nestest-style log line for the instruction about to run at `pc`.
    pub fn trace_line(&self, opcode: u8) -> String {
        format!(
            "{:04X}  {:02X}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc,
            opcode,
            self.a,
            self.x,
            self.y,
            self.status.bits(),
            self.sp,
            self.cycles
        )
    }

    // Copies one page into OAM through ordinary bus reads. The stall length
    // depends on the parity of the cycle count when the instruction started.
    fn oam_dma(&mut self, page: u8, start: u64) {
        let base = (page as u16) << 8;
        for i in 0..=0xFF {
            let byte = self.bus.read(base | i);
            self.bus.write(0x2004, byte);
        }
        self.stall += 513 + (start & 1) as u16;
    }

    fn resolve(&mut self, mode: AddressingMode, operand: u16) -> (u16, bool) {
        use AddressingMode::*;

        match mode {
            Implied | Accumulator => (0, false),
            Immediate => (operand, false),
            ZeroPage => (self.bus.read(operand) as u16, false),
            ZeroPageX => (self.bus.read(operand).wrapping_add(self.x) as u16, false),
            ZeroPageY => (self.bus.read(operand).wrapping_add(self.y) as u16, false),
            Absolute => (self.read_word(operand), false),
            AbsoluteX => {
                let base = self.read_word(operand);
                let addr = base.wrapping_add(self.x as u16);
                (addr, pages_differ(base, addr))
            }
            AbsoluteY => {
                let base = self.read_word(operand);
                let addr = base.wrapping_add(self.y as u16);
                (addr, pages_differ(base, addr))
            }
            Relative => {
                let offset = self.bus.read(operand) as i8;
                (self.pc.wrapping_add(offset as u16), false)
            }
            Indirect => {
                let ptr = self.read_word(operand);
                (self.read_word_same_page(ptr), false)
            }
            IndirectX => {
                let ptr = self.bus.read(operand).wrapping_add(self.x);
                (self.read_word_same_page(ptr as u16), false)
            }
            IndirectY => {
                let ptr = self.bus.read(operand);
                let base = self.read_word_same_page(ptr as u16);
                let addr = base.wrapping_add(self.y as u16);
                (addr, pages_differ(base, addr))
            }
        }
    }

    /// Runs the instruction against the resolved address. Returns any extra
    /// cycles spent beyond the table cost (taken branches).
    fn execute(&mut self, op: Opcode, addr: u16) -> u8 {
        use Instruction::*;

        let mode = op.mode;
        match op.instruction {
            ADC => {
                let m = self.bus.read(addr);
                self.add_with_carry(m);
            }
            SBC => {
                let m = self.bus.read(addr);
                self.add_with_carry(!m);
            }
            AND => {
                self.a &= self.bus.read(addr);
                self.status.set_zn(self.a);
            }
            ORA => {
                self.a |= self.bus.read(addr);
                self.status.set_zn(self.a);
            }
            EOR => {
                self.a ^= self.bus.read(addr);
                self.status.set_zn(self.a);
            }
            BIT => {
                let m = self.bus.read(addr);
                self.status.zero = self.a & m == 0;
                self.status.overflow = m & 0x40 != 0;
                self.status.negative = m & 0x80 != 0;
            }
            CMP => {
                let m = self.bus.read(addr);
                self.compare(self.a, m);
            }
            CPX => {
                let m = self.bus.read(addr);
                self.compare(self.x, m);
            }
            CPY => {
                let m = self.bus.read(addr);
                self.compare(self.y, m);
            }

            ASL => {
                let value = self.load(mode, addr);
                let result = self.shift_left(value);
                self.store(mode, addr, result);
            }
            LSR => {
                let value = self.load(mode, addr);
                let result = self.shift_right(value);
                self.store(mode, addr, result);
            }
            ROL => {
                let value = self.load(mode, addr);
                let result = self.rotate_left(value);
                self.store(mode, addr, result);
            }
            ROR => {
                let value = self.load(mode, addr);
                let result = self.rotate_right(value);
                self.store(mode, addr, result);
            }
            INC => {
                let result = self.bus.read(addr).wrapping_add(1);
                self.bus.write(addr, result);
                self.status.set_zn(result);
            }
            DEC => {
                let result = self.bus.read(addr).wrapping_sub(1);
                self.bus.write(addr, result);
                self.status.set_zn(result);
            }
            INX => {
                self.x = self.x.wrapping_add(1);
                self.status.set_zn(self.x);
            }
            INY => {
                self.y = self.y.wrapping_add(1);
                self.status.set_zn(self.y);
            }
            DEX => {
                self.x = self.x.wrapping_sub(1);
                self.status.set_zn(self.x);
            }
            DEY => {
                self.y = self.y.wrapping_sub(1);
                self.status.set_zn(self.y);
            }

            BCC => return self.branch(!self.status.carry, addr),
            BCS => return self.branch(self.status.carry, addr),
            BNE => return self.branch(!self.status.zero, addr),
            BEQ => return self.branch(self.status.zero, addr),
            BPL => return self.branch(!self.status.negative, addr),
            BMI => return self.branch(self.status.negative, addr),
            BVC => return self.branch(!self.status.overflow, addr),
            BVS => return self.branch(self.status.overflow, addr),

            JMP => self.pc = addr,
            JSR => {
                self.push_word(self.pc.wrapping_sub(1));
                self.pc = addr;
            }
            RTS => self.pc = self.pop_word().wrapping_add(1),
            RTI => {
                self.status = Flags::pulled(self.pop());
                self.pc = self.pop_word();
            }
            BRK => {
                self.push_word(self.pc);
                self.push(self.status.pushed(true));
                self.status.interrupt_disable = true;
                self.pc = self.read_word(IRQ_VECTOR);
            }

            CLC => self.status.carry = false,
            CLD => self.status.decimal = false,
            CLI => self.status.interrupt_disable = false,
            CLV => self.status.overflow = false,
            SEC => self.status.carry = true,
            SED => self.status.decimal = true,
            SEI => self.status.interrupt_disable = true,

            LDA => {
                self.a = self.bus.read(addr);
                self.status.set_zn(self.a);
            }
            LDX => {
                self.x = self.bus.read(addr);
                self.status.set_zn(self.x);
            }
            LDY => {
                self.y = self.bus.read(addr);
                self.status.set_zn(self.y);
            }
            STA => self.bus.write(addr, self.a),
            STX => self.bus.write(addr, self.x),
            STY => self.bus.write(addr, self.y),

            PHA => self.push(self.a),
            PHP => self.push(self.status.pushed(true)),
            PLA => {
                self.a = self.pop();
                self.status.set_zn(self.a);
            }
            PLP => self.status = Flags::pulled(self.pop()),

            TAX => {
                self.x = self.a;
                self.status.set_zn(self.x);
            }
            TAY => {
                self.y = self.a;
                self.status.set_zn(self.y);
            }
            TSX => {
                self.x = self.sp;
                self.status.set_zn(self.x);
            }
            TXA => {
                self.a = self.x;
                self.status.set_zn(self.a);
            }
            TXS => self.sp = self.x,
            TYA => {
                self.a = self.y;
                self.status.set_zn(self.a);
            }

            NOP => {}

            // Unofficial: two operations sharing one resolved address.
            LAX => {
                let m = self.bus.read(addr);
                self.a = m;
                self.x = m;
                self.status.set_zn(m);
            }
            SAX => self.bus.write(addr, self.a & self.x),
            DCP => {
                let result = self.bus.read(addr).wrapping_sub(1);
                self.bus.write(addr, result);
                self.compare(self.a, result);
            }
            ISB => {
                let result = self.bus.read(addr).wrapping_add(1);
                self.bus.write(addr, result);
                self.add_with_carry(!result);
            }
            SLO => {
                let value = self.bus.read(addr);
                let result = self.shift_left(value);
                self.bus.write(addr, result);
                self.a |= result;
                self.status.set_zn(self.a);
            }
            RLA => {
                let value = self.bus.read(addr);
                let result = self.rotate_left(value);
                self.bus.write(addr, result);
                self.a &= result;
                self.status.set_zn(self.a);
            }
            SRE => {
                let value = self.bus.read(addr);
                let result = self.shift_right(value);
                self.bus.write(addr, result);
                self.a ^= result;
                self.status.set_zn(self.a);
            }
            RRA => {
                let value = self.bus.read(addr);
                let result = self.rotate_right(value);
                self.bus.write(addr, result);
                self.add_with_carry(result);
            }
            ANC => {
                self.a &= self.bus.read(addr);
                self.status.set_zn(self.a);
                self.status.carry = self.status.negative;
            }
            ALR => {
                let value = self.a & self.bus.read(addr);
                self.a = self.shift_right(value);
            }
            ARR => {
                let value = self.a & self.bus.read(addr);
                self.a = self.rotate_right(value);
                self.status.carry = self.a & 0x40 != 0;
                self.status.overflow = ((self.a >> 6) ^ (self.a >> 5)) & 1 != 0;
            }
            AXS => {
                let m = self.bus.read(addr);
                let ax = self.a & self.x;
                self.status.carry = ax >= m;
                self.x = ax.wrapping_sub(m);
                self.status.set_zn(self.x);
            }
        }

        0
    }

    fn interrupt_to(&mut self, vector: u16) {
        self.push_word(self.pc);
        self.push(self.status.pushed(false));
        self.status.interrupt_disable = true;
        self.pc = self.read_word(vector);
    }

    // Binary-only: the decimal flag never changes the result.
    fn add_with_carry(&mut self, m: u8) {
        let a = self.a;
        let sum = a as u16 + m as u16 + self.status.carry as u16;
        let result = sum as u8;

        self.status.carry = sum > 0xFF;
        self.status.overflow = (!(a ^ m) & (a ^ result) & 0x80) != 0;
        self.a = result;
        self.status.set_zn(result);
    }

    fn compare(&mut self, register: u8, m: u8) {
        self.status.carry = register >= m;
        self.status.set_zn(register.wrapping_sub(m));
    }

    fn shift_left(&mut self, value: u8) -> u8 {
        self.status.carry = value & 0x80 != 0;
        let result = value << 1;
        self.status.set_zn(result);
        result
    }

    fn shift_right(&mut self, value: u8) -> u8 {
        self.status.carry = value & 0x01 != 0;
        let result = value >> 1;
        self.status.set_zn(result);
        result
    }

    fn rotate_left(&mut self, value: u8) -> u8 {
        let result = (value << 1) | self.status.carry as u8;
        self.status.carry = value & 0x80 != 0;
        self.status.set_zn(result);
        result
    }

    fn rotate_right(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | ((self.status.carry as u8) << 7);
        self.status.carry = value & 0x01 != 0;
        self.status.set_zn(result);
        result
    }

    fn load(&mut self, mode: AddressingMode, addr: u16) -> u8 {
        match mode {
            AddressingMode::Accumulator => self.a,
            _ => self.bus.read(addr),
        }
    }

    fn store(&mut self, mode: AddressingMode, addr: u16, value: u8) {
        match mode {
            AddressingMode::Accumulator => self.a = value,
            _ => self.bus.write(addr, value),
        }
    }

    fn branch(&mut self, condition: bool, target: u16) -> u8 {
        if !condition {
            return 0;
        }

        let extra = if pages_differ(self.pc, target) { 2 } else { 1 };
        self.pc = target;
        extra
    }

    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.bus.read(addr) as u16;
        let hi = self.bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    // The high byte never carries into the next page ($xxFF wraps to $xx00).
    fn read_word_same_page(&mut self, addr: u16) -> u16 {
        let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let lo = self.bus.read(addr) as u16;
        let hi = self.bus.read(hi_addr) as u16;
        (hi << 8) | lo
    }

    fn push(&mut self, value: u8) {
        let addr = 0x0100 | self.sp as u16;
        self.bus.write(addr, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = 0x0100 | self.sp as u16;
        self.bus.read(addr)
    }

    fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push(value as u8);
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }
}

fn pages_differ(a: u16, b: u16) -> bool {
    a & 0xFF00 != b & 0xFF00
}
