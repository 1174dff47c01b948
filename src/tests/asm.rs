// Minimal assembler and machine fixture for the scenario tests

use crate::config::EmulatorConfig;
use crate::psx::gpu::RecordingRenderer;
use crate::psx::Psx;

/// Where test programs are loaded
pub const PROGRAM_BASE: u32 = 0x8001_0000;
/// Scratch data area, away from the program
pub const DATA_BASE: u32 = 0x8002_0000;

pub struct Machine {
    pub psx: Psx,
    pub renderer: RecordingRenderer,
}

pub fn machine() -> Machine {
    machine_with(EmulatorConfig::default())
}

pub fn machine_with(config: EmulatorConfig) -> Machine {
    let renderer = RecordingRenderer::new();
    let psx = Psx::with_config(config, Box::new(renderer.clone()));

    Machine { psx, renderer }
}

impl Machine {
    /// Copies `program` to `PROGRAM_BASE` and points the PC at it
    pub fn load(&mut self, program: &[u32]) {
        let bytes: Vec<u8> = program.iter().flat_map(|w| w.to_le_bytes()).collect();

        self.psx.copy_to_ram(PROGRAM_BASE, &bytes).unwrap();
        self.psx.set_pc(PROGRAM_BASE);
    }

    pub fn run(&mut self, steps: u64) {
        assert_eq!(self.psx.run(steps).unwrap(), steps);
    }

    pub fn reg(&self, i: usize) -> u32 {
        self.psx.regs().get(i)
    }

    pub fn set_reg(&mut self, i: usize, v: u32) {
        self.psx.regs_mut().force(i, v);
    }

    pub fn write32(&mut self, addr: u32, v: u32) {
        self.psx.copy_to_ram(addr, &v.to_le_bytes()).unwrap();
    }

    pub fn read32(&self, addr: u32) -> u32 {
        let b = self.psx.copy_from_ram(addr, 4).unwrap();

        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Bus write, as the CPU would do it
    pub fn store32(&mut self, addr: u32, v: u32) {
        assert!(self.psx.store::<u32>(addr, v).is_ok());
    }

    /// Exception code from CAUSE
    pub fn cause_code(&self) -> u32 {
        (self.psx.cop0().cause() >> 2) & 0x1f
    }
}

fn r_type(funct: u32, rs: usize, rt: usize, rd: usize, shamt: u32) -> u32 {
    ((rs as u32) << 21) | ((rt as u32) << 16) | ((rd as u32) << 11) | (shamt << 6) | funct
}

fn i_type(op: u32, rs: usize, rt: usize, imm: i16) -> u32 {
    (op << 26) | ((rs as u32) << 21) | ((rt as u32) << 16) | (imm as u16 as u32)
}

pub fn nop() -> u32 {
    0
}

pub fn add(rd: usize, rs: usize, rt: usize) -> u32 {
    r_type(0x20, rs, rt, rd, 0)
}

pub fn addu(rd: usize, rs: usize, rt: usize) -> u32 {
    r_type(0x21, rs, rt, rd, 0)
}

pub fn sub(rd: usize, rs: usize, rt: usize) -> u32 {
    r_type(0x22, rs, rt, rd, 0)
}

pub fn sllv(rd: usize, rt: usize, rs: usize) -> u32 {
    r_type(0x04, rs, rt, rd, 0)
}

pub fn sra(rd: usize, rt: usize, shamt: u32) -> u32 {
    r_type(0x03, 0, rt, rd, shamt)
}

pub fn slt(rd: usize, rs: usize, rt: usize) -> u32 {
    r_type(0x2a, rs, rt, rd, 0)
}

pub fn mult(rs: usize, rt: usize) -> u32 {
    r_type(0x18, rs, rt, 0, 0)
}

pub fn multu(rs: usize, rt: usize) -> u32 {
    r_type(0x19, rs, rt, 0, 0)
}

pub fn div(rs: usize, rt: usize) -> u32 {
    r_type(0x1a, rs, rt, 0, 0)
}

pub fn divu(rs: usize, rt: usize) -> u32 {
    r_type(0x1b, rs, rt, 0, 0)
}

pub fn mfhi(rd: usize) -> u32 {
    r_type(0x10, 0, 0, rd, 0)
}

pub fn mflo(rd: usize) -> u32 {
    r_type(0x12, 0, 0, rd, 0)
}

pub fn jr(rs: usize) -> u32 {
    r_type(0x08, rs, 0, 0, 0)
}

pub fn jalr(rd: usize, rs: usize) -> u32 {
    r_type(0x09, rs, 0, rd, 0)
}

pub fn syscall() -> u32 {
    0x0000_000c
}

pub fn addi(rt: usize, rs: usize, imm: i16) -> u32 {
    i_type(0x08, rs, rt, imm)
}

pub fn addiu(rt: usize, rs: usize, imm: i16) -> u32 {
    i_type(0x09, rs, rt, imm)
}

pub fn ori(rt: usize, rs: usize, imm: u16) -> u32 {
    i_type(0x0d, rs, rt, imm as i16)
}

pub fn lui(rt: usize, imm: u16) -> u32 {
    i_type(0x0f, 0, rt, imm as i16)
}

pub fn beq(rs: usize, rt: usize, offset: i16) -> u32 {
    i_type(0x04, rs, rt, offset)
}

pub fn bne(rs: usize, rt: usize, offset: i16) -> u32 {
    i_type(0x05, rs, rt, offset)
}

pub fn bgezal(rs: usize, offset: i16) -> u32 {
    i_type(0x01, rs, 0x11, offset)
}

pub fn jal(target: u32) -> u32 {
    (0x03 << 26) | ((target >> 2) & 0x03ff_ffff)
}

pub fn lb(rt: usize, offset: i16, base: usize) -> u32 {
    i_type(0x20, base, rt, offset)
}

pub fn lw(rt: usize, offset: i16, base: usize) -> u32 {
    i_type(0x23, base, rt, offset)
}

pub fn lwl(rt: usize, offset: i16, base: usize) -> u32 {
    i_type(0x22, base, rt, offset)
}

pub fn lwr(rt: usize, offset: i16, base: usize) -> u32 {
    i_type(0x26, base, rt, offset)
}

pub fn sw(rt: usize, offset: i16, base: usize) -> u32 {
    i_type(0x2b, base, rt, offset)
}

pub fn swl(rt: usize, offset: i16, base: usize) -> u32 {
    i_type(0x2a, base, rt, offset)
}

pub fn swr(rt: usize, offset: i16, base: usize) -> u32 {
    i_type(0x2e, base, rt, offset)
}

pub fn mtc0(rt: usize, rd: usize) -> u32 {
    (0x10 << 26) | (0x04 << 21) | ((rt as u32) << 16) | ((rd as u32) << 11)
}

pub fn mfc0(rt: usize, rd: usize) -> u32 {
    (0x10 << 26) | ((rt as u32) << 16) | ((rd as u32) << 11)
}

pub fn rfe() -> u32 {
    0x4200_0010
}

/// Any COP2 (GTE) operation
pub fn gte_command() -> u32 {
    0x4a00_0001
}
