//! General purpose register file with the load delay and write ordering model
//!
//! Instruction handlers read the live registers and write into a shadow
//! copy. At the end of each step the (at most two) registers touched during
//! that step are copied from the shadow array to the live one:
//!
//! ```text
//! step N   : handler  : set(rd)          -> queue = [.., rd]
//! step N+1 : load     : set(load.reg)      queue = [.., load.reg]
//!            rotate   :                    queue = [load.reg, load.reg]
//!            handler  : set(rd')         -> queue = [load.reg, rd']
//!            commit   : regs[load.reg], then regs[rd']
//! ```
//!
//! A load issued at step N lands during step N+1 and is only visible to
//! step N+2, so the instruction in the load delay slot still sees the old
//! value.

use crate::psx::instruction::REGISTER_NAMES;
use crate::psx::memory_map::RESET_VECTOR;
use std::fmt;

/// Return address register
pub const RA: usize = 31;
pub const SP: usize = 29;
pub const FP: usize = 30;
pub const GP: usize = 28;

pub struct RegisterFile {
    /// Program counter, address of the next instruction to fetch
    pc: u32,
    /// Next value of the PC, branches write it here
    npc: u32,
    hi: u32,
    lo: u32,
    /// Live registers, what handlers read
    regs: [u32; 32],
    /// Shadow registers, what handlers write
    out: [u32; 32],
    /// Indices written during the previous and current step
    changed: [usize; 2],
    /// Pending delayed load: target register and value
    load: (usize, u32),
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile {
            pc: RESET_VECTOR,
            npc: RESET_VECTOR.wrapping_add(4),
            hi: 0,
            lo: 0,
            regs: [0; 32],
            out: [0; 32],
            changed: [0; 2],
            load: (0, 0),
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn npc(&self) -> u32 {
        self.npc
    }

    /// Points both PC and NPC at a fresh instruction stream
    pub fn jump_to(&mut self, pc: u32) {
        self.pc = pc;
        self.npc = pc.wrapping_add(4);
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn set_npc(&mut self, npc: u32) {
        self.npc = npc;
    }

    /// PC <- NPC, NPC <- NPC + 4
    pub fn advance(&mut self) {
        self.pc = self.npc;
        self.npc = self.npc.wrapping_add(4);
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }

    pub fn lo(&self) -> u32 {
        self.lo
    }

    pub fn set_hi(&mut self, v: u32) {
        self.hi = v;
    }

    pub fn set_lo(&mut self, v: u32) {
        self.lo = v;
    }

    /// Live value of register `i`
    pub fn get(&self, i: usize) -> u32 {
        self.regs[i]
    }

    /// Latest value written to register `i`, including a delayed load that
    /// landed during the current step
    pub fn pending(&self, i: usize) -> u32 {
        self.out[i]
    }

    /// Record a write to register `i`. It becomes visible at the end of the
    /// step.
    pub fn set(&mut self, i: usize, v: u32) {
        self.out[i] = v;
        self.out[0] = 0;
        self.changed[1] = i;
    }

    /// Schedule a load that lands during the next step
    pub fn delay_load(&mut self, i: usize, v: u32) {
        self.load = (i, v);
    }

    /// Lands the delayed load scheduled by the previous step
    pub fn commit_delayed_load(&mut self) {
        let (i, v) = self.load;

        self.set(i, v);
        self.load = (0, 0);
    }

    /// Moves the most recent write to the older queue slot
    pub fn rotate(&mut self) {
        self.changed[0] = self.changed[1];
    }

    /// Publishes the shadow values of the registers recorded in the queue,
    /// oldest first
    pub fn commit(&mut self) {
        let [first, second] = self.changed;

        self.regs[first] = self.out[first];
        self.regs[second] = self.out[second];
    }

    /// Writes a register outside of instruction execution (loaders,
    /// debuggers). Takes effect immediately.
    pub fn force(&mut self, i: usize, v: u32) {
        if i != 0 {
            self.regs[i] = v;
            self.out[i] = v;
        }
    }
}

impl Default for RegisterFile {
    fn default() -> RegisterFile {
        RegisterFile::new()
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "pc: {:08x}  npc: {:08x}  hi: {:08x}  lo: {:08x}", self.pc, self.npc, self.hi, self.lo)?;

        for (row, chunk) in self.regs.chunks(8).enumerate() {
            for (col, v) in chunk.iter().enumerate() {
                write!(f, "{:>4}: {:08x} ", REGISTER_NAMES[row * 8 + col], v)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
