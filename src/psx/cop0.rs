//! Coprocessor 0: system control
//!
//! Only the registers the exception machinery needs carry any behaviour,
//! the rest are plain storage for MTC0/MFC0.

use super::memory_map::{EXCEPTION_VECTOR_RAM, EXCEPTION_VECTOR_ROM};
use bitflags::bitflags;
use log::warn;

pub const COP0_REGISTER_COUNT: usize = 17;

pub const REG_BAD_VADDR: usize = 8;
pub const REG_SR: usize = 12;
pub const REG_CAUSE: usize = 13;
pub const REG_EPC: usize = 14;
pub const REG_PRID: usize = 15;

/// Processor revision reported by the R3000A
const PRID_R3000A: u32 = 0x0000_0002;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        const INTERRUPT_ENABLE = 1 << 0;
        const USER_MODE = 1 << 1;
        const ISOLATE_CACHE = 1 << 16;
        const SWAP_CACHES = 1 << 17;
        /// Boot exception vectors in ROM
        const BEV = 1 << 22;
        const COP0_ENABLE = 1 << 28;
        const COP2_ENABLE = 1 << 30;
    }
}

/// Cause bit set when the exception hit an instruction in a delay slot
const CAUSE_BRANCH_DELAY: u32 = 1 << 31;
const CAUSE_CODE_MASK: u32 = 0x7c;
/// The interrupt enable / user mode stack: current, previous, old
const MODE_STACK_MASK: u32 = 0x3f;

pub struct Cop0 {
    regs: [u32; COP0_REGISTER_COUNT],
}

impl Cop0 {
    pub fn new() -> Cop0 {
        let mut regs = [0; COP0_REGISTER_COUNT];

        regs[REG_PRID] = PRID_R3000A;

        Cop0 { regs }
    }

    pub fn get(&self, index: usize) -> u32 {
        match self.regs.get(index) {
            Some(&v) => v,
            None => {
                warn!("Read from unknown COP0 register {}", index);
                0
            }
        }
    }

    pub fn set(&mut self, index: usize, value: u32) {
        match self.regs.get_mut(index) {
            Some(r) => *r = value,
            None => warn!("Write to unknown COP0 register {}: {:08x}", index, value),
        }
    }

    pub fn sr(&self) -> u32 {
        self.regs[REG_SR]
    }

    pub fn status(&self) -> Status {
        Status::from_bits_retain(self.regs[REG_SR])
    }

    pub fn cause(&self) -> u32 {
        self.regs[REG_CAUSE]
    }

    pub fn epc(&self) -> u32 {
        self.regs[REG_EPC]
    }

    pub fn bad_vaddr(&self) -> u32 {
        self.regs[REG_BAD_VADDR]
    }

    pub fn set_bad_vaddr(&mut self, addr: u32) {
        self.regs[REG_BAD_VADDR] = addr;
    }

    pub fn cache_isolated(&self) -> bool {
        self.status().contains(Status::ISOLATE_CACHE)
    }

    /// Exception entry: pushes the mode stack, records the cause and the
    /// return address. Returns the handler address.
    pub fn enter_exception(&mut self, code: u32, pc: u32, in_delay_slot: bool) -> u32 {
        let sr = self.regs[REG_SR];
        let mode = sr & MODE_STACK_MASK;
        self.regs[REG_SR] = (sr & !MODE_STACK_MASK) | ((mode << 2) & MODE_STACK_MASK);

        let mut cause = (self.regs[REG_CAUSE] & !CAUSE_CODE_MASK) | ((code << 2) & CAUSE_CODE_MASK);

        if in_delay_slot {
            cause |= CAUSE_BRANCH_DELAY;
            self.regs[REG_EPC] = pc.wrapping_sub(4);
        } else {
            cause &= !CAUSE_BRANCH_DELAY;
            self.regs[REG_EPC] = pc;
        }

        self.regs[REG_CAUSE] = cause;

        if self.status().contains(Status::BEV) {
            EXCEPTION_VECTOR_ROM
        } else {
            EXCEPTION_VECTOR_RAM
        }
    }

    /// RFE: pops the mode stack, the "old" pair is left untouched
    pub fn return_from_exception(&mut self) {
        let sr = self.regs[REG_SR];
        let mode = sr & MODE_STACK_MASK;

        self.regs[REG_SR] = (sr & !0xf) | (mode >> 2);
    }
}

impl Default for Cop0 {
    fn default() -> Cop0 {
        Cop0::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_stack_push_pop() {
        let mut cop0 = Cop0::new();

        cop0.set(REG_SR, 0b00_01_11);
        cop0.enter_exception(8, 0x8000_1000, false);
        assert_eq!(cop0.sr() & 0x3f, 0b01_11_00);

        cop0.return_from_exception();
        assert_eq!(cop0.sr() & 0x3f, 0b01_01_11);
    }

    #[test]
    fn test_vector_selection() {
        let mut cop0 = Cop0::new();

        assert_eq!(cop0.enter_exception(4, 0, false), EXCEPTION_VECTOR_RAM);

        cop0.set(REG_SR, Status::BEV.bits());
        assert_eq!(cop0.enter_exception(4, 0, false), EXCEPTION_VECTOR_ROM);
    }

    #[test]
    fn test_epc_and_branch_delay_bit() {
        let mut cop0 = Cop0::new();

        cop0.enter_exception(12, 0x8000_0104, true);
        assert_eq!(cop0.epc(), 0x8000_0100);
        assert_eq!(cop0.cause() >> 31, 1);
        assert_eq!((cop0.cause() >> 2) & 0x1f, 12);

        cop0.enter_exception(9, 0x8000_0200, false);
        assert_eq!(cop0.epc(), 0x8000_0200);
        assert_eq!(cop0.cause() >> 31, 0);
        assert_eq!((cop0.cause() >> 2) & 0x1f, 9);
    }

    #[test]
    fn test_cause_keeps_pending_interrupt_bits() {
        let mut cop0 = Cop0::new();

        cop0.set(REG_CAUSE, 0x300);
        cop0.enter_exception(8, 0, false);
        assert_eq!(cop0.cause(), 0x300 | (8 << 2));
    }

    #[test]
    fn test_out_of_range_register() {
        let mut cop0 = Cop0::new();

        cop0.set(40, 1);
        assert_eq!(cop0.get(40), 0);
        assert_eq!(cop0.get(REG_PRID), PRID_R3000A);
    }
}
