//! R3000A interpreter
//!
//! One call to [`Psx::step`] runs exactly one instruction. Branches only
//! ever write NPC, so the instruction following a branch (the delay slot)
//! always runs before the jump is observed.

pub mod exception;
mod handlers;
pub mod registers;

pub use exception::{Exception, InstructionResult, Trap};

use super::instruction::Instruction;
use super::Psx;
use crate::error::Result;
use log::trace;
use registers::RegisterFile;

pub struct Cpu {
    pub(crate) regs: RegisterFile,
    /// Address of the instruction currently executing
    pub(crate) current_pc: u32,
    /// Set by branch handlers, the next instruction is a delay slot
    pub(crate) branching: bool,
    /// True while executing the instruction in a delay slot
    pub(crate) in_delay_slot: bool,
}

impl Cpu {
    pub fn new() -> Cpu {
        let regs = RegisterFile::new();

        Cpu {
            current_pc: regs.pc(),
            regs,
            branching: false,
            in_delay_slot: false,
        }
    }

    /// Jump within the current 256MB segment, `target` is in words
    fn branch_segment(&mut self, target: u32) {
        let pc = self.regs.pc();

        self.regs.set_npc((pc & 0xf000_0000) | (target << 2));
        self.branching = true;
    }

    fn branch_absolute(&mut self, addr: u32) {
        self.regs.set_npc(addr);
        self.branching = true;
    }

    /// `offset` is a sign-extended word count relative to the delay slot
    fn branch_relative(&mut self, offset: u32) {
        let pc = self.regs.pc();

        self.regs.set_npc(pc.wrapping_add(offset << 2));
        self.branching = true;
    }

    /// Consumes the branch flag set by the previous instruction
    fn enter_step(&mut self) {
        self.in_delay_slot = self.branching;
        self.branching = false;
    }
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}

impl Psx {
    /// Executes a single instruction. Architectural exceptions are handled
    /// internally, an `Err` means emulation cannot continue. In that case
    /// PC points back at the offending instruction.
    pub fn step(&mut self) -> Result<()> {
        let pc = self.cpu.regs.pc();
        self.cpu.current_pc = pc;

        if pc % 4 != 0 {
            self.cpu.enter_step();
            self.cop0.set_bad_vaddr(pc);
            self.exception(Exception::AddressLoad);
            return Ok(());
        }

        let word = match self.load::<u32>(pc) {
            Ok(w) => w,
            Err(Trap::Exception(e)) => {
                self.cpu.enter_step();
                self.exception(e);
                return Ok(());
            }
            Err(Trap::Fatal(e)) => return Err(e),
        };

        let npc = self.cpu.regs.npc();
        self.cpu.regs.advance();
        self.cpu.enter_step();

        self.cpu.regs.commit_delayed_load();
        self.cpu.regs.rotate();

        let instruction = Instruction(word);

        if self.config.trace_instructions {
            trace!("{:08x}: {:08x}  {}", pc, word, instruction);
        }

        let result = handlers::dispatch(self, instruction);

        self.cpu.regs.commit();

        match result {
            Ok(()) => Ok(()),
            Err(Trap::Exception(e)) => {
                self.exception(e);
                Ok(())
            }
            Err(Trap::Fatal(e)) => {
                self.cpu.regs.set_pc(pc);
                self.cpu.regs.set_npc(npc);
                self.cpu.branching = self.cpu.in_delay_slot;
                Err(e)
            }
        }
    }

    /// Enters the exception handler for `cause`, raised by the instruction
    /// at `current_pc`
    pub(crate) fn exception(&mut self, cause: Exception) {
        let handler =
            self.cop0
                .enter_exception(cause.code(), self.cpu.current_pc, self.cpu.in_delay_slot);

        trace!(
            "{} exception at {:08x}, jumping to {:08x}",
            cause,
            self.cpu.current_pc,
            handler
        );

        self.cpu.regs.jump_to(handler);
        self.cpu.branching = false;
    }
}
