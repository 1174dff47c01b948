//! PS-X EXE executables
//!
//! A 0x800 byte header followed by the text segment, which is copied as-is
//! to its load address in RAM.

use super::cpu::registers::{FP, GP, SP};
use super::memory_map::{EXE_HEADER_SIZE, EXE_MAGIC};
use super::Psx;
use crate::error::{PsxError, Result};
use byteorder::{ByteOrder, LittleEndian};
use log::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub pc: u32,
    pub gp: u32,
    pub text_address: u32,
    pub data_address: u32,
    pub data_size: u32,
    pub fill_address: u32,
    pub fill_size: u32,
    pub stack_base: u32,
    pub stack_offset: u32,
    pub text: Vec<u8>,
}

impl Executable {
    pub fn parse(bytes: &[u8]) -> Result<Executable> {
        if bytes.len() < EXE_HEADER_SIZE {
            return Err(PsxError::BadExecutable(format!(
                "header truncated ({} bytes)",
                bytes.len()
            )));
        }

        if &bytes[..EXE_MAGIC.len()] != EXE_MAGIC {
            return Err(PsxError::BadExecutable("bad magic".to_string()));
        }

        let word = |offset: usize| LittleEndian::read_u32(&bytes[offset..]);

        let text_size = word(0x1c) as usize;
        let end = EXE_HEADER_SIZE.saturating_add(text_size);

        if end > bytes.len() {
            return Err(PsxError::BadExecutable(format!(
                "text segment of {:#x} bytes overruns the file",
                text_size
            )));
        }

        Ok(Executable {
            pc: word(0x10),
            gp: word(0x14),
            text_address: word(0x18),
            data_address: word(0x20),
            data_size: word(0x24),
            fill_address: word(0x28),
            fill_size: word(0x2c),
            stack_base: word(0x30),
            stack_offset: word(0x34),
            text: bytes[EXE_HEADER_SIZE..end].to_vec(),
        })
    }

    pub fn stack_pointer(&self) -> Option<u32> {
        match self.stack_base {
            0 => None,
            base => Some(base.wrapping_add(self.stack_offset)),
        }
    }
}

impl Psx {
    /// Loads `exe` into RAM and jumps to its entry point. Meant to be called
    /// once the BIOS has finished initializing the kernel.
    pub fn sideload(&mut self, exe: &Executable) -> Result<()> {
        self.copy_to_ram(exe.text_address, &exe.text)?;

        if exe.gp != 0 {
            self.cpu.regs.force(GP, exe.gp);
        }

        if let Some(sp) = exe.stack_pointer() {
            self.cpu.regs.force(SP, sp);
            self.cpu.regs.force(FP, sp);
        }

        self.set_pc(exe.pc);

        info!(
            "Sideloaded {:#x} bytes at {:08x}, entry point {:08x}",
            exe.text.len(),
            exe.text_address,
            exe.pc
        );

        Ok(())
    }
}
