use crate::error::PsxError;
use strum::{Display, IntoStaticStr};

/// Architectural exception causes, the discriminant is the code stored in
/// the COP0 Cause register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum Exception {
    Interrupt = 0x0,
    TlbModification = 0x1,
    TlbLoad = 0x2,
    TlbStore = 0x3,
    /// Unaligned or unmapped load (or instruction fetch)
    AddressLoad = 0x4,
    /// Unaligned or unmapped store
    AddressStore = 0x5,
    BusInstruction = 0x6,
    BusData = 0x7,
    SystemCall = 0x8,
    Break = 0x9,
    /// Reserved (unknown) instruction
    Reserved = 0xa,
    CopUnusable = 0xb,
    Overflow = 0xc,
}

impl Exception {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Why an instruction did not complete normally
#[derive(Debug)]
pub enum Trap {
    /// Delivered to the guest through the exception vector
    Exception(Exception),
    /// Halts emulation
    Fatal(PsxError),
}

impl From<Exception> for Trap {
    fn from(e: Exception) -> Trap {
        Trap::Exception(e)
    }
}

impl From<PsxError> for Trap {
    fn from(e: PsxError) -> Trap {
        Trap::Fatal(e)
    }
}

pub type InstructionResult = Result<(), Trap>;
