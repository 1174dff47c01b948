//! PSX Memory Map Constants
//!
//! Addresses, sizes and masks for every region the bus decodes. Ranges are
//! given as physical addresses unless noted otherwise.

// ============================================================================
// Memory Segments
// ============================================================================

/// Strips the KUSEG/KSEG0/KSEG1 segment bits
pub const PHYSICAL_ADDR_MASK: u32 = 0x1fff_ffff;

/// KSEG2 (cache control) begins here, it is never stripped
pub const KSEG2_BASE: u32 = 0xc000_0000;

// ============================================================================
// Main Memory (RAM)
// ============================================================================

pub const RAM_SIZE: usize = 0x0020_0000; // 2MB
pub const RAM_MASK: u32 = RAM_SIZE as u32 - 1;
pub const RAM_END: u32 = 0x001f_ffff;

// ============================================================================
// Expansion Region 1
// ============================================================================

pub const EXP1_BASE: u32 = 0x1f00_0000;
pub const EXP1_END: u32 = 0x1f7f_ffff;

/// Value returned by reads from the unpopulated expansion port
pub const EXP1_FILL: u32 = 0xff;

// ============================================================================
// Scratchpad (Data Cache)
// ============================================================================

pub const SCRATCHPAD_BASE: u32 = 0x1f80_0000;
pub const SCRATCHPAD_SIZE: usize = 0x400; // 1KB
pub const SCRATCHPAD_END: u32 = SCRATCHPAD_BASE + SCRATCHPAD_SIZE as u32 - 1;

// ============================================================================
// Hardware Registers
// ============================================================================

pub const IO_BASE: u32 = 0x1f80_1000;
pub const IO_END: u32 = 0x1f80_2fff;

/// Offsets relative to `IO_BASE`
pub mod io {
    pub const MEMCTRL_START: u32 = 0x000;
    pub const MEMCTRL_END: u32 = 0x023;
    pub const RAM_SIZE: u32 = 0x060;
    pub const IRQ_START: u32 = 0x070;
    pub const IRQ_END: u32 = 0x07b;
    pub const DMA_START: u32 = 0x080;
    pub const DMA_END: u32 = 0x0ff;
    pub const DMA_CONTROL: u32 = 0x0f0;
    pub const DMA_INTERRUPT: u32 = 0x0f4;
    pub const TIMER_START: u32 = 0x100;
    pub const TIMER_END: u32 = 0x12f;
    pub const GPU_GP0: u32 = 0x810;
    pub const GPU_GP1: u32 = 0x814;
    pub const SPU_START: u32 = 0xc00;
    pub const SPU_END: u32 = 0xfff;
    /// Expansion 2 boot status display
    pub const POST: u32 = 0x1041;
}

// ============================================================================
// BIOS ROM
// ============================================================================

pub const BIOS_BASE: u32 = 0x1fc0_0000;
pub const BIOS_SIZE: usize = 0x0008_0000; // 512KB
pub const BIOS_END: u32 = BIOS_BASE + BIOS_SIZE as u32 - 1;

/// Reset vector (CPU starts here)
pub const RESET_VECTOR: u32 = 0xbfc0_0000;

// ============================================================================
// Cache Control I/O Ports (virtual, KSEG2)
// ============================================================================

pub const IO_PORTS_BASE: u32 = 0xfffe_0000;
pub const IO_PORTS_SIZE: usize = 0x200;
pub const IO_PORTS_END: u32 = IO_PORTS_BASE + IO_PORTS_SIZE as u32 - 1;

// ============================================================================
// Exception Vectors
// ============================================================================

pub const EXCEPTION_VECTOR_RAM: u32 = 0x8000_0080;
pub const EXCEPTION_VECTOR_ROM: u32 = 0xbfc0_0180;

// ============================================================================
// EXE File Loading
// ============================================================================

pub const EXE_MAGIC: &[u8] = b"PS-X EXE";
pub const EXE_HEADER_SIZE: usize = 0x800;

/// Physical address of `vaddr` for the segments that are simple mirrors of
/// the physical space (the low 512MB of KUSEG, KSEG0 and KSEG1), `None`
/// everywhere else
pub const fn to_physical_address(vaddr: u32) -> Option<u32> {
    match vaddr >> 29 {
        0 | 4 | 5 => Some(vaddr & PHYSICAL_ADDR_MASK),
        _ => None,
    }
}
