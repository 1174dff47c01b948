//! The emulated machine
//!
//! [`Psx`] owns every subsystem. Handlers and peripherals never hold
//! references to each other, they go through the machine context which
//! splits its borrows between the parts a given operation needs.

pub mod bus;
pub mod cop0;
pub mod cpu;
pub mod dma;
pub mod exe;
pub mod gpu;
pub mod instruction;
pub mod memory_map;

use crate::config::EmulatorConfig;
use crate::error::Result;
use byteorder::{ByteOrder, LittleEndian};
use bus::AddressSpace;
use cop0::Cop0;
use cpu::registers::RegisterFile;
use cpu::Cpu;
use dma::Dma;
use gpu::{Gpu, Renderer};

pub struct Psx {
    pub(crate) cpu: Cpu,
    pub(crate) cop0: Cop0,
    pub(crate) bus: AddressSpace,
    pub(crate) dma: Dma,
    pub(crate) gpu: Gpu,
    pub(crate) config: EmulatorConfig,
}

impl Psx {
    pub fn new(renderer: Box<dyn Renderer>) -> Psx {
        Psx::with_config(EmulatorConfig::default(), renderer)
    }

    pub fn with_config(config: EmulatorConfig, renderer: Box<dyn Renderer>) -> Psx {
        Psx {
            cpu: Cpu::new(),
            cop0: Cop0::new(),
            bus: AddressSpace::new(),
            dma: Dma::new(),
            gpu: Gpu::new(renderer, config.unimplemented),
            config,
        }
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.cpu.regs
    }

    pub fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.cpu.regs
    }

    pub fn cop0(&self) -> &Cop0 {
        &self.cop0
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn dma(&self) -> &Dma {
        &self.dma
    }

    /// Redirects execution to `pc`, dropping any pending branch
    pub fn set_pc(&mut self, pc: u32) {
        self.cpu.regs.jump_to(pc);
        self.cpu.branching = false;
    }

    /// Runs up to `steps` instructions, polling the renderer for events
    /// between each of them. Returns the number of instructions executed,
    /// which is lower than `steps` if the renderer asked to stop.
    pub fn run(&mut self, steps: u64) -> Result<u64> {
        for n in 0..steps {
            self.step()?;

            if !self.gpu.renderer_mut().poll_events() {
                return Ok(n + 1);
            }
        }

        Ok(steps)
    }
}

/// Trait used to abstract away the various access widths of the bus
pub trait AccessWidth: Copy {
    /// Size in bytes
    const SIZE: u32;

    fn from_u32(val: u32) -> Self;
    fn to_u32(self) -> u32;
    /// Little-endian decode from the start of `buf`
    fn load(buf: &[u8]) -> Self;
    /// Little-endian encode to the start of `buf`
    fn store(self, buf: &mut [u8]);
}

impl AccessWidth for u8 {
    const SIZE: u32 = 1;

    fn from_u32(val: u32) -> Self {
        val as u8
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn load(buf: &[u8]) -> Self {
        buf[0]
    }

    fn store(self, buf: &mut [u8]) {
        buf[0] = self;
    }
}

impl AccessWidth for u16 {
    const SIZE: u32 = 2;

    fn from_u32(val: u32) -> Self {
        val as u16
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn load(buf: &[u8]) -> Self {
        LittleEndian::read_u16(buf)
    }

    fn store(self, buf: &mut [u8]) {
        LittleEndian::write_u16(buf, self)
    }
}

impl AccessWidth for u32 {
    const SIZE: u32 = 4;

    fn from_u32(val: u32) -> Self {
        val
    }

    fn to_u32(self) -> u32 {
        self
    }

    fn load(buf: &[u8]) -> Self {
        LittleEndian::read_u32(buf)
    }

    fn store(self, buf: &mut [u8]) {
        LittleEndian::write_u32(buf, self)
    }
}
