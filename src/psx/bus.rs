//! Memory bus: address decoding and peripheral register dispatch
//!
//! | Virtual range               | Region                          |
//! |-----------------------------|---------------------------------|
//! | `0x00000000` - `0x001fffff` | RAM (also KSEG0/KSEG1 mirrors)   |
//! | `0x1f000000` - `0x1f7fffff` | Expansion 1 (nothing connected) |
//! | `0x1f800000` - `0x1f8003ff` | Scratchpad                      |
//! | `0x1f801000` - `0x1f802fff` | Hardware registers              |
//! | `0x1fc00000` - `0x1fc7ffff` | BIOS ROM                        |
//! | `0xfffe0000` - `0xfffe01ff` | Cache control (KSEG2 only)      |
//!
//! KUSEG, KSEG0 and KSEG1 all decode the same physical space, KSEG2 only
//! contains the cache control window.

use super::cpu::{Exception, Trap};
use super::dma::Dma;
use super::memory_map::{self, io};
use super::{AccessWidth, Psx};
use crate::error::{PsxError, Result};
use log::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Ram(u32),
    Expansion1,
    Scratchpad(u32),
    /// Offset relative to the start of the hardware register window
    Io(u32),
    Bios(u32),
    IoPorts(u32),
}

/// Maps a virtual address to the region holding it, `None` if nothing is
/// mapped there
pub fn resolve(vaddr: u32) -> Option<Region> {
    let paddr = match memory_map::to_physical_address(vaddr) {
        Some(p) => p,
        None => {
            return match vaddr {
                memory_map::IO_PORTS_BASE..=memory_map::IO_PORTS_END => {
                    Some(Region::IoPorts(vaddr - memory_map::IO_PORTS_BASE))
                }
                _ => None,
            }
        }
    };

    let region = match paddr {
        0..=memory_map::RAM_END => Region::Ram(paddr & memory_map::RAM_MASK),
        memory_map::EXP1_BASE..=memory_map::EXP1_END => Region::Expansion1,
        memory_map::SCRATCHPAD_BASE..=memory_map::SCRATCHPAD_END => {
            Region::Scratchpad(paddr - memory_map::SCRATCHPAD_BASE)
        }
        memory_map::IO_BASE..=memory_map::IO_END => Region::Io(paddr - memory_map::IO_BASE),
        memory_map::BIOS_BASE..=memory_map::BIOS_END => Region::Bios(paddr - memory_map::BIOS_BASE),
        _ => return None,
    };

    Some(region)
}

/// Memory control registers at the start of the hardware register window.
/// They configure bus timings, we only keep the values around.
struct MemoryControl {
    regs: [u32; 9],
    ram_size: u32,
}

impl MemoryControl {
    const EXP1_BASE: usize = 0;
    const EXP2_BASE: usize = 1;

    fn new() -> MemoryControl {
        MemoryControl {
            regs: [0; 9],
            ram_size: 0,
        }
    }

    fn get(&self, offset: u32) -> u32 {
        self.regs[(offset >> 2) as usize]
    }

    fn set(&mut self, offset: u32, val: u32) {
        let index = (offset >> 2) as usize;

        match index {
            MemoryControl::EXP1_BASE if val != memory_map::EXP1_BASE => {
                warn!("Expansion 1 base moved to {:08x}", val)
            }
            MemoryControl::EXP2_BASE if val != memory_map::IO_BASE + 0x1000 => {
                warn!("Expansion 2 base moved to {:08x}", val)
            }
            _ => (),
        }

        self.regs[index] = val;
    }
}

/// Owns every memory buffer on the bus
pub struct AddressSpace {
    ram: Box<[u8]>,
    scratchpad: Box<[u8]>,
    bios: Box<[u8]>,
    io_ports: Box<[u8]>,
    memory_control: MemoryControl,
}

impl AddressSpace {
    pub fn new() -> AddressSpace {
        AddressSpace {
            ram: vec![0; memory_map::RAM_SIZE].into_boxed_slice(),
            scratchpad: vec![0; memory_map::SCRATCHPAD_SIZE].into_boxed_slice(),
            bios: vec![0; memory_map::BIOS_SIZE].into_boxed_slice(),
            io_ports: vec![0; memory_map::IO_PORTS_SIZE].into_boxed_slice(),
            memory_control: MemoryControl::new(),
        }
    }

    /// Direct RAM access for DMA, `offset` wraps around the 2MB
    pub fn ram_load<T: AccessWidth>(&self, offset: u32) -> T {
        read(&self.ram, offset)
    }

    pub fn ram_store<T: AccessWidth>(&mut self, offset: u32, val: T) {
        write(&mut self.ram, offset, val)
    }
}

impl Default for AddressSpace {
    fn default() -> AddressSpace {
        AddressSpace::new()
    }
}

/// Buffers are power-of-two sized: masking the offset keeps the access in
/// bounds, and aligned accesses never straddle the end
fn read<T: AccessWidth>(buf: &[u8], offset: u32) -> T {
    let o = (offset as usize) & (buf.len() - 1) & !(T::SIZE as usize - 1);

    T::load(&buf[o..o + T::SIZE as usize])
}

fn write<T: AccessWidth>(buf: &mut [u8], offset: u32, val: T) {
    let o = (offset as usize) & (buf.len() - 1) & !(T::SIZE as usize - 1);

    val.store(&mut buf[o..o + T::SIZE as usize])
}

impl Psx {
    /// Typed load from the bus
    pub fn load<T: AccessWidth>(&mut self, vaddr: u32) -> std::result::Result<T, Trap> {
        if vaddr % T::SIZE != 0 {
            debug!("Unaligned {}bit load from {:08x}", T::SIZE * 8, vaddr);
            return Err(self.address_error(vaddr, Exception::AddressLoad));
        }

        let region = match resolve(vaddr) {
            Some(r) => r,
            None => {
                warn!(
                    "Unmapped {}bit load from {:08x}\n{}",
                    T::SIZE * 8,
                    vaddr,
                    self.cpu.regs
                );
                return Err(self.address_error(vaddr, Exception::AddressLoad));
            }
        };

        let v = match region {
            Region::Ram(offset) => read(&self.bus.ram, offset),
            Region::Expansion1 => T::from_u32(memory_map::EXP1_FILL),
            Region::Scratchpad(offset) => read(&self.bus.scratchpad, offset),
            Region::Io(offset) => T::from_u32(self.io_load(offset, T::SIZE)),
            Region::Bios(offset) => read(&self.bus.bios, offset),
            Region::IoPorts(offset) => read(&self.bus.io_ports, offset),
        };

        Ok(v)
    }

    /// Typed store to the bus. Can run a DMA transfer or a GPU command to
    /// completion before returning.
    pub fn store<T: AccessWidth>(&mut self, vaddr: u32, val: T) -> std::result::Result<(), Trap> {
        if vaddr % T::SIZE != 0 {
            debug!("Unaligned {}bit store to {:08x}", T::SIZE * 8, vaddr);
            return Err(self.address_error(vaddr, Exception::AddressStore));
        }

        if self.cop0.cache_isolated() {
            return Ok(());
        }

        let region = match resolve(vaddr) {
            Some(r) => r,
            None => {
                warn!(
                    "Unmapped {}bit store of {:08x} to {:08x}\n{}",
                    T::SIZE * 8,
                    val.to_u32(),
                    vaddr,
                    self.cpu.regs
                );
                return Err(self.address_error(vaddr, Exception::AddressStore));
            }
        };

        match region {
            Region::Ram(offset) => write(&mut self.bus.ram, offset, val),
            Region::Expansion1 => (),
            Region::Scratchpad(offset) => write(&mut self.bus.scratchpad, offset, val),
            Region::Io(offset) => self.io_store(offset, T::SIZE, val.to_u32())?,
            Region::Bios(offset) => {
                debug!("Dropped write of {:08x} to BIOS offset {:x}", val.to_u32(), offset)
            }
            Region::IoPorts(offset) => write(&mut self.bus.io_ports, offset, val),
        }

        Ok(())
    }

    fn address_error(&mut self, vaddr: u32, cause: Exception) -> Trap {
        self.cop0.set_bad_vaddr(vaddr);

        Trap::Exception(cause)
    }

    fn unhandled_io(&self, what: &str, offset: u32, width: u32) {
        if self.config.log_unhandled_io {
            warn!("Unhandled {}bit {} at I/O offset {:03x}", width * 8, what, offset);
        } else {
            debug!("Unhandled {}bit {} at I/O offset {:03x}", width * 8, what, offset);
        }
    }

    fn io_load(&mut self, offset: u32, width: u32) -> u32 {
        match offset {
            io::MEMCTRL_START..=io::MEMCTRL_END => self.bus.memory_control.get(offset),
            io::RAM_SIZE => self.bus.memory_control.ram_size,
            io::IRQ_START..=io::IRQ_END
            | io::TIMER_START..=io::TIMER_END
            | io::SPU_START..=io::SPU_END
            | io::POST => {
                trace!("Stub {}bit load at I/O offset {:03x}", width * 8, offset);
                0
            }
            io::DMA_START..=io::DMA_END => match Dma::register_index(offset) {
                Some(index) => self.dma.get(index),
                None => {
                    self.unhandled_io("DMA load", offset, width);
                    0
                }
            },
            io::GPU_GP0 => self.gpu.read(),
            io::GPU_GP1 => self.gpu.status(),
            _ => {
                self.unhandled_io("load", offset, width);
                0
            }
        }
    }

    fn io_store(&mut self, offset: u32, width: u32, val: u32) -> std::result::Result<(), Trap> {
        match offset {
            io::MEMCTRL_START..=io::MEMCTRL_END => self.bus.memory_control.set(offset, val),
            io::RAM_SIZE => self.bus.memory_control.ram_size = val,
            io::IRQ_START..=io::IRQ_END
            | io::TIMER_START..=io::TIMER_END
            | io::SPU_START..=io::SPU_END
            | io::POST => {
                trace!("Stub {}bit store of {:08x} at I/O offset {:03x}", width * 8, val, offset)
            }
            io::DMA_START..=io::DMA_END => match Dma::register_index(offset) {
                Some(index) => {
                    if let Some(port) = self.dma.set(index, val) {
                        self.dma.execute(port, &mut self.bus, &mut self.gpu)?;
                    }
                }
                None => self.unhandled_io("DMA store", offset, width),
            },
            io::GPU_GP0 => self.gpu.gp0(val)?,
            io::GPU_GP1 => self.gpu.gp1(val)?,
            _ => self.unhandled_io("store", offset, width),
        }

        Ok(())
    }

    /// Installs the BIOS image, it must be exactly 512KB
    pub fn load_bios(&mut self, image: &[u8]) -> Result<()> {
        if image.len() != memory_map::BIOS_SIZE {
            return Err(PsxError::BadBiosSize {
                expected: memory_map::BIOS_SIZE,
                got: image.len(),
            });
        }

        self.bus.bios.copy_from_slice(image);
        info!("BIOS loaded");

        Ok(())
    }

    /// Host to guest copy into RAM or scratchpad, bypassing cache isolation
    /// and without raising guest exceptions
    pub fn copy_to_ram(&mut self, vaddr: u32, bytes: &[u8]) -> Result<()> {
        for (i, &b) in bytes.iter().enumerate() {
            let addr = vaddr.wrapping_add(i as u32);

            match resolve(addr) {
                Some(Region::Ram(offset)) => write(&mut self.bus.ram, offset, b),
                Some(Region::Scratchpad(offset)) => write(&mut self.bus.scratchpad, offset, b),
                _ => return Err(PsxError::BadLoadAddress(addr)),
            }
        }

        Ok(())
    }

    /// Guest to host copy out of RAM or scratchpad
    pub fn copy_from_ram(&self, vaddr: u32, len: usize) -> Result<Vec<u8>> {
        (0..len)
            .map(|i| {
                let addr = vaddr.wrapping_add(i as u32);

                match resolve(addr) {
                    Some(Region::Ram(offset)) => Ok(read(&self.bus.ram, offset)),
                    Some(Region::Scratchpad(offset)) => Ok(read(&self.bus.scratchpad, offset)),
                    _ => Err(PsxError::BadLoadAddress(addr)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ram_mirrors() {
        assert_eq!(resolve(0x0000_1000), Some(Region::Ram(0x1000)));
        assert_eq!(resolve(0x8000_1000), Some(Region::Ram(0x1000)));
        assert_eq!(resolve(0xa000_1000), Some(Region::Ram(0x1000)));
        assert_eq!(resolve(0x801f_fffc), Some(Region::Ram(0x1f_fffc)));
        // Only the first 2MB are decoded
        assert_eq!(resolve(0x0020_0000), None);
    }

    #[test]
    fn test_resolve_regions() {
        assert_eq!(resolve(0x1f00_0084), Some(Region::Expansion1));
        assert_eq!(resolve(0x9f80_0010), Some(Region::Scratchpad(0x10)));
        assert_eq!(resolve(0x1f80_1810), Some(Region::Io(0x810)));
        assert_eq!(resolve(0xbf80_1814), Some(Region::Io(0x814)));
        assert_eq!(resolve(0xbfc0_0000), Some(Region::Bios(0)));
        assert_eq!(resolve(0x9fc7_fffc), Some(Region::Bios(0x7_fffc)));
        assert_eq!(resolve(0xfffe_0130), Some(Region::IoPorts(0x130)));
    }

    #[test]
    fn test_resolve_unmapped() {
        assert_eq!(resolve(0x1f80_0400), None);
        assert_eq!(resolve(0x1fc8_0000), None);
        assert_eq!(resolve(0xc000_0000), None);
        assert_eq!(resolve(0x2000_0000), None);
        assert_eq!(resolve(0x4000_0100), None);
        assert_eq!(resolve(0xfffe_0200), None);
    }

    #[test]
    fn test_ram_helpers_wrap() {
        let mut bus = AddressSpace::new();

        bus.ram_store::<u32>(0x10, 0xdead_beef);
        assert_eq!(bus.ram_load::<u32>(0x20_0010), 0xdead_beef);
        assert_eq!(bus.ram_load::<u16>(0x12), 0xdead);
    }
}
