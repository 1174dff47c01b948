//! DMA controller
//!
//! Transfers run synchronously: as soon as a channel becomes active the
//! whole transfer is carried out before the register write that armed it
//! returns.

use super::bus::AddressSpace;
use super::gpu::Gpu;
use super::memory_map::{self, io};
use crate::error::{PsxError, Result};
use log::{debug, warn};

/// DMA channels, in register order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    MdecIn = 0,
    MdecOut = 1,
    Gpu = 2,
    CdRom = 3,
    Spu = 4,
    Pio = 5,
    /// Ordering table clear
    Otc = 6,
}

impl Port {
    pub fn from_index(index: usize) -> Option<Port> {
        let port = match index {
            0 => Port::MdecIn,
            1 => Port::MdecOut,
            2 => Port::Gpu,
            3 => Port::CdRom,
            4 => Port::Spu,
            5 => Port::Pio,
            6 => Port::Otc,
            _ => return None,
        };

        Some(port)
    }
}

pub const CHANNEL_COUNT: usize = 7;

/// Register index of the shared control register
pub const REG_CONTROL: usize = 21;
/// Register index of the shared interrupt register
pub const REG_INTERRUPT: usize = 22;

/// Addresses generated during a transfer are word-aligned RAM offsets
const ADDRESS_MASK: u32 = 0x1f_fffc;
/// Linked list terminator in a node header
const LIST_END: u32 = 0x80_0000;
/// Written by OTC to the last entry of the ordering table
const OTC_END: u32 = 0xff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToRam = 0,
    FromRam = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Increment = 0,
    Decrement = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sync {
    /// Transfer `block_words` at once
    Manual = 0,
    /// `block_count` blocks of `block_words`
    Request = 1,
    /// Follow a linked list of packets (GPU command lists)
    LinkedList = 2,
    Reserved = 3,
}

#[derive(Debug, Clone)]
pub struct Channel {
    base: u32,
    block_words: u16,
    block_count: u16,
    direction: Direction,
    step: Step,
    chop: bool,
    sync: Sync,
    chop_dma_window: u8,
    chop_cpu_window: u8,
    enable: bool,
    trigger: bool,
    /// Bits 29 and 30, no known function but they can be written
    dummy: u8,
}

impl Channel {
    fn new() -> Channel {
        Channel {
            base: 0,
            block_words: 0,
            block_count: 0,
            direction: Direction::ToRam,
            step: Step::Increment,
            chop: false,
            sync: Sync::Manual,
            chop_dma_window: 0,
            chop_cpu_window: 0,
            enable: false,
            trigger: false,
            dummy: 0,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn set_base(&mut self, val: u32) {
        self.base = val & 0xf_ffff;
    }

    pub fn block(&self) -> u32 {
        ((self.block_count as u32) << 16) | self.block_words as u32
    }

    pub fn set_block(&mut self, val: u32) {
        self.block_words = val as u16;
        self.block_count = (val >> 16) as u16;
    }

    pub fn control(&self) -> u32 {
        let mut r = 0;

        r |= self.direction as u32;
        r |= (self.step as u32) << 1;
        r |= (self.chop as u32) << 8;
        r |= (self.sync as u32) << 9;
        r |= (self.chop_dma_window as u32) << 16;
        r |= (self.chop_cpu_window as u32) << 20;
        r |= (self.enable as u32) << 24;
        r |= (self.trigger as u32) << 28;
        r |= (self.dummy as u32) << 29;

        r
    }

    pub fn set_control(&mut self, val: u32) {
        self.direction = if val & 1 != 0 {
            Direction::FromRam
        } else {
            Direction::ToRam
        };

        self.step = if (val >> 1) & 1 != 0 {
            Step::Decrement
        } else {
            Step::Increment
        };

        self.chop = (val >> 8) & 1 != 0;

        self.sync = match (val >> 9) & 3 {
            0 => Sync::Manual,
            1 => Sync::Request,
            2 => Sync::LinkedList,
            _ => Sync::Reserved,
        };

        self.chop_dma_window = ((val >> 16) & 7) as u8;
        self.chop_cpu_window = ((val >> 20) & 7) as u8;
        self.enable = (val >> 24) & 1 != 0;
        self.trigger = (val >> 28) & 1 != 0;
        self.dummy = ((val >> 29) & 3) as u8;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn sync(&self) -> Sync {
        self.sync
    }

    /// Manual transfers wait for the trigger bit, the other modes
    /// start as soon as the channel is enabled
    pub fn active(&self) -> bool {
        let trigger = match self.sync {
            Sync::Manual => self.trigger,
            _ => true,
        };

        self.enable && trigger
    }

    /// Number of words of a block transfer
    pub fn transfer_size(&self) -> Option<u32> {
        let words = self.block_words as u32;
        let count = self.block_count as u32;

        match self.sync {
            Sync::Manual => Some(words),
            Sync::Request => Some(words * count),
            Sync::LinkedList | Sync::Reserved => None,
        }
    }

    fn done(&mut self) {
        self.enable = false;
        self.trigger = false;
    }
}

pub struct Dma {
    channels: [Channel; CHANNEL_COUNT],
    /// Channel priorities and enables, not emulated
    control: u32,
    /// Interrupt enables and flags
    interrupt: u32,
}

impl Dma {
    pub fn new() -> Dma {
        Dma {
            channels: std::array::from_fn(|_| Channel::new()),
            control: 0x0765_4321,
            interrupt: 0,
        }
    }

    pub fn channel(&self, port: Port) -> &Channel {
        &self.channels[port as usize]
    }

    /// Register index for an offset in the hardware register window
    pub fn register_index(offset: u32) -> Option<usize> {
        match offset {
            io::DMA_CONTROL => Some(REG_CONTROL),
            io::DMA_INTERRUPT => Some(REG_INTERRUPT),
            io::DMA_START..=0x0ef => {
                let rel = offset - io::DMA_START;
                let channel = (rel >> 4) as usize;

                match rel & 0xf {
                    r @ (0 | 4 | 8) => Some(channel * 3 + (r >> 2) as usize),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn get(&self, index: usize) -> u32 {
        match index {
            0..=20 => {
                let channel = &self.channels[index / 3];
                match index % 3 {
                    0 => channel.base(),
                    1 => channel.block(),
                    _ => channel.control(),
                }
            }
            REG_CONTROL => self.control,
            REG_INTERRUPT => self.interrupt(),
            _ => {
                warn!("Read from unknown DMA register {}", index);
                0
            }
        }
    }

    /// Register write. Returns the channel to run if the write armed it.
    pub fn set(&mut self, index: usize, val: u32) -> Option<Port> {
        match index {
            0..=20 => {
                let channel = &mut self.channels[index / 3];
                match index % 3 {
                    0 => channel.set_base(val),
                    1 => channel.set_block(val),
                    _ => {
                        channel.set_control(val);
                        if channel.active() {
                            return Port::from_index(index / 3);
                        }
                    }
                }
            }
            REG_CONTROL => self.control = val,
            REG_INTERRUPT => self.set_interrupt(val),
            _ => warn!("Write to unknown DMA register {}: {:08x}", index, val),
        }

        None
    }

    /// Interrupt register with the computed master flag in bit 31
    pub fn interrupt(&self) -> u32 {
        let v = self.interrupt;
        let force = v & (1 << 15) != 0;
        let master_enable = v & (1 << 23) != 0;
        let pending = (v >> 16) & (v >> 24) & 0x7f != 0;

        if force || (master_enable && pending) {
            v | (1 << 31)
        } else {
            v
        }
    }

    /// Writing 1 to a flag acknowledges it
    fn set_interrupt(&mut self, val: u32) {
        let ack = val & 0x7f00_0000;
        let flags = self.interrupt & 0x7f00_0000 & !ack;

        self.interrupt = (val & 0x00ff_803f) | flags;
    }

    /// Runs the transfer on `port` to completion
    pub fn execute(&mut self, port: Port, bus: &mut AddressSpace, gpu: &mut Gpu) -> Result<()> {
        let channel = &mut self.channels[port as usize];

        debug!(
            "DMA {:?} {:?} {:?} base {:08x} block {:08x}",
            port,
            channel.direction,
            channel.sync,
            channel.base,
            channel.block()
        );

        let result = match channel.sync {
            Sync::LinkedList => linked_list(port, channel, bus, gpu),
            Sync::Manual | Sync::Request => block(port, channel, bus, gpu),
            Sync::Reserved => Err(PsxError::UnsupportedDma {
                port,
                reason: "reserved sync mode",
            }),
        };

        // A failed transfer is abandoned, it never reads as busy
        channel.done();
        result?;

        let p = port as u32;
        if self.interrupt & (1 << (16 + p)) != 0 {
            self.interrupt |= 1 << (24 + p);
        }

        Ok(())
    }
}

impl Default for Dma {
    fn default() -> Dma {
        Dma::new()
    }
}

fn block(port: Port, channel: &mut Channel, bus: &mut AddressSpace, gpu: &mut Gpu) -> Result<()> {
    match (port, channel.direction) {
        (Port::Gpu, Direction::FromRam) | (Port::Otc, Direction::ToRam) => (),
        _ => {
            return Err(PsxError::UnsupportedDma {
                port,
                reason: "block transfer",
            })
        }
    }

    let step = match channel.step {
        Step::Increment => 4u32,
        Step::Decrement => 4u32.wrapping_neg(),
    };

    let size = channel.transfer_size().unwrap_or(0);
    let mut addr = channel.base;

    for remaining in (1..=size).rev() {
        let cur = addr & ADDRESS_MASK;

        match channel.direction {
            Direction::FromRam => {
                if let Err(e) = gpu.gp0(bus.ram_load::<u32>(cur)) {
                    channel.base = addr.wrapping_add(step);
                    return Err(e);
                }
            }
            Direction::ToRam => {
                // Each entry points to the previous one, the last one closes
                // the list
                let v = if remaining == 1 {
                    OTC_END
                } else {
                    cur.wrapping_sub(4) & memory_map::RAM_MASK
                };
                bus.ram_store::<u32>(cur, v);
            }
        }

        addr = addr.wrapping_add(step);
    }

    channel.base = addr;

    Ok(())
}

fn linked_list(port: Port, channel: &mut Channel, bus: &mut AddressSpace, gpu: &mut Gpu) -> Result<()> {
    if port != Port::Gpu || channel.direction != Direction::FromRam {
        return Err(PsxError::UnsupportedDma {
            port,
            reason: "linked list transfer",
        });
    }

    let mut addr = channel.base & ADDRESS_MASK;

    // A well-formed list can't have more nodes than RAM has words
    for _ in 0..memory_map::RAM_SIZE / 4 {
        let header = bus.ram_load::<u32>(addr);

        for _ in 0..header >> 24 {
            addr = addr.wrapping_add(4) & ADDRESS_MASK;
            gpu.gp0(bus.ram_load::<u32>(addr))?;
        }

        if header & LIST_END != 0 {
            return Ok(());
        }

        addr = header & ADDRESS_MASK;
    }

    Err(PsxError::UnsupportedDma {
        port,
        reason: "linked list does not terminate",
    })
}
