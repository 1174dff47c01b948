// Address decoding and memory mapped registers

use super::asm::*;
use crate::error::PsxError;
use crate::psx::cop0::{Status, REG_SR};
use crate::psx::memory_map::BIOS_SIZE;

#[test]
fn test_ram_mirrors() {
    let mut m = machine();

    m.store32(0x0000_1000, 0x1234_5678);

    assert_eq!(m.psx.load::<u32>(0x8000_1000).ok(), Some(0x1234_5678));
    assert_eq!(m.psx.load::<u32>(0xa000_1000).ok(), Some(0x1234_5678));
    assert_eq!(m.psx.load::<u16>(0xa000_1002).ok(), Some(0x1234));
    assert_eq!(m.psx.load::<u8>(0x8000_1000).ok(), Some(0x78));
}

#[test]
fn test_scratchpad() {
    let mut m = machine();

    m.store32(0x1f80_0010, 0xcafe_babe);

    assert_eq!(m.psx.load::<u32>(0x9f80_0010).ok(), Some(0xcafe_babe));
}

#[test]
fn test_expansion_reads_open_bus() {
    let mut m = machine();

    assert_eq!(m.psx.load::<u8>(0x1f00_0084).ok(), Some(0xff));
    assert_eq!(m.psx.load::<u32>(0x1f00_0000).ok(), Some(0xff));

    // Writes are ignored
    m.store32(0x1f00_0000, 0);
    assert_eq!(m.psx.load::<u8>(0x1f00_0000).ok(), Some(0xff));
}

#[test]
fn test_bios_is_read_only() {
    let mut m = machine();
    let mut bios = vec![0u8; BIOS_SIZE];

    bios[..4].copy_from_slice(&0x3c08_0013u32.to_le_bytes());
    m.psx.load_bios(&bios).unwrap();

    assert_eq!(m.psx.load::<u32>(0xbfc0_0000).ok(), Some(0x3c08_0013));

    m.store32(0xbfc0_0000, 0);
    assert_eq!(m.psx.load::<u32>(0xbfc0_0000).ok(), Some(0x3c08_0013));
}

#[test]
fn test_bios_boots_from_reset_vector() {
    let mut m = machine();
    let mut bios = vec![0u8; BIOS_SIZE];

    // lui $8, 0x0013
    bios[..4].copy_from_slice(&0x3c08_0013u32.to_le_bytes());
    m.psx.load_bios(&bios).unwrap();
    m.run(1);

    assert_eq!(m.reg(8), 0x0013_0000);
    assert_eq!(m.psx.regs().pc(), 0xbfc0_0004);
}

#[test]
fn test_bios_size_is_checked() {
    let mut m = machine();

    match m.psx.load_bios(&[0; 1024]) {
        Err(PsxError::BadBiosSize { expected, got }) => {
            assert_eq!(expected, BIOS_SIZE);
            assert_eq!(got, 1024);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_cache_isolation_drops_writes() {
    let mut m = machine();

    m.write32(DATA_BASE, 0x5555_5555);
    m.set_reg(1, Status::ISOLATE_CACHE.bits());
    m.set_reg(2, 0xdead_beef);
    m.set_reg(3, DATA_BASE);
    m.load(&[mtc0(1, REG_SR), sw(2, 0, 3), mtc0(0, REG_SR), sw(2, 4, 3)]);
    m.run(4);

    assert_eq!(m.read32(DATA_BASE), 0x5555_5555);
    assert_eq!(m.read32(DATA_BASE + 4), 0xdead_beef);
}

#[test]
fn test_memory_control_registers() {
    let mut m = machine();

    m.store32(0x1f80_1010, 0x0013_243f);
    m.store32(0x1f80_1060, 0x0000_0b88);

    assert_eq!(m.psx.load::<u32>(0x1f80_1010).ok(), Some(0x0013_243f));
    assert_eq!(m.psx.load::<u32>(0x1f80_1060).ok(), Some(0x0000_0b88));
}

#[test]
fn test_stubbed_peripherals_read_zero() {
    let mut m = machine();

    m.store32(0x1f80_1074, 0xffff_ffff);
    m.store32(0x1f80_1100, 0x1234);

    assert_eq!(m.psx.load::<u32>(0x1f80_1074).ok(), Some(0));
    assert_eq!(m.psx.load::<u32>(0x1f80_1100).ok(), Some(0));
    assert_eq!(m.psx.load::<u16>(0x1f80_1c00).ok(), Some(0));
}

#[test]
fn test_cache_control_window() {
    let mut m = machine();

    m.store32(0xfffe_0130, 0x0001_e988);

    assert_eq!(m.psx.load::<u32>(0xfffe_0130).ok(), Some(0x0001_e988));
    assert!(m.psx.load::<u32>(0xfffd_0000).is_err());
}

#[test]
fn test_gpu_registers_on_the_bus() {
    let mut m = machine();

    assert_eq!(m.psx.load::<u32>(0x1f80_1814).ok(), Some(m.psx.gpu().status()));

    // Latch the GPU version into GPUREAD
    m.store32(0x1f80_1814, 0x1000_0007);
    assert_eq!(m.psx.load::<u32>(0x1f80_1810).ok(), Some(2));
}

#[test]
fn test_copy_helpers_reject_unmapped() {
    let mut m = machine();

    assert!(matches!(
        m.psx.copy_to_ram(0xbfc0_0000, &[1, 2]),
        Err(PsxError::BadLoadAddress(0xbfc0_0000))
    ));
    assert!(m.psx.copy_from_ram(0x1f80_1000, 4).is_err());
}
