//! Opcode handlers and their dispatch tables

use super::exception::{Exception, InstructionResult, Trap};
use super::registers::RA;
use crate::error::PsxError;
use crate::psx::instruction::Instruction;
use crate::psx::Psx;
use log::warn;

type Handler = fn(&mut Psx, Instruction) -> InstructionResult;

/// Indexed by bits [31:26]
static PRIMARY: [Handler; 64] = [
    op_funct, op_bcondz, op_j, op_jal, op_beq, op_bne, op_blez, op_bgtz, //
    op_addi, op_addiu, op_slti, op_sltiu, op_andi, op_ori, op_xori, op_lui, //
    op_cop0, op_cop_unusable, op_cop2, op_cop_unusable, op_reserved, op_reserved, op_reserved, op_reserved, //
    op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, //
    op_lb, op_lh, op_lwl, op_lw, op_lbu, op_lhu, op_lwr, op_reserved, //
    op_sb, op_sh, op_swl, op_sw, op_reserved, op_reserved, op_swr, op_reserved, //
    op_cop_unusable, op_cop_unusable, op_unimplemented, op_cop_unusable, op_reserved, op_reserved, op_reserved, op_reserved, //
    op_cop_unusable, op_cop_unusable, op_unimplemented, op_cop_unusable, op_reserved, op_reserved, op_reserved, op_reserved, //
];

/// Indexed by bits [5:0] when the primary opcode is 0
static SECONDARY: [Handler; 64] = [
    op_sll, op_reserved, op_srl, op_sra, op_sllv, op_reserved, op_srlv, op_srav, //
    op_jr, op_jalr, op_reserved, op_reserved, op_syscall, op_break, op_reserved, op_reserved, //
    op_mfhi, op_mthi, op_mflo, op_mtlo, op_reserved, op_reserved, op_reserved, op_reserved, //
    op_mult, op_multu, op_div, op_divu, op_reserved, op_reserved, op_reserved, op_reserved, //
    op_add, op_addu, op_sub, op_subu, op_and, op_or, op_xor, op_nor, //
    op_reserved, op_reserved, op_slt, op_sltu, op_reserved, op_reserved, op_reserved, op_reserved, //
    op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, //
    op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, op_reserved, //
];

pub(super) fn dispatch(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    PRIMARY[instruction.op() as usize](psx, instruction)
}

impl Psx {
    fn reg(&self, index: usize) -> u32 {
        self.cpu.regs.get(index)
    }

    fn set_reg(&mut self, index: usize, val: u32) {
        self.cpu.regs.set(index, val)
    }

    /// Effective address of a load/store: base register plus signed offset
    fn effective_address(&self, instruction: Instruction) -> u32 {
        self.reg(instruction.rs()).wrapping_add(instruction.imm_se())
    }
}

fn signed_overflow(result: u32, a: u32, b: u32) -> bool {
    (result ^ a) & (result ^ b) & 0x8000_0000 != 0
}

/// Hardware we don't emulate
fn op_unimplemented(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let pc = psx.cpu.current_pc;

    if psx.config.halts_on_unimplemented() {
        return Err(Trap::Fatal(PsxError::UnimplementedInstruction {
            pc,
            instruction: instruction.raw(),
            mnemonic: instruction.mnemonic(),
        }));
    }

    warn!(
        "Unimplemented instruction {:08x} ({}) at {:08x}",
        instruction.raw(),
        instruction,
        pc
    );

    Err(Exception::Reserved.into())
}

fn op_reserved(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    op_unimplemented(psx, instruction)
}

fn op_cop_unusable(_: &mut Psx, _: Instruction) -> InstructionResult {
    Err(Exception::CopUnusable.into())
}

fn op_funct(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    SECONDARY[instruction.funct() as usize](psx, instruction)
}

// ============================================================================
// Branches and Jumps
// ============================================================================

/// BLTZ, BGEZ, BLTZAL and BGEZAL share an opcode
fn op_bcondz(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let raw = instruction.raw();
    let is_bgez = (raw >> 16) & 1 != 0;
    let is_link = (raw >> 17) & 0xf == 8;

    let v = psx.reg(instruction.rs()) as i32;
    let test = (v < 0) != is_bgez;

    // The link happens whether or not the branch is taken
    if is_link {
        let ra = psx.cpu.regs.npc();
        psx.set_reg(RA, ra);
    }

    if test {
        psx.cpu.branch_relative(instruction.imm_se());
    }

    Ok(())
}

fn op_j(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    psx.cpu.branch_segment(instruction.target());

    Ok(())
}

fn op_jal(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let ra = psx.cpu.regs.npc();

    psx.set_reg(RA, ra);
    psx.cpu.branch_segment(instruction.target());

    Ok(())
}

fn op_jr(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let target = psx.reg(instruction.rs());

    psx.cpu.branch_absolute(target);

    Ok(())
}

fn op_jalr(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let target = psx.reg(instruction.rs());
    let ra = psx.cpu.regs.npc();

    psx.set_reg(instruction.rd(), ra);
    psx.cpu.branch_absolute(target);

    Ok(())
}

fn op_beq(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    if psx.reg(instruction.rs()) == psx.reg(instruction.rt()) {
        psx.cpu.branch_relative(instruction.imm_se());
    }

    Ok(())
}

fn op_bne(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    if psx.reg(instruction.rs()) != psx.reg(instruction.rt()) {
        psx.cpu.branch_relative(instruction.imm_se());
    }

    Ok(())
}

fn op_blez(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    if psx.reg(instruction.rs()) as i32 <= 0 {
        psx.cpu.branch_relative(instruction.imm_se());
    }

    Ok(())
}

fn op_bgtz(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    if psx.reg(instruction.rs()) as i32 > 0 {
        psx.cpu.branch_relative(instruction.imm_se());
    }

    Ok(())
}

// ============================================================================
// Immediate ALU
// ============================================================================

fn op_addi(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let a = psx.reg(instruction.rs());
    let b = instruction.imm_se();
    let v = a.wrapping_add(b);

    // The wrapped result is still written back, the trap is imprecise
    psx.set_reg(instruction.rt(), v);

    if signed_overflow(v, a, b) {
        return Err(Exception::Overflow.into());
    }

    Ok(())
}

fn op_addiu(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs()).wrapping_add(instruction.imm_se());

    psx.set_reg(instruction.rt(), v);

    Ok(())
}

fn op_slti(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = (psx.reg(instruction.rs()) as i32) < (instruction.imm_se() as i32);

    psx.set_reg(instruction.rt(), v as u32);

    Ok(())
}

fn op_sltiu(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs()) < instruction.imm_se();

    psx.set_reg(instruction.rt(), v as u32);

    Ok(())
}

fn op_andi(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs()) & instruction.imm();

    psx.set_reg(instruction.rt(), v);

    Ok(())
}

fn op_ori(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs()) | instruction.imm();

    psx.set_reg(instruction.rt(), v);

    Ok(())
}

fn op_xori(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs()) ^ instruction.imm();

    psx.set_reg(instruction.rt(), v);

    Ok(())
}

fn op_lui(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    psx.set_reg(instruction.rt(), instruction.imm() << 16);

    Ok(())
}

// ============================================================================
// Register ALU
// ============================================================================

fn op_sll(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rt()) << instruction.shamt();

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_srl(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rt()) >> instruction.shamt();

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_sra(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = (psx.reg(instruction.rt()) as i32) >> instruction.shamt();

    psx.set_reg(instruction.rd(), v as u32);

    Ok(())
}

fn op_sllv(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let shift = psx.reg(instruction.rs()) & 0x1f;
    let v = psx.reg(instruction.rt()) << shift;

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_srlv(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let shift = psx.reg(instruction.rs()) & 0x1f;
    let v = psx.reg(instruction.rt()) >> shift;

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_srav(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let shift = psx.reg(instruction.rs()) & 0x1f;
    let v = (psx.reg(instruction.rt()) as i32) >> shift;

    psx.set_reg(instruction.rd(), v as u32);

    Ok(())
}

fn op_add(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let a = psx.reg(instruction.rs());
    let b = psx.reg(instruction.rt());
    let v = a.wrapping_add(b);

    psx.set_reg(instruction.rd(), v);

    if signed_overflow(v, a, b) {
        return Err(Exception::Overflow.into());
    }

    Ok(())
}

fn op_addu(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx
        .reg(instruction.rs())
        .wrapping_add(psx.reg(instruction.rt()));

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_sub(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let a = psx.reg(instruction.rs());
    let b = psx.reg(instruction.rt());
    let v = a.wrapping_sub(b);

    psx.set_reg(instruction.rd(), v);

    if (v ^ a) & (a ^ b) & 0x8000_0000 != 0 {
        return Err(Exception::Overflow.into());
    }

    Ok(())
}

fn op_subu(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx
        .reg(instruction.rs())
        .wrapping_sub(psx.reg(instruction.rt()));

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_and(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs()) & psx.reg(instruction.rt());

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_or(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs()) | psx.reg(instruction.rt());

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_xor(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs()) ^ psx.reg(instruction.rt());

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_nor(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = !(psx.reg(instruction.rs()) | psx.reg(instruction.rt()));

    psx.set_reg(instruction.rd(), v);

    Ok(())
}

fn op_slt(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = (psx.reg(instruction.rs()) as i32) < (psx.reg(instruction.rt()) as i32);

    psx.set_reg(instruction.rd(), v as u32);

    Ok(())
}

fn op_sltu(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs()) < psx.reg(instruction.rt());

    psx.set_reg(instruction.rd(), v as u32);

    Ok(())
}

fn op_syscall(_: &mut Psx, _: Instruction) -> InstructionResult {
    Err(Exception::SystemCall.into())
}

fn op_break(_: &mut Psx, _: Instruction) -> InstructionResult {
    Err(Exception::Break.into())
}

// ============================================================================
// Multiply and Divide
// ============================================================================

fn op_mfhi(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let hi = psx.cpu.regs.hi();

    psx.set_reg(instruction.rd(), hi);

    Ok(())
}

fn op_mthi(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs());

    psx.cpu.regs.set_hi(v);

    Ok(())
}

fn op_mflo(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let lo = psx.cpu.regs.lo();

    psx.set_reg(instruction.rd(), lo);

    Ok(())
}

fn op_mtlo(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let v = psx.reg(instruction.rs());

    psx.cpu.regs.set_lo(v);

    Ok(())
}

fn set_hi_lo(psx: &mut Psx, product: u64) {
    psx.cpu.regs.set_hi((product >> 32) as u32);
    psx.cpu.regs.set_lo(product as u32);
}

fn op_mult(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let a = psx.reg(instruction.rs()) as i32 as i64;
    let b = psx.reg(instruction.rt()) as i32 as i64;

    set_hi_lo(psx, (a * b) as u64);

    Ok(())
}

fn op_multu(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let a = psx.reg(instruction.rs()) as u64;
    let b = psx.reg(instruction.rt()) as u64;

    set_hi_lo(psx, a * b);

    Ok(())
}

fn op_div(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let n = psx.reg(instruction.rs()) as i32;
    let d = psx.reg(instruction.rt()) as i32;

    let (hi, lo) = if d == 0 {
        let lo = if n >= 0 { 0xffff_ffff } else { 1 };
        (n as u32, lo)
    } else if n == i32::MIN && d == -1 {
        (0, i32::MIN as u32)
    } else {
        ((n % d) as u32, (n / d) as u32)
    };

    psx.cpu.regs.set_hi(hi);
    psx.cpu.regs.set_lo(lo);

    Ok(())
}

fn op_divu(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let n = psx.reg(instruction.rs());
    let d = psx.reg(instruction.rt());

    let (hi, lo) = if d == 0 { (n, 0xffff_ffff) } else { (n % d, n / d) };

    psx.cpu.regs.set_hi(hi);
    psx.cpu.regs.set_lo(lo);

    Ok(())
}

// ============================================================================
// Loads
// ============================================================================

fn op_lb(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let v = psx.load::<u8>(addr)? as i8;

    psx.cpu.regs.delay_load(instruction.rt(), v as u32);

    Ok(())
}

fn op_lbu(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let v = psx.load::<u8>(addr)?;

    psx.cpu.regs.delay_load(instruction.rt(), v as u32);

    Ok(())
}

fn op_lh(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let v = psx.load::<u16>(addr)? as i16;

    psx.cpu.regs.delay_load(instruction.rt(), v as u32);

    Ok(())
}

fn op_lhu(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let v = psx.load::<u16>(addr)?;

    psx.cpu.regs.delay_load(instruction.rt(), v as u32);

    Ok(())
}

fn op_lw(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let v = psx.load::<u32>(addr)?;

    psx.cpu.regs.delay_load(instruction.rt(), v);

    Ok(())
}

/// Loads the most significant bytes of an unaligned word. Merges with the
/// in-flight value of `rt` so that LWL/LWR pairs can sit back to back.
fn op_lwl(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let word = psx.load::<u32>(addr & !3)?;
    let cur = psx.cpu.regs.pending(instruction.rt());
    let shift = (addr & 3) * 8;

    let v = (cur & (0x00ff_ffff >> shift)) | (word << (24 - shift));

    psx.cpu.regs.delay_load(instruction.rt(), v);

    Ok(())
}

/// Loads the least significant bytes of an unaligned word
fn op_lwr(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let word = psx.load::<u32>(addr & !3)?;
    let cur = psx.cpu.regs.pending(instruction.rt());
    let shift = (addr & 3) * 8;

    let v = (cur & (0xffff_ff00 << (24 - shift))) | (word >> shift);

    psx.cpu.regs.delay_load(instruction.rt(), v);

    Ok(())
}

// ============================================================================
// Stores
// ============================================================================

fn op_sb(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let v = psx.reg(instruction.rt());

    psx.store::<u8>(addr, v as u8)
}

fn op_sh(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let v = psx.reg(instruction.rt());

    psx.store::<u16>(addr, v as u16)
}

fn op_sw(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let v = psx.reg(instruction.rt());

    psx.store::<u32>(addr, v)
}

/// Reads the aligned word an SWL/SWR merges into. A fault here is reported
/// as a store fault.
fn load_for_merge(psx: &mut Psx, addr: u32) -> Result<u32, Trap> {
    match psx.load::<u32>(addr) {
        Err(Trap::Exception(Exception::AddressLoad)) => Err(Exception::AddressStore.into()),
        r => r,
    }
}

fn op_swl(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let aligned = addr & !3;
    let word = load_for_merge(psx, aligned)?;
    let v = psx.reg(instruction.rt());
    let shift = (addr & 3) * 8;

    let merged = (word & (0xffff_ff00 << shift)) | (v >> (24 - shift));

    psx.store::<u32>(aligned, merged)
}

fn op_swr(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    let addr = psx.effective_address(instruction);
    let aligned = addr & !3;
    let word = load_for_merge(psx, aligned)?;
    let v = psx.reg(instruction.rt());
    let shift = (addr & 3) * 8;

    let merged = (word & (0x00ff_ffff >> (24 - shift))) | (v << shift);

    psx.store::<u32>(aligned, merged)
}

// ============================================================================
// Coprocessors
// ============================================================================

const COP_MFC: u32 = 0x00;
const COP_MTC: u32 = 0x04;
const COP0_RFE: u32 = 0x10;

fn op_cop0(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    if instruction.is_cop_command() {
        return match instruction.funct() {
            COP0_RFE => {
                psx.cop0.return_from_exception();
                Ok(())
            }
            // TLB operations, there's no TLB on this chip
            _ => op_unimplemented(psx, instruction),
        };
    }

    match instruction.cop_op() {
        COP_MFC => {
            let v = psx.cop0.get(instruction.rd());
            psx.cpu.regs.delay_load(instruction.rt(), v);
            Ok(())
        }
        COP_MTC => {
            let v = psx.reg(instruction.rt());
            psx.cop0.set(instruction.rd(), v);
            Ok(())
        }
        _ => op_unimplemented(psx, instruction),
    }
}

/// Geometry Transformation Engine
fn op_cop2(psx: &mut Psx, instruction: Instruction) -> InstructionResult {
    op_unimplemented(psx, instruction)
}
