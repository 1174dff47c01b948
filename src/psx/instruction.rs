//! R3000A instruction word decoding

use std::fmt;

/// Primary opcode of the "function" class, decoded through the secondary
/// table
pub const OP_FUNCT: u32 = 0x00;

/// A raw 32-bit instruction word. Decoding is lazy, every accessor extracts
/// its field on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(pub u32);

impl Instruction {
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Primary opcode, bits [31:26]
    pub const fn op(self) -> u32 {
        self.0 >> 26
    }

    /// Secondary opcode, bits [5:0]
    pub const fn funct(self) -> u32 {
        self.0 & 0x3f
    }

    pub const fn rs(self) -> usize {
        ((self.0 >> 21) & 0x1f) as usize
    }

    pub const fn rt(self) -> usize {
        ((self.0 >> 16) & 0x1f) as usize
    }

    pub const fn rd(self) -> usize {
        ((self.0 >> 11) & 0x1f) as usize
    }

    pub const fn shamt(self) -> u32 {
        (self.0 >> 6) & 0x1f
    }

    /// Zero-extended 16-bit immediate
    pub const fn imm(self) -> u32 {
        self.0 & 0xffff
    }

    /// Sign-extended 16-bit immediate
    pub const fn imm_se(self) -> u32 {
        (self.0 & 0xffff) as i16 as u32
    }

    /// 26-bit jump target, in words
    pub const fn target(self) -> u32 {
        self.0 & 0x03ff_ffff
    }

    /// Coprocessor sub-opcode, bits [25:21]
    pub const fn cop_op(self) -> u32 {
        (self.0 >> 21) & 0x1f
    }

    /// Bit 25 selects a coprocessor-specific operation rather than a move
    pub const fn is_cop_command(self) -> bool {
        self.0 & (1 << 25) != 0
    }

    pub fn mnemonic(self) -> &'static str {
        match self.op() {
            OP_FUNCT => SECONDARY_MNEMONICS[self.funct() as usize],
            0x01 => match (self.rt() & 1 != 0, self.rt() & 0x1e == 0x10) {
                (false, false) => "bltz",
                (true, false) => "bgez",
                (false, true) => "bltzal",
                (true, true) => "bgezal",
            },
            op @ (0x10..=0x13) => {
                let n = (op & 3) as usize;
                if self.is_cop_command() {
                    if n == 0 {
                        match self.funct() {
                            0x01 => "tlbr",
                            0x02 => "tlbwi",
                            0x06 => "tlbwr",
                            0x08 => "tlbp",
                            0x10 => "rfe",
                            _ => "cop0",
                        }
                    } else {
                        COP_NAMES[n]
                    }
                } else {
                    match self.cop_op() {
                        0x00 => MFC_NAMES[n],
                        0x02 => CFC_NAMES[n],
                        0x04 => MTC_NAMES[n],
                        0x06 => CTC_NAMES[n],
                        0x08 => BC_NAMES[n],
                        _ => COP_NAMES[n],
                    }
                }
            }
            op => PRIMARY_MNEMONICS[op as usize],
        }
    }
}

pub const REGISTER_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp",
    "fp", "ra",
];

const COP_NAMES: [&str; 4] = ["cop0", "cop1", "cop2", "cop3"];
const MFC_NAMES: [&str; 4] = ["mfc0", "mfc1", "mfc2", "mfc3"];
const CFC_NAMES: [&str; 4] = ["cfc0", "cfc1", "cfc2", "cfc3"];
const MTC_NAMES: [&str; 4] = ["mtc0", "mtc1", "mtc2", "mtc3"];
const CTC_NAMES: [&str; 4] = ["ctc0", "ctc1", "ctc2", "ctc3"];
const BC_NAMES: [&str; 4] = ["bc0", "bc1", "bc2", "bc3"];

const PRIMARY_MNEMONICS: [&str; 64] = [
    "funct", "bcondz", "j", "jal", "beq", "bne", "blez", "bgtz", //
    "addi", "addiu", "slti", "sltiu", "andi", "ori", "xori", "lui", //
    "cop0", "cop1", "cop2", "cop3", "unk", "unk", "unk", "unk", //
    "unk", "unk", "unk", "unk", "unk", "unk", "unk", "unk", //
    "lb", "lh", "lwl", "lw", "lbu", "lhu", "lwr", "unk", //
    "sb", "sh", "swl", "sw", "unk", "unk", "swr", "unk", //
    "lwc0", "lwc1", "lwc2", "lwc3", "unk", "unk", "unk", "unk", //
    "swc0", "swc1", "swc2", "swc3", "unk", "unk", "unk", "unk", //
];

const SECONDARY_MNEMONICS: [&str; 64] = [
    "sll", "unk", "srl", "sra", "sllv", "unk", "srlv", "srav", //
    "jr", "jalr", "unk", "unk", "syscall", "break", "unk", "unk", //
    "mfhi", "mthi", "mflo", "mtlo", "unk", "unk", "unk", "unk", //
    "mult", "multu", "div", "divu", "unk", "unk", "unk", "unk", //
    "add", "addu", "sub", "subu", "and", "or", "xor", "nor", //
    "unk", "unk", "slt", "sltu", "unk", "unk", "unk", "unk", //
    "unk", "unk", "unk", "unk", "unk", "unk", "unk", "unk", //
    "unk", "unk", "unk", "unk", "unk", "unk", "unk", "unk", //
];

struct Reg(usize);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", REGISTER_NAMES[self.0])
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let m = self.mnemonic();
        let (rs, rt, rd) = (Reg(self.rs()), Reg(self.rt()), Reg(self.rd()));
        let offset = self.imm_se() as i32;

        if self.0 == 0 {
            return write!(f, "nop");
        }

        match self.op() {
            OP_FUNCT => match self.funct() {
                0x00 | 0x02 | 0x03 => write!(f, "{} {}, {}, {}", m, rd, rt, self.shamt()),
                0x04 | 0x06 | 0x07 => write!(f, "{} {}, {}, {}", m, rd, rt, rs),
                0x08 | 0x11 | 0x13 => write!(f, "{} {}", m, rs),
                0x09 => write!(f, "{} {}, {}", m, rd, rs),
                0x0c | 0x0d => write!(f, "{}", m),
                0x10 | 0x12 => write!(f, "{} {}", m, rd),
                0x18..=0x1b => write!(f, "{} {}, {}", m, rs, rt),
                0x20..=0x27 | 0x2a | 0x2b => write!(f, "{} {}, {}, {}", m, rd, rs, rt),
                _ => write!(f, "{} {:#010x}", m, self.0),
            },
            0x01 | 0x06 | 0x07 => write!(f, "{} {}, {}", m, rs, offset << 2),
            0x02 | 0x03 => write!(f, "{} {:#x}", m, self.target() << 2),
            0x04 | 0x05 => write!(f, "{} {}, {}, {}", m, rs, rt, offset << 2),
            0x08..=0x0b => write!(f, "{} {}, {}, {}", m, rt, rs, offset),
            0x0c..=0x0e => write!(f, "{} {}, {}, {:#x}", m, rt, rs, self.imm()),
            0x0f => write!(f, "{} {}, {:#x}", m, rt, self.imm()),
            0x10..=0x13 if !self.is_cop_command() => write!(f, "{} {}, {}", m, rt, self.rd()),
            0x20..=0x2e | 0x30..=0x3b => write!(f, "{} {}, {}({})", m, rt, offset, rs),
            _ => write!(f, "{} {:#010x}", m, self.0),
        }
    }
}
