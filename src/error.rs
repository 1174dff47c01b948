use crate::psx::dma::Port;
use std::io;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, PsxError>;

/// Faults that halt emulation. Architectural exceptions never end up here,
/// they are delivered to the emulated firmware instead.
#[derive(Error, Debug)]
pub enum PsxError {
    #[error("Input output error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid BIOS image: expected {expected} bytes, got {got}")]
    BadBiosSize { expected: usize, got: usize },
    #[error("Invalid PS-X EXE: {0}")]
    BadExecutable(String),
    #[error("Address {0:#010x} is not in RAM")]
    BadLoadAddress(u32),
    #[error("Unimplemented instruction {instruction:#010x} ({mnemonic}) at {pc:#010x}")]
    UnimplementedInstruction {
        pc: u32,
        instruction: u32,
        mnemonic: &'static str,
    },
    #[error("Unimplemented GP0 command {0:#010x}")]
    UnimplementedGp0(u32),
    #[error("Unimplemented GP1 command {0:#010x}")]
    UnimplementedGp1(u32),
    #[error("Unimplemented feature: {0}")]
    UnimplementedFeature(&'static str),
    #[error("Unsupported DMA configuration on channel {port:?}: {reason}")]
    UnsupportedDma { port: Port, reason: &'static str },
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<toml::de::Error> for PsxError {
    fn from(e: toml::de::Error) -> PsxError {
        PsxError::ConfigError(e.to_string())
    }
}
