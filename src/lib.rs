//! PlayStation interpreter core
//!
//! Emulates the R3000A CPU with its coprocessor 0, the memory bus, the DMA
//! controller and the GPU command front end. Rasterization is delegated to
//! a [`Renderer`](psx::gpu::Renderer) supplied by the embedder.

pub mod config;
pub mod error;
pub mod psx;

#[cfg(test)]
mod tests;

pub use config::{EmulatorConfig, UnimplementedPolicy};
pub use error::{PsxError, Result};
pub use psx::Psx;
