//! Emulator configuration
//!
//! Settings are read from a TOML file, every key is optional:
//!
//! ```toml
//! unimplemented = "halt"
//! trace_instructions = false
//! log_unhandled_io = true
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when the guest hits hardware we don't emulate (GTE, TLB ops,
/// unknown GPU commands...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnimplementedPolicy {
    /// Raise the architectural exception (or ignore the GPU command) and let
    /// the firmware deal with it
    #[default]
    Exception,
    /// Stop emulation with a diagnostic
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub unimplemented: UnimplementedPolicy,
    /// Log every executed instruction at trace level
    pub trace_instructions: bool,
    /// Log accesses to unhandled MMIO registers as warnings instead of debug
    pub log_unhandled_io: bool,
}

impl Default for EmulatorConfig {
    fn default() -> EmulatorConfig {
        EmulatorConfig {
            unimplemented: UnimplementedPolicy::Exception,
            trace_instructions: false,
            log_unhandled_io: true,
        }
    }
}

impl EmulatorConfig {
    pub fn from_toml_str(s: &str) -> Result<EmulatorConfig> {
        Ok(toml::from_str(s)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<EmulatorConfig> {
        let text = fs::read_to_string(path)?;

        EmulatorConfig::from_toml_str(&text)
    }

    /// `<config dir>/psx-core/config.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("psx-core").join("config.toml"))
    }

    pub fn halts_on_unimplemented(&self) -> bool {
        self.unimplemented == UnimplementedPolicy::Halt
    }
}
