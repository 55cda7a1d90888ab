//! # Analysis Configuration
//!
//! Per-invocation settings: which VxWorks layout to use, how to decode the
//! image, where it is loaded, and how far the pointer-chasing loops may run
//! before they give up on a corrupt image.
//!
//! ```rust
//! use vxsym_core::config::AnalysisConfig;
//! use vxsym_core::layout::VxVersion;
//! use vxsym_core::types::{Address, Endian};
//!
//! let config = AnalysisConfig::new(VxVersion::V6)
//!     .with_endian(Endian::Little)
//!     .with_load_address(Address::new(0x8000_0000))
//!     .with_max_symbols(50_000);
//! assert_eq!(config.version, VxVersion::V6);
//! ```

use std::env;

use tracing::warn;

use crate::layout::VxVersion;
use crate::types::{Address, Endian};

/// Default cap on symbol records visited by one walk.
pub const DEFAULT_MAX_SYMBOLS: usize = 0x10_0000;

/// Default cap on cluster buffers visited in one free chain.
pub const DEFAULT_MAX_CHAIN_LEN: usize = 0x1_0000;

/// Settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig
{
    /// VxWorks major version; selects every record layout.
    pub version: VxVersion,
    /// Byte order of the image.
    pub endian: Endian,
    /// Address the image is mapped at.
    pub load_address: Address,
    /// Maximum records a symbol table walk visits.
    pub max_symbols: usize,
    /// Maximum buffers a cluster buffer chain walk visits.
    pub max_chain_len: usize,
}

impl Default for AnalysisConfig
{
    fn default() -> Self
    {
        Self::new(VxVersion::default())
    }
}

impl AnalysisConfig
{
    /// Defaults for `version`: big endian, loaded at zero, default caps.
    pub fn new(version: VxVersion) -> Self
    {
        Self {
            version,
            endian: Endian::Big,
            load_address: Address::ZERO,
            max_symbols: DEFAULT_MAX_SYMBOLS,
            max_chain_len: DEFAULT_MAX_CHAIN_LEN,
        }
    }

    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self
    {
        self.endian = endian;
        self
    }

    #[must_use]
    pub fn with_load_address(mut self, load_address: Address) -> Self
    {
        self.load_address = load_address;
        self
    }

    /// Cap the number of symbol records visited (minimum 1).
    #[must_use]
    pub fn with_max_symbols(mut self, max_symbols: usize) -> Self
    {
        self.max_symbols = max_symbols.max(1);
        self
    }

    /// Cap the number of cluster buffers visited per chain (minimum 1).
    #[must_use]
    pub fn with_max_chain_len(mut self, max_chain_len: usize) -> Self
    {
        self.max_chain_len = max_chain_len.max(1);
        self
    }

    /// Override the caps from `VXSYM_MAX_SYMBOLS` and `VXSYM_MAX_CHAIN`.
    ///
    /// Unparsable values are ignored with a warning.
    #[must_use]
    pub fn apply_env(self) -> Self
    {
        let mut config = self;
        if let Some(max) = read_env_usize("VXSYM_MAX_SYMBOLS") {
            config = config.with_max_symbols(max);
        }
        if let Some(max) = read_env_usize("VXSYM_MAX_CHAIN") {
            config = config.with_max_chain_len(max);
        }
        config
    }
}

fn read_env_usize(key: &str) -> Option<usize>
{
    let raw = env::var(key).ok()?;
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => raw.parse::<usize>(),
    };
    match parsed {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "ignoring invalid environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_defaults()
    {
        let config = AnalysisConfig::default();
        assert_eq!(config.version, VxVersion::V5);
        assert_eq!(config.endian, Endian::Big);
        assert_eq!(config.max_symbols, DEFAULT_MAX_SYMBOLS);
    }

    #[test]
    fn test_caps_never_zero()
    {
        let config = AnalysisConfig::new(VxVersion::V7).with_max_symbols(0).with_max_chain_len(0);
        assert_eq!(config.max_symbols, 1);
        assert_eq!(config.max_chain_len, 1);
    }
}
