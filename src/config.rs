//! Runtime configuration
//!
//! Defaults, overridden by `ROOM_HUB_*` environment variables.

use std::env;

use crate::error::AppError;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Channel buffer size for hub commands
pub const DEFAULT_COMMAND_BUFFER: usize = 256;

/// Per-connection outbound queue size
pub const DEFAULT_OUTBOUND_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: String,
    pub command_buffer: usize,
    pub outbound_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            command_buffer: DEFAULT_COMMAND_BUFFER,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(addr) = lookup("ROOM_HUB_ADDR") {
            config.addr = addr;
        }
        if let Some(raw) = lookup("ROOM_HUB_COMMAND_BUFFER") {
            config.command_buffer = parse_buffer("ROOM_HUB_COMMAND_BUFFER", raw)?;
        }
        if let Some(raw) = lookup("ROOM_HUB_OUTBOUND_BUFFER") {
            config.outbound_buffer = parse_buffer("ROOM_HUB_OUTBOUND_BUFFER", raw)?;
        }
        Ok(config)
    }
}

/// Channel capacities must be positive
fn parse_buffer(key: &'static str, raw: String) -> Result<usize, AppError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::Config { key, value: raw }),
    }
}
