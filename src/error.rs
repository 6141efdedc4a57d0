//! Error types for the fallible edges of the client.
//!
//! The protocol and rendering core never fails; only loading configuration
//! and talking to the network can.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config: {0}")]
    Write(#[source] io::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Could not determine config path")]
    NoConfigPath,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write to server: {0}")]
    Write(#[source] io::Error),

    #[error("Connection closed")]
    Closed,
}
