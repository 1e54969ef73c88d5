//! sumbits manifest parsing
//!
//! This crate handles parsing and validation of `sumbits.toml` manifest
//! files, which describe the design width, reset style, simulation settings
//! and stimulus.

pub mod error;
pub mod manifest;

pub use error::{ManifestError, Result};
pub use manifest::{DesignConfig, Manifest, SimulationSection, StimulusEntry};

use std::path::Path;

/// Parse and validate a manifest from a file path
pub fn from_path(path: impl AsRef<Path>) -> Result<Manifest> {
    let contents =
        std::fs::read_to_string(path.as_ref()).map_err(|e| ManifestError::Io(e.to_string()))?;
    from_str(&contents)
}

/// Parse and validate a manifest from a string
pub fn from_str(s: &str) -> Result<Manifest> {
    let manifest: Manifest = toml::from_str(s).map_err(|e| ManifestError::Parse(e.to_string()))?;
    manifest.validate()?;
    Ok(manifest)
}
