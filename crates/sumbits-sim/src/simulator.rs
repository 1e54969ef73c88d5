//! Simulation error and configuration types

use serde::{Deserialize, Serialize};
use sumbits_tree::{ResetKind, TreeError};
use thiserror::Error;

/// Errors that can occur during simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Asynchronous reset requested on a {0:?} reset pipeline")]
    ResetKind(ResetKind),
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Configuration for testbench runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Clock period in picoseconds
    pub clock_period_ps: u64,
    /// Cycles reset is held asserted at the start of a run
    pub reset_cycles: u64,
    /// Hard limit on simulated cycles
    pub max_cycles: u64,
    /// Record a per-cycle waveform
    pub capture_waveform: bool,
    pub reset_kind: ResetKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            clock_period_ps: 10_000,
            reset_cycles: 2,
            max_cycles: 1_000,
            capture_waveform: false,
            reset_kind: ResetKind::Asynchronous,
        }
    }
}

impl SimulationConfig {
    pub fn with_reset_cycles(mut self, cycles: u64) -> Self {
        self.reset_cycles = cycles;
        self
    }

    pub fn with_waveform(mut self, enabled: bool) -> Self {
        self.capture_waveform = enabled;
        self
    }

    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = cycles;
        self
    }

    pub fn with_reset_kind(mut self, kind: ResetKind) -> Self {
        self.reset_kind = kind;
        self
    }

    pub fn validate(&self) -> SimulationResult<()> {
        if self.clock_period_ps < 2 {
            return Err(SimulationError::InvalidConfig(format!(
                "clock period of {} ps is too short",
                self.clock_period_ps
            )));
        }
        if self.reset_cycles == 0 {
            return Err(SimulationError::InvalidConfig(
                "reset must be held for at least one cycle".to_string(),
            ));
        }
        if self.reset_cycles > self.max_cycles {
            return Err(SimulationError::InvalidConfig(format!(
                "{} reset cycles exceed the {} cycle limit",
                self.reset_cycles, self.max_cycles
            )));
        }
        Ok(())
    }
}
