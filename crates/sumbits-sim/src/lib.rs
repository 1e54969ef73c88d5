//! sumbits cycle simulation
//!
//! Drives a popcount tree built by `sumbits-tree` one clock edge at a time.
//! [`PopcountPipeline`] is the register file plus the evaluate-then-commit
//! step; [`Testbench`] adds the clock, reset pulse and stimulus checks, and
//! can capture a [`Waveform`].

pub mod clock_manager;
pub mod pipeline;
pub mod register;
pub mod simulator;
pub mod testbench;
pub mod waveform;

pub use clock_manager::ClockManager;
pub use pipeline::{PipelineSnapshot, PopcountPipeline};
pub use register::{RegisterStage, RegisterState};
pub use simulator::{SimulationConfig, SimulationError, SimulationResult};
pub use testbench::{
    reference_stimulus, SignalMismatch, TestResult, TestRun, TestVector, Testbench,
    REFERENCE_START_CYCLE,
};
pub use waveform::{bits_to_hex, Waveform, WaveformSample};
