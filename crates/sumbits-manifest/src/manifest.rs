//! Manifest structure definitions

use crate::error::{ManifestError, Result};
use serde::{Deserialize, Serialize};
use sumbits_sim::SimulationConfig;
use sumbits_tree::ResetKind;

/// Complete `sumbits.toml` manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Design parameters
    pub design: DesignConfig,

    /// Simulation settings
    #[serde(default)]
    pub simulation: SimulationSection,

    /// Input values applied by the testbench
    #[serde(default)]
    pub stimulus: Vec<StimulusEntry>,
}

/// Design parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignConfig {
    /// Design name, used for netlists and waveforms
    #[serde(default = "default_name")]
    pub name: String,

    /// Number of input bits
    pub width: usize,

    /// Register reset style
    #[serde(default)]
    pub reset: ResetKind,
}

fn default_name() -> String {
    "sumbits".to_string()
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub clock_period_ps: u64,
    pub reset_cycles: u64,
    pub max_cycles: u64,
    pub capture_waveform: bool,
    /// Cycles simulated after the last stimulus entry
    pub trailing_cycles: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        let config = SimulationConfig::default();
        SimulationSection {
            clock_period_ps: config.clock_period_ps,
            reset_cycles: config.reset_cycles,
            max_cycles: config.max_cycles,
            capture_waveform: config.capture_waveform,
            trailing_cycles: 0,
        }
    }
}

/// One input value and the cycle it is applied at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusEntry {
    pub cycle: u64,
    pub value: u64,
    /// Expected root output; defaults to the popcount of `value`
    #[serde(default)]
    pub expect: Option<u64>,
}

impl StimulusEntry {
    pub fn expected_output(&self) -> u64 {
        self.expect.unwrap_or(self.value.count_ones() as u64)
    }
}

impl Manifest {
    /// A manifest for `width` bits with default settings and no stimulus
    pub fn with_width(width: usize) -> Self {
        Manifest {
            design: DesignConfig {
                name: default_name(),
                width,
                reset: ResetKind::default(),
            },
            simulation: SimulationSection::default(),
            stimulus: Vec::new(),
        }
    }

    /// Testbench configuration for this design
    pub fn simulation_config(&self) -> SimulationConfig {
        let sim = &self.simulation;
        SimulationConfig {
            clock_period_ps: sim.clock_period_ps,
            reset_cycles: sim.reset_cycles,
            max_cycles: sim.max_cycles,
            capture_waveform: sim.capture_waveform,
            reset_kind: self.design.reset,
        }
    }

    /// Check the manifest for consistency
    pub fn validate(&self) -> Result<()> {
        let width = self.design.width;
        if width < 1 {
            return Err(ManifestError::Validation(
                "design width must be at least 1".to_string(),
            ));
        }
        if self.design.name.is_empty() {
            return Err(ManifestError::Validation(
                "design name cannot be empty".to_string(),
            ));
        }

        let sim = &self.simulation;
        if sim.reset_cycles == 0 {
            return Err(ManifestError::Validation(
                "reset_cycles must be at least 1".to_string(),
            ));
        }
        if sim.reset_cycles > sim.max_cycles {
            return Err(ManifestError::Validation(format!(
                "reset_cycles ({}) exceeds max_cycles ({})",
                sim.reset_cycles, sim.max_cycles
            )));
        }

        let mut previous: Option<u64> = None;
        for entry in &self.stimulus {
            if width < 64 && entry.value >> width != 0 {
                return Err(ManifestError::Validation(format!(
                    "stimulus value {:#x} at cycle {} does not fit in {} bits",
                    entry.value, entry.cycle, width
                )));
            }
            if entry.cycle < sim.reset_cycles {
                return Err(ManifestError::Validation(format!(
                    "stimulus at cycle {} is applied during reset",
                    entry.cycle
                )));
            }
            if entry.cycle >= sim.max_cycles {
                return Err(ManifestError::Validation(format!(
                    "stimulus at cycle {} is beyond max_cycles ({})",
                    entry.cycle, sim.max_cycles
                )));
            }
            if previous.is_some_and(|p| p >= entry.cycle) {
                return Err(ManifestError::Validation(format!(
                    "stimulus cycles must be strictly increasing (cycle {})",
                    entry.cycle
                )));
            }
            previous = Some(entry.cycle);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with(stimulus: Vec<StimulusEntry>) -> Manifest {
        Manifest {
            stimulus,
            ..Manifest::with_width(8)
        }
    }

    fn entry(cycle: u64, value: u64) -> StimulusEntry {
        StimulusEntry {
            cycle,
            value,
            expect: None,
        }
    }

    #[test]
    fn test_default_manifest_valid() {
        assert!(Manifest::with_width(17).validate().is_ok());
    }

    #[test]
    fn test_zero_width_rejected() {
        assert!(Manifest::with_width(0).validate().is_err());
    }

    #[test]
    fn test_value_too_wide() {
        let manifest = manifest_with(vec![entry(3, 0x100)]);
        assert!(matches!(
            manifest.validate(),
            Err(ManifestError::Validation(_))
        ));
    }

    #[test]
    fn test_stimulus_during_reset() {
        let manifest = manifest_with(vec![entry(1, 1)]);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_unordered_stimulus() {
        let manifest = manifest_with(vec![entry(5, 1), entry(4, 2)]);
        assert!(manifest.validate().is_err());
        let manifest = manifest_with(vec![entry(5, 1), entry(5, 2)]);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_expected_output_defaults_to_popcount() {
        assert_eq!(entry(3, 0b1011).expected_output(), 3);
        let explicit = StimulusEntry {
            expect: Some(9),
            ..entry(3, 0b1011)
        };
        assert_eq!(explicit.expected_output(), 9);
    }

    #[test]
    fn test_default_section_matches_simulation_defaults() {
        let config = Manifest::with_width(8).simulation_config();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_simulation_config_carries_reset_style() {
        let mut manifest = Manifest::with_width(8);
        manifest.design.reset = ResetKind::Synchronous;
        manifest.simulation.reset_cycles = 4;
        let config = manifest.simulation_config();
        assert_eq!(config.reset_kind, ResetKind::Synchronous);
        assert_eq!(config.reset_cycles, 4);
    }

    #[test]
    fn test_wide_design_accepts_any_value() {
        let manifest = Manifest {
            stimulus: vec![entry(4, u64::MAX)],
            ..Manifest::with_width(100)
        };
        assert!(manifest.validate().is_ok());
    }
}
