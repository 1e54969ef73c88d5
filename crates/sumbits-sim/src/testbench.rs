use crate::clock_manager::ClockManager;
use crate::pipeline::PopcountPipeline;
use crate::simulator::{SimulationConfig, SimulationError, SimulationResult};
use crate::waveform::Waveform;
use bitvec::prelude::*;
use std::collections::VecDeque;
use sumbits_tree::ResetKind;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    /// Zero-based clock edge at which the input is first applied
    pub cycle: u64,
    pub input: BitVec<u64, Lsb0>,
    /// Root output expected once the input has crossed the whole pipeline
    pub expected: Option<u64>,
}

impl TestVector {
    pub fn new(cycle: u64, input: BitVec<u64, Lsb0>) -> Self {
        TestVector {
            cycle,
            input,
            expected: None,
        }
    }

    pub fn from_value(cycle: u64, value: u64) -> Self {
        Self::new(cycle, value.view_bits::<Lsb0>().to_bitvec())
    }

    pub fn expect(mut self, output: u64) -> Self {
        self.expected = Some(output);
        self
    }

    pub fn expect_popcount(mut self) -> Self {
        self.expected = Some(self.input.count_ones() as u64);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub passed: bool,
    /// Edge at which the output was checked
    pub cycle: u64,
    /// Edge at which the input was applied
    pub presented: u64,
    pub mismatches: Vec<SignalMismatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMismatch {
    pub signal_name: String,
    pub expected: u64,
    pub actual: u64,
    pub cycle: u64,
}

#[derive(Debug, Clone)]
pub struct TestRun {
    pub results: Vec<TestResult>,
    /// Clock edges simulated
    pub cycles: u64,
    pub waveform: Option<Waveform>,
}

impl TestRun {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// First cycle of the default bench stimulus
pub const REFERENCE_START_CYCLE: u64 = 5;

/// Default bench stimulus: 0x13, 0x01, 0x02 and 0x03 applied on consecutive
/// cycles, each checked against its popcount.
///
/// Values are truncated to `width` bits. The first one is applied at
/// `REFERENCE_START_CYCLE`, or right after reset when reset is held longer.
pub fn reference_stimulus(width: usize, reset_cycles: u64) -> Vec<TestVector> {
    let mask = if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };
    let start = REFERENCE_START_CYCLE.max(reset_cycles);
    [0x13u64, 0x01, 0x02, 0x03]
        .iter()
        .enumerate()
        .map(|(i, &value)| TestVector::from_value(start + i as u64, value & mask).expect_popcount())
        .collect()
}

pub struct Testbench {
    name: String,
    pipeline: PopcountPipeline,
    clock: ClockManager,
    config: SimulationConfig,
    test_vectors: Vec<TestVector>,
    /// Cycles simulated after the last vector is applied
    trailing_cycles: u64,
}

impl Testbench {
    pub fn new(width: usize, config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;
        let pipeline = PopcountPipeline::new(width)?.with_reset_kind(config.reset_kind);
        let clock = ClockManager::new("clk", config.clock_period_ps);

        Ok(Testbench {
            name: "sumbits".to_string(),
            pipeline,
            clock,
            config,
            test_vectors: Vec::new(),
            trailing_cycles: 0,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_trailing_cycles(mut self, cycles: u64) -> Self {
        self.trailing_cycles = cycles;
        self
    }

    pub fn add_test_vector(&mut self, vector: TestVector) {
        self.test_vectors.push(vector);
    }

    pub fn add_test_vectors(&mut self, vectors: Vec<TestVector>) {
        self.test_vectors.extend(vectors);
    }

    pub fn pipeline(&self) -> &PopcountPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Reset the pipeline, apply every vector at its cycle and check outputs.
    ///
    /// Inputs are held between vectors. A vector applied at edge `c` is
    /// checked right after edge `c + depth - 1`.
    pub fn run(&mut self) -> SimulationResult<TestRun> {
        self.test_vectors.sort_by_key(|v| v.cycle);
        self.validate_vectors()?;

        let width = self.pipeline.input_width();
        let depth = self.pipeline.depth() as u64;
        let end = self.end_cycle(depth);
        if end > self.config.max_cycles {
            return Err(SimulationError::InvalidConfig(format!(
                "run needs {} cycles, limit is {}",
                end, self.config.max_cycles
            )));
        }

        self.pipeline = PopcountPipeline::from_tree(self.pipeline.tree().clone())
            .with_reset_kind(self.config.reset_kind);
        self.clock.reset();
        let mut waveform = self
            .config
            .capture_waveform
            .then(|| Waveform::new(self.name.clone(), &self.pipeline));

        info!(
            "Testbench {}: width={} depth={} vectors={} cycles={}",
            self.name,
            width,
            depth,
            self.test_vectors.len(),
            end
        );

        if self.config.reset_kind == ResetKind::Asynchronous {
            self.pipeline.assert_async_reset()?;
        }

        let mut held = bitvec![u64, Lsb0; 0; width];
        let mut pending: VecDeque<(u64, u64, u64)> = VecDeque::new();
        let mut vectors = self.test_vectors.iter().peekable();
        let mut results = Vec::new();

        for cycle in 0..end {
            while let Some(vector) = vectors.next_if(|v| v.cycle == cycle) {
                held.fill(false);
                let used = vector.input.len().min(width);
                held[..used].clone_from_bitslice(&vector.input[..used]);
                if let Some(expected) = vector.expected {
                    pending.push_back((cycle + depth - 1, cycle, expected));
                }
                debug!("cycle {}: apply {} ones", cycle, held.count_ones());
            }

            let reset = cycle < self.config.reset_cycles;
            self.clock.next_rising_edge();
            self.pipeline.advance(reset, held.as_bitslice())?;
            if let Some(waveform) = waveform.as_mut() {
                waveform.record(&self.pipeline, self.clock.time_ps(), reset);
            }
            self.clock.finish_cycle();

            while let Some(&(check, presented, expected)) = pending.front() {
                if check != cycle {
                    break;
                }
                pending.pop_front();

                let actual = self.pipeline.current_output();
                let mut mismatches = Vec::new();
                if actual != expected {
                    warn!(
                        "cycle {}: q = {}, expected {} for input applied at cycle {}",
                        cycle, actual, expected, presented
                    );
                    mismatches.push(SignalMismatch {
                        signal_name: "q".to_string(),
                        expected,
                        actual,
                        cycle,
                    });
                }
                results.push(TestResult {
                    passed: mismatches.is_empty(),
                    cycle,
                    presented,
                    mismatches,
                });
            }
        }

        let passed = results.iter().filter(|r| r.passed).count();
        info!(
            "Testbench {}: {}/{} checks passed",
            self.name,
            passed,
            results.len()
        );

        Ok(TestRun {
            results,
            cycles: end,
            waveform,
        })
    }

    fn validate_vectors(&self) -> SimulationResult<()> {
        let width = self.pipeline.input_width();
        for pair in self.test_vectors.windows(2) {
            if pair[0].cycle == pair[1].cycle {
                return Err(SimulationError::InvalidConfig(format!(
                    "two vectors scheduled at cycle {}",
                    pair[0].cycle
                )));
            }
        }
        for vector in &self.test_vectors {
            if vector.cycle < self.config.reset_cycles {
                return Err(SimulationError::InvalidConfig(format!(
                    "vector at cycle {} is applied while reset is held ({} cycles)",
                    vector.cycle, self.config.reset_cycles
                )));
            }
            if vector.input.len() > width && vector.input[width..].any() {
                return Err(SimulationError::InvalidInput(format!(
                    "vector at cycle {} does not fit in {} bits",
                    vector.cycle, width
                )));
            }
        }
        Ok(())
    }

    fn end_cycle(&self, depth: u64) -> u64 {
        match self.test_vectors.last() {
            Some(last) => (last.cycle + depth).max(last.cycle + 1 + self.trailing_cycles),
            None => self.config.reset_cycles + self.trailing_cycles,
        }
    }
}
