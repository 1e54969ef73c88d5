//! Cycle-accurate popcount pipeline
//!
//! Owns one built tree and its register file. Each call to `advance` is one
//! rising clock edge: every register's next value is computed from the
//! pre-edge snapshot, then all registers commit together.

use crate::register::{RegisterStage, RegisterState};
use crate::simulator::{SimulationError, SimulationResult};
use bitvec::prelude::*;
use indexmap::IndexMap;
use sumbits_tree::{Node, PopcountTree, RegisterId, ResetKind};
use tracing::trace;

/// Register contents at a given cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub cycle: u64,
    pub values: Vec<u64>,
    pub states: Vec<RegisterState>,
}

#[derive(Debug, Clone)]
pub struct PopcountPipeline {
    tree: PopcountTree,
    registers: Vec<RegisterStage>,
    /// Next-value scratch, indexed by register id
    next: Vec<u64>,
    /// Input applied on the most recent edge
    input: BitVec<u64, Lsb0>,
    reset_kind: ResetKind,
    cycle: u64,
}

impl PopcountPipeline {
    /// Build a pipeline counting `width` input bits
    pub fn new(width: usize) -> SimulationResult<Self> {
        Ok(Self::from_tree(PopcountTree::build(width)?))
    }

    pub fn from_tree(tree: PopcountTree) -> Self {
        let registers: Vec<RegisterStage> = tree
            .registers()
            .iter()
            .map(|spec| RegisterStage::new(spec.width))
            .collect();
        let next = vec![0; registers.len()];
        let input = bitvec![u64, Lsb0; 0; tree.input_width()];

        PopcountPipeline {
            tree,
            registers,
            next,
            input,
            reset_kind: ResetKind::default(),
            cycle: 0,
        }
    }

    pub fn with_reset_kind(mut self, kind: ResetKind) -> Self {
        self.reset_kind = kind;
        self
    }

    /// Apply one clock edge and return the new root output.
    ///
    /// `input` is zero-extended to the pipeline width. Bits beyond the width
    /// must be zero; otherwise the call fails without touching any register.
    pub fn advance<T, O>(&mut self, reset: bool, input: &BitSlice<T, O>) -> SimulationResult<u64>
    where
        T: BitStore,
        O: BitOrder,
    {
        let width = self.input_width();
        if input.len() > width && input[width..].any() {
            return Err(SimulationError::InvalidInput(format!(
                "input has bits set above bit {} of a {}-bit pipeline",
                width - 1,
                width
            )));
        }

        let used = input.len().min(width);
        self.input.fill(false);
        self.input[..used].clone_from_bitslice(&input[..used]);

        if !reset {
            evaluate(self.tree.root(), &self.input, &self.registers, &mut self.next);
        }
        for (register, &value) in self.registers.iter_mut().zip(&self.next) {
            let value = register.next(reset, value);
            register.commit(reset, value);
        }
        self.cycle += 1;

        let output = self.current_output();
        trace!(
            "cycle {}: reset={} ones_in={} q={}",
            self.cycle,
            reset,
            self.input.count_ones(),
            output
        );
        Ok(output)
    }

    /// `advance` with the input given as an integer
    pub fn advance_value(&mut self, reset: bool, value: u64) -> SimulationResult<u64> {
        self.advance(reset, value.view_bits::<Lsb0>())
    }

    /// Value of the root register
    pub fn current_output(&self) -> u64 {
        self.register_value(self.tree.root().register().id)
    }

    /// Clear every register immediately, without a clock edge.
    ///
    /// Only available on asynchronously reset pipelines.
    pub fn assert_async_reset(&mut self) -> SimulationResult<()> {
        if self.reset_kind != ResetKind::Asynchronous {
            return Err(SimulationError::ResetKind(self.reset_kind));
        }
        for register in &mut self.registers {
            register.clear();
        }
        Ok(())
    }

    pub fn register_value(&self, id: RegisterId) -> u64 {
        self.registers[id.index()].value()
    }

    pub fn register_state(&self, id: RegisterId) -> RegisterState {
        self.registers[id.index()].state()
    }

    /// Every register value keyed by hierarchical name, in id order
    pub fn register_values(&self) -> IndexMap<String, u64> {
        self.tree
            .registers()
            .iter()
            .map(|spec| {
                (
                    self.tree.register_name(spec.id).to_string(),
                    self.register_value(spec.id),
                )
            })
            .collect()
    }

    pub fn input(&self) -> &BitSlice<u64, Lsb0> {
        &self.input
    }

    pub fn tree(&self) -> &PopcountTree {
        &self.tree
    }

    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub fn input_width(&self) -> usize {
        self.tree.input_width()
    }

    pub fn output_width(&self) -> usize {
        self.tree.output_width()
    }

    pub fn reset_kind(&self) -> ResetKind {
        self.reset_kind
    }

    /// Clock edges applied so far
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            cycle: self.cycle,
            values: self.registers.iter().map(|r| r.value()).collect(),
            states: self.registers.iter().map(|r| r.state()).collect(),
        }
    }

    pub fn restore(&mut self, snapshot: &PipelineSnapshot) -> SimulationResult<()> {
        if snapshot.values.len() != self.registers.len()
            || snapshot.states.len() != self.registers.len()
        {
            return Err(SimulationError::InvalidInput(format!(
                "snapshot holds {} registers, pipeline has {}",
                snapshot.values.len(),
                self.registers.len()
            )));
        }
        for ((register, &value), &state) in self
            .registers
            .iter_mut()
            .zip(&snapshot.values)
            .zip(&snapshot.states)
        {
            register.restore(value, state);
        }
        self.cycle = snapshot.cycle;
        Ok(())
    }
}

/// Compute the next value of every register in `node` from the current ones.
fn evaluate(node: &Node, input: &BitSlice<u64, Lsb0>, current: &[RegisterStage], next: &mut [u64]) {
    match node {
        Node::Leaf(leaf) => {
            assert_eq!(input.len(), leaf.input_width);
            // A 1-bit tree ties its high port bit low
            let bit = |i: usize| input.get(i).map(|b| *b as u64).unwrap_or(0);
            next[leaf.register.id.index()] = bit(1) + bit(0);
        }
        Node::Internal(internal) => {
            let (upper, lower) = internal.split.slice(input);
            evaluate(&internal.left, upper, current, next);
            evaluate(&internal.right, &lower, current, next);

            next[internal.register.id.index()] = current[internal.left.register().id.index()]
                .value()
                + current[internal.right.register().id.index()].value();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset(pipeline: &mut PopcountPipeline) {
        pipeline.advance_value(true, 0).unwrap();
    }

    fn settle(pipeline: &mut PopcountPipeline, value: u64) -> u64 {
        for _ in 0..pipeline.depth() {
            pipeline.advance_value(false, value).unwrap();
        }
        pipeline.current_output()
    }

    #[test]
    fn test_width_4_two_ones() {
        let mut pipeline = PopcountPipeline::new(4).unwrap();
        reset(&mut pipeline);
        assert_eq!(pipeline.depth(), 2);
        assert_eq!(settle(&mut pipeline, 0b0011), 2);
    }

    #[test]
    fn test_width_4_all_ones() {
        let mut pipeline = PopcountPipeline::new(4).unwrap();
        reset(&mut pipeline);
        assert_eq!(settle(&mut pipeline, 0b1111), 4);
    }

    #[test]
    fn test_output_lags_by_depth() {
        let mut pipeline = PopcountPipeline::new(8).unwrap();
        reset(&mut pipeline);
        assert_eq!(pipeline.advance_value(false, 0xff).unwrap(), 0);
        assert_eq!(pipeline.advance_value(false, 0xff).unwrap(), 0);
        assert_eq!(pipeline.advance_value(false, 0xff).unwrap(), 8);
    }

    #[test]
    fn test_width_1_passes_bit_through() {
        let mut pipeline = PopcountPipeline::new(1).unwrap();
        reset(&mut pipeline);
        assert_eq!(pipeline.advance_value(false, 1).unwrap(), 1);
        assert_eq!(pipeline.advance_value(false, 0).unwrap(), 0);
    }

    #[test]
    fn test_reset_clears_every_register() {
        let mut pipeline = PopcountPipeline::new(13).unwrap();
        reset(&mut pipeline);
        settle(&mut pipeline, 0x1fff);
        assert_eq!(pipeline.current_output(), 13);

        pipeline.advance_value(true, 0x1fff).unwrap();
        assert!(pipeline.register_values().values().all(|&v| v == 0));
        assert!(pipeline
            .tree()
            .registers()
            .iter()
            .all(|r| pipeline.register_state(r.id) == RegisterState::Reset));
    }

    #[test]
    fn test_input_above_width_rejected() {
        let mut pipeline = PopcountPipeline::new(4).unwrap();
        reset(&mut pipeline);
        pipeline.advance_value(false, 0b0101).unwrap();
        let before = pipeline.snapshot();

        let err = pipeline.advance_value(false, 0b1_0000).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(_)));
        assert_eq!(pipeline.snapshot(), before);
    }

    #[test]
    fn test_narrow_input_zero_extended() {
        let mut pipeline = PopcountPipeline::new(70).unwrap();
        reset(&mut pipeline);
        let bits = bitvec![u8, Msb0; 1, 1, 1];
        for _ in 0..pipeline.depth() {
            pipeline.advance(false, bits.as_bitslice()).unwrap();
        }
        assert_eq!(pipeline.current_output(), 3);
    }

    #[test]
    fn test_async_reset() {
        let mut pipeline = PopcountPipeline::new(4).unwrap();
        reset(&mut pipeline);
        settle(&mut pipeline, 0b0111);
        pipeline.assert_async_reset().unwrap();
        assert_eq!(pipeline.current_output(), 0);

        let mut sync = PopcountPipeline::new(4)
            .unwrap()
            .with_reset_kind(ResetKind::Synchronous);
        assert!(matches!(
            sync.assert_async_reset(),
            Err(SimulationError::ResetKind(ResetKind::Synchronous))
        ));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut pipeline = PopcountPipeline::new(6).unwrap();
        reset(&mut pipeline);
        pipeline.advance_value(false, 0b101101).unwrap();
        let snapshot = pipeline.snapshot();
        let out = settle(&mut pipeline, 0b101101);

        pipeline.restore(&snapshot).unwrap();
        assert_eq!(pipeline.cycle(), snapshot.cycle);
        assert_eq!(settle(&mut pipeline, 0b101101), out);
    }

    #[test]
    fn test_odd_width_zero_extension() {
        // The widened lower branches must never count the padding bits
        for width in [3, 5, 9, 17] {
            let mut pipeline = PopcountPipeline::new(width).unwrap();
            reset(&mut pipeline);
            let all_ones = (1u64 << width) - 1;
            assert_eq!(settle(&mut pipeline, all_ones), width as u64);
            assert_eq!(settle(&mut pipeline, 1), 1);
            assert_eq!(settle(&mut pipeline, 1 << (width - 1)), 1);
        }
    }

    #[test]
    fn test_register_value_names() {
        let pipeline = PopcountPipeline::new(4).unwrap();
        let names: Vec<_> = pipeline.register_values().keys().cloned().collect();
        assert_eq!(names, vec!["root.upper", "root.lower", "root"]);
    }
}
