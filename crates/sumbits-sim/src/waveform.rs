//! Per-cycle register trace

use crate::pipeline::PopcountPipeline;
use bitvec::prelude::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// State of the pipeline right after one clock edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveformSample {
    /// Zero-based index of the clock edge
    pub cycle: u64,
    pub time_ps: u64,
    pub reset: bool,
    /// Input applied on this edge, as hex
    pub d: String,
    /// Root output after this edge
    pub q: u64,
    pub registers: IndexMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waveform {
    pub name: String,
    pub input_width: usize,
    pub output_width: usize,
    pub depth: usize,
    pub samples: Vec<WaveformSample>,
}

impl Waveform {
    pub fn new(name: impl Into<String>, pipeline: &PopcountPipeline) -> Self {
        Waveform {
            name: name.into(),
            input_width: pipeline.input_width(),
            output_width: pipeline.output_width(),
            depth: pipeline.depth(),
            samples: Vec::new(),
        }
    }

    /// Record the pipeline right after its most recent clock edge
    pub fn record(&mut self, pipeline: &PopcountPipeline, time_ps: u64, reset: bool) {
        self.samples.push(WaveformSample {
            cycle: pipeline.cycle().saturating_sub(1),
            time_ps,
            reset,
            d: bits_to_hex(pipeline.input()),
            q: pipeline.current_output(),
            registers: pipeline.register_values(),
        });
    }

    pub fn sample(&self, cycle: u64) -> Option<&WaveformSample> {
        self.samples.iter().find(|s| s.cycle == cycle)
    }

    /// Root output of every recorded cycle
    pub fn outputs(&self) -> Vec<u64> {
        self.samples.iter().map(|s| s.q).collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Render a bit vector as `0x`-prefixed hex, most-significant nibble first
pub fn bits_to_hex<T, O>(bits: &BitSlice<T, O>) -> String
where
    T: BitStore,
    O: BitOrder,
{
    if bits.is_empty() {
        return "0x0".to_string();
    }
    let digits: String = bits
        .chunks(4)
        .rev()
        .map(|nibble| {
            let value = nibble
                .iter()
                .by_vals()
                .enumerate()
                .fold(0u32, |acc, (i, bit)| acc | ((bit as u32) << i));
            char::from_digit(value, 16).unwrap_or('?')
        })
        .collect();
    format!("0x{}", digits)
}
