use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use sumbits_manifest::{Manifest, StimulusEntry};
use sumbits_sim::{reference_stimulus, TestVector, Testbench};
use sumbits_tree::{Netlist, PopcountTree, ResetKind};
use tracing::info;

/// Trailing cycles simulated after the built-in stimulus
const REFERENCE_TRAILING_CYCLES: u64 = 5;

/// sumbits - recursive pipelined population-count trees
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a tree and write its structural netlist as JSON
    Build {
        /// Design manifest (sumbits.toml)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Input width, overrides the manifest
        #[arg(short, long)]
        width: Option<usize>,

        /// Register reset style, overrides the manifest
        #[arg(short, long, value_enum)]
        reset: Option<ResetArg>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print depth and register figures for a width
    Info {
        /// Input width
        #[arg(short, long)]
        width: usize,
    },

    /// Simulate the pipeline against a stimulus
    Sim {
        /// Design manifest (sumbits.toml)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Input width, overrides the manifest
        #[arg(short, long)]
        width: Option<usize>,

        /// Input values applied on consecutive cycles after reset (0x.., 0b.. or decimal)
        #[arg(long, value_delimiter = ',', value_parser = parse_value)]
        values: Vec<u64>,

        /// Write the captured waveform as JSON
        #[arg(long)]
        waveform: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ResetArg {
    Sync,
    Async,
}

impl From<ResetArg> for ResetKind {
    fn from(arg: ResetArg) -> Self {
        match arg {
            ResetArg::Sync => ResetKind::Synchronous,
            ResetArg::Async => ResetKind::Asynchronous,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::Build {
            manifest,
            width,
            reset,
            output,
        } => {
            let mut manifest = load_manifest(manifest.as_deref(), width)?;
            if let Some(reset) = reset {
                manifest.design.reset = reset.into();
            }
            build_netlist(&manifest, output.as_deref())?;
        }

        Commands::Info { width } => {
            print_info(width)?;
        }

        Commands::Sim {
            manifest,
            width,
            values,
            waveform,
        } => {
            let manifest = load_manifest(manifest.as_deref(), width)?;
            simulate(&manifest, &values, waveform.as_deref())?;
        }
    }

    Ok(())
}

fn parse_value(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2)
    } else {
        s.parse::<u64>()
    };
    parsed.map_err(|e| format!("invalid value '{}': {}", s, e))
}

fn load_manifest(path: Option<&Path>, width: Option<usize>) -> Result<Manifest> {
    let mut manifest = match path {
        Some(path) => sumbits_manifest::from_path(path)
            .with_context(|| format!("Failed to load manifest {}", path.display()))?,
        None => Manifest::with_width(17),
    };
    if let Some(width) = width {
        manifest.design.width = width;
        manifest
            .validate()
            .context("Manifest is invalid for the requested width")?;
    }
    Ok(manifest)
}

fn build_netlist(manifest: &Manifest, output: Option<&Path>) -> Result<()> {
    let tree = PopcountTree::build(manifest.design.width)?;
    let netlist = Netlist::from_tree(&tree, manifest.design.name.clone(), manifest.design.reset);
    let json = netlist.to_json_pretty()?;

    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write netlist to {}", path.display()))?;
            info!(
                "Wrote {} registers ({} bits) to {}",
                netlist.registers.len(),
                netlist.total_register_bits(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_info(width: usize) -> Result<()> {
    let stats = PopcountTree::build(width)?.stats();
    println!("input width:     {}", stats.input_width);
    println!("output width:    {}", stats.output_width);
    println!("pipeline depth:  {}", stats.depth);
    println!("leaves:          {}", stats.leaves);
    println!("registers:       {}", stats.registers);
    println!("padding bits:    {}", stats.padding_bits);
    println!("register bits:   {}", stats.register_bits);
    Ok(())
}

fn simulate(manifest: &Manifest, values: &[u64], waveform_path: Option<&Path>) -> Result<()> {
    let sim = &manifest.simulation;
    let mut config = manifest.simulation_config();
    config.capture_waveform |= waveform_path.is_some();

    let mut testbench = Testbench::new(manifest.design.width, config)?
        .with_name(manifest.design.name.clone());

    if !values.is_empty() {
        let entries = values.iter().enumerate().map(|(i, &value)| StimulusEntry {
            cycle: sim.reset_cycles + i as u64,
            value,
            expect: None,
        });
        testbench.add_test_vectors(entries.map(|e| to_vector(&e)).collect());
        testbench = testbench.with_trailing_cycles(sim.trailing_cycles);
    } else if !manifest.stimulus.is_empty() {
        testbench.add_test_vectors(manifest.stimulus.iter().map(to_vector).collect());
        testbench = testbench.with_trailing_cycles(sim.trailing_cycles);
    } else {
        testbench.add_test_vectors(reference_stimulus(
            manifest.design.width,
            sim.reset_cycles,
        ));
        testbench = testbench.with_trailing_cycles(REFERENCE_TRAILING_CYCLES);
    }

    let run = testbench.run()?;

    println!(
        "{}: width {} depth {}, {} cycles",
        manifest.design.name,
        manifest.design.width,
        testbench.pipeline().depth(),
        run.cycles
    );
    for result in &run.results {
        let status = if result.passed { "ok" } else { "FAIL" };
        match result.mismatches.first() {
            Some(m) => println!(
                "  cycle {:>4} (applied {:>4}): q = {} expected {}  {}",
                result.cycle, result.presented, m.actual, m.expected, status
            ),
            None => println!(
                "  cycle {:>4} (applied {:>4}): {}",
                result.cycle, result.presented, status
            ),
        }
    }

    if let (Some(path), Some(waveform)) = (waveform_path, run.waveform.as_ref()) {
        fs::write(path, waveform.to_json_pretty()?)
            .with_context(|| format!("Failed to write waveform to {}", path.display()))?;
        info!("Wrote {} waveform samples to {}", waveform.samples.len(), path.display());
    }

    if !run.passed() {
        bail!("{} of {} checks failed", run.failures().count(), run.results.len());
    }
    Ok(())
}

fn to_vector(entry: &StimulusEntry) -> TestVector {
    TestVector::from_value(entry.cycle, entry.value).expect(entry.expected_output())
}
