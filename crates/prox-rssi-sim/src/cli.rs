//! Command-line interface definitions for `prox-rssi-sim`.

use clap::{Parser, Subcommand, ValueEnum};

/// Replay harness for the proximity-detection core.
#[derive(Parser)]
#[command(name = "prox-rssi-sim", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// TOML file overriding the default calibration.
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    /// Emit one JSON object per tick instead of a human-readable table.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Replay a CSV file of `t_ms,rssi_dbm` samples.
    Replay(ReplayArgs),
    /// Replay one of the built-in synthetic sample feeds.
    Synth(SynthArgs),
}

/// Arguments for the `replay` subcommand.
#[derive(Parser)]
pub struct ReplayArgs {
    /// CSV file to read; `-` (or omitted) reads from stdin.
    pub path: Option<String>,
}

/// Arguments for the `synth` subcommand.
#[derive(Parser)]
pub struct SynthArgs {
    /// Which synthetic scenario to generate.
    #[arg(value_enum)]
    pub scenario: Scenario,
}

/// Named synthetic scenarios, matching this crate's end-to-end test
/// scenarios so they can be reproduced and inspected from the command
/// line.
#[derive(Clone, Copy, ValueEnum)]
pub enum Scenario {
    /// Far -> stable near -> unlock.
    FarToUnlock,
    /// A single spike absorbed by the Hampel stage.
    SpikeAbsorbed,
    /// Noise alternating above/below threshold; never stabilizes.
    NoiseGate,
    /// A steady signal inside the hysteresis band.
    HysteresisBand,
}
