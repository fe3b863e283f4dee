//! Replay harness for `prox-rssi-core`: feeds a CSV or synthetic sample
//! stream through the pipeline and prints the resulting events and feature
//! snapshots. Not part of the proximity-detection core itself — a host-side
//! development and calibration tool.

mod cli;

use std::io::{BufRead, Read};

use anyhow::{Context, Result};
use clap::Parser;
use prox_rssi_core::{AlphaLut, Event, FeatureSnapshot, Params, ProxRssi};
use serde::Deserialize;

use cli::{Cli, Command, Scenario};

type Px = ProxRssi<128, 128, 1001>;

/// A partial, all-optional mirror of [`Params`] for TOML config files: only
/// fields the caller actually wants to override need to be present.
#[derive(Debug, Default, Deserialize)]
struct ParamsOverride {
    w_raw_ms: Option<u32>,
    w_spike_ms: Option<u32>,
    w_feat_ms: Option<u32>,
    hampel_k_q4: Option<i16>,
    mad_eps_q4: Option<i16>,
    enter_near_q4: Option<i16>,
    exit_near_q4: Option<i16>,
    hyst_q4: Option<i16>,
    pct_th_q15: Option<u16>,
    std_th_q4: Option<i16>,
    stable_ms: Option<u32>,
    min_feat_samples: Option<usize>,
    exit_confirm_ms: Option<u32>,
    lockout_ms: Option<u32>,
    max_reasonable_dt_ms: Option<u32>,
}

impl ParamsOverride {
    fn apply(self, mut base: Params) -> Params {
        macro_rules! over {
            ($field:ident) => {
                if let Some(v) = self.$field {
                    base.$field = v;
                }
            };
        }
        over!(w_raw_ms);
        over!(w_spike_ms);
        over!(w_feat_ms);
        over!(hampel_k_q4);
        over!(mad_eps_q4);
        over!(enter_near_q4);
        over!(exit_near_q4);
        over!(hyst_q4);
        over!(pct_th_q15);
        over!(std_th_q4);
        over!(stable_ms);
        over!(min_feat_samples);
        over!(exit_confirm_ms);
        over!(lockout_ms);
        over!(max_reasonable_dt_ms);
        base
    }
}

fn load_params(config: Option<&str>) -> Result<Params> {
    let base = Params::default();
    let Some(path) = config else {
        return Ok(base);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {path}"))?;
    let overrides: ParamsOverride =
        toml::from_str(&text).with_context(|| format!("parsing config file {path}"))?;
    Ok(overrides.apply(base).validated())
}

fn read_csv_samples<R: Read>(reader: R) -> Result<Vec<(u32, i8)>> {
    let buffered = std::io::BufReader::new(reader);
    let mut samples = Vec::new();
    for line in buffered.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, ',');
        let t_ms: u32 = parts
            .next()
            .context("missing t_ms field")?
            .trim()
            .parse()
            .context("parsing t_ms")?;
        let rssi_dbm: i8 = parts
            .next()
            .context("missing rssi_dbm field")?
            .trim()
            .parse()
            .context("parsing rssi_dbm")?;
        samples.push((t_ms, rssi_dbm));
    }
    Ok(samples)
}

fn synth_samples(scenario: Scenario) -> Vec<(u32, i8)> {
    let steady = |start_ms: u32, dbm: i8, n: u32| -> Vec<(u32, i8)> {
        (0..n).map(|i| (start_ms + i * 100, dbm)).collect()
    };
    match scenario {
        Scenario::FarToUnlock => {
            let mut s = steady(0, -80, 10);
            s.extend(steady(1000, -40, 60));
            s
        }
        Scenario::SpikeAbsorbed => {
            let mut s = steady(0, -50, 10);
            s.push((1000, -5));
            s.extend(steady(1100, -50, 10));
            s
        }
        Scenario::NoiseGate => {
            let mut s = steady(0, -80, 10);
            s.extend((0..40).map(|i| (1000 + i * 100, if i % 2 == 0 { -30 } else { -55 })));
            s
        }
        Scenario::HysteresisBand => {
            let mut s = steady(0, -80, 10);
            s.extend(steady(1000, -55, 40));
            s
        }
    }
}

fn print_tick(json: bool, t_ms: u32, event: Event, f: &FeatureSnapshot) {
    if json {
        let line = serde_json::json!({
            "t_ms": t_ms,
            "event": format!("{event:?}"),
            "features": f,
        });
        println!("{line}");
    } else {
        println!(
            "t={t_ms:>8}  event={event:<18?}  n={:<4} last_q4={:<6} std_q4={:<5} pct_q15={}",
            f.n, f.last_q4, f.std_q4, f.pct_above_enter_q15
        );
    }
}

fn run(samples: &[(u32, i8)], params: Params, json: bool) -> Result<()> {
    let mut px: Px = ProxRssi::new(params, AlphaLut::default_ramp())?;
    for &(t_ms, rssi_dbm) in samples {
        px.push_raw(t_ms, rssi_dbm)
            .with_context(|| format!("push_raw({t_ms}, {rssi_dbm})"))?;
        let (event, features) = px.tick(t_ms);
        print_tick(json, t_ms, event, &features);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let params = load_params(cli.config.as_deref())?;

    match cli.command {
        Command::Replay(args) => {
            let samples = match args.path.as_deref() {
                None | Some("-") => read_csv_samples(std::io::stdin())?,
                Some(path) => {
                    let file = std::fs::File::open(path)
                        .with_context(|| format!("opening {path}"))?;
                    read_csv_samples(file)?
                }
            };
            run(&samples, params, cli.json)
        }
        Command::Synth(args) => {
            let samples = synth_samples(args.scenario);
            run(&samples, params, cli.json)
        }
    }
}
