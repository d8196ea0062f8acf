/*
    Copyright 2023 github.com/programaquatic

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

//! Configuration (§10.1): CLI flags via `clap`, an optional JSON config
//! file merged underneath them, both landing in one resolved
//! [`SimulationConfig`]. CLI flags given on the command line win over the
//! config file, which wins over the built-in defaults.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Parser, Debug)]
#[command(name = "dpd-bouncer", about = "DPD obstacle-bouncing fluid simulator with rigid obstacle bounce-back")]
pub struct Cli {
    /// Optional JSON config file; CLI flags override its fields.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long = "box")]
    pub box_side: Option<f32>,
    #[arg(long)]
    pub density: Option<f32>,
    #[arg(long)]
    pub dt: Option<f32>,
    #[arg(long)]
    pub steps: Option<u64>,
    #[arg(long = "dump-every")]
    pub dump_every: Option<u64>,
    #[arg(long)]
    pub rc: Option<f32>,
    #[arg(long)]
    pub a: Option<f32>,
    #[arg(long)]
    pub gamma: Option<f32>,
    #[arg(long = "kbt")]
    pub kbt: Option<f32>,
    #[arg(long)]
    pub power: Option<f32>,
    #[arg(long = "wall-halfwidth")]
    pub wall_halfwidth: Option<f32>,
    #[arg(long = "funnel-sdf")]
    pub funnel_sdf: Option<PathBuf>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long = "equilibration-steps")]
    pub equilibration_steps: Option<u64>,
    #[arg(long)]
    pub out: Option<PathBuf>,
    #[arg(long = "restart-in")]
    pub restart_in: Option<PathBuf>,
    #[arg(long = "restart-out")]
    pub restart_out: Option<PathBuf>,
    #[arg(long = "bounce-failure-threshold")]
    pub bounce_failure_threshold: Option<f32>,
    /// Supplements the LAMMPS dump with a tab-separated momentum/
    /// temperature log, in the source's own `diag()` style.
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,
    /// Optional constant acceleration, e.g. `0,0.02,0` for scenario 4's
    /// driven flow.
    #[arg(long, value_delimiter = ',')]
    pub gravity: Option<Vec<f32>>,
}

/// Every field of [`Cli`] mirrored as `#[serde(default)]` `Option`s, so a
/// config file only needs to mention what it overrides. Comment lines
/// (`//...`) are stripped before parsing, in the teacher's
/// `aqs_utils::config::read_json` style.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    box_side: Option<f32>,
    density: Option<f32>,
    dt: Option<f32>,
    steps: Option<u64>,
    dump_every: Option<u64>,
    rc: Option<f32>,
    a: Option<f32>,
    gamma: Option<f32>,
    kbt: Option<f32>,
    power: Option<f32>,
    wall_halfwidth: Option<f32>,
    funnel_sdf: Option<PathBuf>,
    seed: Option<u64>,
    equilibration_steps: Option<u64>,
    out: Option<PathBuf>,
    restart_in: Option<PathBuf>,
    restart_out: Option<PathBuf>,
    bounce_failure_threshold: Option<f32>,
    diagnostics: Option<PathBuf>,
    gravity: Option<[f32; 3]>,
}

/// Fully resolved run parameters (§6); every field here has a concrete
/// value, unlike the two partial sources merged to produce it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub box_side: f32,
    pub density: f32,
    pub dt: f32,
    pub steps: u64,
    pub dump_every: u64,
    pub rc: f32,
    pub a: f32,
    pub gamma: f32,
    pub kbt: f32,
    pub power: f32,
    pub wall_halfwidth: f32,
    pub funnel_sdf: Option<PathBuf>,
    pub seed: u64,
    pub equilibration_steps: u64,
    pub out: PathBuf,
    pub restart_in: Option<PathBuf>,
    pub restart_out: Option<PathBuf>,
    pub bounce_failure_threshold: f32,
    pub diagnostics: Option<PathBuf>,
    pub gravity: [f32; 3],
}

impl Default for SimulationConfig {
    /// The end-to-end scenario defaults from §8: `Δt=0.02, r_c=1, a=2.5,
    /// γ=45, kBT=0.1, power=0.25, ρ=3, L=10`, no wall, no funnel, no
    /// gravity, a 0.1% bounce-failure budget.
    fn default() -> Self {
        SimulationConfig {
            box_side: 10.0,
            density: 3.0,
            dt: 0.02,
            steps: 200,
            dump_every: 50,
            rc: 1.0,
            a: 2.5,
            gamma: 45.0,
            kbt: 0.1,
            power: 0.25,
            wall_halfwidth: f32::INFINITY,
            funnel_sdf: None,
            seed: 0,
            equilibration_steps: 200,
            out: PathBuf::from("trajectory.dump"),
            restart_in: None,
            restart_out: None,
            bounce_failure_threshold: 0.001,
            diagnostics: None,
            gravity: [0.0, 0.0, 0.0],
        }
    }
}

macro_rules! apply {
    ($base:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(if let Some(v) = $src.$field {
            $base.$field = v;
        })+
    };
}

impl SimulationConfig {
    /// Merge CLI flags (highest priority), falling back to an optional
    /// JSON config file, falling back to [`SimulationConfig::default`].
    pub fn resolve(cli: &Cli) -> SimResult<Self> {
        let mut cfg = SimulationConfig::default();

        if let Some(path) = &cli.config {
            let file = read_json_with_comments::<ConfigFile>(path)?;
            apply!(
                cfg, file, box_side, density, dt, steps, dump_every, rc, a, gamma, kbt, power,
                wall_halfwidth, seed, equilibration_steps, out, bounce_failure_threshold
            );
            if let Some(v) = file.funnel_sdf {
                cfg.funnel_sdf = Some(v);
            }
            if let Some(v) = file.restart_in {
                cfg.restart_in = Some(v);
            }
            if let Some(v) = file.restart_out {
                cfg.restart_out = Some(v);
            }
            if let Some(v) = file.diagnostics {
                cfg.diagnostics = Some(v);
            }
            if let Some(g) = file.gravity {
                cfg.gravity = g;
            }
        }

        apply!(
            cfg, cli, box_side, density, dt, steps, dump_every, rc, a, gamma, kbt, power,
            wall_halfwidth, seed, equilibration_steps, bounce_failure_threshold
        );
        if let Some(v) = &cli.funnel_sdf {
            cfg.funnel_sdf = Some(v.clone());
        }
        if let Some(v) = &cli.out {
            cfg.out = v.clone();
        }
        if let Some(v) = &cli.restart_in {
            cfg.restart_in = Some(v.clone());
        }
        if let Some(v) = &cli.restart_out {
            cfg.restart_out = Some(v.clone());
        }
        if let Some(v) = &cli.diagnostics {
            cfg.diagnostics = Some(v.clone());
        }
        if let Some(g) = &cli.gravity {
            let at = |i: usize| g.get(i).copied().unwrap_or(0.0);
            cfg.gravity = [at(0), at(1), at(2)];
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Configuration errors (§7): non-positive extents, malformed
    /// thresholds. Checked once before the run starts.
    fn validate(&self) -> SimResult<()> {
        if self.box_side <= 0.0 {
            return Err(SimError::Configuration(format!("box side must be positive, got {}", self.box_side)));
        }
        if self.rc <= 0.0 {
            return Err(SimError::Configuration(format!("rc must be positive, got {}", self.rc)));
        }
        if self.dt <= 0.0 {
            return Err(SimError::Configuration(format!("dt must be positive, got {}", self.dt)));
        }
        if self.density <= 0.0 {
            return Err(SimError::Configuration(format!("density must be positive, got {}", self.density)));
        }
        if !(0.0..=1.0).contains(&self.bounce_failure_threshold) {
            return Err(SimError::Configuration(format!(
                "bounce_failure_threshold must lie in [0,1], got {}",
                self.bounce_failure_threshold
            )));
        }
        if self.box_side / (self.box_side / self.rc).floor().max(1.0) < self.rc {
            return Err(SimError::Configuration(format!(
                "box side {} cannot host cells of edge >= rc={}",
                self.box_side, self.rc
            )));
        }
        Ok(())
    }
}

/// Read and parse a JSON file, stripping `//`-prefixed comment lines
/// first, in the teacher's `aqs_utils::config::read_json` style.
fn read_json_with_comments<T: for<'de> Deserialize<'de>>(path: &std::path::Path) -> SimResult<T> {
    let raw = std::fs::read_to_string(path)?;
    let stripped: String = raw
        .lines()
        .filter(|l| !l.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(serde_json::from_str(&stripped)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn empty_cli() -> Cli {
        Cli::parse_from(["dpd-bouncer"])
    }

    #[test]
    fn defaults_match_spec_scenario_baseline() {
        let cfg = SimulationConfig::resolve(&empty_cli()).unwrap();
        assert_eq!(cfg.box_side, 10.0);
        assert_eq!(cfg.rc, 1.0);
        assert_eq!(cfg.a, 2.5);
        assert_eq!(cfg.gamma, 45.0);
        assert_eq!(cfg.kbt, 0.1);
        assert_eq!(cfg.power, 0.25);
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli::parse_from(["dpd-bouncer", "--steps", "500", "--dt", "0.01"]);
        let cfg = SimulationConfig::resolve(&cli).unwrap();
        assert_eq!(cfg.steps, 500);
        assert_eq!(cfg.dt, 0.01);
    }

    #[test]
    fn rejects_non_positive_box_side() {
        let cli = Cli::parse_from(["dpd-bouncer", "--box", "0"]);
        assert!(SimulationConfig::resolve(&cli).is_err());
    }

    #[test]
    fn rejects_cutoff_larger_than_box() {
        let cli = Cli::parse_from(["dpd-bouncer", "--box", "1", "--rc", "2"]);
        assert!(SimulationConfig::resolve(&cli).is_err());
    }
}
