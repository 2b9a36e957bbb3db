//! Monte Carlo over independent simulation runs, plus stat weights built on
//! top of it.

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::character::Character;
use crate::error::SimError;
use crate::sim::{DamageShare, RunResult, Simulation, SimulationConfig, damage_breakdown};
use crate::stats::Stat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    pub runs: u32,
    /// Trial `i` is seeded with `seed + i` (wrapping).
    pub seed: u64,
    pub parallel: bool,
    /// Points added to one stat at a time for stat weights.
    pub stat_gain: u32,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            runs: 2000,
            seed: 12345,
            parallel: true,
            stat_gain: 20,
        }
    }
}

/// Aggregate of a trial set.
#[derive(Debug, Clone, Serialize)]
pub struct DpsSummary {
    pub runs: u32,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    /// Mean damage per run, per spell.
    pub damage_table: IndexMap<String, f64>,
}

impl DpsSummary {
    fn from_results(results: &[RunResult]) -> Self {
        let n = results.len() as f64;
        let mean = results.iter().map(|r| r.dps).sum::<f64>() / n;
        let variance = results.iter().map(|r| (r.dps - mean).powi(2)).sum::<f64>() / n;
        let min = results.iter().map(|r| r.dps).fold(f64::INFINITY, f64::min);
        let max = results.iter().map(|r| r.dps).fold(f64::NEG_INFINITY, f64::max);

        let mut damage_table: IndexMap<String, f64> = IndexMap::new();
        for result in results {
            for (spell, damage) in &result.damage_table {
                *damage_table.entry(spell.clone()).or_insert(0.0) += damage / n;
            }
        }

        Self {
            runs: results.len() as u32,
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
            damage_table,
        }
    }

    pub fn damage_breakdown(&self) -> Vec<DamageShare> {
        damage_breakdown(&self.damage_table)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatWeight {
    pub stat: Stat,
    pub dps: f64,
    /// `1 + (dps - baseline) / baseline`.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatWeights {
    pub gain: u32,
    pub baseline: f64,
    pub weights: Vec<StatWeight>,
}

impl StatWeights {
    pub fn get(&self, stat: Stat) -> Option<&StatWeight> {
        self.weights.iter().find(|w| w.stat == stat)
    }
}

pub struct TrialRunner {
    sim: SimulationConfig,
    config: TrialConfig,
}

impl TrialRunner {
    pub fn new(sim: SimulationConfig, config: TrialConfig) -> Self {
        Self { sim, config }
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Run every trial against its own deep copy of `base`. Any failing
    /// trial fails the whole set.
    pub fn run(&self, base: &Character) -> Result<DpsSummary, SimError> {
        if self.config.runs == 0 {
            return Err(SimError::InvalidSimulation {
                reason: "runs must be at least 1".to_string(),
            });
        }
        let results = self.run_all(base)?;
        let summary = DpsSummary::from_results(&results);
        info!(
            runs = summary.runs,
            mean = summary.mean,
            min = summary.min,
            max = summary.max,
            "trials complete"
        );
        Ok(summary)
    }

    fn run_all(&self, base: &Character) -> Result<Vec<RunResult>, SimError> {
        let trial = |index: u32| self.run_trial(base, index);
        if self.config.parallel {
            (0..self.config.runs).into_par_iter().map(trial).collect()
        } else {
            (0..self.config.runs).map(trial).collect()
        }
    }

    pub fn run_trial(&self, base: &Character, index: u32) -> Result<RunResult, SimError> {
        let config = SimulationConfig {
            seed: self.config.seed.wrapping_add(index as u64),
            ..self.sim.clone()
        };
        let mut sim = Simulation::new(base.clone(), config)?;
        sim.run()
    }

    /// Re-run the trial set once per stat with `stat_gain` extra points in
    /// that stat. Every set uses the same seeds as the baseline.
    pub fn stat_weights(&self, base: &Character) -> Result<StatWeights, SimError> {
        let gain = self.config.stat_gain;
        let baseline = self.run(base)?.mean;
        if baseline <= 0.0 {
            return Err(SimError::InvalidSimulation {
                reason: format!("baseline dps is {}, cannot weight stats", baseline),
            });
        }

        let mut weights = Vec::with_capacity(Stat::ALL.len());
        for stat in Stat::ALL {
            let mut boosted = base.clone();
            boosted.set_points(base.points().with_gain(stat, gain));
            let dps = self.run(&boosted)?.mean;
            let weight = 1.0 + (dps - baseline) / baseline;
            debug!(stat = stat.name(), dps, weight, "stat weight");
            weights.push(StatWeight { stat, dps, weight });
        }

        info!(gain, baseline, "stat weights complete");
        Ok(StatWeights {
            gain,
            baseline,
            weights,
        })
    }
}
