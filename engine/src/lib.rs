pub mod apl;
pub mod character;
pub mod content;
pub mod error;
pub mod hero;
pub mod sim;
pub mod spell;
pub mod stats;
pub mod trials;

pub use apl::{Action, Condition, Literal, Operator, SimFellConfiguration};
pub use character::{Character, RotationEntry};
pub use error::{ConfigError, ResolutionError, SimError};
pub use hero::{Hero, RimeState};
pub use sim::{DamageShare, RunResult, Simulation, SimulationConfig};
pub use spell::{Spell, SpellDef, SpellId, SpellKind, SpellState};
pub use stats::{DerivedStats, Stat, StatCoefficients, StatPoints, Stats};
pub use trials::{DpsSummary, StatWeight, StatWeights, TrialConfig, TrialRunner};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Damage multiplier applied when a crit roll succeeds.
pub const CRIT_MULTIPLIER: f64 = 2.0;

/// Timers closer to zero than this are treated as expired.
pub const TIME_EPSILON: f64 = 1e-9;

/// Trial-scoped random source. Each simulation owns exactly one.
#[derive(Debug, Clone)]
pub struct Dice {
    source: DiceSource,
}

#[derive(Debug, Clone)]
enum DiceSource {
    Seeded(ChaCha8Rng),
    Scripted { rolls: Vec<f64>, next: usize },
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: DiceSource::Seeded(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Replays the given percentile rolls in order, wrapping around.
    pub fn from_scripted(rolls: Vec<f64>) -> Self {
        Self {
            source: DiceSource::Scripted { rolls, next: 0 },
        }
    }

    /// Percentile roll in `[0, 100)`.
    pub fn percent(&mut self) -> f64 {
        match &mut self.source {
            DiceSource::Seeded(rng) => rng.gen_range(0.0..100.0),
            DiceSource::Scripted { rolls, next } => {
                if rolls.is_empty() {
                    return 100.0;
                }
                let roll = rolls[*next % rolls.len()];
                *next += 1;
                roll
            }
        }
    }

    /// Roll against a percent chance. Chances at or below zero never draw.
    pub fn chance(&mut self, percent: f64) -> bool {
        if percent <= 0.0 {
            return false;
        }
        self.percent() < percent
    }
}
