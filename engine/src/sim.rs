use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::apl::{EvalContext, check_paths, evaluate_all};
use crate::character::Character;
use crate::error::SimError;
use crate::spell::SpellId;
use crate::{CRIT_MULTIPLIER, Dice, TIME_EPSILON};

const DEFAULT_DURATION: f64 = 120.0;
const DEFAULT_MIN_STEP: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub duration: f64,
    pub enemy_count: u32,
    /// Suppress crit rolls so runs are exactly reproducible.
    pub deterministic: bool,
    /// Collect a per-decision trace in the result.
    pub debug: bool,
    pub seed: u64,
    /// Fail the run instead of clamping when a timer is seen below zero.
    pub strict_invariants: bool,
    /// Shortest time any cast or idle wait may take.
    pub min_step: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            enemy_count: 1,
            deterministic: false,
            debug: false,
            seed: 0,
            strict_invariants: false,
            min_step: DEFAULT_MIN_STEP,
        }
    }
}

impl SimulationConfig {
    pub fn new(duration: f64, enemy_count: u32) -> Self {
        Self {
            duration,
            enemy_count,
            ..Self::default()
        }
    }

    /// Deterministic run that records a trace.
    pub fn debug(duration: f64, enemy_count: u32) -> Self {
        Self {
            deterministic: true,
            debug: true,
            ..Self::new(duration, enemy_count)
        }
    }

    fn validate(&self) -> Result<(), SimError> {
        let reason = if !(self.duration.is_finite() && self.duration > 0.0) {
            format!("duration must be positive, got {}", self.duration)
        } else if self.enemy_count == 0 {
            "enemy_count must be at least 1".to_string()
        } else if !(self.min_step.is_finite() && self.min_step > 0.0) {
            format!("min_step must be positive, got {}", self.min_step)
        } else {
            return Ok(());
        };
        Err(SimError::InvalidSimulation { reason })
    }
}

/// Outcome of a single run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub dps: f64,
    pub total_damage: f64,
    pub duration: f64,
    /// Completed casts; channels count when they start.
    pub casts: u32,
    pub crits: u32,
    /// Spell name -> cumulative damage, in order of first damage.
    pub damage_table: IndexMap<String, f64>,
    pub timer_clamps: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl RunResult {
    pub fn damage_breakdown(&self) -> Vec<DamageShare> {
        damage_breakdown(&self.damage_table)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageShare {
    pub spell: String,
    pub damage: f64,
    /// Fraction of the table total, 0..=1.
    pub share: f64,
}

/// Highest damage first, zero rows dropped.
pub fn damage_breakdown(table: &IndexMap<String, f64>) -> Vec<DamageShare> {
    let total: f64 = table.values().sum();
    let mut rows: Vec<DamageShare> = table
        .iter()
        .filter(|(_, damage)| **damage > 0.0)
        .map(|(spell, damage)| DamageShare {
            spell: spell.clone(),
            damage: *damage,
            share: if total > 0.0 { damage / total } else { 0.0 },
        })
        .collect();
    rows.sort_by(|a, b| b.damage.total_cmp(&a.damage));
    rows
}

/// Drives one character through simulated time. Owns the character and
/// its random source outright.
pub struct Simulation {
    character: Character,
    config: SimulationConfig,
    dice: Dice,
    time: f64,
    total_damage: f64,
    damage_table: IndexMap<String, f64>,
    casts: u32,
    crits: u32,
    timer_clamps: u32,
    trace: Vec<String>,
}

impl Simulation {
    pub fn new(character: Character, config: SimulationConfig) -> Result<Self, SimError> {
        let dice = Dice::from_seed(config.seed);
        Self::with_dice(character, config, dice)
    }

    /// Like `new`, but with an explicit random source.
    pub fn with_dice(
        character: Character,
        config: SimulationConfig,
        dice: Dice,
    ) -> Result<Self, SimError> {
        config.validate()?;
        if character.rotation().is_empty() {
            return Err(SimError::InvalidSimulation {
                reason: "rotation is empty".to_string(),
            });
        }
        for entry in character.rotation() {
            let ctx = EvalContext::new(&character).with_spell(character.spell(entry.spell));
            check_paths(&entry.conditions, &ctx)?;
        }
        Ok(Self {
            character,
            config,
            dice,
            time: 0.0,
            total_damage: 0.0,
            damage_table: IndexMap::new(),
            casts: 0,
            crits: 0,
            timer_clamps: 0,
            trace: Vec::new(),
        })
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn into_character(self) -> Character {
        self.character
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Run until the configured duration. The timeline is consumed: a
    /// second call returns the same totals without simulating further.
    pub fn run(&mut self) -> Result<RunResult, SimError> {
        let duration = self.config.duration;
        self.log(format!(
            "[START] {} vs {} enemies for {}s",
            self.character.name, self.config.enemy_count, duration
        ));

        while self.time < duration - TIME_EPSILON {
            self.check_timers()?;
            match self.choose()? {
                Some(id) => self.cast(id),
                None => self.idle(),
            }
        }

        let dps = self.total_damage / duration;
        self.log(format!(
            "[END] t={:.3} damage={:.2} dps={:.2} casts={} crits={}",
            self.time, self.total_damage, dps, self.casts, self.crits
        ));
        debug!(dps, casts = self.casts, crits = self.crits, "run finished");

        Ok(RunResult {
            dps,
            total_damage: self.total_damage,
            duration,
            casts: self.casts,
            crits: self.crits,
            damage_table: self.damage_table.clone(),
            timer_clamps: self.timer_clamps,
            trace: self.trace.clone(),
        })
    }

    /// First rotation entry whose spell is ready and whose conditions hold.
    fn choose(&self) -> Result<Option<SpellId>, SimError> {
        let character = &self.character;
        for entry in character.rotation() {
            let spell = character.spell(entry.spell);
            if !spell.is_ready(character, self.config.enemy_count) {
                continue;
            }
            let ctx = EvalContext::new(character).with_spell(spell);
            if evaluate_all(&entry.conditions, &ctx)? {
                return Ok(Some(entry.spell));
            }
        }
        Ok(None)
    }

    fn cast(&mut self, id: SpellId) {
        let start = self.time;
        let spell = self.character.spell(id);
        let name = spell.name.clone();

        if spell.channeled {
            self.casts += 1;
            let channel = spell.channel_duration(&self.character);
            let ticks = spell.ticks;
            self.log(format!(
                "[CHANNEL][{}] t={:.3} for {:.3}s over {} ticks",
                name, start, channel, ticks
            ));
            let spell = self.character.spell_mut(id);
            spell.start_channel(start, channel);
            spell.set_cooldown();
            self.character.run_cast_hook(id, &mut self.dice);
            self.advance(channel.max(self.config.min_step));
            return;
        }

        let cast_time = spell.effective_cast_time(&self.character);
        self.log(format!(
            "[CAST][{}] t={:.3} cast_time={:.3}",
            name, start, cast_time
        ));
        self.character.spell_mut(id).begin_cast(start + cast_time);
        self.advance(cast_time);
        self.character.spell_mut(id).finish_cast();

        if start + cast_time > self.config.duration + TIME_EPSILON {
            self.log(format!("[CUT][{}] cast does not finish in time", name));
            return;
        }
        self.complete_cast(id);
        if cast_time < self.config.min_step {
            self.advance(self.config.min_step - cast_time);
        }
    }

    fn complete_cast(&mut self, id: SpellId) {
        let now = self.time;
        self.casts += 1;
        let spell = self.character.spell(id);
        let (name, is_buff, is_debuff) = (spell.name.clone(), spell.is_buff, spell.is_debuff);

        if spell.damage_percent > 0.0 && !(spell.is_debuff && spell.do_debuff_damage) {
            let raw = spell.damage(&self.character);
            self.deal(id, raw, "HIT");
        }

        let spell = self.character.spell_mut(id);
        if is_buff || is_debuff {
            spell.apply_debuff(now);
        }
        spell.set_cooldown();

        if is_buff {
            self.character.register_buff(id);
            self.log(format!("[BUFF][{}] up at t={:.3}", name, now));
        } else if is_debuff {
            self.log(format!("[DEBUFF][{}] applied at t={:.3}", name, now));
        }
        self.character.run_cast_hook(id, &mut self.dice);
    }

    fn deal(&mut self, id: SpellId, raw: f64, kind: &str) {
        let crit = self.roll_crit();
        let amount = if crit { raw * CRIT_MULTIPLIER } else { raw };
        if crit {
            self.crits += 1;
        }
        let name = self.character.spell(id).name.clone();
        self.total_damage += amount;
        *self.damage_table.entry(name.clone()).or_insert(0.0) += amount;
        self.character.record_damage(id, amount);
        self.log(format!(
            "[{}][{}] t={:.3} {:.2}{}",
            kind,
            name,
            self.time,
            amount,
            if crit { " CRIT!" } else { "" }
        ));
    }

    fn roll_crit(&mut self) -> bool {
        if self.config.deterministic {
            return false;
        }
        let chance = self.character.crit_chance();
        self.dice.chance(chance)
    }

    /// Move the clock forward by `dt` (never past the duration), resolving
    /// every tick scheduled inside the window in time order.
    fn advance(&mut self, dt: f64) {
        let target = (self.time + dt).min(self.config.duration);
        while let Some((at, id)) = self.character.next_tick() {
            if at > target + TIME_EPSILON {
                break;
            }
            let at = at.clamp(self.time, target);
            self.elapse(at - self.time);
            self.time = at;
            let raw = self.character.spell(id).tick_damage(&self.character);
            self.deal(id, raw, "TICK");
            self.character.run_tick_hook(id, &mut self.dice);
        }
        self.elapse(target - self.time);
        self.time = target;
    }

    fn elapse(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        self.character.advance_timers(dt);
        for name in self.character.expire_buffs() {
            self.log(format!("[BUFF][{}] fades at t={:.3}", name, self.time + dt));
        }
    }

    /// Nothing castable: wait for the next cooldown, debuff or tick boundary.
    fn idle(&mut self) {
        let now = self.time;
        let next_tick = self.character.next_tick().map(|(at, _)| at - now);
        let step = [self.character.next_timer_expiry(), next_tick]
            .into_iter()
            .flatten()
            .filter(|d| *d > TIME_EPSILON)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(self.config.min_step);
        self.log(format!("[IDLE] t={:.3} waiting {:.3}s", now, step));
        self.advance(step);
    }

    fn check_timers(&mut self) -> Result<(), SimError> {
        for (spell, violation) in self.character.sanitize_timers() {
            self.timer_clamps += 1;
            warn!(
                spell = %spell,
                timer = violation.timer,
                value = violation.value,
                "negative timer clamped"
            );
            if self.config.strict_invariants {
                return Err(SimError::StateInvariant {
                    spell,
                    timer: violation.timer,
                    value: violation.value,
                });
            }
        }
        Ok(())
    }

    fn log(&mut self, line: String) {
        if self.config.debug {
            debug!("{}", line);
            self.trace.push(line);
        }
    }
}
