use serde::{Deserialize, Serialize};

use crate::TIME_EPSILON;
use crate::character::Character;
use crate::error::ConfigError;

/// Stable index of a spell inside its character's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SpellId(pub(crate) usize);

impl SpellId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a buff spell does while it is active. Both values are percentages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BuffEffect {
    #[serde(default)]
    pub damage_bonus: f64,
    #[serde(default)]
    pub haste_bonus: f64,
}

/// Archetype-specific hooks a spell carries on top of the shared fields.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "archetype", rename_all = "snake_case")]
pub enum SpellKind {
    #[default]
    Generic,
    Rime(RimeHooks),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RimeHooks {
    /// Anima granted per cast, or per tick for channels and periodic debuffs.
    #[serde(default)]
    pub anima_gain: u32,
    #[serde(default)]
    pub orb_gain: u32,
    #[serde(default)]
    pub orb_cost: u32,
}

/// Catalog entry for a spell. `damage_percent` is written as a percentage
/// of the damage formula base (73 means 0.73).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDef {
    pub name: String,
    #[serde(default)]
    pub cast_time: f64,
    #[serde(default)]
    pub cooldown: f64,
    #[serde(default)]
    pub damage_percent: f64,
    #[serde(default = "default_hits")]
    pub hits: u32,
    #[serde(default)]
    pub channeled: bool,
    #[serde(default)]
    pub ticks: u32,
    #[serde(default)]
    pub is_debuff: bool,
    #[serde(default)]
    pub debuff_duration: f64,
    #[serde(default)]
    pub do_debuff_damage: bool,
    #[serde(default)]
    pub is_buff: bool,
    #[serde(default)]
    pub buff: BuffEffect,
    #[serde(default = "default_min_targets")]
    pub min_target_count: u32,
    #[serde(default = "default_max_targets")]
    pub max_target_count: u32,
    #[serde(default)]
    pub kind: SpellKind,
}

fn default_hits() -> u32 {
    1
}

fn default_min_targets() -> u32 {
    1
}

fn default_max_targets() -> u32 {
    1000
}

impl SpellDef {
    /// A single-hit, single-target instant with no cooldown and no damage.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cast_time: 0.0,
            cooldown: 0.0,
            damage_percent: 0.0,
            hits: default_hits(),
            channeled: false,
            ticks: 0,
            is_debuff: false,
            debuff_duration: 0.0,
            do_debuff_damage: false,
            is_buff: false,
            buff: BuffEffect::default(),
            min_target_count: default_min_targets(),
            max_target_count: default_max_targets(),
            kind: SpellKind::Generic,
        }
    }

    /// Reject definitions whose timers are negative or whose periodic
    /// damage could never land.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, value: &dyn std::fmt::Display| ConfigError::InvalidField {
            field,
            value: format!("{}: {}", self.name, value),
        };
        for (field, value) in [
            ("cast_time", self.cast_time),
            ("cooldown", self.cooldown),
            ("debuff_duration", self.debuff_duration),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, &value));
            }
        }
        let periodic = self.channeled || self.do_debuff_damage;
        if periodic && self.ticks == 0 {
            return Err(invalid("ticks", &self.ticks));
        }
        if periodic && self.debuff_duration <= 0.0 {
            return Err(invalid("debuff_duration", &self.debuff_duration));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SpellState {
    #[default]
    Idle,
    Casting { completes_at: f64 },
    Channeling { ends_at: f64 },
}

/// Evenly spaced ticks; the k-th tick lands at `started_at + k * interval`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct TickSchedule {
    started_at: f64,
    interval: f64,
    total: u32,
    done: u32,
}

impl TickSchedule {
    fn next_at(&self) -> Option<f64> {
        (self.done < self.total).then(|| self.started_at + self.interval * (self.done + 1) as f64)
    }
}

/// Which timer a sanity check caught below zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerViolation {
    pub timer: &'static str,
    pub value: f64,
}

/// Live state of one spell, owned by exactly one character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spell {
    pub name: String,
    pub base_cast_time: f64,
    pub cooldown: f64,
    /// Already normalized to a 0..1 multiplier.
    pub damage_percent: f64,
    pub hits: u32,
    pub channeled: bool,
    pub ticks: u32,
    pub next_tick_time: f64,
    pub is_debuff: bool,
    pub debuff_duration: f64,
    pub do_debuff_damage: bool,
    pub is_buff: bool,
    pub buff: BuffEffect,
    pub min_target_count: u32,
    pub max_target_count: u32,
    pub kind: SpellKind,
    pub total_damage_dealt: f64,
    remaining_cooldown: f64,
    remaining_debuff_duration: f64,
    state: SpellState,
    schedule: Option<TickSchedule>,
}

impl From<SpellDef> for Spell {
    fn from(def: SpellDef) -> Self {
        Self {
            name: def.name,
            base_cast_time: def.cast_time,
            cooldown: def.cooldown,
            damage_percent: def.damage_percent / 100.0,
            hits: def.hits,
            channeled: def.channeled,
            ticks: def.ticks,
            next_tick_time: 0.0,
            is_debuff: def.is_debuff,
            debuff_duration: def.debuff_duration,
            do_debuff_damage: def.do_debuff_damage,
            is_buff: def.is_buff,
            buff: def.buff,
            min_target_count: def.min_target_count,
            max_target_count: def.max_target_count,
            kind: def.kind,
            total_damage_dealt: 0.0,
            remaining_cooldown: 0.0,
            remaining_debuff_duration: 0.0,
            state: SpellState::Idle,
            schedule: None,
        }
    }
}

/// Lowercase identifier with spaces turned into underscores
/// (`Frost Bolt` -> `frost_bolt`).
pub fn simfell_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

impl Spell {
    pub fn simfell_name(&self) -> String {
        simfell_name(&self.name)
    }

    pub fn remaining_cooldown(&self) -> f64 {
        self.remaining_cooldown
    }

    pub fn remaining_debuff_duration(&self) -> f64 {
        self.remaining_debuff_duration
    }

    pub fn state(&self) -> SpellState {
        self.state
    }

    pub fn is_debuff_active(&self) -> bool {
        self.remaining_debuff_duration > 0.0
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.schedule.map_or(0, |s| s.total - s.done)
    }

    /// Time of the next pending tick, if any.
    pub fn pending_tick(&self) -> Option<f64> {
        self.schedule.and_then(|s| s.next_at())
    }

    /// Cast time after haste. Zero for instants.
    pub fn effective_cast_time(&self, character: &Character) -> f64 {
        self.base_cast_time / (1.0 + character.total_haste() / 100.0)
    }

    /// How long a channel keeps the caster busy; hasted like cast time.
    pub fn channel_duration(&self, character: &Character) -> f64 {
        self.debuff_duration / (1.0 + character.total_haste() / 100.0)
    }

    pub fn is_ready(&self, character: &Character, enemy_count: u32) -> bool {
        if self.remaining_cooldown > 0.0 || self.state != SpellState::Idle {
            return false;
        }
        if enemy_count < self.min_target_count || enemy_count > self.max_target_count {
            return false;
        }
        if self.is_debuff && self.do_debuff_damage && self.ticks_remaining() > 0 {
            return false;
        }
        character.hero().allows(self)
    }

    /// Damage of one full cast before any crit roll.
    pub fn damage(&self, character: &Character) -> f64 {
        let derived = character.stats().derived();
        self.damage_percent
            * derived.intellect
            * self.hits as f64
            * (1.0 + derived.expertise / 100.0)
            * character.damage_multiplier()
    }

    /// Share of `damage` delivered by a single tick.
    pub fn tick_damage(&self, character: &Character) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.damage(character) / self.ticks as f64
    }

    pub fn set_cooldown(&mut self) {
        self.remaining_cooldown = self.cooldown;
    }

    pub fn reset_cooldown(&mut self) {
        self.remaining_cooldown = 0.0;
    }

    pub fn update_cooldown(&mut self, delta_time: f64) {
        self.remaining_cooldown = clamp_timer(self.remaining_cooldown - delta_time);
    }

    pub fn update_remaining_debuff_duration(&mut self, delta_time: f64) {
        self.remaining_debuff_duration = clamp_timer(self.remaining_debuff_duration - delta_time);
    }

    /// Start (or refresh) the debuff. Damaging debuffs schedule their ticks
    /// over the unhasted duration starting at `now`.
    pub fn apply_debuff(&mut self, now: f64) {
        self.remaining_debuff_duration = self.debuff_duration;
        if self.do_debuff_damage {
            self.schedule = schedule(now, self.debuff_duration, self.ticks);
            self.sync_next_tick();
        }
    }

    pub(crate) fn begin_cast(&mut self, completes_at: f64) {
        self.state = SpellState::Casting { completes_at };
    }

    pub(crate) fn finish_cast(&mut self) {
        self.state = SpellState::Idle;
    }

    pub(crate) fn start_channel(&mut self, now: f64, duration: f64) {
        self.state = SpellState::Channeling {
            ends_at: now + duration,
        };
        self.schedule = schedule(now, duration, self.ticks);
        self.sync_next_tick();
        if self.schedule.is_none() {
            self.state = SpellState::Idle;
        }
    }

    /// Consume the pending tick. A channel whose ticks are exhausted ends.
    pub(crate) fn take_tick(&mut self) {
        if let Some(s) = self.schedule.as_mut() {
            s.done = (s.done + 1).min(s.total);
            if s.done == s.total {
                self.schedule = None;
                if matches!(self.state, SpellState::Channeling { .. }) {
                    self.state = SpellState::Idle;
                }
            }
        }
        self.sync_next_tick();
    }

    /// Clamp any timer that drifted below zero and report what was seen.
    pub fn sanitize_timers(&mut self) -> Option<TimerViolation> {
        let mut violation = None;
        if self.remaining_cooldown < 0.0 {
            violation = Some(TimerViolation {
                timer: "remaining_cooldown",
                value: self.remaining_cooldown,
            });
            self.remaining_cooldown = 0.0;
        }
        if self.remaining_debuff_duration < 0.0 {
            violation = Some(TimerViolation {
                timer: "remaining_debuff_duration",
                value: self.remaining_debuff_duration,
            });
            self.remaining_debuff_duration = 0.0;
        }
        violation
    }

    /// Overwrite both timers without clamping.
    #[cfg(test)]
    pub(crate) fn corrupt_timers(&mut self, cooldown: f64, debuff: f64) {
        self.remaining_cooldown = cooldown;
        self.remaining_debuff_duration = debuff;
    }

    fn sync_next_tick(&mut self) {
        if let Some(at) = self.pending_tick() {
            self.next_tick_time = at;
        }
    }
}

fn schedule(now: f64, duration: f64, ticks: u32) -> Option<TickSchedule> {
    (ticks > 0 && duration > 0.0).then(|| TickSchedule {
        started_at: now,
        interval: duration / ticks as f64,
        total: ticks,
        done: 0,
    })
}

fn clamp_timer(value: f64) -> f64 {
    if value < TIME_EPSILON { 0.0 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simfell_name_normalizes() {
        assert_eq!(simfell_name("Frost Bolt"), "frost_bolt");
        assert_eq!(simfell_name("  Ice Comet "), "ice_comet");
    }

    #[test]
    fn schedule_spreads_ticks_evenly() {
        let s = schedule(10.0, 3.0, 3).unwrap();
        assert_eq!(s.next_at(), Some(11.0));
        let last = TickSchedule { done: 2, ..s };
        assert_eq!(last.next_at(), Some(13.0));
        assert_eq!(TickSchedule { done: 3, ..s }.next_at(), None);
    }

    #[test]
    fn zero_ticks_never_schedule() {
        assert!(schedule(0.0, 2.0, 0).is_none());
        assert!(schedule(0.0, 0.0, 4).is_none());
    }

    #[test]
    fn drift_below_epsilon_clamps_to_zero() {
        assert_eq!(clamp_timer(1e-12), 0.0);
        assert_eq!(clamp_timer(-0.5), 0.0);
        assert_eq!(clamp_timer(0.25), 0.25);
    }
}
