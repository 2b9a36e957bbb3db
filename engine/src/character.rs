use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::Dice;
use crate::apl::{Action, Condition, SimFellConfiguration};
use crate::content::{HeroCatalog, builtin_catalog};
use crate::error::ConfigError;
use crate::hero::Hero;
use crate::spell::{Spell, SpellDef, SpellId, TimerViolation, simfell_name};
use crate::stats::{StatPoints, Stats};

/// One rotation slot: the spell to try and the conditions that must all hold.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationEntry {
    pub spell: SpellId,
    pub conditions: Vec<Condition>,
}

/// A hero build with its own spells. Cloning produces a fully independent
/// copy; only the immutable catalog is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub name: String,
    hero: Hero,
    stats: Stats,
    catalog: Arc<HeroCatalog>,
    spells: Vec<Spell>,
    spell_index: IndexMap<String, SpellId>,
    rotation: Vec<RotationEntry>,
    talents: IndexSet<String>,
    buffs: IndexMap<String, SpellId>,
}

impl Character {
    /// A character of a built-in archetype that knows its whole catalog.
    pub fn for_hero(hero: &str, points: StatPoints) -> Result<Self, ConfigError> {
        Self::with_catalog(builtin_catalog(hero)?, points)
    }

    pub fn with_catalog(catalog: HeroCatalog, points: StatPoints) -> Result<Self, ConfigError> {
        let hero = Hero::from_name(&catalog.hero)?;
        let mut character = Character {
            name: catalog.hero.clone(),
            hero,
            stats: Stats::new(points, catalog.coefficients),
            spells: Vec::with_capacity(catalog.spells.len()),
            spell_index: IndexMap::new(),
            rotation: Vec::new(),
            talents: IndexSet::new(),
            buffs: IndexMap::new(),
            catalog: Arc::new(catalog),
        };
        let defs = character.catalog.spells.clone();
        for def in defs {
            character.learn_spell(def)?;
        }
        Ok(character)
    }

    pub fn from_preset(hero: &str, preset: &str) -> Result<Self, ConfigError> {
        let catalog = builtin_catalog(hero)?;
        let points = catalog
            .preset(preset)
            .ok_or_else(|| ConfigError::InvalidField {
                field: "preset",
                value: preset.to_string(),
            })?;
        Self::with_catalog(catalog, points)
    }

    /// `intellect-crit-expertise-haste-spirit`, e.g. `100-120-80-90-40`.
    pub fn from_stat_string(hero: &str, stats: &str) -> Result<Self, ConfigError> {
        Self::for_hero(hero, parse_stat_string(stats)?)
    }

    /// Build the character a parsed document describes: stats, talents and
    /// the action list as its rotation.
    pub fn from_config(config: &SimFellConfiguration) -> Result<Self, ConfigError> {
        let mut character = Self::for_hero(&config.hero, config.points())?;
        character.name = config.name.clone();
        character.add_talents_from_string(&config.talents)?;
        character.set_rotation(&config.actions)?;
        for trinket in [&config.trinket1, &config.trinket2] {
            if !trinket.is_empty() {
                debug!(trinket = %trinket, "trinket has no modeled effect");
            }
        }
        Ok(character)
    }

    pub fn hero(&self) -> &Hero {
        &self.hero
    }

    pub fn catalog(&self) -> &HeroCatalog {
        &self.catalog
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn points(&self) -> StatPoints {
        self.stats.points()
    }

    pub fn update_stats(&mut self, intellect: u32, crit: u32, expertise: u32, haste: u32, spirit: u32) {
        self.set_points(StatPoints::new(intellect, crit, expertise, haste, spirit));
    }

    pub fn set_points(&mut self, points: StatPoints) {
        self.stats.update(points);
    }

    pub fn crit_chance(&self) -> f64 {
        self.stats.derived().crit
    }

    /// Learn (or replace) a spell; its identifier is the simfell name.
    pub fn learn_spell(&mut self, def: SpellDef) -> Result<SpellId, ConfigError> {
        def.validate()?;
        let key = simfell_name(&def.name);
        let spell = Spell::from(def);
        let id = match self.spell_index.get(&key) {
            Some(&id) => {
                self.spells[id.0] = spell;
                id
            }
            None => {
                let id = SpellId(self.spells.len());
                self.spells.push(spell);
                self.spell_index.insert(key, id);
                id
            }
        };
        Ok(id)
    }

    pub fn spell(&self, id: SpellId) -> &Spell {
        &self.spells[id.0]
    }

    pub(crate) fn spell_mut(&mut self, id: SpellId) -> &mut Spell {
        &mut self.spells[id.0]
    }

    pub fn spell_by_name(&self, name: &str) -> Option<SpellId> {
        self.spell_index.get(&simfell_name(name)).copied()
    }

    pub fn spells(&self) -> impl Iterator<Item = (SpellId, &Spell)> {
        self.spells.iter().enumerate().map(|(i, s)| (SpellId(i), s))
    }

    pub fn rotation(&self) -> &[RotationEntry] {
        &self.rotation
    }

    pub fn add_spell_to_rotation(&mut self, identifier: &str) -> Result<(), ConfigError> {
        let spell = self
            .spell_by_name(identifier)
            .ok_or_else(|| ConfigError::UnknownSpell(identifier.to_string()))?;
        self.rotation.push(RotationEntry {
            spell,
            conditions: Vec::new(),
        });
        Ok(())
    }

    pub fn add_action(&mut self, action: &Action) -> Result<(), ConfigError> {
        let spell = self
            .spell_by_name(&action.name)
            .ok_or_else(|| ConfigError::UnknownSpell(action.name.clone()))?;
        self.rotation.push(RotationEntry {
            spell,
            conditions: action.conditions.clone(),
        });
        Ok(())
    }

    /// Replace the rotation with the given actions, in order.
    pub fn set_rotation(&mut self, actions: &[Action]) -> Result<(), ConfigError> {
        self.rotation.clear();
        actions.iter().try_for_each(|a| self.add_action(a))
    }

    pub fn use_default_rotation(&mut self) -> Result<(), ConfigError> {
        self.rotation.clear();
        let names = self.catalog.default_rotation.clone();
        names.iter().try_for_each(|n| self.add_spell_to_rotation(n))
    }

    /// Acquire a talent by name and apply its effects immediately. Taking
    /// the same talent twice is a no-op.
    pub fn add_talent(&mut self, name: &str) -> Result<(), ConfigError> {
        let talent = self
            .catalog
            .talent_by_name(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownTalent(name.to_string()))?;
        if !self.talents.insert(simfell_name(&talent.name)) {
            return Ok(());
        }
        for effect in &talent.effects {
            let id = self
                .spell_by_name(effect.spell())
                .ok_or_else(|| ConfigError::UnknownSpell(effect.spell().to_string()))?;
            effect.apply(self.spell_mut(id));
        }
        debug!(talent = %talent.name, "talent applied");
        Ok(())
    }

    pub fn add_talent_by_id(&mut self, id: &str) -> Result<(), ConfigError> {
        let name = self
            .catalog
            .talent_by_id(id)
            .map(|t| t.name.clone())
            .ok_or_else(|| ConfigError::UnknownTalent(id.to_string()))?;
        self.add_talent(&name)
    }

    /// Talent tree string: one dash-separated group per row, one digit per
    /// chosen column. `2-12-3` picks 1.2, 2.1, 2.2 and 3.3.
    pub fn add_talents_from_string(&mut self, tree: &str) -> Result<(), ConfigError> {
        let tree = tree.trim();
        if tree.is_empty() {
            return Ok(());
        }
        for (row, group) in tree.split('-').enumerate() {
            for column in group.trim().chars() {
                if !column.is_ascii_digit() {
                    return Err(ConfigError::InvalidField {
                        field: "talents",
                        value: tree.to_string(),
                    });
                }
                self.add_talent_by_id(&format!("{}.{}", row + 1, column))?;
            }
        }
        Ok(())
    }

    pub fn has_talent(&self, name: &str) -> bool {
        self.talents.contains(&simfell_name(name))
    }

    pub fn talents(&self) -> impl Iterator<Item = &str> {
        self.talents.iter().map(String::as_str)
    }

    pub fn is_buff_active(&self, name: &str) -> bool {
        self.buffs
            .get(&simfell_name(name))
            .is_some_and(|&id| self.spell(id).is_debuff_active())
    }

    pub fn active_buffs(&self) -> impl Iterator<Item = &Spell> {
        self.buffs
            .values()
            .map(|&id| self.spell(id))
            .filter(|s| s.is_debuff_active())
    }

    /// Derived haste plus whatever active buffs add.
    pub fn total_haste(&self) -> f64 {
        self.stats.derived().haste + self.active_buffs().map(|s| s.buff.haste_bonus).sum::<f64>()
    }

    pub fn damage_multiplier(&self) -> f64 {
        self.active_buffs()
            .map(|s| 1.0 + s.buff.damage_bonus / 100.0)
            .product()
    }

    pub(crate) fn register_buff(&mut self, id: SpellId) {
        let key = simfell_name(&self.spell(id).name);
        self.buffs.insert(key, id);
    }

    /// Drop buffs whose duration ran out; returns their display names.
    pub(crate) fn expire_buffs(&mut self) -> Vec<String> {
        let spells = &self.spells;
        let mut expired = Vec::new();
        self.buffs.retain(|_, id| {
            let spell = &spells[id.0];
            let active = spell.is_debuff_active();
            if !active {
                expired.push(spell.name.clone());
            }
            active
        });
        expired
    }

    /// Age every spell's cooldown and debuff timer.
    pub fn advance_timers(&mut self, delta_time: f64) {
        for spell in &mut self.spells {
            spell.update_cooldown(delta_time);
            spell.update_remaining_debuff_duration(delta_time);
        }
    }

    /// Clamp negative timers on every spell; returns what was clamped.
    pub fn sanitize_timers(&mut self) -> Vec<(String, TimerViolation)> {
        self.spells
            .iter_mut()
            .filter_map(|s| s.sanitize_timers().map(|v| (s.name.clone(), v)))
            .collect()
    }

    /// Earliest pending tick across all spells.
    pub fn next_tick(&self) -> Option<(f64, SpellId)> {
        self.spells()
            .filter_map(|(id, s)| s.pending_tick().map(|t| (t, id)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    /// Smallest positive cooldown or debuff timer.
    pub fn next_timer_expiry(&self) -> Option<f64> {
        self.spells
            .iter()
            .flat_map(|s| [s.remaining_cooldown(), s.remaining_debuff_duration()])
            .filter(|t| *t > 0.0)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub(crate) fn run_cast_hook(&mut self, id: SpellId, dice: &mut Dice) {
        let spirit = self.stats.derived().spirit;
        self.hero.on_cast(&self.spells[id.0], spirit, dice);
    }

    /// Consume the spell's pending tick and let the hero react to it.
    pub(crate) fn run_tick_hook(&mut self, id: SpellId, dice: &mut Dice) {
        let spirit = self.stats.derived().spirit;
        self.spells[id.0].take_tick();
        self.hero.on_tick(&self.spells[id.0], spirit, dice);
    }

    pub(crate) fn record_damage(&mut self, id: SpellId, amount: f64) {
        self.spells[id.0].total_damage_dealt += amount;
    }
}

pub fn parse_stat_string(stats: &str) -> Result<StatPoints, ConfigError> {
    let invalid = || ConfigError::InvalidField {
        field: "custom_character",
        value: stats.to_string(),
    };
    let values = stats
        .split('-')
        .map(|part| part.trim().parse::<i64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    let &[intellect, crit, expertise, haste, spirit] = values.as_slice() else {
        return Err(invalid());
    };
    let names = ["intellect", "crit", "expertise", "haste", "spirit"];
    let mut points = [0u32; 5];
    for (slot, (value, stat)) in points
        .iter_mut()
        .zip([intellect, crit, expertise, haste, spirit].into_iter().zip(names))
    {
        if value < 0 {
            return Err(ConfigError::NegativePoints { stat, value });
        }
        *slot = u32::try_from(value).map_err(|_| invalid())?;
    }
    let [intellect, crit, expertise, haste, spirit] = points;
    Ok(StatPoints::new(intellect, crit, expertise, haste, spirit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_string_round_trips_into_points() {
        let p = parse_stat_string("100-120-80-90-40").unwrap();
        assert_eq!(p, StatPoints::new(100, 120, 80, 90, 40));
    }

    #[test]
    fn stat_string_rejects_wrong_shapes() {
        assert!(parse_stat_string("1-2-3").is_err());
        assert!(parse_stat_string("a-2-3-4-5").is_err());
    }
}
