use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::spell::{SpellDef, SpellKind};
use crate::stats::{StatCoefficients, StatPoints};

/// Everything an archetype brings to the table: coefficients, spells,
/// talent tree and stat presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroCatalog {
    pub hero: String,
    pub coefficients: StatCoefficients,
    pub spells: Vec<SpellDef>,
    #[serde(default)]
    pub talents: Vec<TalentDef>,
    #[serde(default)]
    pub presets: IndexMap<String, StatPoints>,
    /// Priority order used when a document supplies no actions.
    #[serde(default)]
    pub default_rotation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentDef {
    pub name: String,
    /// `row.column`, e.g. `2.1`.
    pub id: String,
    #[serde(default)]
    pub effects: Vec<TalentEffect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum TalentEffect {
    ScaleDamage { spell: String, factor: f64 },
    AdjustCooldown { spell: String, seconds: f64 },
    AdjustCastTime { spell: String, seconds: f64 },
    AdjustOrbCost { spell: String, delta: i32 },
    AdjustTicks { spell: String, delta: i32 },
}

impl TalentEffect {
    pub fn spell(&self) -> &str {
        match self {
            TalentEffect::ScaleDamage { spell, .. }
            | TalentEffect::AdjustCooldown { spell, .. }
            | TalentEffect::AdjustCastTime { spell, .. }
            | TalentEffect::AdjustOrbCost { spell, .. }
            | TalentEffect::AdjustTicks { spell, .. } => spell,
        }
    }

    pub(crate) fn apply(&self, spell: &mut crate::spell::Spell) {
        match self {
            TalentEffect::ScaleDamage { factor, .. } => spell.damage_percent *= factor,
            TalentEffect::AdjustCooldown { seconds, .. } => {
                spell.cooldown = (spell.cooldown + seconds).max(0.0)
            }
            TalentEffect::AdjustCastTime { seconds, .. } => {
                spell.base_cast_time = (spell.base_cast_time + seconds).max(0.0)
            }
            TalentEffect::AdjustOrbCost { delta, .. } => {
                if let SpellKind::Rime(hooks) = &mut spell.kind {
                    hooks.orb_cost = hooks.orb_cost.saturating_add_signed(*delta);
                }
            }
            TalentEffect::AdjustTicks { delta, .. } => {
                spell.ticks = spell.ticks.saturating_add_signed(*delta).max(1)
            }
        }
    }
}

impl HeroCatalog {
    pub fn talent_by_name(&self, name: &str) -> Option<&TalentDef> {
        let wanted = crate::spell::simfell_name(name);
        self.talents
            .iter()
            .find(|t| crate::spell::simfell_name(&t.name) == wanted)
    }

    pub fn talent_by_id(&self, id: &str) -> Option<&TalentDef> {
        self.talents.iter().find(|t| t.id == id)
    }

    pub fn preset(&self, name: &str) -> Option<StatPoints> {
        self.presets
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }
}

pub fn builtin_catalogs() -> HashMap<&'static str, &'static str> {
    HashMap::from([("rime", include_str!("../content/rime.yaml"))])
}

pub fn parse_catalog(yaml: &str) -> Result<HeroCatalog, ConfigError> {
    let catalog: HeroCatalog = serde_yaml::from_str(yaml)?;
    for def in &catalog.spells {
        def.validate()?;
    }
    Ok(catalog)
}

pub fn builtin_catalog(hero: &str) -> Result<HeroCatalog, ConfigError> {
    let key = hero.trim().to_lowercase();
    let yaml = builtin_catalogs()
        .get(key.as_str())
        .copied()
        .ok_or_else(|| ConfigError::UnknownHero(hero.to_string()))?;
    parse_catalog(yaml)
}

pub fn load_catalog(path: &str) -> Result<HeroCatalog> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read catalog YAML: {}", path))?;
    let catalog = parse_catalog(&text)
        .with_context(|| format!("failed to parse catalog YAML: {}", path))?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rime_catalog_parses() {
        let catalog = builtin_catalog("Rime").unwrap();
        assert_eq!(catalog.hero, "rime");
        assert!(catalog.spells.iter().any(|s| s.name == "Frost Bolt"));
        assert!(catalog.talent_by_id("1.2").is_some());
        assert!(catalog.preset("default").is_some());
        for name in &catalog.default_rotation {
            assert!(
                catalog
                    .spells
                    .iter()
                    .any(|s| crate::spell::simfell_name(&s.name) == *name),
                "rotation entry {name} missing from catalog"
            );
        }
    }

    #[test]
    fn talent_effects_reference_known_spells() {
        let catalog = builtin_catalog("rime").unwrap();
        for talent in &catalog.talents {
            for effect in &talent.effects {
                assert!(
                    catalog
                        .spells
                        .iter()
                        .any(|s| crate::spell::simfell_name(&s.name) == effect.spell()),
                    "{} targets unknown spell {}",
                    talent.name,
                    effect.spell()
                );
            }
        }
    }

    const COEFFICIENTS: &str = "hero: rime
coefficients: { intellect: 1.0, crit: 0.1, expertise: 0.1, haste: 0.1, spirit: 0.1 }
";

    #[test]
    fn zero_tick_channel_is_rejected() {
        let yaml = format!(
            "{COEFFICIENTS}spells:\n  - {{ name: Torrent, damage_percent: 300, channeled: true, ticks: 0, debuff_duration: 2.5 }}\n"
        );
        match parse_catalog(&yaml) {
            Err(ConfigError::InvalidField { field, value }) => {
                assert_eq!(field, "ticks");
                assert_eq!(value, "Torrent: 0");
            }
            other => panic!("expected InvalidField, got {:?}", other),
        }
    }

    #[test]
    fn periodic_debuff_without_duration_is_rejected() {
        let yaml = format!(
            "{COEFFICIENTS}spells:\n  - {{ name: Swallows, damage_percent: 90, is_debuff: true, do_debuff_damage: true, ticks: 10 }}\n"
        );
        assert!(matches!(
            parse_catalog(&yaml),
            Err(ConfigError::InvalidField { field: "debuff_duration", .. })
        ));
    }

    #[test]
    fn negative_cooldown_is_rejected() {
        let yaml = format!("{COEFFICIENTS}spells:\n  - {{ name: Snap, cooldown: -8, damage_percent: 120 }}\n");
        assert!(matches!(
            parse_catalog(&yaml),
            Err(ConfigError::InvalidField { field: "cooldown", .. })
        ));
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        assert!(matches!(
            builtin_catalog("warlock"),
            Err(ConfigError::UnknownHero(_))
        ));
    }
}
