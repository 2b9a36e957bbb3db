use serde::Serialize;
use tracing::trace;

use crate::Dice;
use crate::error::ConfigError;
use crate::spell::{Spell, SpellKind};

pub const MAX_ANIMA: u32 = 10;
pub const MAX_WINTER_ORBS: u32 = 5;

/// Closed set of playable archetypes. Each variant owns the resources its
/// spells read and write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "hero", rename_all = "snake_case")]
pub enum Hero {
    Rime(RimeState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RimeState {
    pub anima: u32,
    pub winter_orbs: u32,
}

impl RimeState {
    /// Every `MAX_ANIMA` anima collapses into one winter orb.
    fn gain_anima(&mut self, amount: u32) {
        self.anima += amount;
        while self.anima >= MAX_ANIMA {
            self.anima -= MAX_ANIMA;
            self.gain_orbs(1);
        }
    }

    fn gain_orbs(&mut self, amount: u32) {
        self.winter_orbs = (self.winter_orbs + amount).min(MAX_WINTER_ORBS);
    }
}

impl Hero {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "rime" => Ok(Hero::Rime(RimeState::default())),
            _ => Err(ConfigError::UnknownHero(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Hero::Rime(_) => "rime",
        }
    }

    /// Archetype-specific readiness predicate.
    pub fn allows(&self, spell: &Spell) -> bool {
        match (self, spell.kind) {
            (Hero::Rime(state), SpellKind::Rime(hooks)) => state.winter_orbs >= hooks.orb_cost,
            _ => true,
        }
    }

    /// Resource bookkeeping for a resolved cast. Channels call this when
    /// they start.
    pub fn on_cast(&mut self, spell: &Spell, spirit: f64, dice: &mut Dice) {
        let Hero::Rime(state) = self;
        if let SpellKind::Rime(hooks) = spell.kind {
            state.winter_orbs = state.winter_orbs.saturating_sub(hooks.orb_cost);
            state.gain_orbs(hooks.orb_gain);
            // Channels and periodic debuffs generate anima per tick instead.
            if !(spell.channeled || spell.do_debuff_damage) {
                state.gain_anima(anima_with_spirit(hooks.anima_gain, spirit, dice));
            }
            trace!(spell = %spell.name, anima = state.anima, orbs = state.winter_orbs, "rime cast");
        }
    }

    pub fn on_tick(&mut self, spell: &Spell, spirit: f64, dice: &mut Dice) {
        let Hero::Rime(state) = self;
        if let SpellKind::Rime(hooks) = spell.kind {
            state.gain_anima(anima_with_spirit(hooks.anima_gain, spirit, dice));
        }
    }

    /// Archetype attributes visible to the condition language.
    pub fn attribute(&self, key: &str) -> Option<f64> {
        match (self, key) {
            (Hero::Rime(state), "anima") => Some(state.anima as f64),
            (Hero::Rime(state), "winter_orbs") => Some(state.winter_orbs as f64),
            _ => None,
        }
    }
}

/// Spirit is a percent chance for an anima-generating event to yield one more.
fn anima_with_spirit(base: u32, spirit: f64, dice: &mut Dice) -> u32 {
    if base == 0 {
        return 0;
    }
    if dice.chance(spirit) { base + 1 } else { base }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anima_overflow_becomes_orbs() {
        let mut state = RimeState::default();
        state.gain_anima(23);
        assert_eq!(state.anima, 3);
        assert_eq!(state.winter_orbs, 2);
    }

    #[test]
    fn orbs_cap_at_max() {
        let mut state = RimeState {
            anima: 0,
            winter_orbs: 4,
        };
        state.gain_orbs(3);
        assert_eq!(state.winter_orbs, MAX_WINTER_ORBS);
    }

    #[test]
    fn zero_spirit_never_consumes_a_roll() {
        let mut dice = Dice::from_scripted(vec![0.0]);
        assert_eq!(anima_with_spirit(2, 0.0, &mut dice), 2);
        assert_eq!(anima_with_spirit(2, 50.0, &mut dice), 3);
    }

    #[test]
    fn unknown_hero_is_rejected() {
        assert!(matches!(
            Hero::from_name("paladin"),
            Err(ConfigError::UnknownHero(_))
        ));
        assert_eq!(Hero::from_name(" Rime ").unwrap().name(), "rime");
    }
}
