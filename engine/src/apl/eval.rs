use super::{Condition, Literal, Operator};
use crate::character::Character;
use crate::error::ResolutionError;
use crate::spell::Spell;

/// Typed value of a resolved attribute path.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

/// What a condition can see at decision time.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub character: &'a Character,
    pub spell: Option<&'a Spell>,
}

impl<'a> EvalContext<'a> {
    pub fn new(character: &'a Character) -> Self {
        Self {
            character,
            spell: None,
        }
    }

    pub fn with_spell(mut self, spell: &'a Spell) -> Self {
        self.spell = Some(spell);
        self
    }
}

/// Resolve a dotted path against the registered attributes of its namespace.
pub fn resolve(path: &str, ctx: &EvalContext<'_>) -> Result<AttrValue, ResolutionError> {
    if let Some(key) = path.strip_prefix("character.") {
        return resolve_character(path, key, ctx.character);
    }
    if let Some(key) = path.strip_prefix("spell.") {
        let spell = ctx.spell.ok_or_else(|| ResolutionError::NoSpellInScope {
            path: path.to_string(),
        })?;
        return resolve_spell(path, key, spell, ctx.character);
    }
    Err(ResolutionError::UnknownNamespace {
        path: path.to_string(),
    })
}

fn resolve_character(
    path: &str,
    key: &str,
    character: &Character,
) -> Result<AttrValue, ResolutionError> {
    use AttrValue::*;

    let derived = character.stats().derived();
    let points = character.stats().points();
    let value = match key {
        "intellect" => Number(derived.intellect),
        "crit" => Number(derived.crit),
        "expertise" => Number(derived.expertise),
        "haste" => Number(derived.haste),
        "spirit" => Number(derived.spirit),
        "intellect_points" => Number(points.intellect as f64),
        "crit_points" => Number(points.crit as f64),
        "expertise_points" => Number(points.expertise as f64),
        "haste_points" => Number(points.haste as f64),
        "spirit_points" => Number(points.spirit as f64),
        "total_haste" => Number(character.total_haste()),
        "damage_multiplier" => Number(character.damage_multiplier()),
        "hero" => Text(character.hero().name().to_string()),
        _ => {
            if let Some(name) = key.strip_prefix("buff.") {
                return resolve_buff(path, name, character);
            }
            if let Some(name) = key.strip_prefix("talent.") {
                if character.catalog().talent_by_name(name).is_none() {
                    return Err(ResolutionError::UnknownPath {
                        path: path.to_string(),
                    });
                }
                return Ok(Flag(character.has_talent(name)));
            }
            match character.hero().attribute(key) {
                Some(v) => Number(v),
                None => {
                    return Err(ResolutionError::UnknownPath {
                        path: path.to_string(),
                    });
                }
            }
        }
    };
    Ok(value)
}

/// `buff.<name>` is whether the buff is up, `buff.<name>.remaining` its
/// remaining duration. Unknown buff names are an error, inactive ones are not.
fn resolve_buff(
    path: &str,
    rest: &str,
    character: &Character,
) -> Result<AttrValue, ResolutionError> {
    let (name, field) = match rest.split_once('.') {
        Some((name, field)) => (name, Some(field)),
        None => (rest, None),
    };
    let spell = character
        .spell_by_name(name)
        .map(|id| character.spell(id))
        .filter(|s| s.is_buff)
        .ok_or_else(|| ResolutionError::UnknownPath {
            path: path.to_string(),
        })?;
    let active = character.is_buff_active(name);
    match field {
        None => Ok(AttrValue::Flag(active)),
        Some("remaining") => Ok(AttrValue::Number(if active {
            spell.remaining_debuff_duration()
        } else {
            0.0
        })),
        Some(_) => Err(ResolutionError::UnknownPath {
            path: path.to_string(),
        }),
    }
}

fn resolve_spell(
    path: &str,
    key: &str,
    spell: &Spell,
    character: &Character,
) -> Result<AttrValue, ResolutionError> {
    use AttrValue::*;

    let value = match key {
        "name" => Text(spell.name.clone()),
        "cooldown" => Number(spell.cooldown),
        "remaining_cooldown" => Number(spell.remaining_cooldown()),
        "cast_time" => Number(spell.effective_cast_time(character)),
        "base_cast_time" => Number(spell.base_cast_time),
        "damage_percent" => Number(spell.damage_percent),
        "damage" => Number(spell.damage(character)),
        "hits" => Number(spell.hits as f64),
        "ticks" => Number(spell.ticks as f64),
        "ticks_remaining" => Number(spell.ticks_remaining() as f64),
        "debuff_duration" => Number(spell.debuff_duration),
        "remaining_debuff_duration" => Number(spell.remaining_debuff_duration()),
        "total_damage_dealt" => Number(spell.total_damage_dealt),
        "min_target_count" => Number(spell.min_target_count as f64),
        "max_target_count" => Number(spell.max_target_count as f64),
        "channeled" => Flag(spell.channeled),
        "is_debuff" => Flag(spell.is_debuff),
        "is_buff" => Flag(spell.is_buff),
        "debuff_active" => Flag(spell.is_debuff_active()),
        _ => {
            return Err(ResolutionError::UnknownPath {
                path: path.to_string(),
            });
        }
    };
    Ok(value)
}

/// Resolve the left side, coerce the literal to its type, compare.
pub fn evaluate(condition: &Condition, ctx: &EvalContext<'_>) -> Result<bool, ResolutionError> {
    let path = condition.left.as_str();
    let op = condition.operator;
    let mismatch = |expected: &'static str| ResolutionError::TypeMismatch {
        path: path.to_string(),
        expected,
        literal: condition.right.to_string(),
    };

    match resolve(path, ctx)? {
        AttrValue::Number(actual) => {
            let wanted = match &condition.right {
                Literal::Number(n) => *n,
                Literal::Text(s) => s.trim().parse::<f64>().map_err(|_| mismatch("numeric"))?,
            };
            Ok(op.compare(&actual, &wanted))
        }
        AttrValue::Flag(actual) => {
            require_equality(path, op)?;
            let wanted = match &condition.right {
                Literal::Number(n) if *n == 0.0 => false,
                Literal::Number(n) if *n == 1.0 => true,
                Literal::Text(s) if s.eq_ignore_ascii_case("true") => true,
                Literal::Text(s) if s.eq_ignore_ascii_case("false") => false,
                _ => return Err(mismatch("boolean")),
            };
            Ok(op.compare(&actual, &wanted))
        }
        AttrValue::Text(actual) => {
            require_equality(path, op)?;
            let wanted = condition.right.to_string();
            Ok(op.compare(actual.as_str(), wanted.as_str()))
        }
    }
}

/// Logical AND over all conditions. An empty list holds.
pub fn evaluate_all(conditions: &[Condition], ctx: &EvalContext<'_>) -> Result<bool, ResolutionError> {
    for condition in conditions {
        if !evaluate(condition, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn require_equality(path: &str, op: Operator) -> Result<(), ResolutionError> {
    if op.is_equality() {
        Ok(())
    } else {
        Err(ResolutionError::UnsupportedOperator {
            path: path.to_string(),
            op: op.to_string(),
        })
    }
}

/// Evaluate every condition without short-circuiting; fails on the first
/// unresolvable path.
pub fn check_paths(conditions: &[Condition], ctx: &EvalContext<'_>) -> Result<(), ResolutionError> {
    for condition in conditions {
        evaluate(condition, ctx)?;
    }
    Ok(())
}
