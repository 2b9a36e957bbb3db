use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use super::{Action, Condition, SimFellConfiguration};
use crate::error::ConfigError;

const FIELDS: [&str; 12] = [
    "name",
    "hero",
    "intellect",
    "crit",
    "expertise",
    "haste",
    "spirit",
    "talents",
    "trinket1",
    "trinket2",
    "duration",
    "enemies",
];

pub fn parse_path(path: impl AsRef<Path>) -> Result<SimFellConfiguration, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_document(&text)
}

/// Parse a whole document. Any malformed line aborts; nothing partial is
/// returned.
pub fn parse_document(text: &str) -> Result<SimFellConfiguration, ConfigError> {
    let mut fields: IndexMap<&'static str, String> = IndexMap::new();
    let mut actions = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::MissingEquals {
                line_no,
                line: line.to_string(),
            })?;
        let key = key.trim();
        let value = value.trim();

        if key.starts_with("action") {
            let parsed = parse_action_list(line_no, value)?;
            debug!(line_no, count = parsed.len(), "actions");
            actions.extend(parsed);
            continue;
        }

        let field = FIELDS
            .iter()
            .copied()
            .find(|f| *f == key)
            .ok_or_else(|| ConfigError::UnknownField {
                line_no,
                field: key.to_string(),
            })?;
        fields.insert(field, value.to_string());
    }

    let mut take = |field: &'static str| {
        fields
            .swap_remove(field)
            .ok_or(ConfigError::MissingField { field })
    };

    let name = take("name")?;
    let hero = take("hero")?;
    let intellect = points_field("intellect", &take("intellect")?)?;
    let crit = points_field("crit", &take("crit")?)?;
    let expertise = points_field("expertise", &take("expertise")?)?;
    let haste = points_field("haste", &take("haste")?)?;
    let spirit = points_field("spirit", &take("spirit")?)?;
    let talents = take("talents")?;
    let trinket1 = take("trinket1")?;
    let trinket2 = take("trinket2")?;
    let duration = positive_field("duration", &take("duration")?)?;
    let enemies = positive_field("enemies", &take("enemies")?)?;

    if actions.is_empty() {
        return Err(ConfigError::MissingField { field: "actions" });
    }

    Ok(SimFellConfiguration {
        name,
        hero,
        intellect,
        crit,
        expertise,
        haste,
        spirit,
        talents,
        trinket1,
        trinket2,
        duration,
        enemies,
        actions,
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// `/frost_bolt,if=character.haste > 20/cold_snap` -> two actions.
fn parse_action_list(line_no: usize, value: &str) -> Result<Vec<Action>, ConfigError> {
    let entries: Vec<&str> = value
        .split('/')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    if entries.is_empty() {
        return Err(ConfigError::MalformedAction {
            line_no,
            entry: value.to_string(),
        });
    }
    entries
        .into_iter()
        .map(|entry| parse_action(line_no, entry))
        .collect()
}

fn parse_action(line_no: usize, entry: &str) -> Result<Action, ConfigError> {
    let malformed = || ConfigError::MalformedAction {
        line_no,
        entry: entry.to_string(),
    };

    let (name, conditions) = match entry.split_once(',') {
        Some((name, rest)) => {
            let cond_text = rest.trim().strip_prefix("if=").ok_or_else(malformed)?;
            let conditions = cond_text
                .split(" and ")
                .map(|c| {
                    c.parse::<Condition>()
                        .map_err(|source| ConfigError::Condition { line_no, source })
                })
                .collect::<Result<Vec<_>, _>>()?;
            (name.trim(), conditions)
        }
        None => (entry, Vec::new()),
    };

    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(malformed());
    }

    Ok(Action {
        name: name.to_string(),
        conditions,
    })
}

fn points_field(field: &'static str, value: &str) -> Result<u32, ConfigError> {
    let n: i64 = value.parse().map_err(|_| ConfigError::InvalidField {
        field,
        value: value.to_string(),
    })?;
    if n < 0 {
        return Err(ConfigError::NegativePoints { stat: field, value: n });
    }
    u32::try_from(n).map_err(|_| ConfigError::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn positive_field(field: &'static str, value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidField {
            field,
            value: value.to_string(),
        }),
    }
}
