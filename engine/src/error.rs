use thiserror::Error;

use crate::apl::ConditionSyntax;

/// Malformed or incomplete action-priority documents and invalid builds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("line {line_no}: expected `key = value`, got `{line}`")]
    MissingEquals { line_no: usize, line: String },
    #[error("line {line_no}: malformed action entry `{entry}`")]
    MalformedAction { line_no: usize, entry: String },
    #[error("line {line_no}: bad condition: {source}")]
    Condition {
        line_no: usize,
        #[source]
        source: ConditionSyntax,
    },
    #[error("line {line_no}: unknown configuration field `{field}`")]
    UnknownField { line_no: usize, field: String },
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("field `{field}` has invalid value `{value}`")]
    InvalidField { field: &'static str, value: String },
    #[error("{stat} points must be non-negative (got {value})")]
    NegativePoints { stat: &'static str, value: i64 },
    #[error("unknown hero `{0}`")]
    UnknownHero(String),
    #[error("unknown spell `{0}`")]
    UnknownSpell(String),
    #[error("unknown talent `{0}`")]
    UnknownTalent(String),
    #[error("invalid catalog: {0}")]
    Catalog(#[from] serde_yaml::Error),
    #[error("failed to read `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A condition path that cannot be resolved against the live objects.
#[derive(Debug, Error, PartialEq)]
pub enum ResolutionError {
    #[error("unknown attribute path `{path}`")]
    UnknownPath { path: String },
    #[error("path `{path}` is not rooted at `character` or `spell`")]
    UnknownNamespace { path: String },
    #[error("`{path}` has no spell in scope")]
    NoSpellInScope { path: String },
    #[error("`{path}` expects a {expected} operand, got `{literal}`")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        literal: String,
    },
    #[error("operator `{op}` is not supported for `{path}`")]
    UnsupportedOperator { path: String, op: String },
}

/// Failures while running a simulation or a trial set.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("timer `{timer}` of `{spell}` observed at {value} before clamping")]
    StateInvariant {
        spell: String,
        timer: &'static str,
        value: f64,
    },
    #[error("invalid simulation: {reason}")]
    InvalidSimulation { reason: String },
}
