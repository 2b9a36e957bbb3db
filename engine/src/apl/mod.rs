//! Action-priority-list documents: the parsed data model, the line parser
//! and the condition evaluator.

pub mod eval;
pub mod parser;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::StatPoints;

pub use eval::{AttrValue, EvalContext, check_paths, evaluate, evaluate_all, resolve};
pub use parser::{parse_document, parse_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(self, Operator::Eq | Operator::Ne)
    }

    pub fn compare<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        match self {
            Operator::Eq => left == right,
            Operator::Ne => left != right,
            Operator::Lt => left < right,
            Operator::Le => left <= right,
            Operator::Gt => left > right,
            Operator::Ge => left >= right,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = ConditionSyntax;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            other => Err(ConditionSyntax::UnknownOperator(other.to_string())),
        }
    }
}

/// Right-hand operand, kept exactly as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    fn parse(raw: &str) -> Literal {
        if let Ok(n) = raw.parse::<f64>() {
            return Literal::Number(n);
        }
        let unquoted = raw
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
            .unwrap_or(raw);
        Literal::Text(unquoted.to_string())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionSyntax {
    #[error("`{0}` has no comparison operator")]
    MissingOperator(String),
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("`{0}` is missing its left operand")]
    MissingLeft(String),
    #[error("`{0}` is missing its right operand")]
    MissingRight(String),
    #[error("`{0}` must be rooted at `character.` or `spell.`")]
    BadNamespace(String),
}

/// `<left> <operator> <right>`, e.g. `character.haste > 20`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub left: String,
    pub operator: Operator,
    pub right: Literal,
}

impl Condition {
    pub fn new(left: impl Into<String>, operator: Operator, right: Literal) -> Self {
        Self {
            left: left.into(),
            operator,
            right,
        }
    }
}

impl FromStr for Condition {
    type Err = ConditionSyntax;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let start = text
            .find(['=', '!', '<', '>'])
            .ok_or_else(|| ConditionSyntax::MissingOperator(text.to_string()))?;
        let rest = &text[start..];
        let op_len = if rest[1..].starts_with('=') { 2 } else { 1 };
        let operator: Operator = rest[..op_len].parse()?;

        let left = text[..start].trim();
        let right = rest[op_len..].trim();
        if left.is_empty() {
            return Err(ConditionSyntax::MissingLeft(text.to_string()));
        }
        if right.is_empty() {
            return Err(ConditionSyntax::MissingRight(text.to_string()));
        }
        if !(left.starts_with("character.") || left.starts_with("spell.")) {
            return Err(ConditionSyntax::BadNamespace(left.to_string()));
        }

        Ok(Condition {
            left: left.to_string(),
            operator,
            right: Literal::parse(right),
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

/// A cast attempt guarded by zero or more AND-ed conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub conditions: Vec<Condition>,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.conditions.is_empty() {
            let joined = self
                .conditions
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" and ");
            write!(f, " [{}]", joined)?;
        }
        Ok(())
    }
}

/// Parsed action-priority-list document. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimFellConfiguration {
    pub name: String,
    pub hero: String,
    pub intellect: u32,
    pub crit: u32,
    pub expertise: u32,
    pub haste: u32,
    pub spirit: u32,
    pub talents: String,
    pub trinket1: String,
    pub trinket2: String,
    pub duration: u32,
    pub enemies: u32,
    pub actions: Vec<Action>,
}

impl SimFellConfiguration {
    pub fn points(&self) -> StatPoints {
        StatPoints::new(
            self.intellect,
            self.crit,
            self.expertise,
            self.haste,
            self.spirit,
        )
    }

    pub fn parsed_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
