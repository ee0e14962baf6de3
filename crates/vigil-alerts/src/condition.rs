//! Condition evaluation: comparing a sampled value against a threshold.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AlertError, Result};

/// Comparison operators for alert conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// Greater than (>).
    #[serde(rename = ">")]
    GreaterThan,
    /// Greater than or equal (>=).
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    /// Less than (<).
    #[serde(rename = "<")]
    LessThan,
    /// Less than or equal (<=).
    #[serde(rename = "<=")]
    LessThanOrEqual,
    /// Equal (==).
    #[serde(rename = "==")]
    Equal,
    /// Not equal (!=).
    #[serde(rename = "!=")]
    NotEqual,
}

impl ComparisonOperator {
    /// All supported operators.
    pub const ALL: [Self; 6] = [
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::Equal,
        Self::NotEqual,
    ];

    /// Evaluates `value <op> threshold`.
    ///
    /// Equality is exact; thresholds for `==` and `!=` are expected to be
    /// values the metric actually reports (counts, flags, enum codes).
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::GreaterThanOrEqual => value >= threshold,
            Self::LessThan => value < threshold,
            Self::LessThanOrEqual => value <= threshold,
            Self::Equal => value == threshold,
            Self::NotEqual => value != threshold,
        }
    }

    /// Returns the operator as a string symbol.
    #[must_use]
    pub const fn as_symbol(&self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

impl FromStr for ComparisonOperator {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.as_symbol() == trimmed)
            .ok_or_else(|| AlertError::UnknownOperator {
                operator: s.to_string(),
            })
    }
}

/// Checks whether `value` satisfies `operator` against `threshold`.
///
/// The operator is given as configured text. An unrecognized operator is an
/// error, never a silent `false`: a misconfigured rule must not look like a
/// rule whose condition simply never holds.
///
/// # Errors
///
/// Returns [`AlertError::UnknownOperator`] if `operator` is not one of
/// `>`, `<`, `>=`, `<=`, `==`, `!=`.
pub fn check_condition(value: f64, operator: &str, threshold: f64) -> Result<bool> {
    let op: ComparisonOperator = operator.parse()?;
    Ok(op.evaluate(value, threshold))
}
