//! Three-valued evaluation results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Outcome of evaluating an expression.
///
/// `NotLoaded` means the answer depends on an implementation that has not been
/// activated yet. It behaves like an unknown value: `False` still dominates a
/// conjunction and `True` still dominates a disjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationResult {
    /// The expression does not hold
    False,
    /// The expression holds
    True,
    /// The expression cannot be decided without activating an implementation
    NotLoaded,
}

impl EvaluationResult {
    /// Three-valued conjunction
    pub fn and(self, other: EvaluationResult) -> EvaluationResult {
        use EvaluationResult::*;
        match (self, other) {
            (False, _) | (_, False) => False,
            (NotLoaded, _) | (_, NotLoaded) => NotLoaded,
            (True, True) => True,
        }
    }

    /// Three-valued disjunction
    pub fn or(self, other: EvaluationResult) -> EvaluationResult {
        use EvaluationResult::*;
        match (self, other) {
            (True, _) | (_, True) => True,
            (NotLoaded, _) | (_, NotLoaded) => NotLoaded,
            (False, False) => False,
        }
    }

    /// Three-valued negation; `NotLoaded` stays `NotLoaded`
    pub fn negate(self) -> EvaluationResult {
        match self {
            EvaluationResult::False => EvaluationResult::True,
            EvaluationResult::True => EvaluationResult::False,
            EvaluationResult::NotLoaded => EvaluationResult::NotLoaded,
        }
    }

    /// Whether the result is definitely `True`
    pub fn is_true(self) -> bool {
        self == EvaluationResult::True
    }

    /// Whether the result could still be `True` once everything is loaded
    pub fn is_possible(self) -> bool {
        self != EvaluationResult::False
    }
}

impl From<bool> for EvaluationResult {
    fn from(value: bool) -> Self {
        if value {
            EvaluationResult::True
        } else {
            EvaluationResult::False
        }
    }
}

impl BitAnd for EvaluationResult {
    type Output = EvaluationResult;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for EvaluationResult {
    type Output = EvaluationResult;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl Not for EvaluationResult {
    type Output = EvaluationResult;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EvaluationResult::False => "false",
            EvaluationResult::True => "true",
            EvaluationResult::NotLoaded => "not_loaded",
        };
        f.write_str(s)
    }
}
