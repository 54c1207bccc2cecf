//! Dice expression evaluator.
//!
//! DESIGN
//! ======
//! Grammar is `(\d+)?d(\d+)`, case-insensitive, matched against the whole
//! token. Parsing is permissive: anything outside the grammar degrades to a
//! single `1d20` roll instead of failing the submission, so
//! [`ParseFallbackError`] never reaches a user.
//!
//! Quirks kept on purpose:
//! - a count of `0` counts as omitted (one die);
//! - a zero-sided die (`d0`) yields exactly 1 per trial.

use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Chat prefix that turns a submission into a dice roll.
pub const ROLL_COMMAND: &str = "/roll";

/// Expression used when `/roll` has no argument, and for malformed input.
pub const DEFAULT_DICE: &str = "1d20";

/// Upper bound on dice per expression. Larger counts are out of grammar.
pub const MAX_DICE: u32 = 1000;

const FALLBACK: DiceExpr = DiceExpr { count: 1, sides: 20 };

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFallbackError {
    #[error("dice expression is empty")]
    Empty,
    #[error("dice expression `{0}` does not match NdX")]
    Malformed(String),
    #[error("dice count {0} exceeds the maximum of {MAX_DICE}")]
    TooManyDice(u64),
}

/// A parsed `NdX` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
}

/// Outcome of evaluating a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// Expression as the user typed it, even when it fell back.
    pub dice: String,
    pub result: u64,
}

impl FromStr for DiceExpr {
    type Err = ParseFallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseFallbackError::Empty);
        }
        let malformed = || ParseFallbackError::Malformed(s.to_owned());

        let Some(split) = s.find(['d', 'D']) else {
            return Err(malformed());
        };
        let (count_digits, rest) = s.split_at(split);
        let sides_digits = &rest[1..];

        if !count_digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if sides_digits.is_empty() || !sides_digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let count = if count_digits.is_empty() {
            1
        } else {
            let raw: u64 = count_digits.parse().map_err(|_| malformed())?;
            if raw > u64::from(MAX_DICE) {
                return Err(ParseFallbackError::TooManyDice(raw));
            }
            // Zero reads as "omitted".
            u32::try_from(raw).map_err(|_| malformed())?.max(1)
        };
        let sides: u32 = sides_digits.parse().map_err(|_| malformed())?;

        Ok(Self { count, sides })
    }
}

impl DiceExpr {
    /// Roll every die and sum the faces.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        (0..self.count)
            .map(|_| {
                if self.sides == 0 {
                    1
                } else {
                    u64::from(rng.random_range(1..=self.sides))
                }
            })
            .sum()
    }

    /// Inclusive `(min, max)` a roll of this expression can produce.
    #[must_use]
    pub fn bounds(&self) -> (u64, u64) {
        let count = u64::from(self.count);
        (count, count * u64::from(self.sides.max(1)))
    }
}

/// Inclusive result bounds for the `dice` string of a `dice_roll` action.
/// Malformed expressions carry the fallback `1d20` bounds.
#[must_use]
pub fn result_bounds(expression: &str) -> (u64, u64) {
    expression.parse::<DiceExpr>().unwrap_or(FALLBACK).bounds()
}

/// Extract the dice expression from a `/roll` submission.
///
/// Returns `None` when the first whitespace-separated token is not the roll
/// command, and the default expression when no argument follows it.
#[must_use]
pub fn roll_command_expression(input: &str) -> Option<&str> {
    let mut tokens = input.split_whitespace();
    if tokens.next()? != ROLL_COMMAND {
        return None;
    }
    Some(tokens.next().unwrap_or(DEFAULT_DICE))
}

/// Evaluate an expression with the thread-local generator.
#[must_use]
pub fn evaluate(expression: &str) -> DiceRoll {
    evaluate_with(expression, &mut rand::rng())
}

/// Evaluate an expression with a caller-supplied generator.
pub fn evaluate_with<R: Rng + ?Sized>(expression: &str, rng: &mut R) -> DiceRoll {
    let expr = expression.parse::<DiceExpr>().unwrap_or(FALLBACK);
    DiceRoll { dice: expression.to_owned(), result: expr.roll(rng) }
}

#[cfg(test)]
#[path = "dice_test.rs"]
mod tests;
