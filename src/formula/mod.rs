//! Arithmetic formulas with named variables.
//!
//! Formulas are stored as text on characteristic rows (limits, conversion
//! formulas) and produced by the curve fitter. Evaluation never fails loudly:
//! callers get `None` and apply their own fallback.

mod eval;
mod parse;
mod table;

pub use parse::{parse, BinOp, Expr};
pub use table::FormulaTable;

use std::collections::HashMap;

/// Variable bindings for evaluation
pub type Variables = HashMap<String, f64>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("empty formula")]
    Empty,
    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid number literal: {0}")]
    InvalidNumber(String),
    #[error("expected {expected} at token {pos}")]
    Expected { expected: String, pos: usize },
    #[error("unexpected input after token {0}")]
    TrailingInput(usize),
    #[error("formula nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Evaluate a formula or a lookup-table literal
pub fn evaluate(expression: &str, variables: &Variables) -> Option<f64> {
    if let Some(table) = FormulaTable::parse(expression) {
        return table.evaluate(variables);
    }
    let expr = parse(expression).ok()?;
    eval::eval(&expr, variables)
}

/// Parse a numeric literal, as stored in min/max columns
pub fn numeric_literal(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Build a [`Variables`] map from pairs
pub fn vars<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Variables {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
