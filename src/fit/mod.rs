//! Curve fitting of conversion formulas from paired samples.
//!
//! Three model families are fitted independently (linear, power, shifted
//! power); each may be absent when the data is insufficient or degenerate.
//! [`generate_table_from_pairs`] is the closed-form-free fallback.

mod regression;
mod samples;

pub use regression::*;
pub use samples::*;

use serde::Serialize;

/// Every fit computed for one sample set
#[derive(Debug, Clone, Default, Serialize)]
pub struct FitReport {
    pub linear: Option<RegressionFit>,
    pub power: Option<RegressionFit>,
    pub shifted_power: Option<RegressionFit>,
}

impl FitReport {
    /// Fit with the highest R². Ties go to the simpler model.
    pub fn best(&self) -> Option<&RegressionFit> {
        [&self.linear, &self.power, &self.shifted_power]
            .into_iter()
            .flatten()
            .fold(None, |best: Option<&RegressionFit>, fit| match best {
                Some(current) if current.r_squared >= fit.r_squared => Some(current),
                _ => Some(fit),
            })
    }
}

/// Run all three model families on the same pairs
pub fn fit_all(pairs: &[(f64, f64)]) -> FitReport {
    FitReport {
        linear: fit_linear(pairs),
        power: fit_power(pairs),
        shifted_power: fit_shifted_power(pairs),
    }
}

/// Render a coefficient with up to six decimals, trailing zeros trimmed
pub fn format_coefficient(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
