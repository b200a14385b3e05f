use serde::Serialize;

use super::format_coefficient;

/// Exponents tried by the shifted-power grid search
pub const SHIFTED_POWER_EXPONENTS: [f64; 9] = [0.30, 0.40, 0.50, 0.60, 0.70, 0.80, 1.00, 1.20, 1.50];

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitModel {
    Linear,
    Power,
    ShiftedPower,
}

/// One fitted model family
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionFit {
    pub model: FitModel,
    /// Formula text, evaluable by the formula engine with variable `x`
    pub formula: String,
    pub a: f64,
    pub b: f64,
    /// Shift, scale and exponent of the shifted-power model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f: Option<f64>,
    pub r_squared: f64,
}

/// Ordinary least squares slope and intercept
fn least_squares(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let (mut sx, mut sy, mut sxy, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for &(x, y) in points {
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
    }
    let denominator = n * sxx - sx * sx;
    if denominator.abs() < EPSILON {
        return None;
    }
    let a = (n * sxy - sx * sy) / denominator;
    let b = (sy - a * sx) / n;
    (a.is_finite() && b.is_finite()).then_some((a, b))
}

/// R² of predictions against observed values, `1.0` when all observations are equal
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    if observed.is_empty() {
        return 0.0;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_tot: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
    if ss_tot.abs() < EPSILON {
        return 1.0;
    }
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    (1.0 - ss_res / ss_tot).max(0.0)
}

/// `y = a·x + b`
pub fn fit_linear(pairs: &[(f64, f64)]) -> Option<RegressionFit> {
    let (a, b) = least_squares(pairs)?;
    let observed: Vec<f64> = pairs.iter().map(|(_, y)| *y).collect();
    let predicted: Vec<f64> = pairs.iter().map(|(x, _)| a * x + b).collect();

    Some(RegressionFit {
        model: FitModel::Linear,
        formula: format!("{} * x + {}", format_coefficient(a), format_coefficient(b)),
        a,
        b,
        c: None,
        e: None,
        f: None,
        r_squared: r_squared(&observed, &predicted),
    })
}

/// `y = a·x^b`, fitted in log space on strictly positive pairs
pub fn fit_power(pairs: &[(f64, f64)]) -> Option<RegressionFit> {
    let usable: Vec<(f64, f64)> = pairs
        .iter()
        .copied()
        .filter(|(x, y)| *x > 0.0 && *y > 0.0)
        .collect();
    let logs: Vec<(f64, f64)> = usable.iter().map(|(x, y)| (x.ln(), y.ln())).collect();
    let (b, ln_a) = least_squares(&logs)?;
    let a = ln_a.exp();
    if !a.is_finite() {
        return None;
    }

    let observed: Vec<f64> = usable.iter().map(|(_, y)| *y).collect();
    let predicted: Vec<f64> = usable.iter().map(|(x, _)| a * x.powf(b)).collect();

    Some(RegressionFit {
        model: FitModel::Power,
        formula: format!("{} * pow(x, {})", format_coefficient(a), format_coefficient(b)),
        a,
        b,
        c: None,
        e: None,
        f: None,
        r_squared: r_squared(&observed, &predicted),
    })
}

/// `y = a + b·((x−c)/e)^f` with `c = min x`, `e = range` and `f` grid-searched
pub fn fit_shifted_power(pairs: &[(f64, f64)]) -> Option<RegressionFit> {
    if pairs.len() < 3 {
        return None;
    }
    let min_x = pairs.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let max_x = pairs.iter().map(|(x, _)| *x).fold(f64::NEG_INFINITY, f64::max);
    let c = min_x;
    let e = if (max_x - min_x).abs() < EPSILON { 1.0 } else { max_x - min_x };

    let mut best: Option<RegressionFit> = None;
    for f in SHIFTED_POWER_EXPONENTS {
        let transformed: Vec<(f64, f64)> = pairs
            .iter()
            .filter_map(|(x, y)| {
                let base = (x - c) / e;
                (base >= 0.0).then(|| (base.powf(f), *y))
            })
            .collect();
        let Some((b, a)) = least_squares(&transformed) else {
            continue;
        };

        let observed: Vec<f64> = transformed.iter().map(|(_, y)| *y).collect();
        let predicted: Vec<f64> = transformed.iter().map(|(t, _)| a + b * t).collect();
        let score = r_squared(&observed, &predicted);

        if best.as_ref().map_or(true, |fit| score > fit.r_squared) {
            best = Some(RegressionFit {
                model: FitModel::ShiftedPower,
                formula: format!(
                    "{} + {} * pow((x-{})/{}, {})",
                    format_coefficient(a),
                    format_coefficient(b),
                    format_coefficient(c),
                    format_coefficient(e),
                    format_coefficient(f),
                ),
                a,
                b,
                c: Some(c),
                e: Some(e),
                f: Some(f),
                r_squared: score,
            });
        }
    }

    best
}
