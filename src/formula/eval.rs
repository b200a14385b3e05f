use super::parse::{BinOp, Expr};
use super::Variables;

/// Evaluate a parsed expression. `None` on unresolved variables, division by
/// zero, unknown functions or non-finite intermediate results.
pub fn eval(expr: &Expr, vars: &Variables) -> Option<f64> {
    let value = match expr {
        Expr::Number(n) => *n,
        Expr::Var(name) => *vars.get(name)?,
        Expr::Neg(inner) => -eval(inner, vars)?,
        Expr::Coalesce(left, right) => match eval(left, vars) {
            Some(v) => v,
            None => eval(right, vars)?,
        },
        Expr::Binary(op, left, right) => {
            let l = eval(left, vars)?;
            let r = eval(right, vars)?;
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div if r == 0.0 => return None,
                BinOp::Div => l / r,
                BinOp::Rem if r == 0.0 => return None,
                BinOp::Rem => l % r,
                BinOp::Pow => l.powf(r),
            }
        }
        Expr::Call(name, args) => call(name, args, vars)?,
    };

    value.is_finite().then_some(value)
}

fn call(name: &str, args: &[Expr], vars: &Variables) -> Option<f64> {
    let values = args
        .iter()
        .map(|arg| eval(arg, vars))
        .collect::<Option<Vec<f64>>>()?;

    match (name, values.as_slice()) {
        ("pow", [base, exponent]) => Some(base.powf(*exponent)),
        ("sqrt", [v]) if *v >= 0.0 => Some(v.sqrt()),
        ("abs", [v]) => Some(v.abs()),
        ("floor", [v]) => Some(v.floor()),
        ("ceil", [v]) => Some(v.ceil()),
        ("round", [v]) => Some(v.round()),
        ("ln", [v]) if *v > 0.0 => Some(v.ln()),
        ("exp", [v]) => Some(v.exp()),
        ("min", [first, rest @ ..]) => Some(rest.iter().fold(*first, |acc, v| acc.min(*v))),
        ("max", [first, rest @ ..]) => Some(rest.iter().fold(*first, |acc, v| acc.max(*v))),
        _ => None,
    }
}
