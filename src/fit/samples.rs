use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Level → value sample series, keyed by the level as written in the catalogue
pub type SampleSeries = BTreeMap<String, f64>;

/// Pairs built from two sample series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairedSamples {
    pub pairs: Vec<(f64, f64)>,
    /// Levels present in only one of the two series
    pub dropped: usize,
}

/// Zip two `level → value` series on matching level keys. Levels missing from
/// either side are dropped and counted.
pub fn pair_samples(source: &SampleSeries, target: &SampleSeries) -> PairedSamples {
    let mut pairs = Vec::new();
    let mut dropped = 0;

    for (level, x) in source {
        match target.get(level) {
            Some(y) => pairs.push((*x, *y)),
            None => dropped += 1,
        }
    }
    dropped += target.keys().filter(|level| !source.contains_key(*level)).count();

    if dropped > 0 {
        tracing::debug!(dropped, kept = pairs.len(), "sample levels without a counterpart");
    }

    PairedSamples { pairs, dropped }
}

/// Emit a literal lookup table keyed by `round(x)`. Last writer wins on
/// duplicate keys.
pub fn generate_table_from_pairs(pairs: &[(f64, f64)]) -> String {
    let mut table: BTreeMap<i64, f64> = BTreeMap::new();
    for &(x, y) in pairs {
        if x.is_finite() && y.is_finite() {
            table.insert(x.round() as i64, y);
        }
    }

    // written by hand to keep keys in numeric order
    let entries: Vec<String> = table
        .into_iter()
        .map(|(key, value)| format!("\"{}\":{}", key, table_value(value)))
        .collect();
    format!("{{{}}}", entries.join(","))
}

fn table_value(value: f64) -> Value {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-9 {
        Value::from(rounded as i64)
    } else {
        let value = (value * 10_000.0).round() / 10_000.0;
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(entries: &[(&str, f64)]) -> SampleSeries {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_pairing_drops_unmatched_levels() {
        let source = series(&[("1", 10.0), ("2", 20.0), ("5", 50.0)]);
        let target = series(&[("1", 1.0), ("2", 2.0), ("3", 3.0)]);
        let paired = pair_samples(&source, &target);
        assert_eq!(paired.pairs, vec![(10.0, 1.0), (20.0, 2.0)]);
        assert_eq!(paired.dropped, 2);
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(generate_table_from_pairs(&[]), "{}");
    }

    #[test]
    fn test_table_values() {
        let table = generate_table_from_pairs(&[(1.2, 3.0), (9.6, 2.123456), (10.4, 7.0)]);
        let parsed: Value = serde_json::from_str(&table).unwrap();
        assert_eq!(parsed["1"], Value::from(3));
        // 9.6 and 10.4 both round to 10: last writer wins
        assert_eq!(parsed["10"], Value::from(7));
        assert_eq!(parsed.as_object().unwrap().len(), 2);

        let table = generate_table_from_pairs(&[(2.0, 2.123456)]);
        assert_eq!(table, r#"{"2":2.1235}"#);
    }
}
