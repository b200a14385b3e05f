use serde_json::Value;
use std::collections::BTreeMap;

use super::Variables;

/// Literal `{"level": value}` lookup table, the closed-form fallback
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormulaTable {
    entries: BTreeMap<i64, f64>,
}

impl FormulaTable {
    /// Parse a JSON object with integer keys. Returns `None` when the text is
    /// not a table literal.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            return None;
        }

        let object: serde_json::Map<String, Value> = serde_json::from_str(trimmed).ok()?;
        let mut entries = BTreeMap::new();
        for (key, value) in object {
            let key = key.trim().parse::<i64>().ok()?;
            let value = match value {
                Value::Number(n) => n.as_f64()?,
                Value::String(s) => s.trim().parse::<f64>().ok()?,
                _ => return None,
            };
            entries.insert(key, value);
        }
        Some(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of the greatest key not exceeding `input`, or of the smallest key
    /// when `input` is below every key
    pub fn lookup(&self, input: f64) -> Option<f64> {
        let key = input.round() as i64;
        self.entries
            .range(..=key)
            .next_back()
            .or_else(|| self.entries.iter().next())
            .map(|(_, value)| *value)
    }

    /// Evaluate against `x`, falling back to `level`
    pub fn evaluate(&self, vars: &Variables) -> Option<f64> {
        let input = vars.get("x").or_else(|| vars.get("level"))?;
        self.lookup(*input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_steps() {
        let table = FormulaTable::parse(r#"{"1": 5, "10": 12.5, "20": 30}"#).unwrap();
        assert_eq!(table.lookup(0.0), Some(5.0));
        assert_eq!(table.lookup(1.0), Some(5.0));
        assert_eq!(table.lookup(9.0), Some(5.0));
        assert_eq!(table.lookup(10.0), Some(12.5));
        assert_eq!(table.lookup(99.0), Some(30.0));
    }

    #[test]
    fn test_not_a_table() {
        assert!(FormulaTable::parse("x * 2").is_none());
        assert!(FormulaTable::parse(r#"{"a": 1}"#).is_none());
        assert!(FormulaTable::parse("{}").unwrap().is_empty());
    }
}
