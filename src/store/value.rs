use serde_json::Value;

use super::schema::ColumnType;

/// A converted field value ready for binding
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Coerce a converted JSON value to the column's storage type.
    /// Values the column cannot hold become `Null`.
    pub fn from_json(value: &Value, col_type: ColumnType) -> Self {
        match (value, col_type) {
            (Value::Null, _) => SqlValue::Null,
            (_, ColumnType::Integer) => crate::convert::value_as_i64(value)
                .map(SqlValue::Integer)
                .unwrap_or(SqlValue::Null),
            (_, ColumnType::Real) => crate::convert::value_as_f64(value)
                .map(SqlValue::Real)
                .unwrap_or(SqlValue::Null),
            (Value::Bool(b), ColumnType::Boolean) => SqlValue::Integer(i64::from(*b)),
            (Value::Number(n), ColumnType::Boolean) => {
                SqlValue::Integer(i64::from(n.as_f64().is_some_and(|f| f != 0.0)))
            }
            (_, ColumnType::Boolean) => SqlValue::Null,
            (Value::String(s), ColumnType::Text | ColumnType::Json) => SqlValue::Text(s.clone()),
            (Value::Number(n), ColumnType::Text) => SqlValue::Text(n.to_string()),
            (Value::Bool(b), ColumnType::Text) => SqlValue::Text(b.to_string()),
            (other, _) => SqlValue::Text(other.to_string()),
        }
    }

    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}
