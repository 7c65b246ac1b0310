//! Tabular result types.
//!
//! A `ResultSet` is an ordered list of `ResultRow`s; each row keeps its columns
//! in projection order so that serialized JSON objects list keys the same way
//! the query selected them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Any integer width, widened to i64
    Int(i64),
    /// Any float width, widened to f64
    Float(f64),
    /// Text, and anything rendered as text (numeric, uuid, json)
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Timestamp without time zone
    Timestamp(NaiveDateTime),
    /// Timestamp with time zone, normalized to UTC
    TimestampTz(DateTime<Utc>),
    /// One-dimensional array, elements in storage order
    Array(Vec<ScalarValue>),
}

impl ScalarValue {
    /// Check if value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(v) => serializer.serialize_str(v),
            Self::Date(v) => serializer.collect_str(&v.format("%Y-%m-%d")),
            Self::Time(v) => serializer.collect_str(&v.format("%H:%M:%S%.f")),
            Self::Timestamp(v) => serializer.collect_str(&v.format("%Y-%m-%dT%H:%M:%S%.f")),
            Self::TimestampTz(v) => serializer.serialize_str(&v.to_rfc3339()),
            Self::Array(items) => serializer.collect_seq(items),
        }
    }
}

/// One result row: column name → value, in projection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, ScalarValue)>,
}

impl ResultRow {
    /// Create an empty row with room for `capacity` columns.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Pair column names with values positionally.
    ///
    /// Extra names or values beyond the shorter side are ignored.
    pub fn from_pairs<I, N>(names: I, values: Vec<ScalarValue>) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let mut row = Self::with_capacity(values.len());
        for (name, value) in names.into_iter().zip(values) {
            row.insert(name, value);
        }
        row
    }

    /// Insert a column value.
    ///
    /// A repeated column name keeps its first position and takes the new value,
    /// so keys stay unique within the row.
    pub fn insert(&mut self, name: impl Into<String>, value: ScalarValue) {
        let name = name.into();
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((name, value)),
        }
    }

    /// Look up a value by column name.
    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Column names in projection order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over `(name, value)` pairs in projection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Ordered rows in the order the database returned them.
pub type ResultSet = Vec<ResultRow>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_preserves_projection_order() {
        let row = ResultRow::from_pairs(
            ["zeta", "alpha", "mid"],
            vec![
                ScalarValue::Int(1),
                ScalarValue::Text("a".to_string()),
                ScalarValue::Null,
            ],
        );

        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);

        // serde_json::Map sorts keys, so compare the raw text
        let text = serde_json::to_string(&row).unwrap();
        assert_eq!(text, r#"{"zeta":1,"alpha":"a","mid":null}"#);
    }

    #[test]
    fn test_duplicate_column_keeps_first_position_last_value() {
        let row = ResultRow::from_pairs(
            ["id", "name", "id"],
            vec![
                ScalarValue::Int(1),
                ScalarValue::Text("probe".to_string()),
                ScalarValue::Int(2),
            ],
        );

        assert_eq!(row.len(), 2);
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(row.get("id"), Some(&ScalarValue::Int(2)));
    }

    #[test]
    fn test_scalar_serialization() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let ts = date.and_hms_opt(14, 5, 0).unwrap();
        let row = ResultRow::from_pairs(
            ["ok", "temp", "day", "seen_at", "logged_at"],
            vec![
                ScalarValue::Bool(true),
                ScalarValue::Float(21.5),
                ScalarValue::Date(date),
                ScalarValue::Timestamp(ts),
                ScalarValue::TimestampTz(ts.and_utc()),
            ],
        );

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(
            value,
            json!({
                "ok": true,
                "temp": 21.5,
                "day": "2024-03-09",
                "seen_at": "2024-03-09T14:05:00",
                "logged_at": "2024-03-09T14:05:00+00:00",
            })
        );
    }

    #[test]
    fn test_array_serializes_as_list() {
        let row = ResultRow::from_pairs(
            ["tags"],
            vec![ScalarValue::Array(vec![
                ScalarValue::Text("indoor".to_string()),
                ScalarValue::Null,
                ScalarValue::Int(3),
            ])],
        );
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({"tags": ["indoor", null, 3]})
        );
    }

    #[test]
    fn test_mismatched_lengths_truncate() {
        let row = ResultRow::from_pairs(["a", "b"], vec![ScalarValue::Int(1)]);
        assert_eq!(row.len(), 1);
        assert!(row.get("b").is_none());
    }
}
