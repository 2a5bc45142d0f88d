use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Untyped cell value as stored by the data source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn to_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Integer(value) => Some(value.to_string()),
            RawValue::Real(value) => Some(value.to_string()),
            RawValue::Text(value) => Some(value.clone()),
            RawValue::Blob(bytes) => String::from_utf8(bytes.clone()).ok(),
        }
    }

    pub fn to_long(&self) -> Option<i64> {
        match self {
            RawValue::Integer(value) => Some(*value),
            RawValue::Real(value) => {
                let truncated = value.trunc();
                if truncated.is_finite()
                    && truncated >= i64::MIN as f64
                    && truncated < i64::MAX as f64
                {
                    Some(truncated as i64)
                } else {
                    None
                }
            }
            RawValue::Text(value) => value.trim().parse().ok(),
            RawValue::Null | RawValue::Blob(_) => None,
        }
    }

    pub fn to_int(&self) -> Option<i32> {
        self.to_long().and_then(|value| i32::try_from(value).ok())
    }

    pub fn to_blob(&self) -> Option<Vec<u8>> {
        match self {
            RawValue::Blob(bytes) => Some(bytes.clone()),
            RawValue::Text(value) => Some(value.clone().into_bytes()),
            _ => None,
        }
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Integer(i64::from(value))
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// One result row; column set and order come from the data source.
///
/// Serializes as a map whose entries keep column order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, RawValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.cells.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Keep only the named columns, in projection order. Missing columns read as null.
    pub fn project(&self, projection: &[&str]) -> RawRow {
        let mut projected = RawRow::new();
        for column in projection {
            let value = self.get(column).cloned().unwrap_or(RawValue::Null);
            projected.push(*column, value);
        }
        projected
    }
}

impl IntoIterator for RawRow {
    type Item = (String, RawValue);
    type IntoIter = std::vec::IntoIter<(String, RawValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = RawRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column names to cell values")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<RawRow, M::Error> {
                let mut row = RawRow::new();
                while let Some((column, value)) = access.next_entry::<String, RawValue>()? {
                    row.push(column, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

impl FromIterator<(String, RawValue)> for RawRow {
    fn from_iter<T: IntoIterator<Item = (String, RawValue)>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}
