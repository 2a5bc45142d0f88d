use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::trace;

use crate::column::{Column, ColumnClass};
use crate::row::RawRow;

/// Typed value of one decoded field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Long(i64),
    Int(i32),
    Null,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Long(value) => Some(*value),
            FieldValue::Int(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// Field name → typed value, in source column order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl DecodedRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for DecodedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Decode one row. Never fails: a cell that cannot be coerced to its column's class becomes
/// [`FieldValue::Null`] and the remaining cells are still decoded.
pub fn decode(row: RawRow) -> DecodedRecord {
    let fields = row
        .into_iter()
        .map(|(name, raw)| {
            let decoded = match Column::from_name(&name).class() {
                ColumnClass::Text => raw.to_text().map(FieldValue::Text),
                ColumnClass::Timestamp => raw.to_long().map(FieldValue::Long),
                ColumnClass::Integer => raw.to_int().map(FieldValue::Int),
            };
            let value = match decoded {
                Some(value) => value,
                None => {
                    if !raw.is_null() {
                        trace!(target = "record-query", column = %name, ?raw, "cell not coercible; decoded as null");
                    }
                    FieldValue::Null
                }
            };
            (name, value)
        })
        .collect();
    DecodedRecord { fields }
}
