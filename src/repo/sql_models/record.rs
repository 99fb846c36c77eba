use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::{Column as _, Row, TypeInfo, ValueRef, sqlite::SqliteRow};

use crate::{query, repo};

/// A row returned by a projection: the selected column names with one value each.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<query::Value>,
}

impl Record {
    pub fn new(columns: Vec<String>, values: Vec<query::Value>) -> Self {
        Self { columns, values }
    }

    /// Returns the value of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&query::Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[query::Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<query::Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Converts a fetched row into a [`Record`].
///
/// SQLite reports the storage class of each value, which decides the variant:
/// stored booleans come back as integers and `BLOB` values as [`query::Value::Blob`].
pub(super) fn cast_record(row: SqliteRow) -> Result<Record, repo::Error> {
    let columns = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = (0..row.len())
        .map(|idx| cast_value(&row, idx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Record::new(columns, values))
}

fn cast_value(row: &SqliteRow, idx: usize) -> Result<query::Value, repo::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(query::Value::Null);
    }

    let type_name = raw.type_info().name().to_ascii_uppercase();
    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "INT8" => query::Value::Integer(row.try_get_unchecked(idx)?),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => query::Value::Float(row.try_get_unchecked(idx)?),
        "BOOLEAN" => query::Value::Boolean(row.try_get_unchecked(idx)?),
        "TEXT" | "DATE" | "TIME" | "DATETIME" => query::Value::Text(row.try_get_unchecked(idx)?),
        "BLOB" => query::Value::Blob(row.try_get_unchecked(idx)?),
        _ => return Err(repo::Error::UnsupportedColumnType(type_name)),
    };
    Ok(value)
}
