//! Row records and the one-pass cursor that produces them.

use std::iter::FusedIterator;
use std::rc::Rc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::types::{QueryResult, Row, Value};

/// One result row as an ordered mapping from column name to value.
///
/// Fields keep the column order of the result; lookups ignore case.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    names: Rc<[String]>,
    values: Row,
}

impl Record {
    /// Value of the named field, if the record has it.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| &self.values[i])
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Field names in column order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Lazy, single-pass sequence of records over a query result.
///
/// The cursor consumes the result it was made from; reading the rows again
/// means executing the query again.
#[derive(Debug)]
pub struct RecordCursor {
    names: Rc<[String]>,
    rows: std::vec::IntoIter<Row>,
}

impl RecordCursor {
    /// Number of fields in every record.
    pub fn field_count(&self) -> usize {
        self.names.len()
    }

    /// Column names in field order.
    pub fn field_names(&self) -> &[String] {
        &self.names
    }
}

impl Iterator for RecordCursor {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.rows.next().map(|values| Record {
            names: Rc::clone(&self.names),
            values,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for RecordCursor {}

impl FusedIterator for RecordCursor {}

impl QueryResult {
    /// Turns the result into a cursor over its records.
    pub fn into_records(self) -> RecordCursor {
        let names: Rc<[String]> = self.columns.into_iter().map(|c| c.name).collect();
        RecordCursor {
            names,
            rows: self.rows.into_iter(),
        }
    }
}
