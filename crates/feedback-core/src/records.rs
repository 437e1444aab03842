//! Header-keyed CSV records and a forward-only reader over them.

use csv::{ReaderBuilder, StringRecord};
use indexmap::IndexMap;
use serde::Serialize;

/// One input row keyed by header name, in header order. Serializes as a
/// flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Sets `column`, keeping its position if it already exists and
    /// appending it otherwise.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn from_row(headers: &StringRecord, row: &StringRecord) -> Self {
        let fields = headers
            .iter()
            .zip(row.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Single-pass reader yielding one [`Record`] per data row. The first line is
/// the header; blank lines are skipped and a row whose width differs from the
/// header is reported as an error.
pub struct RecordReader<'a> {
    reader: csv::Reader<&'a [u8]>,
    headers: StringRecord,
    row: StringRecord,
}

impl<'a> RecordReader<'a> {
    pub fn new(text: &'a str) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());
        let headers = reader.headers()?.clone();
        Ok(Self {
            reader,
            headers,
            row: StringRecord::new(),
        })
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<Record, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.row) {
            Ok(true) => Some(Ok(Record::from_row(&self.headers, &self.row))),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
