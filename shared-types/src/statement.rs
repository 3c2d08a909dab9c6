use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::transaction::Transaction;

/// Metadata printed once in the statement header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementHeader {
    pub period_start: Option<NaiveDate>,
    pub currency: String,
}

/// Result of parsing one statement document, transactions in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub header: StatementHeader,
    pub transactions: Vec<Transaction>,
}

/// Named raw fields of a statement entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    Date,
    Name,
    AccountName,
    Sekv,
    Price,
    AccountNumber,
    Variable,
    Ks,
    Ss,
    Note,
}

impl FieldName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Date => "date",
            FieldName::Name => "name",
            FieldName::AccountName => "accountName",
            FieldName::Sekv => "sekv",
            FieldName::Price => "price",
            FieldName::AccountNumber => "accountNumber",
            FieldName::Variable => "variable",
            FieldName::Ks => "ks",
            FieldName::Ss => "ss",
            FieldName::Note => "note",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trimmed raw strings captured from one block, keyed by field name.
///
/// Values are stored trimmed; an empty value is kept so the record builder
/// can tell "column present but blank" from "column missing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFieldMap {
    fields: BTreeMap<FieldName, String>,
}

impl RawFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FieldName, value: &str) {
        self.fields.insert(field, value.trim().to_string());
    }

    pub fn get(&self, field: FieldName) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Value of the field, or `None` when missing or blank
    pub fn non_empty(&self, field: FieldName) -> Option<&str> {
        self.get(field).filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> FromIterator<(FieldName, &'a str)> for RawFieldMap {
    fn from_iter<T: IntoIterator<Item = (FieldName, &'a str)>>(iter: T) -> Self {
        let mut map = RawFieldMap::new();
        for (field, value) in iter {
            map.insert(field, value);
        }
        map
    }
}
