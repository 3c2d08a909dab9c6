use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use shared_types::{BlockError, FieldName, RawFieldMap, Transaction, TransactionFields};
use std::str::FromStr;

use super::fields::LINE_BREAK;

lazy_static! {
    static ref UPPERCASE_NAME_RE: Regex =
        Regex::new(r"^[A-Z\s]+$").expect("uppercase name pattern is valid");
}

/// Builds typed transactions from raw field maps of one statement
#[derive(Debug, Clone)]
pub struct RecordBuilder<'a> {
    currency: &'a str,
    related_date: NaiveDate,
}

impl<'a> RecordBuilder<'a> {
    /// `related_date` supplies the year, since entries only print `DD.MM.`
    pub fn new(currency: &'a str, related_date: NaiveDate) -> Self {
        Self {
            currency,
            related_date,
        }
    }

    pub fn build(&self, fields: &RawFieldMap) -> Result<Transaction, BlockError> {
        let date = parse_entry_date(require(fields, FieldName::Date)?, self.related_date.year())?;
        let name = fields
            .get(FieldName::Name)
            .ok_or(BlockError::MissingField(FieldName::Name))?;
        let sekv = parse_sekv(require(fields, FieldName::Sekv)?)?;
        let price = parse_price(require(fields, FieldName::Price)?)?;

        Ok(Transaction::new(TransactionFields {
            date,
            currency: self.currency.to_string(),
            name: name.to_string(),
            account_name: fields.non_empty(FieldName::AccountName).map(normalize_account_name),
            account_number: fields.non_empty(FieldName::AccountNumber).map(str::to_string),
            sekv,
            price,
            variable: parse_symbol(fields.get(FieldName::Variable)),
            ks: parse_symbol(fields.get(FieldName::Ks)),
            ss: parse_symbol(fields.get(FieldName::Ss)),
            note: fields.get(FieldName::Note).and_then(clean_note),
        }))
    }
}

fn require(fields: &RawFieldMap, field: FieldName) -> Result<&str, BlockError> {
    fields.non_empty(field).ok_or(BlockError::MissingField(field))
}

/// `DD.MM.` combined with the statement year
pub fn parse_entry_date(raw: &str, year: i32) -> Result<NaiveDate, BlockError> {
    let invalid = || BlockError::InvalidDateField(raw.to_string());

    let mut parts = raw.trim().split('.');
    let day: u32 = parts.next().and_then(|d| d.parse().ok()).ok_or_else(invalid)?;
    let month: u32 = parts.next().and_then(|m| m.parse().ok()).ok_or_else(invalid)?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

fn parse_sekv(raw: &str) -> Result<u64, BlockError> {
    let invalid = || BlockError::InvalidNumber {
        field: FieldName::Sekv,
        value: raw.to_string(),
    };

    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    raw.parse().map_err(|_| invalid())
}

/// Decimal comma amount with optional digit grouping, e.g. `-1 234,50`
pub fn parse_price(raw: &str) -> Result<Decimal, BlockError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    Decimal::from_str(cleaned).map_err(|_| BlockError::InvalidNumber {
        field: FieldName::Price,
        value: raw.to_string(),
    })
}

/// Payment symbols are digits only; blank or anything else means no symbol
pub fn parse_symbol(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// All-caps names are re-cased word by word, anything else is kept as is
pub fn normalize_account_name(name: &str) -> String {
    let name = name.trim();
    if !UPPERCASE_NAME_RE.is_match(name) {
        return name.to_string();
    }

    name.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn clean_note(raw: &str) -> Option<String> {
    let note = raw
        .split(LINE_BREAK)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!note.is_empty()).then_some(note)
}
