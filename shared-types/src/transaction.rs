use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Typed values of a statement entry, before the identity hash is computed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFields {
    pub date: NaiveDate,
    pub currency: String,
    pub name: String,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub sekv: u64,
    pub price: Decimal,
    pub variable: Option<u64>,
    pub ks: Option<u64>,
    pub ss: Option<u64>,
    pub note: Option<String>,
}

/// A payment read from a bank statement.
///
/// Immutable once built. `identity_hash` is derived from the observable
/// fields and is what callers use to deduplicate transactions seen in more
/// than one fetch. Deserializing recomputes the hash from the fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TransactionFields")]
pub struct Transaction {
    date: NaiveDate,
    currency: String,
    name: String,
    account_name: Option<String>,
    account_number: Option<String>,
    sekv: u64,
    price: Decimal,
    variable: Option<u64>,
    ks: Option<u64>,
    ss: Option<u64>,
    note: Option<String>,
    identity_hash: String,
}

impl Transaction {
    pub fn new(fields: TransactionFields) -> Self {
        let identity_hash = identity_hash(&fields);
        Self {
            date: fields.date,
            currency: fields.currency,
            name: fields.name,
            account_name: fields.account_name,
            account_number: fields.account_number,
            sekv: fields.sekv,
            price: fields.price,
            variable: fields.variable,
            ks: fields.ks,
            ss: fields.ss,
            note: fields.note,
            identity_hash,
        }
    }

    /// True when the variable symbol field equals `vs` or the note mentions it
    pub fn is_variable_symbol(&self, vs: u64) -> bool {
        self.variable == Some(vs) || self.contains_variable_symbol_in_note(&vs.to_string())
    }

    pub fn contains_variable_symbol_in_note(&self, vs: &str) -> bool {
        match &self.note {
            Some(note) => !vs.is_empty() && note.contains(vs),
            None => false,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn account_name(&self) -> Option<&str> {
        self.account_name.as_deref()
    }

    pub fn account_number(&self) -> Option<&str> {
        self.account_number.as_deref()
    }

    pub fn sekv(&self) -> u64 {
        self.sekv
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn variable(&self) -> Option<u64> {
        self.variable
    }

    pub fn ks(&self) -> Option<u64> {
        self.ks
    }

    pub fn ss(&self) -> Option<u64> {
        self.ss
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn identity_hash(&self) -> &str {
        &self.identity_hash
    }
}

impl From<TransactionFields> for Transaction {
    fn from(fields: TransactionFields) -> Self {
        Self::new(fields)
    }
}

/// Hex SHA-256 over `variable_ks_sekv_price_accountName_accountNumber_note_date`.
///
/// `name`, `currency` and `ss` do not take part. Absent values contribute an
/// empty segment and the price is normalized so `10.5` and `10.50` agree.
pub fn identity_hash(fields: &TransactionFields) -> String {
    fn number(value: Option<u64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    let payload = [
        number(fields.variable),
        number(fields.ks),
        fields.sekv.to_string(),
        fields.price.normalize().to_string(),
        fields.account_name.clone().unwrap_or_default(),
        fields.account_number.clone().unwrap_or_default(),
        fields.note.clone().unwrap_or_default(),
        fields.date.format("%Y-%m-%d").to_string(),
    ]
    .join("_");

    hex::encode(Sha256::digest(payload.as_bytes()))
}
