use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{StatementError, StatementHeader};

lazy_static! {
    static ref PERIOD_RE: Regex =
        Regex::new(r"Za obdobi od:\s+(?<day>\d{2})\.(?<month>\d{2})\.(?<year>\d{4})")
            .expect("period pattern is valid");
    static ref CURRENCY_RE: Regex =
        Regex::new(r"Mena uctu: (?<currency>[A-Z]+)").expect("currency pattern is valid");
}

/// Read period start and account currency from normalized statement text.
///
/// A missing currency is fatal for the document; a missing period is not.
pub fn extract_header(text: &str) -> Result<StatementHeader, StatementError> {
    let currency = find_currency(text).ok_or(StatementError::MissingCurrency)?;

    Ok(StatementHeader {
        period_start: find_period_start(text),
        currency,
    })
}

pub fn find_currency(text: &str) -> Option<String> {
    CURRENCY_RE
        .captures(text)
        .map(|caps| caps["currency"].to_string())
}

pub fn find_period_start(text: &str) -> Option<NaiveDate> {
    let caps = PERIOD_RE.captures(text)?;
    let year: i32 = caps["year"].parse().ok()?;
    let month: u32 = caps["month"].parse().ok()?;
    let day: u32 = caps["day"].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day);
    if date.is_none() {
        tracing::warn!("Ignoring invalid statement period start {}", &caps[0]);
    }
    date
}
