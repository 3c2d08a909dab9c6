//! Parser for CSOB fixed-column text statements delivered as e-mail
//! attachments.
//!
//! Each document flows through [`preprocess`], [`header`], [`segment`],
//! [`fields`] and [`record`] in that order. The parser holds only its
//! configuration, so one instance can serve any number of documents.

mod authorizator;
mod cache;
pub mod fields;
pub mod header;
pub mod preprocess;
pub mod record;
pub mod segment;

pub use authorizator::{CsobPaymentAuthorizator, FetchReport};
pub use cache::{fingerprint, StatementCache};
pub use fields::{FieldExtractor, LineFieldExtractor};
pub use record::RecordBuilder;
pub use segment::RawBlock;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use shared_types::{ParsedStatement, StatementError};

/// What a batch fetch does when one attachment fails fatally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole fetch on the first failing attachment
    #[default]
    FailFast,
    /// Record the failure and continue with the next attachment
    CollectAndContinue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementParserConfig {
    /// Character set the bank writes attachments in
    pub source_encoding: String,
    pub failure_policy: FailurePolicy,
}

impl Default for StatementParserConfig {
    fn default() -> Self {
        Self {
            source_encoding: preprocess::DEFAULT_SOURCE_ENCODING.to_string(),
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

pub struct CsobStatementParser<E = LineFieldExtractor> {
    config: StatementParserConfig,
    extractor: E,
}

impl CsobStatementParser {
    pub fn new(config: StatementParserConfig) -> Self {
        Self::with_extractor(config, LineFieldExtractor::new())
    }

    pub fn with_defaults() -> Self {
        Self::new(StatementParserConfig::default())
    }
}

impl<E: FieldExtractor> CsobStatementParser<E> {
    pub fn with_extractor(config: StatementParserConfig, extractor: E) -> Self {
        Self { config, extractor }
    }

    pub fn config(&self) -> &StatementParserConfig {
        &self.config
    }

    pub fn set_source_encoding(&mut self, encoding: impl Into<String>) {
        self.config.source_encoding = encoding.into();
    }

    /// Parse statement text, dating entries by the local calendar date when
    /// the statement prints no period
    pub fn parse_statement(&self, text: &str) -> Result<ParsedStatement, StatementError> {
        self.parse_statement_with_reference_date(text, Local::now().date_naive())
    }

    /// Parse statement text; `reference_date` stands in for a missing
    /// period start.
    ///
    /// Broken entries are logged and skipped. Only an empty document or a
    /// missing currency fails the whole parse.
    pub fn parse_statement_with_reference_date(
        &self,
        text: &str,
        reference_date: NaiveDate,
    ) -> Result<ParsedStatement, StatementError> {
        let text = preprocess::normalize_text(text)?;
        let header = header::extract_header(&text)?;
        let builder = RecordBuilder::new(
            &header.currency,
            header.period_start.unwrap_or(reference_date),
        );

        let mut transactions = Vec::new();
        for block in segment::split_blocks(&text) {
            let built = self
                .extractor
                .extract(&block)
                .and_then(|fields| builder.build(&fields));

            match built {
                Ok(transaction) => transactions.push(transaction),
                Err(e) => {
                    tracing::warn!("Skipping statement entry {:?}: {}", block.first_line(), e);
                }
            }
        }

        tracing::debug!(
            "Parsed {} transactions in {} statement",
            transactions.len(),
            header.currency
        );

        Ok(ParsedStatement {
            header,
            transactions,
        })
    }

    /// Decode raw attachment bytes with the configured encoding, then parse
    pub fn parse_attachment(&self, content: &[u8]) -> Result<ParsedStatement, StatementError> {
        self.parse_attachment_as(content, &self.config.source_encoding)
    }

    /// Decode raw attachment bytes with an explicit encoding, then parse
    pub fn parse_attachment_as(
        &self,
        content: &[u8],
        encoding: &str,
    ) -> Result<ParsedStatement, StatementError> {
        let text = preprocess::decode_attachment(content, encoding)?;
        self.parse_statement(&text)
    }
}

impl Default for CsobStatementParser {
    fn default() -> Self {
        Self::with_defaults()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn reference_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, 15).unwrap()
    }

    fn parse(text: &str) -> Result<ParsedStatement, StatementError> {
        CsobStatementParser::with_defaults().parse_statement_with_reference_date(text, reference_date())
    }

    #[test]
    fn test_end_to_end_single_entry() {
        let text = statement(CZK_HEADER, &[jan_novak().render()]);
        let parsed = parse(&text).unwrap();

        assert_eq!(parsed.header.currency, "CZK");
        assert_eq!(parsed.header.period_start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(parsed.transactions.len(), 1);

        let transaction = &parsed.transactions[0];
        assert_eq!(transaction.currency(), "CZK");
        assert_eq!(transaction.date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(transaction.name(), "Prichozi uhrada");
        assert_eq!(transaction.account_name(), Some("Jan Novak"));
        assert_eq!(transaction.account_number(), Some("19-2000145399/0800"));
        assert_eq!(transaction.sekv(), 1234567);
        assert_eq!(transaction.price(), Decimal::from_str("1234.50").unwrap());
        assert_eq!(transaction.variable(), Some(123456));
        assert_eq!(transaction.ks(), Some(308));
        assert_eq!(transaction.ss(), Some(1));
        assert_eq!(transaction.note(), Some("Objednavka c. 123456"));
    }

    #[test]
    fn test_body_after_single_separator() {
        let text = format!(
            "Za obdobi od: 01.01.2024\nMena uctu: CZK\n{}\n{}",
            "=".repeat(segment::SEPARATOR_WIDTH),
            jan_novak().render()
        );
        let parsed = parse(&text).unwrap();

        assert_eq!(parsed.transactions.len(), 1);
        let transaction = &parsed.transactions[0];
        assert_eq!(transaction.currency(), "CZK");
        assert_eq!(transaction.date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(transaction.account_name(), Some("Jan Novak"));
        assert_eq!(transaction.variable(), Some(123456));
    }

    #[test]
    fn test_bank_export_with_several_entries() {
        let parsed = parse(MARCH_2024_STATEMENT).unwrap();

        assert_eq!(parsed.header.currency, "CZK");
        assert_eq!(parsed.header.period_start, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parsed.transactions.len(), 3);

        let incoming = &parsed.transactions[0];
        assert_eq!(incoming.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(incoming.name(), "Prichozi uhrada");
        assert_eq!(incoming.account_name(), Some("Jan Novak"));
        assert_eq!(incoming.account_number(), Some("19-2000145399/0800"));
        assert_eq!(incoming.sekv(), 101);
        assert_eq!(incoming.price(), Decimal::from_str("1500.00").unwrap());
        assert_eq!(incoming.variable(), Some(2024001));
        assert_eq!(incoming.ks(), Some(308));
        assert_eq!(incoming.ss(), Some(1));
        assert_eq!(incoming.note(), Some("Faktura 2024001"));

        let fee = &parsed.transactions[1];
        assert_eq!(fee.name(), "Poplatek za vedeni uctu");
        assert_eq!(fee.account_name(), None);
        assert_eq!(fee.account_number(), None);
        assert_eq!(fee.price(), Decimal::from_str("-95.00").unwrap());
        assert_eq!(fee.note(), None);

        let standing_order = &parsed.transactions[2];
        assert_eq!(standing_order.date(), NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(standing_order.account_name(), Some("Druzstvo Tesin"));
        assert_eq!(standing_order.price(), Decimal::from_str("-12000.00").unwrap());
        assert_eq!(standing_order.variable(), Some(77));
        assert_eq!(standing_order.ks(), None);
        assert_eq!(standing_order.note(), Some("Najemne brezen"));
    }

    #[test]
    fn test_bank_export_through_source_encoding() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1250.encode(MARCH_2024_STATEMENT);
        let parsed = CsobStatementParser::with_defaults()
            .parse_attachment(&bytes)
            .unwrap();

        assert_eq!(parsed, parse(MARCH_2024_STATEMENT).unwrap());
    }

    #[test]
    fn test_blank_name_entry_is_kept() {
        let mut entry = jan_novak();
        entry.name = "";
        let parsed = parse(&statement(CZK_HEADER, &[entry.render()])).unwrap();

        assert_eq!(parsed.transactions.len(), 1);
        let transaction = &parsed.transactions[0];
        assert_eq!(transaction.name(), "");
        assert_eq!(transaction.account_name(), Some("Jan Novak"));
        assert_eq!(transaction.sekv(), 1234567);
        assert_eq!(transaction.price(), Decimal::from_str("1234.50").unwrap());
    }

    #[test]
    fn test_missing_currency_fails_document() {
        let header = "CSOB Vypis z uctu\nZa obdobi od:   01.01.2024";
        let text = statement(header, &[jan_novak().render()]);
        assert!(matches!(parse(&text), Err(StatementError::MissingCurrency)));
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(parse("  \n \r\n"), Err(StatementError::EmptyInput)));
    }

    #[test]
    fn test_no_separator_yields_zero_transactions() {
        let parsed = parse("Mena uctu: EUR\n01.02. something").unwrap();
        assert_eq!(parsed.header.currency, "EUR");
        assert!(parsed.transactions.is_empty());
    }

    #[test]
    fn test_missing_period_uses_reference_year() {
        let text = statement("Mena uctu: CZK", &[jan_novak().render()]);
        let parsed = parse(&text).unwrap();

        assert_eq!(parsed.header.period_start, None);
        assert_eq!(
            parsed.transactions[0].date(),
            NaiveDate::from_ymd_opt(2030, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_broken_entries_are_skipped_in_order() {
        let mut second = jan_novak();
        second.date = "02.02.";
        second.name = "Platba kartou";
        second.account_name = "Alza.cz a.s.";
        second.sekv = "0001234568";
        second.price = "-499,00";
        second.variable = "";
        second.symbols = "";
        second.note = "";

        let mut invalid_date = jan_novak();
        invalid_date.date = "31.02.";

        let mut bad_price = jan_novak();
        bad_price.price = "n/a";

        let entries = [
            jan_novak().render(),
            invalid_date.render(),
            "Prevod z minuleho obdobi".to_string(),
            bad_price.render(),
            second.render(),
        ];
        let parsed = parse(&statement(CZK_HEADER, &entries)).unwrap();

        assert_eq!(parsed.transactions.len(), 2);
        assert_eq!(parsed.transactions[0].sekv(), 1234567);
        assert_eq!(parsed.transactions[1].sekv(), 1234568);
        assert_eq!(parsed.transactions[1].account_name(), Some("Alza.cz a.s."));
        assert_eq!(parsed.transactions[1].price(), Decimal::from_str("-499.00").unwrap());
        assert_eq!(parsed.transactions[1].variable(), None);
        assert_eq!(parsed.transactions[1].note(), None);
    }

    #[test]
    fn test_short_lines_do_not_fail() {
        let text = statement(
            CZK_HEADER,
            &[format!(
                "05.01. {}{}{}100,00\n2000145399/0800",
                pad("Vklad", 31),
                pad("", 21),
                pad("77", 20)
            )],
        );
        let parsed = parse(&text).unwrap();

        assert_eq!(parsed.transactions.len(), 1);
        let transaction = &parsed.transactions[0];
        assert_eq!(transaction.account_number(), Some("2000145399/0800"));
        assert_eq!(transaction.account_name(), None);
        assert_eq!(transaction.variable(), None);
        assert_eq!(transaction.ks(), None);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let mut second = jan_novak();
        second.sekv = "99";
        let text = statement(CZK_HEADER, &[jan_novak().render(), second.render()]);

        let parser = CsobStatementParser::with_defaults();
        let first = parser.parse_statement_with_reference_date(&text, reference_date()).unwrap();
        let again = parser.parse_statement_with_reference_date(&text, reference_date()).unwrap();

        assert_eq!(first, again);
        let hashes: Vec<_> = first.transactions.iter().map(|t| t.identity_hash()).collect();
        let hashes_again: Vec<_> = again.transactions.iter().map(|t| t.identity_hash()).collect();
        assert_eq!(hashes, hashes_again);
    }

    #[test]
    fn test_parse_attachment_decodes_source_encoding() {
        let mut entry = jan_novak();
        entry.account_name = "JIŘÍ ČERNÝ";
        entry.note = "Platba za zboží";
        let text = statement(
            "Za období od:   01.01.2024\nMěna účtu: CZK",
            &[entry.render()],
        );
        let (bytes, _, _) = encoding_rs::WINDOWS_1250.encode(&text);

        let parsed = CsobStatementParser::with_defaults()
            .parse_attachment(&bytes)
            .unwrap();

        assert_eq!(parsed.header.currency, "CZK");
        assert_eq!(parsed.transactions.len(), 1);
        assert_eq!(parsed.transactions[0].account_name(), Some("Jiri Cerny"));
        assert_eq!(parsed.transactions[0].note(), Some("Platba za zbozi"));
        assert_eq!(parsed.transactions[0].variable(), Some(123456));
    }

    #[test]
    fn test_config_defaults_and_serde() {
        let config = StatementParserConfig::default();
        assert_eq!(config.source_encoding, "windows-1250");
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);

        let policy: FailurePolicy = serde_json::from_str("\"collect-and-continue\"").unwrap();
        assert_eq!(policy, FailurePolicy::CollectAndContinue);
    }
}
