//! Raw field extraction from one statement entry.
//!
//! Column layout of an entry, counted in characters:
//!
//! ```text
//! line 1: DD.MM. <sp> name(31) accountName(21) sekv(20) price(<=19)
//! line 2: accountNumber(51) variable(<=15) ks ss
//! line 3+: note
//! ```
//!
//! Line 1 columns start right after the date and its single separator
//! space, so a blank name keeps the later columns in place. `ks` must start
//! right at column 66 of line 2 and be at least three characters long; `ss`
//! is the next token. Tokens never contain `[`.

use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{BlockError, FieldName, RawFieldMap};

use super::segment::RawBlock;

pub const NAME_WIDTH: usize = 31;
pub const ACCOUNT_NAME_WIDTH: usize = 21;
pub const SEKV_WIDTH: usize = 20;
pub const PRICE_WIDTH: usize = 19;
pub const ACCOUNT_NUMBER_WIDTH: usize = 51;
pub const VARIABLE_WIDTH: usize = 15;

/// Joins note fragments spread over several lines
pub const LINE_BREAK: &str = "\n";

lazy_static! {
    static ref ENTRY_HEAD_RE: Regex =
        Regex::new(r"^(?<date>\d{2}\.\d{2}\.)\s").expect("entry head pattern is valid");
    static ref SYMBOLS_RE: Regex =
        Regex::new(r"^(?<ks>[^\[\s]{3,})?\s*(?<ss>[^\[\s]+)?").expect("symbols pattern is valid");
}

/// Turns a raw block into named raw field strings
pub trait FieldExtractor {
    fn extract(&self, block: &RawBlock<'_>) -> Result<RawFieldMap, BlockError>;
}

/// Reads each line of the entry against its own fixed-column layout.
///
/// Lines shorter than the layout yield the columns that fit; a column that
/// starts past the end of its line is left out of the map.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFieldExtractor;

impl LineFieldExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_head(&self, line: &str, fields: &mut RawFieldMap) {
        let Some(caps) = ENTRY_HEAD_RE.captures(line) else {
            return;
        };
        fields.insert(FieldName::Date, &caps["date"]);

        let rest = &line[caps[0].len()..];
        let columns = [
            (FieldName::Name, NAME_WIDTH),
            (FieldName::AccountName, ACCOUNT_NAME_WIDTH),
            (FieldName::Sekv, SEKV_WIDTH),
            (FieldName::Price, PRICE_WIDTH),
        ];

        let mut start = 0;
        for (field, width) in columns {
            if let Some(value) = column(rest, start, width) {
                fields.insert(field, value);
            }
            start += width;
        }
    }

    fn extract_account(&self, line: &str, fields: &mut RawFieldMap) {
        if let Some(value) = column(line, 0, ACCOUNT_NUMBER_WIDTH) {
            fields.insert(FieldName::AccountNumber, value);
        }
        if let Some(value) = column(line, ACCOUNT_NUMBER_WIDTH, VARIABLE_WIDTH) {
            fields.insert(FieldName::Variable, value);
        }

        let Some(symbols) = tail(line, ACCOUNT_NUMBER_WIDTH + VARIABLE_WIDTH) else {
            return;
        };
        if let Some(caps) = SYMBOLS_RE.captures(symbols) {
            if let Some(ks) = caps.name("ks") {
                fields.insert(FieldName::Ks, ks.as_str());
            }
            if let Some(ss) = caps.name("ss") {
                fields.insert(FieldName::Ss, ss.as_str());
            }
        }
    }

    fn extract_note(&self, lines: &[&str], fields: &mut RawFieldMap) {
        let note = lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(LINE_BREAK);

        if !note.is_empty() {
            fields.insert(FieldName::Note, &note);
        }
    }
}

impl FieldExtractor for LineFieldExtractor {
    fn extract(&self, block: &RawBlock<'_>) -> Result<RawFieldMap, BlockError> {
        let mut fields = RawFieldMap::new();

        self.extract_head(block.first_line(), &mut fields);
        if let Some(line) = block.line(1) {
            self.extract_account(line, &mut fields);
        }
        if let Some(rest) = block.lines().get(2..) {
            self.extract_note(rest, &mut fields);
        }

        if fields.is_empty() {
            return Err(BlockError::UnparseableBlock);
        }
        Ok(fields)
    }
}

/// Characters `[start, start + width)` of `line`, cut short at its end.
/// `None` when the line ends before `start`.
fn column(line: &str, start: usize, width: usize) -> Option<&str> {
    let begin = char_offset(line, start)?;
    let end = char_offset(line, start + width).unwrap_or(line.len());
    Some(&line[begin..end])
}

fn tail(line: &str, start: usize) -> Option<&str> {
    char_offset(line, start).map(|begin| &line[begin..])
}

fn char_offset(line: &str, chars: usize) -> Option<usize> {
    line.char_indices().nth(chars).map(|(offset, _)| offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(value: &str, width: usize) -> String {
        format!("{value:<width$}")
    }

    fn head_line(name: &str, account_name: &str, sekv: &str, price: &str) -> String {
        format!(
            "01.02. {}{}{}{}",
            pad(name, NAME_WIDTH),
            pad(account_name, ACCOUNT_NAME_WIDTH),
            pad(sekv, SEKV_WIDTH),
            price
        )
    }

    fn account_line(account: &str, variable: &str, symbols: &str) -> String {
        format!(
            "{}{}{}",
            pad(account, ACCOUNT_NUMBER_WIDTH),
            pad(variable, VARIABLE_WIDTH),
            symbols
        )
    }

    fn extract(lines: &[&str]) -> Result<RawFieldMap, BlockError> {
        LineFieldExtractor::new().extract(&RawBlock::new(lines.to_vec()))
    }

    #[test]
    fn test_full_entry() {
        let head = head_line("Prichozi platba", "JAN NOVAK", "0000042", "     1 234,50");
        let account = account_line("19-2000145399/0800", "123456", "0308 0001");
        let fields = extract(&[head.as_str(), account.as_str(), "  Faktura 2024001  "]).unwrap();

        assert_eq!(fields.get(FieldName::Date), Some("01.02."));
        assert_eq!(fields.get(FieldName::Name), Some("Prichozi platba"));
        assert_eq!(fields.get(FieldName::AccountName), Some("JAN NOVAK"));
        assert_eq!(fields.get(FieldName::Sekv), Some("0000042"));
        assert_eq!(fields.get(FieldName::Price), Some("1 234,50"));
        assert_eq!(fields.get(FieldName::AccountNumber), Some("19-2000145399/0800"));
        assert_eq!(fields.get(FieldName::Variable), Some("123456"));
        assert_eq!(fields.get(FieldName::Ks), Some("0308"));
        assert_eq!(fields.get(FieldName::Ss), Some("0001"));
        assert_eq!(fields.get(FieldName::Note), Some("Faktura 2024001"));
    }

    #[test]
    fn test_blank_name_keeps_column_positions() {
        let head = head_line("", "JAN NOVAK", "0000042", "1 234,50");
        let fields = extract(&[head.as_str()]).unwrap();

        assert_eq!(fields.get(FieldName::Name), Some(""));
        assert_eq!(fields.get(FieldName::AccountName), Some("JAN NOVAK"));
        assert_eq!(fields.get(FieldName::Sekv), Some("0000042"));
        assert_eq!(fields.get(FieldName::Price), Some("1 234,50"));
    }

    #[test]
    fn test_short_head_line_keeps_fitting_columns() {
        let head = format!("01.02. {}KB", pad("Poplatek za vedeni uctu", NAME_WIDTH));
        let fields = extract(&[head.as_str()]).unwrap();

        assert_eq!(fields.get(FieldName::Name), Some("Poplatek za vedeni uctu"));
        assert_eq!(fields.get(FieldName::AccountName), Some("KB"));
        assert_eq!(fields.get(FieldName::Sekv), None);
        assert_eq!(fields.get(FieldName::Price), None);
        assert_eq!(fields.get(FieldName::AccountNumber), None);
    }

    #[test]
    fn test_short_account_line() {
        let head = head_line("Platba", "", "1", "10,00");
        let fields = extract(&[head.as_str(), "2000145399/0800    "]).unwrap();

        assert_eq!(fields.get(FieldName::AccountNumber), Some("2000145399/0800"));
        assert_eq!(fields.get(FieldName::Variable), None);
        assert_eq!(fields.get(FieldName::Ks), None);
        assert_eq!(fields.get(FieldName::Ss), None);
    }

    #[test]
    fn test_single_symbol_after_gap_is_specific_symbol() {
        let head = head_line("Platba", "", "1", "10,00");
        let account = account_line("2000145399/0800", "77", " 9988");
        let fields = extract(&[head.as_str(), account.as_str()]).unwrap();

        assert_eq!(fields.get(FieldName::Ks), None);
        assert_eq!(fields.get(FieldName::Ss), Some("9988"));
    }

    #[test]
    fn test_bracket_stops_symbols() {
        let head = head_line("Platba", "", "1", "10,00");
        let account = account_line("2000145399/0800", "", "[SEPA]");
        let fields = extract(&[head.as_str(), account.as_str()]).unwrap();

        assert_eq!(fields.get(FieldName::Variable), Some(""));
        assert_eq!(fields.get(FieldName::Ks), None);
        assert_eq!(fields.get(FieldName::Ss), None);
    }

    #[test]
    fn test_note_spans_remaining_lines() {
        let head = head_line("Platba", "", "1", "10,00");
        let fields = extract(&[head.as_str(), "", "Objednavka 55", "   ", "dekujeme"]).unwrap();

        assert_eq!(fields.get(FieldName::Note), Some("Objednavka 55\ndekujeme"));
    }

    #[test]
    fn test_block_without_any_field_is_unparseable() {
        assert_eq!(extract(&["Celkem"]), Err(BlockError::UnparseableBlock));
    }

    #[test]
    fn test_column_slicing() {
        assert_eq!(column("abcdef", 0, 3), Some("abc"));
        assert_eq!(column("abcdef", 4, 3), Some("ef"));
        assert_eq!(column("abcdef", 6, 3), None);
        assert_eq!(column("čšřabc", 1, 2), Some("šř"));
        assert_eq!(tail("abcdef", 2), Some("cdef"));
        assert_eq!(tail("ab", 2), None);
    }
}
