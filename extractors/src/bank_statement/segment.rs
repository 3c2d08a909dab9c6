use lazy_static::lazy_static;
use regex::Regex;

/// Width of the `=` and `-` separator lines in the export
pub const SEPARATOR_WIDTH: usize = 99;

lazy_static! {
    static ref SECTION_SEPARATOR: String = "=".repeat(SEPARATOR_WIDTH);
    static ref ENTRY_SEPARATOR: String = "-".repeat(SEPARATOR_WIDTH);
    static ref DATE_PREFIX_RE: Regex =
        Regex::new(r"^\d{2}\.\d{2}\.\s").expect("date prefix pattern is valid");
}

/// Lines of one candidate statement entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock<'a> {
    lines: Vec<&'a str>,
}

impl<'a> RawBlock<'a> {
    pub fn new(lines: Vec<&'a str>) -> Self {
        Self { lines }
    }

    pub fn from_text(text: &'a str) -> Self {
        Self::new(text.trim().split('\n').collect())
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&'a str> {
        self.lines.get(index).copied()
    }

    pub fn first_line(&self) -> &'a str {
        self.line(0).unwrap_or("")
    }

    /// Entries open with a `DD.MM.` date followed by whitespace
    pub fn has_date_prefix(&self) -> bool {
        DATE_PREFIX_RE.is_match(self.first_line())
    }
}

/// Text between the first `=` separator and the next one.
///
/// `None` when the document has no separator at all.
pub fn statement_body(text: &str) -> Option<&str> {
    text.split(SECTION_SEPARATOR.as_str()).nth(1)
}

/// Every chunk of the body delimited by `-` separators, unfiltered
pub fn candidate_blocks(body: &str) -> impl Iterator<Item = RawBlock<'_>> {
    body.split(ENTRY_SEPARATOR.as_str()).map(RawBlock::from_text)
}

/// Split a normalized statement into its transaction blocks, in order.
///
/// Chunks that do not start with a date (column headings, totals) are
/// dropped silently.
pub fn split_blocks(text: &str) -> Vec<RawBlock<'_>> {
    let Some(body) = statement_body(text) else {
        tracing::debug!("Statement has no section separator, nothing to parse");
        return Vec::new();
    };

    candidate_blocks(body)
        .filter(|block| {
            let keep = block.has_date_prefix();
            if !keep {
                tracing::debug!("Skipping block without date prefix: {:?}", block.first_line());
            }
            keep
        })
        .collect()
}
