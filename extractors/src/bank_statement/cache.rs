use sha2::{Digest, Sha256};
use shared_types::{ParsedStatement, StatementError};
use std::collections::HashMap;

use super::fields::FieldExtractor;
use super::CsobStatementParser;

/// Content fingerprint of an attachment decoded with `encoding`
pub fn fingerprint(content: &[u8], encoding: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(encoding.trim().to_lowercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Parsed statements keyed by attachment fingerprint.
///
/// Owned by the caller and passed in explicitly; the parser never caches on
/// its own. Only successful parses are stored.
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: HashMap<String, ParsedStatement>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &str) -> Option<&ParsedStatement> {
        self.entries.get(fingerprint)
    }

    pub fn insert(&mut self, fingerprint: String, statement: ParsedStatement) {
        self.entries.insert(fingerprint, statement);
    }

    pub fn invalidate(&mut self, fingerprint: &str) -> Option<ParsedStatement> {
        self.entries.remove(fingerprint)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached statement for `content` decoded from `encoding`, parsing and
    /// storing it on a miss
    pub fn get_or_parse<E: FieldExtractor>(
        &mut self,
        parser: &CsobStatementParser<E>,
        content: &[u8],
        encoding: &str,
    ) -> Result<ParsedStatement, StatementError> {
        let key = fingerprint(content, encoding);
        if let Some(statement) = self.entries.get(&key) {
            tracing::debug!("Statement cache hit for {}", key);
            return Ok(statement.clone());
        }

        let statement = parser.parse_attachment_as(content, encoding)?;
        self.entries.insert(key, statement.clone());
        Ok(statement)
    }
}
