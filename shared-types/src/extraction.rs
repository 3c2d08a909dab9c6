use serde::{Deserialize, Serialize};
use std::fmt;

use crate::statement::FieldName;
use crate::transaction::Transaction;

/// Capability shared by every payment source: fetch everything it can see,
/// or parse one already-decoded document.
pub trait PaymentAuthorizator {
    /// Fetch and parse every statement reachable from the source, in order
    fn fetch_transactions(&mut self) -> Result<Vec<Transaction>, AuthorizatorError>;

    /// Parse a single normalized statement text
    fn parse(&self, text: &str) -> Result<Vec<Transaction>, StatementError>;
}

/// Mailbox collaborator the authorizator reads statements from.
///
/// Connection handling, credentials and temporary storage belong to the
/// implementation.
pub trait MailboxSource {
    fn message_ids(&mut self) -> Result<Vec<MessageId>, MailboxError>;

    fn attachments(&mut self, id: &MessageId) -> Result<Vec<Attachment>, MailboxError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl Attachment {
    /// Binary documents (PDF exports) never reach the text pipeline
    pub fn is_binary_document(&self) -> bool {
        let content_type = self.content_type.to_lowercase();
        content_type.contains("application/pdf")
            || self.filename.to_lowercase().ends_with(".pdf")
            || self.content.starts_with(b"%PDF")
    }

    /// `charset` parameter of the content type, when the mailbox knows it
    pub fn declared_charset(&self) -> Option<&str> {
        self.content_type.split(';').skip(1).find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"'))
                .filter(|value| !value.is_empty())
        })
    }
}

/// Failures while turning one statement document into transactions
#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error("Input file can not be empty")]
    EmptyInput,

    #[error("Input does not contain currency info")]
    MissingCurrency,

    #[error("Can not convert attachment from {encoding}: {reason}")]
    EncodingConversionFailure { encoding: String, reason: String },
}

impl StatementError {
    /// Conversion failures skip the attachment; everything else aborts the document
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StatementError::EncodingConversionFailure { .. })
    }
}

/// Failures scoped to a single transaction block; the block is skipped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("Block does not match the statement column layout")]
    UnparseableBlock,

    #[error("Invalid date field: {0:?}")]
    InvalidDateField(String),

    #[error("Missing required field: {0}")]
    MissingField(FieldName),

    #[error("Invalid number in field {field}: {value:?}")]
    InvalidNumber { field: FieldName, value: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Mailbox unavailable: {0}")]
    Unavailable(String),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    #[error("Malformed message: {0}")]
    MalformedMessage(MessageId),

    #[error("Mailbox I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthorizatorError {
    #[error(transparent)]
    Mailbox(#[from] MailboxError),

    #[error("Message {message_id}: {source}")]
    Message {
        message_id: MessageId,
        #[source]
        source: MailboxError,
    },

    #[error("Attachment \"{attachment}\" of message {message_id}: {source}")]
    Attachment {
        message_id: MessageId,
        attachment: String,
        #[source]
        source: StatementError,
    },
}
