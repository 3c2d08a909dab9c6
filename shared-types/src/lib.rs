//! Shared Types Crate
//!
//! Data model, error taxonomy and capability traits for reading payment
//! transactions out of fixed-column bank statement exports. The parsing
//! engine itself lives in the `extractors` crate.

pub mod extraction;
pub mod statement;
pub mod transaction;

pub use extraction::{
    Attachment, AuthorizatorError, BlockError, MailboxError, MailboxSource, MessageId,
    PaymentAuthorizator, StatementError,
};
pub use statement::{FieldName, ParsedStatement, RawFieldMap, StatementHeader};
pub use transaction::{identity_hash, Transaction, TransactionFields};
