//! Extractors Crate
//!
//! Turns fixed-column CSOB bank statement exports, as delivered in e-mail
//! attachments, into typed payment transactions.
//!
//! # Architecture
//!
//! - **Types**: Transactions, errors and capability traits are defined in the
//!   `shared-types` crate
//! - **Implementations**: The statement parsing engine and the mailbox-driven
//!   authorizator live in this crate
//!
//! # Example
//!
//! ```rust,ignore
//! use extractors::CsobStatementParser;
//!
//! let parser = CsobStatementParser::with_defaults();
//! let statement = parser.parse_attachment(&attachment.content)?;
//! for transaction in &statement.transactions {
//!     println!("{} {}", transaction.date(), transaction.price());
//! }
//! ```

pub mod bank_statement;

// Re-export commonly used types
pub use bank_statement::{
    CsobPaymentAuthorizator, CsobStatementParser, FailurePolicy, FetchReport, FieldExtractor,
    LineFieldExtractor, StatementCache, StatementParserConfig,
};

// Re-export the capability traits from shared-types for convenience
pub use shared_types::{MailboxSource, PaymentAuthorizator};
