use shared_types::{
    Attachment, AuthorizatorError, MailboxSource, MessageId, PaymentAuthorizator, StatementError,
    Transaction,
};

use super::cache::StatementCache;
use super::{CsobStatementParser, FailurePolicy, StatementParserConfig};

/// Outcome of reading every statement in the mailbox
#[derive(Debug, Default)]
pub struct FetchReport {
    pub transactions: Vec<Transaction>,
    /// Unreadable messages and fatal attachment errors, only populated with
    /// [`FailurePolicy::CollectAndContinue`]
    pub failures: Vec<AuthorizatorError>,
    /// Binary or undecodable attachments that were passed over
    pub skipped_attachments: usize,
}

/// Reads CSOB statement attachments from a mailbox and parses them
pub struct CsobPaymentAuthorizator<M: MailboxSource> {
    mailbox: M,
    parser: CsobStatementParser,
}

impl<M: MailboxSource> CsobPaymentAuthorizator<M> {
    pub fn new(mailbox: M, config: StatementParserConfig) -> Self {
        Self {
            mailbox,
            parser: CsobStatementParser::new(config),
        }
    }

    pub fn set_attachment_encoding(&mut self, encoding: impl Into<String>) {
        self.parser.set_source_encoding(encoding);
    }

    pub fn parser(&self) -> &CsobStatementParser {
        &self.parser
    }

    pub fn mailbox(&self) -> &M {
        &self.mailbox
    }

    pub fn into_mailbox(self) -> M {
        self.mailbox
    }

    /// Fetch every statement, honouring the configured failure policy
    pub fn fetch_report(&mut self) -> Result<FetchReport, AuthorizatorError> {
        self.fetch(None)
    }

    /// Like [`PaymentAuthorizator::fetch_transactions`], reusing statements
    /// already parsed into `cache`
    pub fn fetch_transactions_cached(
        &mut self,
        cache: &mut StatementCache,
    ) -> Result<Vec<Transaction>, AuthorizatorError> {
        Ok(self.fetch(Some(cache))?.transactions)
    }

    fn fetch(
        &mut self,
        mut cache: Option<&mut StatementCache>,
    ) -> Result<FetchReport, AuthorizatorError> {
        let mut report = FetchReport::default();
        let message_ids = self.mailbox.message_ids()?;
        tracing::info!("Found {} messages in statement mailbox", message_ids.len());

        for message_id in message_ids {
            let attachments = match self.mailbox.attachments(&message_id) {
                Ok(attachments) => attachments,
                Err(e) => {
                    let err = AuthorizatorError::Message {
                        message_id,
                        source: e,
                    };
                    self.record_failure(&mut report, err)?;
                    continue;
                }
            };

            for attachment in attachments {
                if attachment.is_binary_document() {
                    tracing::debug!(
                        "Skipping binary attachment {} of message {}",
                        attachment.filename,
                        message_id
                    );
                    report.skipped_attachments += 1;
                    continue;
                }

                let encoding = attachment
                    .declared_charset()
                    .unwrap_or(&self.parser.config().source_encoding);
                let parsed = match cache.as_deref_mut() {
                    Some(cache) => cache.get_or_parse(&self.parser, &attachment.content, encoding),
                    None => self.parser.parse_attachment_as(&attachment.content, encoding),
                };

                match parsed {
                    Ok(statement) => {
                        tracing::info!(
                            "Parsed {} transactions from {} of message {}",
                            statement.transactions.len(),
                            attachment.filename,
                            message_id
                        );
                        report.transactions.extend(statement.transactions);
                    }
                    Err(e) if !e.is_fatal() => {
                        tracing::warn!(
                            "Skipping attachment {} of message {}: {}",
                            attachment.filename,
                            message_id,
                            e
                        );
                        report.skipped_attachments += 1;
                    }
                    Err(e) => {
                        let err = attachment_error(&message_id, &attachment, e);
                        self.record_failure(&mut report, err)?;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Abort with `err` or keep it in the report, per the failure policy
    fn record_failure(
        &self,
        report: &mut FetchReport,
        err: AuthorizatorError,
    ) -> Result<(), AuthorizatorError> {
        match self.parser.config().failure_policy {
            FailurePolicy::FailFast => Err(err),
            FailurePolicy::CollectAndContinue => {
                tracing::error!("{}", err);
                report.failures.push(err);
                Ok(())
            }
        }
    }
}

impl<M: MailboxSource> PaymentAuthorizator for CsobPaymentAuthorizator<M> {
    fn fetch_transactions(&mut self) -> Result<Vec<Transaction>, AuthorizatorError> {
        Ok(self.fetch(None)?.transactions)
    }

    fn parse(&self, text: &str) -> Result<Vec<Transaction>, StatementError> {
        Ok(self.parser.parse_statement(text)?.transactions)
    }
}

fn attachment_error(
    message_id: &MessageId,
    attachment: &Attachment,
    source: StatementError,
) -> AuthorizatorError {
    AuthorizatorError::Attachment {
        message_id: message_id.clone(),
        attachment: attachment.filename.clone(),
        source,
    }
}
