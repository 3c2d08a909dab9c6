use mail_parser::decoders::base64::base64_decode;
use mail_parser::decoders::quoted_printable::quoted_printable_decode;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use shared_types::{Attachment, MailboxError, MailboxSource, MessageId};
use std::path::{Path, PathBuf};

/// Mailbox backed by a directory of exported `.eml` files; the file stem is
/// the message id
pub struct EmlDirectoryMailbox {
    directory: PathBuf,
}

impl EmlDirectoryMailbox {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn message_path(&self, id: &MessageId) -> PathBuf {
        self.directory.join(format!("{id}.eml"))
    }
}

impl MailboxSource for EmlDirectoryMailbox {
    fn message_ids(&mut self) -> Result<Vec<MessageId>, MailboxError> {
        let entries = std::fs::read_dir(&self.directory).map_err(|e| {
            MailboxError::Unavailable(format!("{}: {e}", self.directory.display()))
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_eml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"));
            if !is_eml {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(MessageId::from(stem));
            }
        }
        ids.sort();

        Ok(ids)
    }

    fn attachments(&mut self, id: &MessageId) -> Result<Vec<Attachment>, MailboxError> {
        let path = self.message_path(id);
        if !path.is_file() {
            return Err(MailboxError::MessageNotFound(id.clone()));
        }

        let bytes = std::fs::read(&path)?;
        let message = MessageParser::default()
            .parse(&bytes)
            .ok_or_else(|| MailboxError::MalformedMessage(id.clone()))?;

        let mut attachments = Vec::new();
        for (index, part) in message.attachments().enumerate() {
            let filename = part
                .attachment_name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("attachment-{}", index + 1));

            let (content_type, content) = match &part.body {
                // mail-parser only decodes text reliably when the part names
                // its charset; otherwise the raw bytes go through the
                // configured statement encoding
                PartType::Text(text) | PartType::Html(text) => match declared_charset(part) {
                    Some(_) => (
                        "text/plain; charset=utf-8".to_string(),
                        text.as_bytes().to_vec(),
                    ),
                    None => {
                        let raw = raw_body(&message, part)
                            .ok_or_else(|| MailboxError::MalformedMessage(id.clone()))?;
                        (mime_type(part, "text/plain"), raw)
                    }
                },
                PartType::Binary(data) | PartType::InlineBinary(data) => {
                    (mime_type(part, "application/octet-stream"), data.to_vec())
                }
                _ => {
                    tracing::debug!("Ignoring nested part {} of message {}", filename, id);
                    continue;
                }
            };

            attachments.push(Attachment {
                filename,
                content_type,
                content,
            });
        }

        tracing::debug!("Message {} has {} attachments", id, attachments.len());
        Ok(attachments)
    }
}

fn declared_charset<'a>(part: &'a MessagePart<'_>) -> Option<&'a str> {
    part.content_type()?.attribute("charset")
}

fn mime_type(part: &MessagePart<'_>, fallback: &str) -> String {
    match part.content_type() {
        Some(ct) => match ct.subtype() {
            Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
            None => ct.ctype().to_string(),
        },
        None => fallback.to_string(),
    }
}

/// Body bytes of `part` with only the transfer encoding undone
fn raw_body(message: &Message<'_>, part: &MessagePart<'_>) -> Option<Vec<u8>> {
    let start = part.raw_body_offset() as usize;
    let end = part.raw_end_offset() as usize;
    let raw = message.raw_message().get(start..end)?;

    match part.content_transfer_encoding() {
        Some(encoding) if encoding.eq_ignore_ascii_case("base64") => base64_decode(raw),
        Some(encoding) if encoding.eq_ignore_ascii_case("quoted-printable") => {
            quoted_printable_decode(raw)
        }
        _ => Some(raw.to_vec()),
    }
}
