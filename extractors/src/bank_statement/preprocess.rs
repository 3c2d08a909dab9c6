//! Attachment bytes to canonical plain-ASCII statement text.
//!
//! The exports are fixed-column reports, so every step here keeps one
//! output character per input character: diacritics are stripped, anything
//! without an ASCII base letter becomes `?`.

use encoding_rs::Encoding;
use shared_types::StatementError;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

pub const DEFAULT_SOURCE_ENCODING: &str = "windows-1250";

/// Decode raw attachment bytes from `encoding_label`.
///
/// Fails with [`StatementError::EncodingConversionFailure`] for unknown
/// encodings and for content that is clearly binary; callers skip such
/// attachments instead of aborting. Undecodable bytes are replaced, not
/// reported.
pub fn decode_attachment(content: &[u8], encoding_label: &str) -> Result<String, StatementError> {
    let encoding = Encoding::for_label(encoding_label.trim().as_bytes())
        .ok_or_else(|| conversion_failure(encoding_label, "unknown encoding"))?;

    let content = content.trim_ascii();
    if content.contains(&0) {
        return Err(conversion_failure(encoding_label, "binary content"));
    }

    let (text, _, had_errors) = encoding.decode(content);
    if had_errors {
        tracing::debug!(
            "Replaced malformed byte sequences while decoding {} attachment",
            encoding.name()
        );
    }

    Ok(text.into_owned())
}

/// Normalize decoded text: unify line breaks, drop control characters and
/// trailing spaces, transliterate to ASCII and trim.
pub fn normalize_text(text: &str) -> Result<String, StatementError> {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let normalized = unified
        .lines()
        .map(|line| to_ascii(line).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n");

    let normalized = normalized.trim();
    if normalized.is_empty() {
        return Err(StatementError::EmptyInput);
    }

    Ok(normalized.to_string())
}

fn to_ascii(line: &str) -> String {
    line.nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter_map(|c| match c {
            '\t' => Some(' '),
            c if c.is_ascii_control() => None,
            c if c.is_ascii() => Some(c),
            c if c.is_whitespace() => Some(' '),
            c if c.is_control() => None,
            c => Some(fold_letter(c).unwrap_or('?')),
        })
        .collect()
}

/// Single-letter stand-ins for characters NFD leaves whole
fn fold_letter(c: char) -> Option<char> {
    let folded = match c {
        'Ł' => 'L',
        'ł' => 'l',
        'Đ' | 'Ð' => 'D',
        'đ' | 'ð' => 'd',
        'ß' => 's',
        'Æ' => 'A',
        'æ' => 'a',
        'Ø' | 'Œ' => 'O',
        'ø' | 'œ' => 'o',
        'Þ' => 'T',
        'þ' => 't',
        'Ħ' => 'H',
        'ħ' => 'h',
        'ı' => 'i',
        '‚' | '‘' | '’' => '\'',
        '„' | '“' | '”' => '"',
        '–' | '—' => '-',
        _ => return None,
    };
    Some(folded)
}

fn conversion_failure(encoding: &str, reason: &str) -> StatementError {
    StatementError::EncodingConversionFailure {
        encoding: encoding.to_string(),
        reason: reason.to_string(),
    }
}
