use crate::text::errors::TextError;
use crate::text::lines::{LineEnding, LineEndingStats};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use serde::Serialize;

/// How the encoding of a file was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingConfidence {
    /// Byte order mark present.
    Bom,
    /// Bytes are valid UTF-8.
    ValidUtf8,
    /// Statistical guess without decode errors.
    Guessed,
    /// Guessing failed; decoded as windows-1252, which maps every byte.
    Fallback,
}

/// File content decoded to a `String`, with everything needed to write it
/// back byte-for-byte in the same form.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
    pub has_bom: bool,
    pub line_ending: LineEnding,
    pub mixed_line_endings: bool,
    pub confidence: EncodingConfidence,
}

impl DecodedText {
    /// Decode raw bytes, detecting encoding and line endings.
    pub fn decode(bytes: &[u8]) -> Self {
        let (text, encoding, has_bom, confidence) = decode_bytes(bytes);
        let stats = LineEndingStats::scan(&text);
        Self {
            text,
            encoding,
            has_bom,
            line_ending: stats.dominant(),
            mixed_line_endings: stats.is_mixed(),
            confidence,
        }
    }

    /// Wrap freshly authored text (no file on disk yet).
    pub fn new_utf8(text: impl Into<String>) -> Self {
        let text = text.into();
        let stats = LineEndingStats::scan(&text);
        Self {
            text,
            encoding: UTF_8,
            has_bom: false,
            line_ending: stats.dominant(),
            mixed_line_endings: stats.is_mixed(),
            confidence: EncodingConfidence::ValidUtf8,
        }
    }

    /// Encoding name as reported by `encoding_rs` (e.g. `UTF-8`).
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Warning to surface when the encoding was not established reliably.
    pub fn encoding_warning(&self) -> Option<String> {
        match self.confidence {
            EncodingConfidence::Fallback => Some(format!(
                "encoding detection failed; decoded as {} with reduced confidence",
                self.encoding.name()
            )),
            EncodingConfidence::Guessed => Some(format!(
                "encoding guessed as {}; verify the result",
                self.encoding.name()
            )),
            _ => None,
        }
    }

    /// Encode `text` with this file's encoding and BOM.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, TextError> {
        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            return Ok(encode_utf16(text, self.encoding == UTF_16BE, self.has_bom));
        }

        let mut out = Vec::with_capacity(text.len() + 3);
        if self.has_bom && self.encoding == UTF_8 {
            out.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
        }

        let (encoded, _, had_unmappable) = self.encoding.encode(text);
        if had_unmappable {
            return Err(TextError::Unencodable {
                encoding: self.encoding.name(),
            });
        }
        out.extend_from_slice(&encoded);
        Ok(out)
    }
}

fn decode_bytes(bytes: &[u8]) -> (String, &'static Encoding, bool, EncodingConfidence) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (text.into_owned(), encoding, true, EncodingConfidence::Bom);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (
            text.to_string(),
            UTF_8,
            false,
            EncodingConfidence::ValidUtf8,
        );
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);
    let (text, had_errors) = guess.decode_without_bom_handling(bytes);
    if !had_errors {
        return (text.into_owned(), guess, false, EncodingConfidence::Guessed);
    }

    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    (
        text.into_owned(),
        WINDOWS_1252,
        false,
        EncodingConfidence::Fallback,
    )
}

// encoding_rs only decodes UTF-16; its encoder maps UTF-16 to UTF-8 output.
fn encode_utf16(text: &str, big_endian: bool, bom: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2 + 2);
    let mut push = |unit: u16| {
        if big_endian {
            out.extend_from_slice(&unit.to_be_bytes());
        } else {
            out.extend_from_slice(&unit.to_le_bytes());
        }
    };
    if bom {
        push(0xFEFF);
    }
    for unit in text.encode_utf16() {
        push(unit);
    }
    out
}
