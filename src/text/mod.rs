//! Encoding and line-ending handling.
//!
//! Files are decoded once into a [`DecodedText`] that remembers the source
//! encoding, BOM and line-ending convention. Matching and splicing operate on
//! exact byte offsets of the decoded text, so untouched lines keep their
//! original terminators even in files with mixed line endings.

pub mod encoding;
pub mod errors;
pub mod lines;

pub use encoding::{DecodedText, EncodingConfidence};
pub use errors::TextError;
pub use lines::{LineEnding, LineEndingStats, LineIndex, LineSpan, Position};
