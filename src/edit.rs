use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The splice primitive: byte-span replacement with verification.
///
/// Every mutation (replace, insert before/after, append) compiles down to
/// one or more `Edit`s over the decoded text. Intelligence lives in span
/// acquisition, not application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// What we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => content_hash(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(content_hash(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("before-text verification failed at byte {byte_start}: found {found:?}")]
    BeforeTextMismatch { byte_start: usize, found: String },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in text of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("byte range [{byte_start}, {byte_end}) splits a character")]
    NotCharBoundary { byte_start: usize, byte_end: usize },

    #[error("edits overlap at byte {at}")]
    Overlap { at: usize },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Edit {
    /// Create an edit with automatic verification generation.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    /// Pure insertion at `offset`.
    pub fn insert(offset: usize, new_text: impl Into<String>) -> Self {
        Self::new(offset, offset, new_text, "")
    }

    /// Check the edit against `content` and return the text it replaces.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }

        let current = content
            .get(self.byte_start..self.byte_end)
            .ok_or(EditError::NotCharBoundary {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
            })?;

        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    pub fn apply_to(&self, content: &str) -> Result<String, EditError> {
        Self::apply_all(content, std::slice::from_ref(self))
    }

    /// Apply several edits to the same text.
    ///
    /// All offsets refer to `content`. Edits are sorted by start offset and
    /// spliced front to back into a fresh buffer; two insertions at the same
    /// offset keep their given order.
    pub fn apply_all(content: &str, edits: &[Edit]) -> Result<String, EditError> {
        for edit in edits {
            edit.validate(content)?;
        }

        let mut order: Vec<&Edit> = edits.iter().collect();
        order.sort_by_key(|e| (e.byte_start, e.byte_end));
        for pair in order.windows(2) {
            if pair[0].byte_end > pair[1].byte_start {
                return Err(EditError::Overlap {
                    at: pair[1].byte_start,
                });
            }
        }

        let mut out = String::with_capacity(
            content.len() + edits.iter().map(|e| e.new_text.len()).sum::<usize>(),
        );
        let mut cursor = 0;
        for edit in order {
            out.push_str(&content[cursor..edit.byte_start]);
            out.push_str(&edit.new_text);
            cursor = edit.byte_end;
        }
        out.push_str(&content[cursor..]);
        Ok(out)
    }
}

/// Hash used for concurrent-modification and read-back checks.
pub fn content_hash(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Atomic file write: tempfile + fsync + rename, then bump the mtime so
/// watchers and incremental builds see the change.
///
/// Either the full write succeeds or the file is left untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Tempfile in the same directory keeps the rename on one filesystem.
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions)?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_exact_match() {
        let verify = EditVerification::ExactMatch("hello world".to_string());
        assert!(verify.matches("hello world"));
        assert!(!verify.matches("hello"));
    }

    #[test]
    fn verification_uses_hash_for_large_text() {
        let text = "x".repeat(2000);
        let verify = EditVerification::from_text(&text);
        assert!(matches!(verify, EditVerification::Hash(_)));
        assert!(verify.matches(&text));
        assert!(!verify.matches("x"));
    }

    #[test]
    fn invalid_range_is_rejected() {
        let edit = Edit::new(5, 20, "replacement", "");
        assert!(matches!(
            edit.apply_to("hello world"),
            Err(EditError::InvalidByteRange { .. })
        ));
        let inverted = Edit::new(10, 5, "replacement", "");
        assert!(matches!(
            inverted.apply_to("hello world"),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn mismatched_before_text_is_rejected() {
        let edit = Edit::new(0, 5, "HELLO", "howdy");
        assert!(matches!(
            edit.apply_to("hello world"),
            Err(EditError::BeforeTextMismatch { .. })
        ));
    }

    #[test]
    fn split_character_is_rejected() {
        let edit = Edit::new(1, 2, "x", "");
        assert!(matches!(
            edit.apply_to("héllo"),
            Err(EditError::NotCharBoundary { .. }) | Err(EditError::BeforeTextMismatch { .. })
        ));
    }

    #[test]
    fn unordered_edits_splice_by_offset() {
        let text = "line1\nline2\nline3\n";
        let edits = vec![
            Edit::new(12, 17, "LINE3", "line3"),
            Edit::new(0, 5, "LINE1", "line1"),
            Edit::insert(6, "new\n"),
        ];
        assert_eq!(
            Edit::apply_all(text, &edits).unwrap(),
            "LINE1\nnew\nline2\nLINE3\n"
        );
    }

    #[test]
    fn insertions_at_one_offset_keep_their_order() {
        let edits = vec![Edit::insert(2, "1"), Edit::insert(2, "2"), Edit::insert(0, "0")];
        assert_eq!(Edit::apply_all("abcd", &edits).unwrap(), "0ab12cd");
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let edits = vec![Edit::new(0, 5, "a", "hello"), Edit::new(3, 8, "b", "lo wo")];
        assert!(matches!(
            Edit::apply_all("hello world", &edits),
            Err(EditError::Overlap { .. })
        ));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, b"original content").unwrap();

        atomic_write(&file_path, b"modified content").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "modified content");
    }
}
