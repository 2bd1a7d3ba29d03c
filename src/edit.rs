use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: a zero-width splice with verification.
///
/// `new_text` is inserted at `offset`. The text in `[span_start, offset)` must
/// satisfy `expected_before`, so an insertion planned against one version of a
/// document is never spliced into another.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Insertion does nothing until passed to apply_insertions()"]
pub struct Insertion {
    /// Start of the verified span preceding the insertion point
    pub span_start: usize,
    /// Byte offset the text is inserted at
    pub offset: usize,
    /// Text to insert
    pub new_text: String,
    /// Verification of what we expect to find in [span_start, offset)
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
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed for span [{span_start}, {offset})")]
    BeforeTextMismatch {
        span_start: usize,
        offset: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in text of length {text_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        text_len: usize,
    },

    #[error("Byte offset {0} is not on a UTF-8 character boundary")]
    NotCharBoundary(usize),

    #[error("Insertions overlap or are out of order: span at {next} starts before {previous}")]
    Unordered { previous: usize, next: usize },

    #[error("File changed on disk since it was read: {0}")]
    ConcurrentModification(PathBuf),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Insertion {
    /// Create an insertion at the end of `span_text`, which starts at `span_start`.
    pub fn after(span_start: usize, span_text: &str, new_text: impl Into<String>) -> Self {
        Self {
            span_start,
            offset: span_start + span_text.len(),
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(span_text),
        }
    }

    fn validate(&self, content: &str) -> Result<(), EditError> {
        if self.span_start > self.offset || self.offset > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.span_start,
                byte_end: self.offset,
                text_len: content.len(),
            });
        }

        for boundary in [self.span_start, self.offset] {
            if !content.is_char_boundary(boundary) {
                return Err(EditError::NotCharBoundary(boundary));
            }
        }

        let current = &content[self.span_start..self.offset];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                span_start: self.span_start,
                offset: self.offset,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        Ok(())
    }
}

/// Apply insertions to `content` in a single pass.
///
/// Insertions must be ordered by offset with non-overlapping verified spans.
/// Every insertion is validated before any text is produced.
pub fn apply_insertions(content: &str, insertions: &[Insertion]) -> Result<String, EditError> {
    for window in insertions.windows(2) {
        let (previous, next) = (&window[0], &window[1]);
        if next.span_start < previous.offset {
            return Err(EditError::Unordered {
                previous: previous.offset,
                next: next.span_start,
            });
        }
    }

    for insertion in insertions {
        insertion.validate(content)?;
    }

    let added: usize = insertions.iter().map(|i| i.new_text.len()).sum();
    let mut output = String::with_capacity(content.len() + added);
    let mut cursor = 0;

    for insertion in insertions {
        output.push_str(&content[cursor..insertion.offset]);
        output.push_str(&insertion.new_text);
        cursor = insertion.offset;
    }
    output.push_str(&content[cursor..]);

    Ok(output)
}

/// Hash of a file's bytes taken at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSnapshot {
    hash: u64,
    len: usize,
}

impl ContentSnapshot {
    pub fn of(content: &[u8]) -> Self {
        Self {
            hash: xxh3_64(content),
            len: content.len(),
        }
    }

    /// Re-read `path` and fail if its contents differ from the snapshot.
    pub fn verify(&self, path: &Path) -> Result<(), EditError> {
        let current = fs::read(path)?;
        if Self::of(&current) != *self {
            return Err(EditError::ConcurrentModification(path.to_path_buf()));
        }
        Ok(())
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the original file is left untouched.
/// The original file's permissions are carried over to the replacement.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;

    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
