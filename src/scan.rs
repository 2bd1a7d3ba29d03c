//! Anchor/landing scanner over unstructured source text.
//!
//! A match starts at a literal anchor token and ends at the closing
//! parenthesis of the nearest following landing call whose argument list is a
//! single brace-delimited object (`landing({ ... })`). Brace depth is tracked
//! explicitly, so nested objects inside the argument list are consumed whole.
//! String literals and comments inside the argument list are skipped while
//! counting braces.

/// A span of source text from an anchor token through the landing call's
/// closing parenthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Byte offset of the first anchor byte (inclusive)
    pub start: usize,
    /// Byte offset just past the landing call's `)` (exclusive)
    pub end: usize,
    /// The matched text, `source[start..end]`
    pub text: String,
}

impl Match {
    /// Length of the match in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 1-based line on which the match starts.
    pub fn line_number(&self, source: &str) -> usize {
        source[..self.start].matches('\n').count() + 1
    }
}

/// Pairs each anchor token with the nearest qualifying landing call after it.
///
/// # Example
///
/// ```
/// use callchain_splicer::Matcher;
///
/// let matcher = Matcher::new("anchor(", "landing(");
/// let matches = matcher.find_matches("foo.anchor(1).middle().landing({a: 1}).more()");
///
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches[0].text, "anchor(1).middle().landing({a: 1})");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    anchor: String,
    landing: String,
}

impl Matcher {
    pub fn new(anchor: impl Into<String>, landing: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            landing: landing.into(),
        }
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    pub fn landing(&self) -> &str {
        &self.landing
    }

    /// Find all matches in document order.
    ///
    /// Matches never overlap: scanning resumes after the end of each match, so
    /// any anchors between an anchor and its landing call are consumed by the
    /// earlier match. An anchor with no qualifying landing call before the end
    /// of the text produces nothing.
    pub fn find_matches(&self, text: &str) -> Vec<Match> {
        let mut matches = Vec::new();
        if self.anchor.is_empty() || self.landing.is_empty() {
            return matches;
        }

        let mut cursor = 0;
        while let Some(offset) = text[cursor..].find(&self.anchor) {
            let start = cursor + offset;
            // Landing qualification does not depend on the anchor, so if the
            // nearest anchor has no landing, no later anchor has one either.
            let Some(end) = self.find_landing(text, start + self.anchor.len()) else {
                break;
            };
            matches.push(Match {
                start,
                end,
                text: text[start..end].to_string(),
            });
            cursor = end;
        }

        matches
    }

    /// Find the end of the nearest qualifying landing call at or after `from`.
    fn find_landing(&self, text: &str, from: usize) -> Option<usize> {
        let step = self.landing.chars().next().map_or(1, char::len_utf8);
        let mut cursor = from;

        while let Some(offset) = text[cursor..].find(&self.landing) {
            let landing_start = cursor + offset;
            if let Some(end) = self.landing_call_end(text, landing_start + self.landing.len()) {
                return Some(end);
            }
            cursor = landing_start + step;
        }

        None
    }

    /// Check that `text[pos..]` continues the landing token with a
    /// `({ ... })` argument list and return the offset past its `)`.
    fn landing_call_end(&self, text: &str, pos: usize) -> Option<usize> {
        let bytes = text.as_bytes();
        let mut pos = pos;

        if !self.landing.ends_with('(') {
            pos = skip_whitespace(bytes, pos);
            if bytes.get(pos) != Some(&b'(') {
                return None;
            }
            pos += 1;
        }

        pos = skip_whitespace(bytes, pos);
        if bytes.get(pos) != Some(&b'{') {
            return None;
        }

        pos = skip_whitespace(bytes, balanced_brace_end(bytes, pos)?);
        if bytes.get(pos) != Some(&b')') {
            return None;
        }

        Some(pos + 1)
    }
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}

/// Given `bytes[open] == b'{'`, return the offset just past its matching `}`.
///
/// Returns `None` when the text ends before the braces balance.
fn balanced_brace_end(bytes: &[u8], open: usize) -> Option<usize> {
    debug_assert_eq!(bytes.get(open), Some(&b'{'));

    let mut depth = 0usize;
    let mut pos = open;

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos + 1);
                }
            }
            quote @ (b'"' | b'\'' | b'`') => {
                pos = string_end(bytes, pos + 1, quote)?;
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                pos = bytes[pos..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |nl| pos + nl + 1);
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                let close = bytes[pos + 2..].windows(2).position(|w| w == b"*/")?;
                pos = pos + 2 + close + 2;
                continue;
            }
            _ => {}
        }
        pos += 1;
    }

    None
}

/// Offset just past the closing `quote`, honouring backslash escapes.
fn string_end(bytes: &[u8], mut pos: usize, quote: u8) -> Option<usize> {
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b if b == quote => return Some(pos + 1),
            _ => pos += 1,
        }
    }
    None
}
