//! Fragment injection - splices a fixed fragment after every match
//!
//! [`rewrite`] is the plain single-pass splice. [`Injector`] plans the same
//! splice as verified [`Insertion`]s and skips matches that are already
//! followed by the fragment, so re-running it on its own output is a no-op.

use crate::config::schema::{DEFAULT_FRAGMENT, DEFAULT_INDENT};
use crate::edit::{apply_insertions, EditError, Insertion};
use crate::scan::Match;

/// Fixed text placed on a new line after each match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionFragment {
    /// The fragment itself
    pub text: String,
    /// Literal whitespace placed before the fragment on its new line
    pub indent: String,
}

impl InsertionFragment {
    pub fn new(text: impl Into<String>, indent: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            indent: indent.into(),
        }
    }

    /// The exact text spliced in after a match: newline, indentation, fragment.
    pub fn splice_text(&self) -> String {
        format!("\n{}{}", self.indent, self.text)
    }
}

impl Default for InsertionFragment {
    fn default() -> Self {
        Self::new(DEFAULT_FRAGMENT, DEFAULT_INDENT)
    }
}

/// Replace every match with `match.text + "\n" + indent + fragment`.
///
/// Text outside the matches is copied verbatim. `matches` must come from
/// `text` and be ordered and non-overlapping, as [`crate::Matcher`] produces them.
pub fn rewrite(text: &str, matches: &[Match], fragment: &InsertionFragment) -> String {
    let splice = fragment.splice_text();
    let mut output = String::with_capacity(text.len() + matches.len() * splice.len());
    let mut cursor = 0;

    for m in matches {
        output.push_str(&text[cursor..m.start]);
        output.push_str(&m.text);
        output.push_str(&splice);
        cursor = m.end;
    }
    output.push_str(&text[cursor..]);

    output
}

/// Outcome of one injection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Injection carries the rewritten text"]
pub struct Injection {
    /// The full rewritten text
    pub text: String,
    /// Matches that received the fragment
    pub applied: usize,
    /// Matches skipped because the fragment already follows them
    pub already_applied: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injector {
    fragment: InsertionFragment,
    skip_applied: bool,
}

impl Injector {
    /// Create an injector that skips matches already followed by the fragment.
    pub fn new(fragment: InsertionFragment) -> Self {
        Self {
            fragment,
            skip_applied: true,
        }
    }

    /// Toggle the already-applied check. With it off, every run inserts
    /// another copy of the fragment after each match.
    pub fn skip_applied(mut self, skip: bool) -> Self {
        self.skip_applied = skip;
        self
    }

    pub fn fragment(&self) -> &InsertionFragment {
        &self.fragment
    }

    /// Whether the fragment already follows `m` (ignoring whitespace on
    /// both sides). Offsets outside `text` are never applied; they are left
    /// for [`apply_insertions`] to reject.
    pub fn is_applied(&self, text: &str, m: &Match) -> bool {
        let fragment = self.fragment.text.trim_start();
        text.get(m.end..)
            .is_some_and(|rest| rest.trim_start().starts_with(fragment))
    }

    /// Plan verified insertions for `matches`, returning them together with
    /// the number of matches skipped as already applied.
    pub fn plan(&self, text: &str, matches: &[Match]) -> (Vec<Insertion>, usize) {
        let splice = self.fragment.splice_text();
        let mut insertions = Vec::with_capacity(matches.len());
        let mut skipped = 0;

        for m in matches {
            if self.skip_applied && self.is_applied(text, m) {
                skipped += 1;
                continue;
            }
            insertions.push(Insertion::after(m.start, &m.text, splice.as_str()));
        }

        (insertions, skipped)
    }

    /// Splice the fragment after every match of `matches` in `text`.
    pub fn inject(&self, text: &str, matches: &[Match]) -> Result<Injection, EditError> {
        let (insertions, already_applied) = self.plan(text, matches);
        let rewritten = apply_insertions(text, &insertions)?;

        Ok(Injection {
            text: rewritten,
            applied: insertions.len(),
            already_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Matcher;

    fn fragment() -> InsertionFragment {
        InsertionFragment::new("FRAGMENT", "  ")
    }

    fn matcher() -> Matcher {
        Matcher::new("anchor(", "landing(")
    }

    #[test]
    fn test_rewrite_single_match() {
        let text = "foo.anchor(1).middle().landing({a: 1}).more()";
        let matches = matcher().find_matches(text);

        let output = rewrite(text, &matches, &fragment());
        assert_eq!(
            output,
            "foo.anchor(1).middle().landing({a: 1})\n  FRAGMENT.more()"
        );
    }

    #[test]
    fn test_rewrite_without_matches_is_identity() {
        let text = "nothing to see here.landing({a: 1})";
        let output = rewrite(text, &matcher().find_matches(text), &fragment());
        assert_eq!(output, text);
    }

    #[test]
    fn test_rewrite_preserves_text_between_matches() {
        let text = "x.anchor().landing({});\n// between\ny.anchor().landing({});\n// after\n";
        let output = rewrite(text, &matcher().find_matches(text), &fragment());

        assert_eq!(
            output,
            "x.anchor().landing({})\n  FRAGMENT;\n// between\ny.anchor().landing({})\n  FRAGMENT;\n// after\n"
        );
    }

    #[test]
    fn test_default_fragment_is_compute_budget() {
        let fragment = InsertionFragment::default();
        assert!(fragment.text.starts_with(".preInstructions("));
        assert_eq!(fragment.indent, " ".repeat(10));
    }

    #[test]
    fn test_injector_matches_rewrite_when_unguarded() {
        let text = "a.anchor().landing({ b: 1 }).rpc();\nc.anchor().landing({ d: 2 }).rpc();";
        let matches = matcher().find_matches(text);

        let injection = Injector::new(fragment())
            .skip_applied(false)
            .inject(text, &matches)
            .unwrap();

        assert_eq!(injection.text, rewrite(text, &matches, &fragment()));
        assert_eq!(injection.applied, 2);
        assert_eq!(injection.already_applied, 0);
    }

    #[test]
    fn test_injector_skips_applied_matches() {
        let text = "a.anchor().landing({})\n  FRAGMENT.rpc();\nb.anchor().landing({}).rpc();";
        let matches = matcher().find_matches(text);

        let injection = Injector::new(fragment()).inject(text, &matches).unwrap();

        assert_eq!(injection.applied, 1);
        assert_eq!(injection.already_applied, 1);
        assert_eq!(
            injection.text,
            "a.anchor().landing({})\n  FRAGMENT.rpc();\nb.anchor().landing({})\n  FRAGMENT.rpc();"
        );
    }

    #[test]
    fn test_guarded_injection_is_idempotent() {
        let text = "a.anchor().landing({}).rpc();";
        let injector = Injector::new(fragment());

        let first = injector.inject(text, &matcher().find_matches(text)).unwrap();
        let second = injector
            .inject(&first.text, &matcher().find_matches(&first.text))
            .unwrap();

        assert_eq!(second.text, first.text);
        assert_eq!(second.applied, 0);
        assert_eq!(second.already_applied, 1);
    }

    #[test]
    fn test_unguarded_injection_duplicates() {
        let text = "a.anchor().landing({}).rpc();";
        let injector = Injector::new(fragment()).skip_applied(false);

        let first = injector.inject(text, &matcher().find_matches(text)).unwrap();
        let second = injector
            .inject(&first.text, &matcher().find_matches(&first.text))
            .unwrap();

        assert_eq!(second.text.matches("FRAGMENT").count(), 2);
    }

    #[test]
    fn test_inject_rejects_stale_matches() {
        let matches = matcher().find_matches("a.anchor().landing({ x: 1 })");
        let result = Injector::new(fragment()).inject("a.anchor().landing({ y: 2 })", &matches);
        assert!(matches!(result, Err(EditError::BeforeTextMismatch { .. })));
    }

    #[test]
    fn test_inject_rejects_matches_past_end_of_text() {
        let matches = matcher().find_matches("a.anchor().landing({ x: 1 })");
        let result = Injector::new(fragment()).inject("short", &matches);
        assert!(matches!(result, Err(EditError::InvalidByteRange { .. })));
    }

    #[test]
    fn test_inject_rejects_match_ending_inside_char() {
        let matches = vec![Match {
            start: 0,
            end: 1,
            text: "x".to_string(),
        }];
        let result = Injector::new(fragment()).inject("éé", &matches);
        assert!(matches!(result, Err(EditError::NotCharBoundary(1))));
    }

    #[test]
    fn test_leading_whitespace_fragment_is_recognised() {
        let text = "anchor().landing({})";
        let injector = Injector::new(InsertionFragment::new(" F", ""));

        let first = injector.inject(text, &matcher().find_matches(text)).unwrap();
        let second = injector
            .inject(&first.text, &matcher().find_matches(&first.text))
            .unwrap();

        assert_eq!(first.text, "anchor().landing({})\n F");
        assert_eq!(second.applied, 0);
        assert_eq!(second.already_applied, 1);
        assert_eq!(second.text, first.text);
    }
}
