//! Callchain Splicer: inserts a fixed fragment into chained method calls
//!
//! A one-shot source rewriter. It finds every call chain that runs from an
//! *anchor* token (e.g. `.submitSignature(`) to the nearest following
//! *landing* call with an object argument (e.g. `.accounts({ ... })`), and
//! splices a fixed fragment onto a new line right after the landing call.
//!
//! # Architecture
//!
//! - [`scan`] finds matches with an explicit scanner that tracks brace depth,
//!   so nested object literals inside the landing call are handled.
//! - [`inject`] turns matches into verified [`edit::Insertion`]s and skips
//!   matches the fragment already follows.
//! - [`driver`] reads the file, applies every configured rule, and replaces
//!   the file atomically (tempfile + fsync + rename).
//!
//! Matching is purely textual. Nothing about the surrounding language's
//! syntax is validated.
//!
//! # Example
//!
//! ```
//! use callchain_splicer::{rewrite, InsertionFragment, Matcher};
//!
//! let text = "foo.anchor(1).middle().landing({a: 1}).more()";
//! let matches = Matcher::new("anchor(", "landing(").find_matches(text);
//! let output = rewrite(text, &matches, &InsertionFragment::new("FRAGMENT", "  "));
//!
//! assert_eq!(output, "foo.anchor(1).middle().landing({a: 1})\n  FRAGMENT.more()");
//! ```

pub mod config;
pub mod driver;
pub mod edit;
pub mod inject;
pub mod safety;
pub mod scan;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, RuleConfig, RuleDefinition};
pub use driver::{run, run_with, DriverError, RunOptions, RunReport};
pub use edit::{apply_insertions, EditError, EditVerification, Insertion};
pub use inject::{rewrite, Injection, Injector, InsertionFragment};
pub use safety::{SafetyError, WorkspaceGuard};
pub use scan::{Match, Matcher};
