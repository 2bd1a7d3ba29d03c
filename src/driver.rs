//! Read, rewrite and write back a single target file
//!
//! The driver reads the whole file once, runs every configured rule over the
//! in-memory text in order, and replaces the file atomically. Nothing is
//! written when the text is unchanged or in dry-run mode.

use crate::config::{RuleConfig, ValidationError};
use crate::edit::{atomic_write, ContentSnapshot, EditError};
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::scan::Match;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Failed to determine working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8: {source}")]
    Utf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("invalid rule config: {0}")]
    Config(#[from] ValidationError),

    #[error("Failed to rewrite {path}: {source}")]
    Edit {
        path: PathBuf,
        #[source]
        source: EditError,
    },
}

/// How a run is carried out.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Target file; relative paths resolve against the workspace
    pub path: PathBuf,
    /// Rules applied in order
    pub config: RuleConfig,
    /// Compute the rewrite without touching the file
    pub dry_run: bool,
    /// Insert even where the fragment is already present
    pub allow_duplicates: bool,
    /// Workspace root; the current directory when unset
    pub workspace: Option<PathBuf>,
}

impl RunOptions {
    /// Options for the built-in rule against `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: RuleConfig::builtin(),
            dry_run: false,
            allow_duplicates: false,
            workspace: None,
        }
    }

    pub fn config(mut self, config: RuleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    pub fn workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }
}

/// Per-rule outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    pub id: String,
    /// Matches found in the text as it stood when this rule ran
    pub matches: Vec<Match>,
    /// 1-based starting line of each match in that text
    pub lines: Vec<usize>,
    pub applied: usize,
    pub already_applied: usize,
}

/// Outcome of a run over one file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RunReport should be checked for what was written"]
pub struct RunReport {
    /// Canonical path of the target file
    pub path: PathBuf,
    pub original: String,
    pub rewritten: String,
    pub rules: Vec<RuleReport>,
    /// Whether the file on disk was replaced
    pub written: bool,
}

impl RunReport {
    pub fn total_applied(&self) -> usize {
        self.rules.iter().map(|r| r.applied).sum()
    }

    pub fn total_already_applied(&self) -> usize {
        self.rules.iter().map(|r| r.already_applied).sum()
    }

    pub fn is_unchanged(&self) -> bool {
        self.original == self.rewritten
    }
}

/// Rewrite `path` with the built-in rule, resolving it against the
/// current directory.
pub fn run(path: impl AsRef<Path>) -> Result<RunReport, DriverError> {
    run_with(&RunOptions::new(path.as_ref()))
}

pub fn run_with(options: &RunOptions) -> Result<RunReport, DriverError> {
    options.config.validate()?;

    let workspace = match &options.workspace {
        Some(workspace) => workspace.clone(),
        None => env::current_dir().map_err(DriverError::WorkingDirectory)?,
    };
    let guard = WorkspaceGuard::new(&workspace)?;
    let path = guard.validate_path(&options.path)?;

    let bytes = fs::read(&path).map_err(|source| DriverError::Read {
        path: path.clone(),
        source,
    })?;
    let snapshot = ContentSnapshot::of(&bytes);
    let original = String::from_utf8(bytes).map_err(|source| DriverError::Utf8 {
        path: path.clone(),
        source,
    })?;

    let edit_error = |source| DriverError::Edit {
        path: path.clone(),
        source,
    };

    let mut text = original.clone();
    let mut rules = Vec::with_capacity(options.config.rules.len());

    for rule in &options.config.rules {
        let matches = rule.matcher().find_matches(&text);
        let injector = rule
            .injector()
            .skip_applied(rule.skip_applied && !options.allow_duplicates);
        let injection = injector.inject(&text, &matches).map_err(edit_error)?;

        rules.push(RuleReport {
            id: rule.id.clone(),
            lines: matches.iter().map(|m| m.line_number(&text)).collect(),
            matches,
            applied: injection.applied,
            already_applied: injection.already_applied,
        });
        text = injection.text;
    }

    let written = !options.dry_run && text != original;
    if written {
        write_back(&guard, &path, &snapshot, &text)?;
    }

    Ok(RunReport {
        path,
        original,
        rewritten: text,
        rules,
        written,
    })
}

/// Replace `path` with `text`, unless the file no longer matches `snapshot`.
fn write_back(
    guard: &WorkspaceGuard,
    path: &Path,
    snapshot: &ContentSnapshot,
    text: &str,
) -> Result<(), DriverError> {
    let edit_error = |source| DriverError::Edit {
        path: path.to_path_buf(),
        source,
    };

    let target = guard.revalidate(path)?;
    snapshot.verify(&target).map_err(edit_error)?;
    atomic_write(&target, text.as_bytes()).map_err(edit_error)?;
    Ok(())
}
