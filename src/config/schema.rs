use crate::inject::{InsertionFragment, Injector};
use crate::scan::Matcher;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// File rewritten when no target is given.
pub const DEFAULT_TARGET: &str = "bridge1024.ts";
pub const DEFAULT_RULE_ID: &str = "submit-signature-compute-budget";
pub const DEFAULT_ANCHOR: &str = ".submitSignature(";
pub const DEFAULT_LANDING: &str = ".accounts(";
pub const DEFAULT_FRAGMENT: &str =
    ".preInstructions([ComputeBudgetProgram.setComputeUnitLimit({ units: 400_000 })])";
/// Indentation of a chained call inside an `await program.methods` block.
pub const DEFAULT_INDENT: &str = "          ";
/// Confirmation printed after the built-in rule runs.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Added compute budget to all submitSignature calls";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleConfig {
    /// The single compute-budget rule used when no rule file is given.
    pub fn builtin() -> Self {
        Self {
            meta: Metadata {
                name: "compute-budget".to_string(),
                description: Some(
                    "Raise the compute unit limit on every submitSignature call".to_string(),
                ),
                target: Some(DEFAULT_TARGET.to_string()),
            },
            rules: vec![RuleDefinition::builtin()],
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let rule_id = if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
                None
            } else {
                if !seen.insert(rule.id.as_str()) {
                    issues.push(ValidationIssue::DuplicateId {
                        rule_id: rule.id.clone(),
                    });
                }
                Some(rule.id.clone())
            };

            for (field, value) in [
                ("anchor", &rule.anchor),
                ("landing", &rule.landing),
                ("fragment", &rule.fragment),
            ] {
                if value.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        rule_id: rule_id.clone(),
                        field,
                    });
                }
            }

            if !rule.indent.chars().all(|c| c == ' ' || c == '\t') {
                issues.push(ValidationIssue::InvalidCombo {
                    rule_id: rule_id.clone(),
                    message: "indent may only contain spaces and tabs".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Target file, relative to the working directory
    #[serde(default)]
    pub target: Option<String>,
}

/// One anchor/landing/fragment combination.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    pub id: String,
    pub anchor: String,
    pub landing: String,
    pub fragment: String,
    #[serde(default = "default_indent")]
    pub indent: String,
    #[serde(default = "default_skip_applied")]
    pub skip_applied: bool,
}

fn default_indent() -> String {
    DEFAULT_INDENT.to_string()
}

fn default_skip_applied() -> bool {
    true
}

impl RuleDefinition {
    pub fn builtin() -> Self {
        Self {
            id: DEFAULT_RULE_ID.to_string(),
            anchor: DEFAULT_ANCHOR.to_string(),
            landing: DEFAULT_LANDING.to_string(),
            fragment: DEFAULT_FRAGMENT.to_string(),
            indent: default_indent(),
            skip_applied: default_skip_applied(),
        }
    }

    pub fn matcher(&self) -> Matcher {
        Matcher::new(self.anchor.as_str(), self.landing.as_str())
    }

    pub fn fragment(&self) -> InsertionFragment {
        InsertionFragment::new(self.fragment.as_str(), self.indent.as_str())
    }

    pub fn injector(&self) -> Injector {
        Injector::new(self.fragment()).skip_applied(self.skip_applied)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    InvalidCombo {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule config contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is used more than once")
            }
            ValidationIssue::InvalidCombo { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
        }
    }
}
