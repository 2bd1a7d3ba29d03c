pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    Metadata, RuleConfig, RuleDefinition, ValidationError, ValidationIssue, DEFAULT_ANCHOR,
    DEFAULT_FRAGMENT, DEFAULT_INDENT, DEFAULT_LANDING, DEFAULT_RULE_ID, DEFAULT_SUCCESS_MESSAGE,
    DEFAULT_TARGET,
};
