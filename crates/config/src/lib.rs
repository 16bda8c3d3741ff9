//! Configuration loading, env substitution, and validation.
//!
//! Config files: `slackbase.toml`, `slackbase.yaml`, or `slackbase.json`
//! Searched in `./` then `~/.config/slackbase/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{DisplayConfig, KeybaseConfig, SlackConfig, SlackbaseConfig, SyncConfig},
    validate::{Diagnostic, Severity, ValidationResult, check_config, validate, validate_str},
};
