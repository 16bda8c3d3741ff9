//! Slack workspace as the relay source.
//!
//! Directory and history reads go through the Web API; live messages arrive
//! over Socket Mode, so no public HTTP endpoint is needed. Both ride on
//! slack-morphism.

pub mod error;
pub mod socket;
pub mod workspace;

pub use {
    error::{Error, Result},
    workspace::SlackWorkspace,
};
