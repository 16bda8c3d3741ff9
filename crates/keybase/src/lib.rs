//! Keybase chat destination.
//!
//! Every call goes through `keybase chat api -m <json>`. Keybase message
//! bodies carry no structured sender or time fields, so both are embedded
//! into the text itself by [`metadata`].

pub mod api;
pub mod error;
pub mod gateway;
pub mod metadata;
pub mod process;

pub use {
    error::{Error, Result},
    gateway::KeybaseGateway,
    process::{ApiRunner, CliRunner},
};
