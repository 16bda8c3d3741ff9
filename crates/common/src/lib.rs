//! Shared value types and error definitions used across all slackbase crates.

pub mod error;
pub mod message;
pub mod time;

pub use {
    error::{Error, FromMessage, Result},
    message::Message,
    time::Timestamp,
};
