//! Collaborator seams for the relay.
//!
//! The Slack workspace implements [`SourceWorkspace`], the Keybase CLI
//! gateway implements [`DestinationChat`]. The bridge only talks to these
//! traits, plus the shared name caches in [`directory`].

pub mod directory;
pub mod error;
pub mod gating;
pub mod history;
pub mod plugin;

pub use {
    directory::{ChannelDirectory, UserNameCache, title_case},
    error::{Error, Result},
    history::HistoryWindow,
    plugin::{
        DestinationChat, MessageEvent, SourceChannel, SourceEvent, SourceRecord, SourceUser,
        SourceWorkspace,
    },
};
