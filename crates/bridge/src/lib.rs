//! The relay itself.
//!
//! [`Bridge`] consumes the source's event stream. On the first connect it
//! runs one [`HistoryReconciler`] pass over every shared channel; after that
//! each new message goes straight through the [`RelayForwarder`].

pub mod bridge;
pub mod forward;
pub mod reconcile;

pub use {
    bridge::{Bridge, BridgeSettings},
    forward::RelayForwarder,
    reconcile::{BackfillPlan, ChannelOutcome, ChannelReport, HistoryReconciler, SyncReport, plan_backfill},
    slackbase_channels::{Error, Result},
};
