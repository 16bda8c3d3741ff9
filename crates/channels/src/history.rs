use slackbase_common::Timestamp;

/// Shape of a history request against the source.
///
/// Recomputed on every reconciliation pass, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryWindow {
    /// Maximum number of records. `None` lets the source page through
    /// everything matching `oldest`.
    pub count: Option<usize>,
    /// Exclusive lower bound: only records strictly newer are returned.
    pub oldest: Option<Timestamp>,
}

impl HistoryWindow {
    /// The `count` most recent records.
    pub fn latest(count: usize) -> Self {
        Self {
            count: Some(count),
            oldest: None,
        }
    }

    /// Everything strictly newer than `oldest`.
    pub fn since(oldest: Timestamp) -> Self {
        Self {
            count: None,
            oldest: Some(oldest),
        }
    }

    /// Whether a record at `time` falls inside the window's lower bound.
    pub fn admits(&self, time: Timestamp) -> bool {
        self.oldest.is_none_or(|oldest| time > oldest)
    }
}
