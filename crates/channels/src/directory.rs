use std::collections::{BTreeMap, HashMap, HashSet};

use {tokio::sync::Mutex, tracing::debug};

use crate::{
    Result,
    plugin::{DestinationChat, SourceChannel, SourceWorkspace},
};

/// Channel names on both sides of the relay.
///
/// Maps source channel names to their ids and records which names the
/// destination team can receive. Refreshed when the source connects.
#[derive(Debug, Clone, Default)]
pub struct ChannelDirectory {
    by_name: BTreeMap<String, String>,
    available: HashSet<String>,
}

impl ChannelDirectory {
    pub fn new(
        source: impl IntoIterator<Item = SourceChannel>,
        destination: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            by_name: source.into_iter().map(|c| (c.name, c.id)).collect(),
            available: destination.into_iter().collect(),
        }
    }

    /// Fetch both channel lists.
    pub async fn load(
        source: &dyn SourceWorkspace,
        destination: &dyn DestinationChat,
        team: &str,
    ) -> Result<Self> {
        let source_channels = source.list_channels().await?;
        let destination_channels = destination.list_channels(team).await?;
        debug!(
            team,
            source = source_channels.len(),
            destination = destination_channels.len(),
            "loaded channel directory"
        );
        Ok(Self::new(source_channels, destination_channels))
    }

    /// Source id for a channel name.
    pub fn source_id(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// Channel name for a source id.
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.by_name
            .iter()
            .find(|(_, channel_id)| channel_id.as_str() == id)
            .map(|(name, _)| name.as_str())
    }

    /// Whether the destination team has a channel with this name.
    pub fn is_available(&self, name: &str) -> bool {
        self.available.contains(name)
    }

    /// `(name, source id)` of every source channel, ordered by name.
    pub fn channels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_name
            .iter()
            .map(|(name, id)| (name.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Source user id → display name, filled on first sighting.
///
/// Entries are never evicted or refreshed. The lock is held across the
/// lookup so concurrent first sightings of one user issue a single request.
#[derive(Debug, Default)]
pub struct UserNameCache {
    names: Mutex<HashMap<String, String>>,
}

impl UserNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display name for `user_id`, asking `source` only on a cache miss.
    pub async fn resolve(&self, source: &dyn SourceWorkspace, user_id: &str) -> Result<String> {
        let mut names = self.names.lock().await;
        if let Some(name) = names.get(user_id) {
            return Ok(name.clone());
        }
        let user = source.user_info(user_id).await?;
        let name = title_case(&user.name);
        debug!(user_id, name = %name, "cached user name");
        names.insert(user_id.to_string(), name.clone());
        Ok(name)
    }

    #[cfg(test)]
    pub(crate) async fn get(&self, user_id: &str) -> Option<String> {
        self.names.lock().await.get(user_id).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.names.lock().await.len()
    }
}

/// Upper-case the first letter of every word.
///
/// Letters, digits and `_` form words; everything else separates them.
/// Remaining letters keep their case.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for ch in name.chars() {
        if at_word_start && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use {
        async_trait::async_trait, rstest::rstest, tokio::sync::mpsc,
        tokio_util::sync::CancellationToken,
    };

    use super::*;
    use crate::{
        Error, HistoryWindow,
        plugin::{SourceEvent, SourceRecord, SourceUser},
    };

    #[derive(Default)]
    struct CountingSource {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl SourceWorkspace for CountingSource {
        async fn connect(
            &self,
            _events: mpsc::Sender<SourceEvent>,
            _cancel: CancellationToken,
        ) -> Result<()> {
            Ok(())
        }

        async fn workspace_domain(&self) -> Result<String> {
            Ok("acme".into())
        }

        async fn list_channels(&self) -> Result<Vec<SourceChannel>> {
            Ok(vec![])
        }

        async fn channel_info(&self, channel_id: &str) -> Result<SourceChannel> {
            Err(Error::channel_not_found(channel_id))
        }

        async fn user_info(&self, user_id: &str) -> Result<SourceUser> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            match user_id {
                "U1" => Ok(SourceUser {
                    id: "U1".into(),
                    name: "john.doe".into(),
                }),
                other => Err(Error::user_not_found(other)),
            }
        }

        async fn channel_history(
            &self,
            _channel_id: &str,
            _window: &HistoryWindow,
        ) -> Result<Vec<SourceRecord>> {
            Ok(vec![])
        }
    }

    #[rstest]
    #[case("alice", "Alice")]
    #[case("john.doe", "John.Doe")]
    #[case("mary-ann o'neil", "Mary-Ann O'Neil")]
    #[case("snake_case", "Snake_case")]
    #[case("r2d2 c3po", "R2d2 C3po")]
    #[case("", "")]
    fn title_cases_words(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(title_case(input), expected);
    }

    #[test]
    fn directory_lookups() {
        let dir = ChannelDirectory::new(
            vec![
                SourceChannel {
                    id: "C1".into(),
                    name: "general".into(),
                },
                SourceChannel {
                    id: "C2".into(),
                    name: "random".into(),
                },
            ],
            vec!["general".to_string()],
        );
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.source_id("random"), Some("C2"));
        assert_eq!(dir.name_of("C1"), Some("general"));
        assert!(dir.is_available("general"));
        assert!(!dir.is_available("random"));
        let names: Vec<_> = dir.channels().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["general", "random"]);
    }

    #[tokio::test]
    async fn user_cache_asks_source_once() {
        let source = CountingSource::default();
        let cache = UserNameCache::new();
        assert_eq!(cache.resolve(&source, "U1").await.unwrap(), "John.Doe");
        assert_eq!(cache.resolve(&source, "U1").await.unwrap(), "John.Doe");
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("U1").await.as_deref(), Some("John.Doe"));
    }

    #[tokio::test]
    async fn concurrent_first_sightings_are_serialized() {
        let source = Arc::new(CountingSource::default());
        let cache = Arc::new(UserNameCache::new());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let source = Arc::clone(&source);
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                cache.resolve(source.as_ref(), "U1").await.unwrap()
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), "John.Doe");
        }
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_user_is_not_cached() {
        let source = CountingSource::default();
        let cache = UserNameCache::new();
        let err = cache.resolve(&source, "U404").await.unwrap_err();
        assert!(matches!(err, Error::DirectoryLookup { kind: "user", .. }));
        assert_eq!(cache.len().await, 0);
    }
}
