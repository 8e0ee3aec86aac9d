//! Concurrent narration cache
//!
//! One generation task per unique key, tracked in a shared-future registry:
//! callers that request a key while its synthesis is in flight await the
//! same task, so the backend is called at most once per key no matter how
//! many callers race. Entries transition Pending -> Ready or Pending ->
//! Failed exactly once and stay settled until removed.

use crate::key::NarrationKey;
use crate::{SpeechSynthesizer, SynthesisError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type InflightTask = Shared<BoxFuture<'static, Result<PathBuf, SynthesisError>>>;

/// A (text, voice) pair to pre-generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationRequest {
    pub text: String,
    pub voice: String,
}

impl NarrationRequest {
    /// Create a request.
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
        }
    }
}

/// Lifecycle of one cached narration artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// Generation requested, synthesis in flight
    Pending,
    /// Artifact written to disk
    Ready(PathBuf),
    /// Synthesis failed permanently; narration for this key is skipped
    Failed(String),
}

/// One cache entry, keyed by hash of (text, voice).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub text: String,
    pub voice: String,
    pub status: EntryStatus,
}

/// Deduplicated, content-addressed audio pre-generation cache.
///
/// Cheap to clone; clones share the same underlying state.
#[derive(Clone)]
pub struct NarrationCache {
    inner: Arc<Inner>,
}

struct Inner {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    dir: PathBuf,
    entries: DashMap<NarrationKey, CacheEntry>,
    inflight: DashMap<NarrationKey, InflightTask>,
}

impl fmt::Debug for NarrationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationCache")
            .field("dir", &self.inner.dir)
            .field("entries", &self.inner.entries.len())
            .field("inflight", &self.inner.inflight.len())
            .finish()
    }
}

impl NarrationCache {
    /// Create a cache writing artifacts under `dir`.
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                synthesizer,
                dir: dir.into(),
                entries: DashMap::new(),
                inflight: DashMap::new(),
            }),
        }
    }

    /// Kick off generation for every unique request, fire-and-forget.
    ///
    /// Input duplicates collapse to one entry; keys that are already settled
    /// or in flight are left alone. Returns immediately; pair with
    /// [`wait_idle`](Self::wait_idle) when a completion barrier is needed.
    pub fn pregenerate_all<I>(&self, requests: I)
    where
        I: IntoIterator<Item = NarrationRequest>,
    {
        for request in requests {
            let key = NarrationKey::compute(&request.text, &request.voice);
            if let Some(entry) = self.inner.entries.get(&key) {
                if entry.status != EntryStatus::Pending {
                    continue;
                }
            }
            let task = self.ensure_task(key, &request.text, &request.voice);
            let cache = self.clone();
            tokio::spawn(async move {
                let result = task.await;
                cache.settle(key, &result);
            });
        }
    }

    /// Await every in-flight generation and settle its entry.
    pub async fn wait_idle(&self) {
        let pending: Vec<(NarrationKey, InflightTask)> = self
            .inner
            .inflight
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();

        let results =
            futures::future::join_all(pending.iter().map(|(_, task)| task.clone())).await;
        for ((key, _), result) in pending.into_iter().zip(results) {
            self.settle(key, &result);
        }
    }

    /// Path to the audio artifact for (text, voice), generating on demand.
    ///
    /// Ready keys return their path, pending keys await the in-flight task,
    /// cold keys trigger lazy generation. Failed keys return `None`: missing
    /// narration is skipped, never fatal.
    pub async fn audio_path(&self, text: &str, voice: &str) -> Option<PathBuf> {
        let key = NarrationKey::compute(text, voice);

        if let Some(entry) = self.inner.entries.get(&key) {
            match &entry.status {
                EntryStatus::Ready(path) => return Some(path.clone()),
                EntryStatus::Failed(_) => return None,
                EntryStatus::Pending => {}
            }
        }

        let task = self.ensure_task(key, text, voice);
        let result = task.await;
        self.settle(key, &result);

        match result {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(%key, error = %e, "narration unavailable, skipping");
                None
            }
        }
    }

    /// Remove one entry and its on-disk artifact.
    pub async fn remove(&self, text: &str, voice: &str) {
        let key = NarrationKey::compute(text, voice);
        self.inner.inflight.remove(&key);
        if let Some((_, entry)) = self.inner.entries.remove(&key) {
            if let EntryStatus::Ready(path) = entry.status {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(%key, error = %e, "failed to remove narration artifact");
                }
            }
        }
    }

    /// Drop every entry and delete every artifact.
    pub async fn reset(&self) {
        self.inner.inflight.clear();
        let keys: Vec<NarrationKey> = self.inner.entries.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, entry)) = self.inner.entries.remove(&key) {
                if let EntryStatus::Ready(path) = entry.status {
                    let _ = tokio::fs::remove_file(&path).await;
                }
            }
        }
    }

    /// Shutdown: reset and remove the cache directory itself.
    pub async fn cleanup(&self) {
        self.reset().await;
        if let Err(e) = tokio::fs::remove_dir_all(&self.inner.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %e, "failed to remove narration cache directory");
            }
        }
    }

    /// Current status of a key, mainly for diagnostics and tests.
    #[must_use]
    pub fn status(&self, text: &str, voice: &str) -> Option<EntryStatus> {
        let key = NarrationKey::compute(text, voice);
        self.inner.entries.get(&key).map(|e| e.status.clone())
    }

    /// Number of cache entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Whether the cache holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Cache directory.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Get or create the single in-flight task for `key`.
    ///
    /// A settle can land between a caller's status read and this lookup,
    /// leaving the in-flight map empty for a key that is already Ready or
    /// Failed. The vacant branch re-checks the entry and replays the
    /// recorded outcome instead of synthesizing a second time.
    fn ensure_task(&self, key: NarrationKey, text: &str, voice: &str) -> InflightTask {
        match self.inner.inflight.entry(key) {
            Entry::Occupied(occupied) => occupied.get().clone(),
            Entry::Vacant(vacant) => {
                match self.inner.entries.entry(key) {
                    Entry::Occupied(settled) => match &settled.get().status {
                        EntryStatus::Ready(path) => return settled_task(Ok(path.clone())),
                        EntryStatus::Failed(message) => {
                            return settled_task(Err(SynthesisError::Backend(message.clone())));
                        }
                        EntryStatus::Pending => {}
                    },
                    Entry::Vacant(slot) => {
                        slot.insert(CacheEntry {
                            text: text.to_string(),
                            voice: voice.to_string(),
                            status: EntryStatus::Pending,
                        });
                    }
                }
                let task = generation_task(
                    Arc::clone(&self.inner.synthesizer),
                    self.inner.dir.clone(),
                    key,
                    text.to_string(),
                    voice.to_string(),
                );
                vacant.insert(task.clone());
                task
            }
        }
    }

    /// Record a completed generation. Idempotent: only a Pending entry
    /// transitions, so the first settle wins and later ones are no-ops.
    fn settle(&self, key: NarrationKey, result: &Result<PathBuf, SynthesisError>) {
        self.inner.inflight.remove(&key);
        self.inner.entries.alter(&key, |_, mut entry| {
            if entry.status == EntryStatus::Pending {
                entry.status = match result {
                    Ok(path) => EntryStatus::Ready(path.clone()),
                    Err(e) => EntryStatus::Failed(e.to_string()),
                };
            }
            entry
        });
    }
}

/// An already-resolved task carrying a settled entry's outcome.
fn settled_task(result: Result<PathBuf, SynthesisError>) -> InflightTask {
    async move { result }.boxed().shared()
}

fn generation_task(
    synthesizer: Arc<dyn SpeechSynthesizer>,
    dir: PathBuf,
    key: NarrationKey,
    text: String,
    voice: String,
) -> InflightTask {
    async move {
        let bytes = synthesizer.synthesize(&text, &voice).await?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SynthesisError::Io(e.to_string()))?;
        let path = dir.join(key.file_name());
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| SynthesisError::Io(e.to_string()))?;
        tracing::debug!(%key, path = %path.display(), "narration artifact ready");
        Ok(path)
    }
    .boxed()
    .shared()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSynthesizer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSynthesizer {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingSynthesizer {
        async fn synthesize(&self, text: &str, _voice: &str) -> Result<Vec<u8>, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Stay in flight long enough for callers to race.
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                Err(SynthesisError::Backend("voice offline".to_string()))
            } else {
                Ok(text.as_bytes().to_vec())
            }
        }
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_synthesis_call() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(false);
        let cache = NarrationCache::new(synth.clone(), tmp.path().join("narration"));

        let (a, b) = tokio::join!(
            cache.audio_path("hello there", "brian"),
            cache.audio_path("hello there", "brian"),
        );

        assert_eq!(synth.calls(), 1);
        assert_eq!(a, b);
        assert!(a.unwrap().exists());
    }

    #[tokio::test]
    async fn pregenerate_deduplicates_input() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(false);
        let cache = NarrationCache::new(synth.clone(), tmp.path().join("narration"));

        cache.pregenerate_all(vec![
            NarrationRequest::new("line one", "brian"),
            NarrationRequest::new("line one", "brian"),
            NarrationRequest::new("line two", "brian"),
        ]);
        cache.wait_idle().await;

        assert_eq!(synth.calls(), 2);
        assert_eq!(cache.len(), 2);
        assert!(matches!(
            cache.status("line one", "brian"),
            Some(EntryStatus::Ready(_))
        ));
    }

    #[tokio::test]
    async fn pregenerated_audio_is_served_without_resynthesis() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(false);
        let cache = NarrationCache::new(synth.clone(), tmp.path().join("narration"));

        cache.pregenerate_all(vec![NarrationRequest::new("cached", "brian")]);
        cache.wait_idle().await;

        let path = cache.audio_path("cached", "brian").await;
        assert!(path.is_some());
        assert_eq!(synth.calls(), 1);
    }

    #[tokio::test]
    async fn failed_entries_return_none_and_stay_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(true);
        let cache = NarrationCache::new(synth.clone(), tmp.path().join("narration"));

        assert!(cache.audio_path("doomed", "brian").await.is_none());
        assert!(matches!(
            cache.status("doomed", "brian"),
            Some(EntryStatus::Failed(_))
        ));

        // The failure is permanent: no second synthesis attempt.
        assert!(cache.audio_path("doomed", "brian").await.is_none());
        assert_eq!(synth.calls(), 1);
    }

    #[tokio::test]
    async fn losing_a_settle_race_replays_the_ready_outcome() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(false);
        let cache = NarrationCache::new(synth.clone(), tmp.path().join("narration"));

        let path = cache.audio_path("raced", "brian").await.unwrap();
        assert!(cache.inner.inflight.is_empty());

        // A caller that read the entry as Pending just before the settle
        // arrives here with the in-flight map already empty; it must get
        // the recorded artifact back, not a second synthesis.
        let key = NarrationKey::compute("raced", "brian");
        let replay = cache.ensure_task(key, "raced", "brian").await.unwrap();

        assert_eq!(replay, path);
        assert!(cache.inner.inflight.is_empty());
        assert_eq!(synth.calls(), 1);
    }

    #[tokio::test]
    async fn losing_a_settle_race_on_a_failed_key_stays_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(true);
        let cache = NarrationCache::new(synth.clone(), tmp.path().join("narration"));

        assert!(cache.audio_path("doomed", "brian").await.is_none());

        let key = NarrationKey::compute("doomed", "brian");
        let replay = cache.ensure_task(key, "doomed", "brian").await;

        assert!(replay.is_err());
        assert_eq!(synth.calls(), 1);
    }

    #[tokio::test]
    async fn remove_deletes_the_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(false);
        let cache = NarrationCache::new(synth, tmp.path().join("narration"));

        let path = cache.audio_path("short lived", "brian").await.unwrap();
        assert!(path.exists());

        cache.remove("short lived", "brian").await;
        assert!(!path.exists());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn cleanup_removes_the_cache_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(false);
        let dir = tmp.path().join("narration");
        let cache = NarrationCache::new(synth, dir.clone());

        cache.audio_path("anything", "brian").await.unwrap();
        assert!(dir.exists());

        cache.cleanup().await;
        assert!(!dir.exists());
    }
}
