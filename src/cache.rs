//! In-memory transcript cache with single-flight population.
//!
//! Keyed by (video, language, kind). A request arriving while another is
//! populating the same key awaits that result instead of issuing a second
//! upstream fetch. Entries expire on a fixed TTL and the oldest-accessed
//! entries are evicted beyond the capacity bound. Failed populations are
//! never stored.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::debug;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::{TrackKind, Transcript, VideoId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub video_id: VideoId,
    pub language_code: String,
    pub kind: TrackKind,
}

#[derive(Clone)]
struct Stored {
    transcript: Arc<Transcript>,
    stored_at: Instant,
}

struct Slot {
    cell: OnceCell<Stored>,
    last_accessed_ms: AtomicU64,
}

impl Slot {
    fn new() -> Self {
        Slot {
            cell: OnceCell::new(),
            last_accessed_ms: AtomicU64::new(0),
        }
    }
}

pub struct TranscriptCache {
    slots: DashMap<CacheKey, Arc<Slot>>,
    ttl: Duration,
    capacity: usize,
    epoch: Instant,
}

impl TranscriptCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        TranscriptCache {
            slots: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
            epoch: Instant::now(),
        }
    }

    /// Return the cached transcript for `key`, or populate it via `fetch`.
    ///
    /// Concurrent callers for the same key share one in-flight fetch. A
    /// failed fetch leaves the key empty for the next caller.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Arc<Transcript>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Transcript>>,
    {
        let slot = self.live_slot(&key);

        if let Some(stored) = slot.cell.get() {
            debug!("Transcript cache hit: {}/{}", key.video_id, key.language_code);
            self.touch(&slot);
            return Ok(stored.transcript.clone());
        }

        let init = slot
            .cell
            .get_or_try_init(|| async {
                let transcript = fetch().await?;
                Ok(Stored {
                    transcript: Arc::new(transcript),
                    stored_at: Instant::now(),
                })
            })
            .await;

        match init {
            Ok(stored) => {
                self.touch(&slot);
                let transcript = stored.transcript.clone();
                self.evict_if_needed();
                Ok(transcript)
            }
            Err(err) => {
                // Leave nothing behind; a filled cell means a concurrent
                // caller succeeded after our failure, keep theirs.
                self.slots
                    .remove_if(&key, |_, s| Arc::ptr_eq(s, &slot) && s.cell.get().is_none());
                Err(err)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Fetch or create the slot for `key`, replacing it when its value has
    /// outlived the TTL.
    fn live_slot(&self, key: &CacheKey) -> Arc<Slot> {
        loop {
            let slot = self
                .slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Slot::new()))
                .clone();
            match slot.cell.get() {
                Some(stored) if stored.stored_at.elapsed() >= self.ttl => {
                    debug!("Transcript cache entry expired: {}/{}", key.video_id, key.language_code);
                    self.slots.remove_if(key, |_, s| Arc::ptr_eq(s, &slot));
                }
                _ => return slot,
            }
        }
    }

    fn touch(&self, slot: &Slot) {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        slot.last_accessed_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Evict least-recently-accessed filled entries beyond capacity.
    /// In-flight (unfilled) slots are never evicted.
    fn evict_if_needed(&self) {
        if self.slots.len() <= self.capacity {
            return;
        }
        let mut filled: Vec<(CacheKey, u64)> = self
            .slots
            .iter()
            .filter(|e| e.value().cell.get().is_some())
            .map(|e| (e.key().clone(), e.value().last_accessed_ms.load(Ordering::Relaxed)))
            .collect();
        filled.sort_by_key(|(_, accessed)| *accessed);

        let excess = self.slots.len().saturating_sub(self.capacity);
        for (key, _) in filled.into_iter().take(excess) {
            debug!("Evicting transcript cache entry: {}/{}", key.video_id, key.language_code);
            self.slots.remove(&key);
        }
    }
}
