//! Cache of rendered Form 137 documents.
//!
//! Rendering reads the ledger and then stores the result. A write that lands
//! between those two steps bumps the student's generation, and the stale
//! render is then refused at insert time.

use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct Generations {
    /// Bumped by [`TranscriptCache::invalidate_all`]
    epoch: u64,
    per_student: HashMap<i32, u64>,
}

/// Snapshot of a student's generation, taken before reading the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket {
    student_id: i32,
    epoch: u64,
    generation: u64,
}

#[derive(Clone, Debug)]
pub struct TranscriptCache {
    documents: Cache<i32, Arc<Vec<u8>>>,
    generations: Arc<Mutex<Generations>>,
}

impl TranscriptCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            documents: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            generations: Arc::new(Mutex::new(Generations::default())),
        }
    }

    pub async fn get(&self, student_id: &i32) -> Option<Arc<Vec<u8>>> {
        self.documents.get(student_id).await
    }

    /// Must be taken before the data that goes into the render is read.
    pub async fn ticket(&self, student_id: i32) -> RenderTicket {
        let generations = self.generations.lock().await;
        RenderTicket {
            student_id,
            epoch: generations.epoch,
            generation: generations.per_student.get(&student_id).copied().unwrap_or(0),
        }
    }

    /// Stores a render unless the student's data changed since `ticket` was
    /// taken. Returns whether the document was stored.
    pub async fn insert(&self, ticket: RenderTicket, bytes: Arc<Vec<u8>>) -> bool {
        let generations = self.generations.lock().await;
        let current = generations
            .per_student
            .get(&ticket.student_id)
            .copied()
            .unwrap_or(0);
        if generations.epoch != ticket.epoch || current != ticket.generation {
            debug!(
                "Discarding stale Form 137 render for student {}",
                ticket.student_id
            );
            return false;
        }
        self.documents.insert(ticket.student_id, bytes).await;
        true
    }

    pub async fn invalidate(&self, student_id: &i32) {
        let mut generations = self.generations.lock().await;
        *generations.per_student.entry(*student_id).or_insert(0) += 1;
        self.documents.invalidate(student_id).await;
    }

    pub async fn invalidate_all(&self) {
        let mut generations = self.generations.lock().await;
        generations.epoch += 1;
        self.documents.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TranscriptCache {
        TranscriptCache::new(16, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = cache();
        let ticket = cache.ticket(1).await;
        assert!(cache.insert(ticket, Arc::new(b"%PDF".to_vec())).await);
        assert_eq!(cache.get(&1).await.as_deref(), Some(&b"%PDF".to_vec()));
    }

    #[tokio::test]
    async fn test_write_during_render_discards_result() {
        let cache = cache();
        let ticket = cache.ticket(1).await;
        cache.invalidate(&1).await;

        assert!(!cache.insert(ticket, Arc::new(b"old".to_vec())).await);
        assert!(cache.get(&1).await.is_none());

        let ticket = cache.ticket(1).await;
        assert!(cache.insert(ticket, Arc::new(b"new".to_vec())).await);
    }

    #[tokio::test]
    async fn test_invalidate_all_discards_pending_renders() {
        let cache = cache();
        let ticket = cache.ticket(7).await;
        cache.invalidate_all().await;
        assert!(!cache.insert(ticket, Arc::new(b"old".to_vec())).await);
    }

    #[tokio::test]
    async fn test_other_students_are_unaffected() {
        let cache = cache();
        let ticket = cache.ticket(1).await;
        cache.invalidate(&2).await;
        assert!(cache.insert(ticket, Arc::new(b"doc".to_vec())).await);
    }
}
