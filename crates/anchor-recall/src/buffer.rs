//! Bounded, insertion-ordered store of anchor records.
//!
//! Every structural mutation and every read goes through one lock, so a
//! prune scan and a concurrent `add` never interleave.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::constants::MAX_ANCHORS;
use crate::types::{AnchorRecord, AnchorSummary};

struct BufferInner {
    records: VecDeque<Arc<AnchorRecord>>,
    next_id: u64,
}

/// Shared anchor store. Cheap to share behind an `Arc`.
pub struct AnchorBuffer {
    inner: Mutex<BufferInner>,
    capacity: usize,
}

impl AnchorBuffer {
    /// Create an empty buffer holding at most [`MAX_ANCHORS`] records.
    pub fn new() -> Self {
        Self::with_capacity(MAX_ANCHORS)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BufferInner {
                records: VecDeque::with_capacity(capacity + 1),
                next_id: 1,
            }),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when over capacity.
    /// Returns the id assigned to the record.
    pub fn add(&self, mut record: AnchorRecord) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        record.id = id;
        inner.records.push_back(Arc::new(record));

        if inner.records.len() > self.capacity {
            if let Some(evicted) = inner.records.pop_front() {
                tracing::debug!("Anchor {} evicted at capacity", evicted.id);
            }
        }
        id
    }

    /// Highest-confidence record. The earliest inserted wins a tie.
    pub fn best(&self) -> Option<Arc<AnchorRecord>> {
        let inner = self.inner.lock();
        let mut best: Option<(&Arc<AnchorRecord>, f64)> = None;
        for record in &inner.records {
            let confidence = record.confidence();
            match best {
                Some((_, top)) if confidence <= top => {}
                _ => best = Some((record, confidence)),
            }
        }
        best.map(|(record, _)| record.clone())
    }

    /// Remove a specific record by identity. Returns false if it was already gone.
    pub fn remove(&self, record: &AnchorRecord) -> bool {
        self.remove_id(record.id)
    }

    pub fn remove_id(&self, id: u64) -> bool {
        let mut inner = self.inner.lock();
        match inner.records.iter().position(|r| r.id == id) {
            Some(index) => {
                inner.records.remove(index);
                true
            }
            None => false,
        }
    }

    /// Visit every record in insertion order under the lock and drop those
    /// the predicate selects. Returns the ids removed.
    pub fn prune<F>(&self, mut should_prune: F) -> Vec<u64>
    where
        F: FnMut(&AnchorRecord) -> bool,
    {
        let mut inner = self.inner.lock();
        let mut removed = Vec::new();
        inner.records.retain(|record| {
            if should_prune(record) {
                removed.push(record.id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Snapshot of the current records in insertion order.
    pub fn all(&self) -> Vec<Arc<AnchorRecord>> {
        self.inner.lock().records.iter().cloned().collect()
    }

    /// Reporting summaries in insertion order.
    pub fn summaries(&self) -> Vec<AnchorSummary> {
        self.inner
            .lock()
            .records
            .iter()
            .map(|r| r.summary())
            .collect()
    }
}

impl Default for AnchorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScreenPoint, ScreenRect, WindowRef};
    use image::RgbImage;
    use std::time::Instant;

    fn record(window: u64) -> AnchorRecord {
        AnchorRecord::new(
            Instant::now(),
            WindowRef(window),
            ScreenRect::new(0, 0, 100, 100),
            ScreenPoint::new(50, 50),
            vec![RgbImage::new(8, 8)],
        )
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = AnchorBuffer::new();
        assert!(buffer.is_empty());
        assert!(buffer.best().is_none());
        assert!(buffer.all().is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest_in_order() {
        let buffer = AnchorBuffer::new();
        for window in 1..=26 {
            buffer.add(record(window));
            assert!(buffer.len() <= MAX_ANCHORS);
        }
        let windows: Vec<u64> = buffer.all().iter().map(|r| r.window.0).collect();
        assert_eq!(windows, (2..=26).collect::<Vec<_>>());
    }

    #[test]
    fn test_best_prefers_highest_confidence() {
        let buffer = AnchorBuffer::new();
        buffer.add(record(1).with_confidence(0.4));
        buffer.add(record(2).with_confidence(0.9));
        buffer.add(record(3).with_confidence(0.7));
        assert_eq!(buffer.best().unwrap().window, WindowRef(2));
    }

    #[test]
    fn test_best_tie_goes_to_first_inserted() {
        let buffer = AnchorBuffer::new();
        buffer.add(record(1).with_confidence(0.3));
        buffer.add(record(2));
        buffer.add(record(3));
        assert_eq!(buffer.best().unwrap().window, WindowRef(2));
    }

    #[test]
    fn test_remove_by_identity() {
        let buffer = AnchorBuffer::new();
        buffer.add(record(1));
        buffer.add(record(2));
        let first = buffer.all()[0].clone();
        assert!(buffer.remove(&first));
        assert!(!buffer.remove(&first));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.all()[0].window, WindowRef(2));
    }

    #[test]
    fn test_prune_removes_selected() {
        let buffer = AnchorBuffer::new();
        let a = buffer.add(record(1));
        buffer.add(record(2));
        let c = buffer.add(record(3));
        let removed = buffer.prune(|r| r.window != WindowRef(2));
        assert_eq!(removed, vec![a, c]);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_concurrent_add_and_prune() {
        const WRITERS: u64 = 4;
        const PER_WRITER: u64 = 50;
        // Large enough that capacity eviction never hides a lost add.
        let buffer = Arc::new(AnchorBuffer::with_capacity(1000));
        let writers: Vec<_> = (0..WRITERS)
            .map(|t| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    for i in 0..PER_WRITER {
                        buffer.add(record(t * 100 + i));
                    }
                })
            })
            .collect();
        let mut removed = Vec::new();
        for _ in 0..20 {
            removed.extend(buffer.prune(|r| r.window.0 % 2 == 0));
        }
        for w in writers {
            w.join().unwrap();
        }

        let remaining: Vec<u64> = buffer.all().iter().map(|r| r.id).collect();
        assert_eq!(
            remaining.len() as u64,
            WRITERS * PER_WRITER - removed.len() as u64
        );
        let mut sorted = remaining.clone();
        sorted.sort_unstable();
        assert_eq!(remaining, sorted);

        // Every assigned id is either still present or was pruned, once.
        let mut seen: Vec<u64> = remaining.iter().chain(removed.iter()).copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=WRITERS * PER_WRITER).collect::<Vec<_>>());
    }
}
