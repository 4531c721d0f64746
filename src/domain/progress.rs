//! The durable crawl cursor and its persistence seam.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::warn;

/// Two-level harvest cursor: the next (district, date-bucket) unit that has
/// not yet been confirmed. Every unit lexicographically before it has been
/// processed at least once; nothing at or after it has.
///
/// The derived ordering is lexicographic over (district, date), which is
/// exactly the planner's emission order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProgressCursor {
    pub district_index: usize,
    pub date_index: usize,
}

impl ProgressCursor {
    #[must_use]
    pub const fn new(district_index: usize, date_index: usize) -> Self {
        Self {
            district_index,
            date_index,
        }
    }

    /// Moves past a completed unit. Confirming the last bucket of a district
    /// rolls over to `(district + 1, 0)`. The cursor never moves backwards;
    /// a stale confirmation is ignored with a warning.
    pub fn advance(&mut self, district_index: usize, date_index: usize, bucket_count: usize) {
        let next = if date_index + 1 >= bucket_count {
            Self::new(district_index + 1, 0)
        } else {
            Self::new(district_index, date_index + 1)
        };
        if next <= *self {
            warn!(current = ?self, proposed = ?next, "ignoring stale cursor advance");
            return;
        }
        *self = next;
    }
}

/// Persistence seam for the cursor. The run loop saves through this after
/// every confirmed unit, never batched, so a crash loses at most the unit
/// that was in flight. The file-backed implementation lives in the
/// infrastructure layer; tests substitute [`InMemoryProgressStore`].
pub trait ProgressStore: Send + Sync {
    /// Loads the last persisted cursor. A missing or unreadable backing
    /// store yields the zero cursor; starting over is always safe.
    fn load(&self) -> ProgressCursor;

    fn save(&self, cursor: &ProgressCursor) -> anyhow::Result<()>;
}

impl<P: ProgressStore + ?Sized> ProgressStore for std::sync::Arc<P> {
    fn load(&self) -> ProgressCursor {
        (**self).load()
    }

    fn save(&self, cursor: &ProgressCursor) -> anyhow::Result<()> {
        (**self).save(cursor)
    }
}

/// Cursor store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    cursor: Mutex<ProgressCursor>,
}

impl InMemoryProgressStore {
    #[must_use]
    pub fn new(cursor: ProgressCursor) -> Self {
        Self {
            cursor: Mutex::new(cursor),
        }
    }

    #[must_use]
    pub fn current(&self) -> ProgressCursor {
        *self.cursor.lock().expect("cursor lock poisoned")
    }
}

impl ProgressStore for InMemoryProgressStore {
    fn load(&self) -> ProgressCursor {
        self.current()
    }

    fn save(&self, cursor: &ProgressCursor) -> anyhow::Result<()> {
        *self.cursor.lock().expect("cursor lock poisoned") = *cursor;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_within_a_district() {
        let mut cursor = ProgressCursor::default();
        cursor.advance(0, 0, 12);
        assert_eq!(cursor, ProgressCursor::new(0, 1));
        cursor.advance(0, 1, 12);
        assert_eq!(cursor, ProgressCursor::new(0, 2));
    }

    #[test]
    fn last_bucket_rolls_into_next_district() {
        let mut cursor = ProgressCursor::new(3, 11);
        cursor.advance(3, 11, 12);
        assert_eq!(cursor, ProgressCursor::new(4, 0));
    }

    #[test]
    fn stale_advance_is_ignored() {
        let mut cursor = ProgressCursor::new(5, 4);
        cursor.advance(2, 1, 12);
        assert_eq!(cursor, ProgressCursor::new(5, 4));
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(ProgressCursor::new(0, 11) < ProgressCursor::new(1, 0));
        assert!(ProgressCursor::new(2, 3) < ProgressCursor::new(2, 4));
    }

    #[test]
    fn in_memory_store_round_trips() {
        let store = InMemoryProgressStore::default();
        assert_eq!(store.load(), ProgressCursor::default());
        store.save(&ProgressCursor::new(7, 2)).unwrap();
        assert_eq!(store.load(), ProgressCursor::new(7, 2));
    }
}
