//! Service-key bookkeeping: daily quotas and round-robin rotation.
//!
//! The ring never touches the network. It decides which key the next call
//! should carry, counts what each key has spent today, and resets counters
//! lazily when the calendar day moves on. Waiting out a fully exhausted ring
//! is the caller's job, so the wait stays cancellable.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no API service keys configured")]
    EmptyKeySet,
}

/// One API credential and its usage counter. The counter belongs to
/// `reset_date`; the first touch on a later day zeroes it (no timer).
#[derive(Clone)]
pub struct ServiceKey {
    key: String,
    used_today: u32,
    reset_date: NaiveDate,
}

// Key material must stay out of logs; Debug shows the counters only.
impl std::fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceKey")
            .field("key", &"<redacted>")
            .field("used_today", &self.used_today)
            .field("reset_date", &self.reset_date)
            .finish()
    }
}

impl ServiceKey {
    fn new(key: String, today: NaiveDate) -> Self {
        Self {
            key,
            used_today: 0,
            reset_date: today,
        }
    }

    fn roll_day(&mut self, today: NaiveDate) {
        if today > self.reset_date {
            self.used_today = 0;
            self.reset_date = today;
        }
    }
}

/// Round-robin rotation over the configured keys with a per-key daily cap.
///
/// Rotation advances on every selection whether or not the selected key is
/// exhausted; the policy spreads load across keys rather than conserving
/// quota. Exhausted keys are skipped by the caller via
/// [`KeyRing::is_exhausted`].
#[derive(Debug)]
pub struct KeyRing {
    keys: Vec<ServiceKey>,
    cursor: usize,
    daily_cap: u32,
}

impl KeyRing {
    pub fn new(
        keys: Vec<String>,
        daily_cap: u32,
        today: NaiveDate,
    ) -> Result<Self, CredentialError> {
        if keys.is_empty() {
            return Err(CredentialError::EmptyKeySet);
        }
        Ok(Self {
            keys: keys.into_iter().map(|k| ServiceKey::new(k, today)).collect(),
            cursor: 0,
            daily_cap,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Selects the current key index and advances the rotation cursor.
    pub fn next_key(&mut self) -> usize {
        let selected = self.cursor;
        self.cursor = (self.cursor + 1) % self.keys.len();
        selected
    }

    #[must_use]
    pub fn key(&self, idx: usize) -> &str {
        &self.keys[idx].key
    }

    pub fn record_use(&mut self, idx: usize, today: NaiveDate) {
        let entry = &mut self.keys[idx];
        entry.roll_day(today);
        entry.used_today += 1;
    }

    pub fn is_exhausted(&mut self, idx: usize, today: NaiveDate) -> bool {
        let entry = &mut self.keys[idx];
        entry.roll_day(today);
        entry.used_today >= self.daily_cap
    }

    pub fn all_exhausted(&mut self, today: NaiveDate) -> bool {
        (0..self.keys.len()).all(|idx| self.is_exhausted(idx, today))
    }

    /// Zeroes every counter, stamping `today` as the new accounting day.
    pub fn reset_all(&mut self, today: NaiveDate) {
        for entry in &mut self.keys {
            entry.used_today = 0;
            entry.reset_date = today;
        }
    }

    /// Per-key usage counters, in configuration order.
    #[must_use]
    pub fn used_counts(&self) -> Vec<u32> {
        self.keys.iter().map(|k| k.used_today).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn ring(count: usize, cap: u32) -> KeyRing {
        let keys = (0..count).map(|i| format!("key-{i}")).collect();
        KeyRing::new(keys, cap, day(1)).unwrap()
    }

    #[test]
    fn empty_key_set_is_fatal_at_construction() {
        assert!(matches!(
            KeyRing::new(Vec::new(), 1000, day(1)),
            Err(CredentialError::EmptyKeySet)
        ));
    }

    #[test]
    fn rotation_is_fair_over_consecutive_calls() {
        // 7 selections over 3 keys: every key picked floor(7/3)=2 or
        // ceil(7/3)=3 times.
        let mut ring = ring(3, 1000);
        let mut counts = [0u32; 3];
        for _ in 0..7 {
            let idx = ring.next_key();
            counts[idx] += 1;
            ring.record_use(idx, day(1));
        }
        assert_eq!(counts.iter().sum::<u32>(), 7);
        assert!(counts.iter().all(|&c| c == 2 || c == 3));
        assert_eq!(ring.used_counts(), vec![3, 2, 2]);
    }

    #[test]
    fn rotation_advances_even_past_exhausted_keys() {
        let mut ring = ring(2, 1);
        let first = ring.next_key();
        ring.record_use(first, day(1));
        assert!(ring.is_exhausted(first, day(1)));
        // The cursor still moves one slot per selection.
        assert_eq!(ring.next_key(), (first + 1) % 2);
        assert_eq!(ring.next_key(), first);
    }

    #[test]
    fn cap_marks_key_exhausted() {
        let mut ring = ring(2, 2);
        for _ in 0..2 {
            ring.record_use(0, day(1));
        }
        assert!(ring.is_exhausted(0, day(1)));
        assert!(!ring.is_exhausted(1, day(1)));
        assert!(!ring.all_exhausted(day(1)));
        for _ in 0..2 {
            ring.record_use(1, day(1));
        }
        assert!(ring.all_exhausted(day(1)));
    }

    #[test]
    fn day_rollover_resets_lazily() {
        let mut ring = ring(1, 1);
        ring.record_use(0, day(1));
        assert!(ring.all_exhausted(day(1)));
        // Same ring, next calendar day: the counter resets on first touch.
        assert!(!ring.is_exhausted(0, day(2)));
        assert_eq!(ring.used_counts(), vec![0]);
    }

    #[test]
    fn debug_output_redacts_key_material() {
        let ring = KeyRing::new(vec!["secret-key-value".to_string()], 10, day(1)).unwrap();
        let rendered = format!("{ring:?}");
        assert!(!rendered.contains("secret-key-value"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn reset_all_zeroes_every_counter() {
        let mut ring = ring(3, 1);
        for idx in 0..3 {
            ring.record_use(idx, day(1));
        }
        assert!(ring.all_exhausted(day(1)));
        ring.reset_all(day(2));
        assert_eq!(ring.used_counts(), vec![0, 0, 0]);
        assert!(!ring.all_exhausted(day(2)));
    }
}
