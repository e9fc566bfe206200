use std::collections::HashSet;

/// Tracks emails issued within one batch.
///
/// Uniqueness is per batch only; nothing here consults the store, so an
/// email may still collide with a row inserted by an earlier run.
pub struct EmailTracker {
    seen: HashSet<String>,
    /// Random suffix redraws allowed before switching to the counter suffix.
    pub max_retries: usize,
    counter: u64,
}

impl EmailTracker {
    pub fn new(max_retries: usize) -> Self {
        Self {
            seen: HashSet::new(),
            max_retries,
            counter: 0,
        }
    }

    /// Record `email` if it hasn't been issued yet. Returns false on a duplicate.
    pub fn try_insert(&mut self, email: &str) -> bool {
        if self.seen.contains(email) {
            return false;
        }
        self.seen.insert(email.to_string())
    }

    /// Issue an email built from a monotonic counter suffix.
    ///
    /// `build` receives the suffix and returns a candidate; the counter keeps
    /// advancing until a candidate is free, so this always terminates with a
    /// batch-unique address.
    pub fn issue_with_counter(&mut self, build: impl Fn(u64) -> String) -> String {
        loop {
            self.counter += 1;
            let candidate = build(self.counter);
            if self.try_insert(&candidate) {
                return candidate;
            }
        }
    }

    /// Number of distinct emails issued so far.
    pub fn count(&self) -> usize {
        self.seen.len()
    }
}

impl Default for EmailTracker {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_tracking() {
        let mut tracker = EmailTracker::default();
        assert!(tracker.try_insert("mari.tamm123@mail.ee"));

        // Same value should fail
        assert!(!tracker.try_insert("mari.tamm123@mail.ee"));

        // Different value should succeed
        assert!(tracker.try_insert("mari.tamm124@mail.ee"));
        assert_eq!(tracker.count(), 2);
    }

    #[test]
    fn test_counter_skips_taken_addresses() {
        let mut tracker = EmailTracker::default();
        assert!(tracker.try_insert("a.b1@x.ee"));
        assert!(tracker.try_insert("a.b2@x.ee"));

        let issued = tracker.issue_with_counter(|n| format!("a.b{}@x.ee", n));
        assert_eq!(issued, "a.b3@x.ee");
        assert_eq!(tracker.count(), 3);
    }
}
