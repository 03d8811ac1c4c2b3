//! Deferred change notification
//!
//! Inputs that defer their upward change (hidden inputs copying a referenced
//! value, for instance) push into a `ChangeCoalescer`. The form drains it at the
//! end of each pass, so several writes to one path within a pass become one
//! event carrying the last value.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::change::ChangeEvent;

/// What happens to pending changes when the owner is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushPolicy {
    /// Pending changes are dropped
    #[default]
    Discard,
    /// Pending changes are delivered one last time
    Flush,
}

/// Last-write-wins buffer of changes keyed by path, in first-write order
#[derive(Debug, Default)]
pub struct ChangeCoalescer {
    pending: Vec<ChangeEvent>,
    policy: FlushPolicy,
    closed: bool,
}

impl ChangeCoalescer {
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            pending: Vec::new(),
            policy,
            closed: false,
        }
    }

    /// Queue a change; replaces any pending change for the same path
    pub fn push(&mut self, event: ChangeEvent) {
        if self.closed {
            debug!("coalescer closed, dropping change for '{}'", event.path);
            return;
        }
        match self.pending.iter_mut().find(|p| p.path == event.path) {
            Some(existing) => existing.value = event.value,
            None => self.pending.push(event),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Take every pending change
    pub fn flush(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Close the buffer; returns what the flush policy lets through
    pub fn teardown(&mut self) -> Vec<ChangeEvent> {
        self.closed = true;
        let pending = self.flush();
        match self.policy {
            FlushPolicy::Flush => pending,
            FlushPolicy::Discard => {
                if !pending.is_empty() {
                    debug!("discarding {} deferred change(s) on teardown", pending.len());
                }
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_last_write_wins_in_first_write_order() {
        let mut coalescer = ChangeCoalescer::new(FlushPolicy::Discard);
        coalescer.push(ChangeEvent::set("a", json!(1)));
        coalescer.push(ChangeEvent::set("b", json!(2)));
        coalescer.push(ChangeEvent::set("a", json!(3)));

        assert_eq!(coalescer.len(), 2);
        assert_eq!(
            coalescer.flush(),
            vec![ChangeEvent::set("a", json!(3)), ChangeEvent::set("b", json!(2))]
        );
        assert!(coalescer.is_empty());
    }

    #[test]
    fn test_teardown_policies() {
        let mut discard = ChangeCoalescer::new(FlushPolicy::Discard);
        discard.push(ChangeEvent::set("a", json!(1)));
        assert!(discard.teardown().is_empty());

        let mut flush = ChangeCoalescer::new(FlushPolicy::Flush);
        flush.push(ChangeEvent::set("a", json!(1)));
        assert_eq!(flush.teardown(), vec![ChangeEvent::set("a", json!(1))]);

        flush.push(ChangeEvent::set("b", json!(2)));
        assert!(flush.is_empty());
        assert!(flush.is_closed());
    }
}
