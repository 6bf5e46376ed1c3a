use std::collections::HashMap;
use std::sync::RwLock;

use stockroom_core::AggregateId;

use super::ProjectionError;

/// Last applied sequence number per stream.
#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<AggregateId, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, aggregate_id: AggregateId) -> u64 {
        match self.inner.read() {
            Ok(cursors) => cursors.get(&aggregate_id).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// `Ok(true)` when `seq` is the next envelope to apply, `Ok(false)` for a
    /// redelivery. A stream first seen mid-way is accepted as-is.
    pub fn admit(&self, aggregate_id: AggregateId, seq: u64) -> Result<bool, ProjectionError> {
        let last = self.get(aggregate_id);
        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(false);
        }
        if seq != last + 1 && last != 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        Ok(true)
    }

    pub fn advance(&self, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.insert(aggregate_id, seq);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_in_order_skips_redelivery_rejects_gaps() {
        let cursors = StreamCursors::new();
        let id = AggregateId::new();

        assert!(cursors.admit(id, 1).unwrap());
        cursors.advance(id, 1);
        assert!(!cursors.admit(id, 1).unwrap());
        assert!(cursors.admit(id, 2).unwrap());
        assert!(matches!(
            cursors.admit(id, 4),
            Err(ProjectionError::NonMonotonicSequence { last: 1, found: 4 })
        ));
        assert!(cursors.admit(id, 0).is_err());

        cursors.clear();
        assert_eq!(cursors.get(id), 0);
    }
}
