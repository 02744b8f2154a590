use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// A job waiting for a concurrency slot. Ordered for a max-heap: higher
/// `priority` first, and among equal priorities, the earliest `enqueued_at`
/// first (FIFO tie-break).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub output_id: String,
    pub priority: i32,
    pub enqueued_at: DateTime<Utc>,
}

impl Ord for Ticket {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.enqueued_at.cmp(&self.enqueued_at))
    }
}

impl PartialOrd for Ticket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn higher_priority_pops_first() {
        let mut heap = BinaryHeap::new();
        let now = Utc::now();
        heap.push(Ticket { output_id: "low".into(), priority: 0, enqueued_at: now });
        heap.push(Ticket { output_id: "high".into(), priority: 5, enqueued_at: now });
        assert_eq!(heap.pop().unwrap().output_id, "high");
    }

    #[test]
    fn equal_priority_breaks_ties_fifo() {
        let mut heap = BinaryHeap::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(1);
        heap.push(Ticket { output_id: "second".into(), priority: 0, enqueued_at: t1 });
        heap.push(Ticket { output_id: "first".into(), priority: 0, enqueued_at: t0 });
        assert_eq!(heap.pop().unwrap().output_id, "first");
        assert_eq!(heap.pop().unwrap().output_id, "second");
    }
}
