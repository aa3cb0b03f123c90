use crate::models::{MatchingPolicy, RequestHandle};

/// Size-or-time flush policy driven by periodic ticks
#[derive(Debug, Clone)]
pub struct BatchTrigger {
    pool_limit: usize,
    poll_limit: u32,
    poll_count: u32,
}

impl BatchTrigger {
    pub fn new(pool_limit: usize, poll_limit: u32) -> Self {
        Self {
            pool_limit,
            poll_limit,
            poll_count: 0,
        }
    }

    pub fn from_policy(policy: &MatchingPolicy) -> Self {
        Self::new(policy.pool_limit, policy.poll_limit)
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }

    /// Register one tick with `queued` requests waiting.
    ///
    /// Returns `true` when the queue should be flushed: it is non-empty and
    /// either holds at least `pool_limit` requests or this tick reaches
    /// `poll_limit`. The counter restarts after a flush, and also when it
    /// reaches the limit with nothing queued.
    pub fn on_tick(&mut self, queued: usize) -> bool {
        self.poll_count += 1;

        let flush = queued > 0 && (queued >= self.pool_limit || self.poll_count >= self.poll_limit);
        if flush || self.poll_count >= self.poll_limit {
            self.poll_count = 0;
        }

        flush
    }

    /// Restart the counter after a flush that did not come from a tick
    pub fn reset(&mut self) {
        self.poll_count = 0;
    }
}

/// A request waiting for the next batch
#[derive(Debug, Clone)]
pub struct QueuedRequest {
    pub handle: RequestHandle,
}

impl QueuedRequest {
    pub fn mentee_id(&self) -> &str {
        self.handle.mentee_id()
    }
}

/// FIFO of pending requests plus the trigger that decides when to drain it
#[derive(Debug)]
pub struct RequestQueue {
    pending: Vec<QueuedRequest>,
    trigger: BatchTrigger,
}

impl RequestQueue {
    pub fn new(trigger: BatchTrigger) -> Self {
        Self {
            pending: Vec::new(),
            trigger,
        }
    }

    pub fn enqueue(&mut self, handle: RequestHandle) {
        self.pending.push(QueuedRequest { handle });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn trigger(&self) -> &BatchTrigger {
        &self.trigger
    }

    /// Tick the trigger and, if it fires, hand back the whole queue.
    ///
    /// The queue is swapped for an empty one so later enqueues land in the
    /// next batch.
    pub fn poll(&mut self) -> Option<Vec<QueuedRequest>> {
        if self.trigger.on_tick(self.pending.len()) {
            Some(std::mem::take(&mut self.pending))
        } else {
            None
        }
    }

    /// Drain everything now, regardless of the trigger
    pub fn drain(&mut self) -> Vec<QueuedRequest> {
        self.trigger.reset();
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchFlag;

    fn handle(id: &str) -> RequestHandle {
        MatchFlag::new(id).handle()
    }

    #[test]
    fn test_flushes_after_poll_limit() {
        let mut trigger = BatchTrigger::new(10, 3);
        assert!(!trigger.on_tick(1));
        assert!(!trigger.on_tick(1));
        assert!(trigger.on_tick(1));
        assert_eq!(trigger.poll_count(), 0);
    }

    #[test]
    fn test_flushes_on_pool_limit() {
        let mut trigger = BatchTrigger::new(10, 3);
        assert!(trigger.on_tick(10));
        assert_eq!(trigger.poll_count(), 0);
    }

    #[test]
    fn test_empty_queue_never_flushes_but_resets() {
        let mut trigger = BatchTrigger::new(10, 3);
        assert!(!trigger.on_tick(0));
        assert!(!trigger.on_tick(0));
        assert!(!trigger.on_tick(0));
        assert_eq!(trigger.poll_count(), 0);

        // A fresh cycle starts after the reset
        assert!(!trigger.on_tick(1));
        assert_eq!(trigger.poll_count(), 1);
    }

    #[test]
    fn test_poll_drains_in_fifo_order() {
        let mut queue = RequestQueue::new(BatchTrigger::new(2, 3));
        queue.enqueue(handle("m1"));
        assert!(queue.poll().is_none());

        queue.enqueue(handle("m2"));
        let batch = queue.poll().unwrap();
        let ids: Vec<&str> = batch.iter().map(QueuedRequest::mentee_id).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_after_poll_goes_to_next_batch() {
        let mut queue = RequestQueue::new(BatchTrigger::new(1, 3));
        queue.enqueue(handle("m1"));
        let first = queue.poll().unwrap();

        queue.enqueue(handle("m2"));
        assert_eq!(first.len(), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.poll().unwrap()[0].mentee_id(), "m2");
    }

    #[test]
    fn test_drain_resets_trigger() {
        let mut queue = RequestQueue::new(BatchTrigger::new(10, 3));
        queue.enqueue(handle("m1"));
        assert!(queue.poll().is_none());
        assert_eq!(queue.trigger().poll_count(), 1);

        assert_eq!(queue.drain().len(), 1);
        assert_eq!(queue.trigger().poll_count(), 0);
    }
}
