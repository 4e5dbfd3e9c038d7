mod common;

use common::strategies::*;
use proptest::prelude::*;
use serde_json::json;
use speechflow_core::models::Payload;
use speechflow_core::queue::{MessagePriority, ProcessingQueue};
use std::collections::VecDeque;

fn payload(id: usize) -> Payload {
    json!({"id": format!("item-{id}")})
        .as_object()
        .cloned()
        .unwrap()
}

/// Reference model: one FIFO of ids per priority
#[derive(Default)]
struct Model {
    buckets: [VecDeque<String>; 4],
}

impl Model {
    fn pop(&mut self) -> Option<String> {
        self.buckets.iter_mut().find_map(VecDeque::pop_front)
    }

    fn highest_non_empty(&self) -> Option<usize> {
        self.buckets.iter().position(|bucket| !bucket.is_empty())
    }
}

proptest! {
    /// Property: the queue serves items exactly like per-priority FIFOs
    /// drained highest priority first, including after requeue and demotion
    #[test]
    fn queue_matches_priority_fifo_model(ops in queue_ops_strategy(64)) {
        let queue = ProcessingQueue::new(0, 1_000);
        let mut model = Model::default();
        let mut next_id = 0;

        for op in ops {
            match op {
                QueueOp::Enqueue(priority) => {
                    prop_assert!(queue.enqueue(payload(next_id), priority));
                    model.buckets[priority.index()].push_back(format!("item-{next_id}"));
                    next_id += 1;
                }
                QueueOp::Dequeue => {
                    let expected_bucket = model.highest_non_empty();
                    let item = queue.try_dequeue();
                    prop_assert_eq!(item.as_ref().map(|i| i.id.clone()), model.pop());
                    if let Some(item) = item {
                        prop_assert_eq!(Some(item.priority.index()), expected_bucket);
                    }
                }
                QueueOp::Cycle => {
                    let Some(item) = queue.try_dequeue() else {
                        prop_assert!(model.pop().is_none());
                        continue;
                    };
                    prop_assert_eq!(Some(item.id.clone()), model.pop());

                    let next_retry = item.retry_count + 1;
                    let landing = if next_retry > 1 { MessagePriority::Low } else { item.priority };
                    let id = item.id.clone();
                    prop_assert!(queue.requeue(item));
                    model.buckets[landing.index()].push_back(id);
                }
            }
            let model_size: usize = model.buckets.iter().map(VecDeque::len).sum();
            prop_assert_eq!(queue.size(), model_size);
        }

        while let Some(expected) = model.pop() {
            prop_assert_eq!(queue.try_dequeue().map(|item| item.id), Some(expected));
        }
        prop_assert!(queue.is_empty());
    }

    /// Property: a bounded queue never holds more than its capacity and
    /// rejections leave it unchanged
    #[test]
    fn bounded_queue_never_exceeds_capacity(
        capacity in 1usize..16,
        priorities in prop::collection::vec(priority_strategy(), 0..40),
    ) {
        let queue = ProcessingQueue::new(capacity, 3);
        let mut accepted = 0;

        for (id, priority) in priorities.iter().enumerate() {
            let before = queue.size();
            if queue.enqueue(payload(id), *priority) {
                accepted += 1;
            } else {
                prop_assert_eq!(queue.size(), before);
                prop_assert!(queue.is_full());
            }
            prop_assert!(queue.size() <= capacity);
        }

        prop_assert_eq!(accepted, priorities.len().min(capacity));
    }

    /// Property: an item requeued past its budget is gone for good
    #[test]
    fn requeue_respects_retry_budget(max_retries in 0u32..6) {
        let queue = ProcessingQueue::new(0, max_retries);
        prop_assert!(queue.enqueue(payload(0), MessagePriority::High));

        let mut requeues = 0;
        while let Some(item) = queue.try_dequeue() {
            if !queue.requeue(item) {
                break;
            }
            requeues += 1;
        }

        prop_assert_eq!(requeues, max_retries);
        prop_assert!(queue.is_empty());
        prop_assert_eq!(queue.get_stats().total_failed, 1);
    }
}
