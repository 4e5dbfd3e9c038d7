//! Proptest strategies for queue properties.

use proptest::prelude::*;
use speechflow_core::queue::MessagePriority;

pub fn priority_strategy() -> impl Strategy<Value = MessagePriority> {
    prop_oneof![
        Just(MessagePriority::Critical),
        Just(MessagePriority::High),
        Just(MessagePriority::Normal),
        Just(MessagePriority::Low),
    ]
}

/// Queue operations applied in sequence by the model-based tests
#[derive(Debug, Clone)]
pub enum QueueOp {
    Enqueue(MessagePriority),
    Dequeue,
    /// Dequeue the next item and requeue it immediately
    Cycle,
}

pub fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        4 => priority_strategy().prop_map(QueueOp::Enqueue),
        2 => Just(QueueOp::Dequeue),
        1 => Just(QueueOp::Cycle),
    ]
}

pub fn queue_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<QueueOp>> {
    prop::collection::vec(queue_op_strategy(), 0..max_len)
}
