use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use speechflow_core::models::Payload;
use speechflow_core::queue::{MessagePriority, ProcessingQueue};

fn payload(id: usize) -> Payload {
    json!({"id": format!("item-{id}"), "type": "speech.created", "data": {}})
        .as_object()
        .cloned()
        .unwrap_or_default()
}

fn benchmark_enqueue_dequeue(c: &mut Criterion) {
    c.bench_function("enqueue_dequeue_1000_mixed_priorities", |b| {
        b.iter(|| {
            let queue = ProcessingQueue::new(0, 3);
            for i in 0..1000 {
                queue.enqueue(payload(i), MessagePriority::ALL[i % 4]);
            }
            while let Some(item) = queue.try_dequeue() {
                black_box(item);
            }
        })
    });
}

fn benchmark_requeue_cycle(c: &mut Criterion) {
    c.bench_function("requeue_cycle_500", |b| {
        b.iter(|| {
            let queue = ProcessingQueue::new(0, 1);
            for i in 0..500 {
                queue.enqueue(payload(i), MessagePriority::Normal);
            }
            while let Some(item) = queue.try_dequeue() {
                black_box(queue.requeue(item));
            }
        })
    });
}

fn benchmark_stats(c: &mut Criterion) {
    let queue = ProcessingQueue::new(0, 3);
    for i in 0..1000 {
        queue.enqueue(payload(i), MessagePriority::ALL[i % 4]);
    }
    c.bench_function("get_stats_1000_items", |b| b.iter(|| black_box(queue.get_stats())));
}

criterion_group!(
    benches,
    benchmark_enqueue_dequeue,
    benchmark_requeue_cycle,
    benchmark_stats
);
criterion_main!(benches);
