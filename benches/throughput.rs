use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use chunked_queue::{ChunkedQueue, QueueOps};
use parking_lot::Mutex;
use std::collections::{LinkedList, VecDeque};
use std::sync::{Arc, Barrier};
use std::thread;

// Elements put and then drained per iteration
const ELEMENTS: usize = 100_000;
// Number of operations per MPMC benchmark
const OPS_PER_BENCH: usize = 1_000_000;

/// Baseline: one growable ring buffer behind a lock
struct LockedVecDeque<T>(Mutex<VecDeque<T>>);

impl<T> QueueOps<T> for LockedVecDeque<T> {
    fn put(&self, element: T) {
        self.0.lock().push_back(element);
    }

    fn get(&self) -> Option<T> {
        self.0.lock().pop_front()
    }

    fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.0.lock().front().cloned()
    }

    fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn len(&self) -> usize {
        self.0.lock().len()
    }
}

/// Baseline: one heap node per element behind a lock
struct LockedList<T>(Mutex<LinkedList<T>>);

impl<T> QueueOps<T> for LockedList<T> {
    fn put(&self, element: T) {
        self.0.lock().push_back(element);
    }

    fn get(&self) -> Option<T> {
        self.0.lock().pop_front()
    }

    fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.0.lock().front().cloned()
    }

    fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn len(&self) -> usize {
        self.0.lock().len()
    }
}

fn put_then_drain<Q: QueueOps<usize>>(queue: &Q) {
    for n in 0..ELEMENTS {
        queue.put(black_box(n));
    }

    let mut last_get = 0;
    while !queue.is_empty() {
        let v = queue.get();
        assert_eq!(v, Some(last_get));
        last_get += 1;
    }
}

fn bench_put_then_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_then_drain");
    group.throughput(Throughput::Elements(ELEMENTS as u64));

    for chunk_capacity in [16, 128, 1024] {
        group.bench_with_input(
            BenchmarkId::new("ChunkedQueue", chunk_capacity),
            &chunk_capacity,
            |b, &chunk_capacity| {
                b.iter(|| put_then_drain(&ChunkedQueue::with_chunk_capacity(chunk_capacity)))
            },
        );
    }

    group.bench_function("Mutex<VecDeque>", |b| {
        b.iter(|| put_then_drain(&LockedVecDeque(Mutex::new(VecDeque::new()))))
    });

    group.bench_function("Mutex<LinkedList>", |b| {
        b.iter(|| put_then_drain(&LockedList(Mutex::new(LinkedList::new()))))
    });

    group.finish();
}

fn run_mpmc<Q>(queue: Arc<Q>, threads: usize)
where
    Q: QueueOps<u32> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads * 2));
    let mut handles = Vec::with_capacity(threads * 2);

    // Producers
    for _ in 0..threads {
        let q = queue.clone();
        let b = barrier.clone();
        handles.push(thread::spawn(move || {
            b.wait();
            for i in 0..(OPS_PER_BENCH / threads) {
                q.put(black_box(i as u32));
            }
        }));
    }

    // Consumers poll; the queue never waits for data
    for _ in 0..threads {
        let q = queue.clone();
        let b = barrier.clone();
        handles.push(thread::spawn(move || {
            b.wait();
            let mut received = 0;
            while received < OPS_PER_BENCH / threads {
                if let Some(v) = q.get() {
                    black_box(v);
                    received += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");
    group.throughput(Throughput::Elements(OPS_PER_BENCH as u64));
    group.sample_size(10);

    for threads in [1, 2, 4].iter() {
        // Skip configurations that would require more than available CPUs
        if *threads * 2 > num_cpus::get() {
            continue;
        }

        group.bench_with_input(BenchmarkId::new("ChunkedQueue", threads), threads, |b, &threads| {
            b.iter(|| run_mpmc(Arc::new(ChunkedQueue::new()), threads))
        });

        group.bench_with_input(
            BenchmarkId::new("Mutex<VecDeque>", threads),
            threads,
            |b, &threads| {
                b.iter(|| run_mpmc(Arc::new(LockedVecDeque(Mutex::new(VecDeque::new()))), threads))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_put_then_drain, bench_mpmc);
criterion_main!(benches);
