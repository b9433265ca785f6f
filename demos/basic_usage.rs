use chunked_queue::ChunkedQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() {
    // RUST_LOG=chunked_queue=trace shows chunk allocation and release
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("ChunkedQueue Rust Example");
    println!("-------------------------\n");

    // Configuration
    const PRODUCERS: usize = 2; // Number of producer threads
    const CONSUMERS: usize = 2; // Number of consumer threads
    const N: u32 = 1_000_000; // Each producer puts this many elements into the queue
    const CHUNK_CAPACITY: usize = 256; // Slots per chunk

    // Create a queue object shared between all producers and consumers
    let queue = Arc::new(ChunkedQueue::<u32>::with_chunk_capacity(CHUNK_CAPACITY));
    let producers_done = Arc::new(AtomicBool::new(false));

    println!("Starting {} producers and {} consumers", PRODUCERS, CONSUMERS);
    println!("Each producer will put {} elements", N);
    println!("Chunk capacity: {}\n", CHUNK_CAPACITY);

    let start_time = Instant::now();

    // Start the consumers
    let sums = Arc::new(Mutex::new(vec![0u64; CONSUMERS]));
    let mut consumer_threads = Vec::with_capacity(CONSUMERS);

    for i in 0..CONSUMERS {
        let q = queue.clone();
        let sums = sums.clone();
        let producers_done = producers_done.clone();
        consumer_threads.push(thread::spawn(move || {
            let mut local_sum = 0u64;

            // The queue never blocks: poll until the producers are finished and nothing is left
            loop {
                match q.get() {
                    Some(n) => local_sum += n as u64,
                    None if producers_done.load(Ordering::Acquire) && q.is_empty() => break,
                    None => thread::yield_now(),
                }
            }

            // Update the global sum array once
            let mut sums = sums.lock().unwrap();
            sums[i] = local_sum;
        }));
    }

    // Start the producers
    let mut producer_threads = Vec::with_capacity(PRODUCERS);

    for _ in 0..PRODUCERS {
        let q = queue.clone();
        producer_threads.push(thread::spawn(move || {
            for n in 1..=N {
                q.put(n);
            }
        }));
    }

    for t in producer_threads {
        t.join().unwrap();
    }
    producers_done.store(true, Ordering::Release);

    for t in consumer_threads {
        t.join().unwrap();
    }

    let elapsed = start_time.elapsed();

    // Verify the results
    let expected_sum = (N as u64 * (N as u64 + 1)) / 2 * PRODUCERS as u64;
    let sums = sums.lock().unwrap();
    let total_sum: u64 = sums.iter().sum();

    println!("Results:");
    for (i, sum) in sums.iter().enumerate() {
        println!("Consumer {} sum: {}", i, sum);
    }
    println!("Total sum: {}", total_sum);
    println!("Expected:  {}", expected_sum);
    println!("Difference: {}", total_sum as i64 - expected_sum as i64);
    println!("Queue empty at exit: {}", queue.is_empty());

    let ops = (N as usize * PRODUCERS) as f64;
    println!("\nPerformance:");
    println!("Time: {:.2?}", elapsed);
    println!("Throughput: {:.2} million ops/sec", ops / elapsed.as_secs_f64() / 1_000_000.0);
}
