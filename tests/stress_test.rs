//! Stress tests for fixed-pool

use fixed_pool::prelude::*;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
#[ignore] // Run with --ignored flag
fn stress_test_many_small_tasks() {
    let pool = FixedPool::new(8).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for i in 0..100_000 {
        let counter = counter.clone();
        pool.submit(
            move || {
                counter.fetch_add(1, Ordering::Relaxed);
            },
            Priority::ALL[i % 3],
        );
    }
    pool.shutdown();

    assert_eq!(counter.load(Ordering::Relaxed), 100_000);
}

#[test]
#[ignore]
fn stress_test_capacity_never_exceeded() {
    let mut rng = rand::thread_rng();

    for capacity in [1usize, 2, 3, 7, 16] {
        let pool = FixedPool::new(capacity).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..500 {
            let (running, peak) = (running.clone(), peak.clone());
            let micros = rng.gen_range(0..300);
            let priority = Priority::ALL[rng.gen_range(0..3)];
            pool.submit(
                move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_micros(micros));
                    running.fetch_sub(1, Ordering::SeqCst);
                },
                priority,
            );
        }
        pool.shutdown();

        assert!(peak.load(Ordering::SeqCst) <= capacity, "capacity {}", capacity);
        assert!(pool.metrics().peak_in_flight <= capacity);
    }
}

#[test]
#[ignore]
fn stress_test_fifo_with_random_priorities() {
    let pool = Arc::new(FixedPool::new(1).unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));

    let submitters: Vec<_> = (0..4usize)
        .map(|submitter| {
            let (pool, log) = (pool.clone(), log.clone());
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                let mut sequence = [0usize; 3];
                for _ in 0..2_000 {
                    let lane = rng.gen_range(0..3);
                    let n = sequence[lane];
                    sequence[lane] += 1;
                    let log = log.clone();
                    assert!(pool.submit(
                        move || log.lock().push((submitter, lane, n)),
                        Priority::ALL[lane],
                    ));
                }
            })
        })
        .collect();

    for s in submitters {
        s.join().unwrap();
    }
    pool.shutdown();

    // per submitter and lane, execution order matches submission order
    let log = log.lock();
    assert_eq!(log.len(), 8_000);
    let mut next = [[0usize; 3]; 4];
    for &(submitter, lane, n) in log.iter() {
        assert_eq!(next[submitter][lane], n);
        next[submitter][lane] += 1;
    }
}

#[test]
#[ignore]
fn stress_test_shutdown_races_submitters() {
    for round in 0..20 {
        let pool = Arc::new(FixedPool::new(4).unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let executed = Arc::new(AtomicUsize::new(0));

        let submitters: Vec<_> = (0..4)
            .map(|_| {
                let (pool, accepted, executed) = (pool.clone(), accepted.clone(), executed.clone());
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        let executed = executed.clone();
                        let ok = pool.submit(
                            move || {
                                executed.fetch_add(1, Ordering::SeqCst);
                            },
                            Priority::Normal,
                        );
                        if ok {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        thread::sleep(Duration::from_micros(200));
        pool.shutdown();

        for s in submitters {
            s.join().unwrap();
        }

        // everything admitted before the state flipped has run
        assert_eq!(
            executed.load(Ordering::SeqCst),
            accepted.load(Ordering::SeqCst),
            "round {}",
            round
        );
        assert_eq!(pool.queued_total(), 0);
    }
}
