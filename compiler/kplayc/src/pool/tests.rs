use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn results_keep_submission_order() {
    let items: Vec<u64> = (0..64).collect();
    let squares = WorkerPool::new(Some(4)).run(&items, |n| {
        // Uneven work so completion order differs from submission order.
        std::thread::sleep(std::time::Duration::from_micros((64 - n) * 50));
        n * n
    });
    assert_eq!(squares, items.iter().map(|n| n * n).collect::<Vec<_>>());
}

#[test]
fn every_item_runs_once() {
    let calls = AtomicUsize::new(0);
    let items = vec!["a"; 10];
    let out = WorkerPool::default().run(&items, |s| {
        calls.fetch_add(1, Ordering::Relaxed);
        s.len()
    });
    assert_eq!(out, vec![1; 10]);
    assert_eq!(calls.load(Ordering::Relaxed), 10);
}

#[test]
fn empty_and_single_batches() {
    let pool = WorkerPool::new(Some(2));
    assert_eq!(pool.run(&[] as &[i32], |n| n + 1), Vec::<i32>::new());
    assert_eq!(pool.run(&[41], |n| n + 1), vec![42]);
}

#[test]
fn sized_from_environment() {
    let env = kplay_analysis::Environment::bundled();
    assert_eq!(WorkerPool::from_environment(&env).workers(), None);
}
