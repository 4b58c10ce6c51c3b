use std::sync::atomic::{AtomicU64, Ordering};

pub static GLOBAL_DISTANCE_COUNT: AtomicU64 = AtomicU64::new(0);

/// Adds `cnt` distance evaluations at once, so that tight loops can
/// count locally and publish once.
pub fn add_distance_count(cnt: u64) {
    GLOBAL_DISTANCE_COUNT.fetch_add(cnt, Ordering::SeqCst);
}

/// gets the value of the counter, and sets the value to 0.
/// if multiple threads read this concurrently, they will all get 0 except the first one,
/// assuming the counter is not incremented in-between
pub fn distance_count() -> u64 {
    GLOBAL_DISTANCE_COUNT.swap(0, Ordering::SeqCst)
}
