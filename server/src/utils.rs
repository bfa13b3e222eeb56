use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Signed difference between two durations, in milliseconds
pub fn signed_millis(actual: Duration, expected: Duration) -> f64 {
    (actual.as_secs_f64() - expected.as_secs_f64()) * 1000.0
}
