// Time types used across the project.
//
// System time is only used by builders and tests; everything that affects
// consensus reads timestamps carried by blocks and transactions.

use std::time::{SystemTime, UNIX_EPOCH};

// Millis timestamps used to determine it using its type
pub type TimestampMillis = u64;

// Return timestamp in milliseconds
// Only use for building transactions or admission control, never for
// deterministic state transitions
pub fn get_current_time_in_millis() -> TimestampMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Incorrect time returned from SystemTime")
        .as_millis() as TimestampMillis
}
