//! Time utilities for the beat clock and uptime reporting

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Default tempo in beats per minute
pub const DEFAULT_BPM: u32 = 75;

/// Delay between match point and the game-over screen
pub const DEFAULT_GAMEOVER_DELAY: Duration = Duration::from_millis(2000);

/// Length of one beat at `bpm`. Zero is treated as one beat per minute.
pub fn beat_interval(bpm: u32) -> Duration {
    Duration::from_millis(60_000 / u64::from(bpm.max(1)))
}

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Process start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}
