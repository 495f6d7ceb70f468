//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Max inbound peer frames per second. A well-behaved client commits a few times per beat.
pub const INBOUND_RATE_LIMIT: u32 = 30;

/// Per-connection limiter for inbound peer frames
#[derive(Clone)]
pub struct PeerRateLimiter {
    inbound: Arc<Limiter>,
}

impl PeerRateLimiter {
    pub fn new() -> Self {
        Self::with_rate(INBOUND_RATE_LIMIT)
    }

    pub fn with_rate(per_second: u32) -> Self {
        Self {
            inbound: create_limiter(per_second),
        }
    }

    /// Check if an inbound frame is allowed (returns true if allowed)
    pub fn check_inbound(&self) -> bool {
        self.inbound.check().is_ok()
    }
}

impl Default for PeerRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_capped() {
        let limiter = PeerRateLimiter::with_rate(3);
        let allowed = (0..10).filter(|_| limiter.check_inbound()).count();
        assert_eq!(allowed, 3);
    }

    #[test]
    fn zero_rate_still_admits_one() {
        let limiter = PeerRateLimiter::with_rate(0);
        assert!(limiter.check_inbound());
        assert!(!limiter.check_inbound());
    }
}
