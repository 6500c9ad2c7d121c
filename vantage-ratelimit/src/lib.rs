#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use governor::Quota;
use governor::RateLimiter;
use governor::state::InMemoryState;
use governor::state::NotKeyed;
use governor::clock::DefaultClock;

pub type PerIpLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Login,
    Register,
}

impl Bucket {
    /// Window each bucket's burst capacity refills over: 1 minute for login
    /// attempts, 10 minutes for registration attempts.
    fn window(self) -> Duration {
        match self {
            Self::Login => Duration::from_secs(60),
            Self::Register => Duration::from_secs(600),
        }
    }
}

fn quota_for(capacity: NonZeroU32, window: Duration) -> Quota {
    match Quota::with_period(window / capacity.get()) {
        Some(quota) => quota.allow_burst(capacity),
        None => panic!("window is non-zero and capacity.get() divides it into a non-zero period"),
    }
}

const DEFAULT_LOGIN_CAPACITY: NonZeroU32 = match NonZeroU32::new(5) {
    Some(capacity) => capacity,
    None => panic!("5 is non-zero"),
};

const DEFAULT_REGISTER_CAPACITY: NonZeroU32 = match NonZeroU32::new(3) {
    Some(capacity) => capacity,
    None => panic!("3 is non-zero"),
};

/// Two named per-IP token buckets (`login`, `register`). Buckets are created
/// lazily on first use; there is no reaper, matching the single-process,
/// loss-on-restart scope the rate limiter operates under.
pub struct RateLimiterRegistry {
    login: DashMap<IpAddr, Arc<PerIpLimiter>>,
    register: DashMap<IpAddr, Arc<PerIpLimiter>>,
    login_capacity: NonZeroU32,
    register_capacity: NonZeroU32,
}

impl Default for RateLimiterRegistry {
    fn default() -> Self {
        Self::with_capacities(5, 3)
    }
}

impl RateLimiterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry with configured per-IP burst capacities, falling
    /// back to the teacher defaults (5 logins/min, 3 registrations/10min)
    /// for a zero capacity rather than panicking on bad configuration.
    #[must_use]
    pub fn with_capacities(login_capacity: u32, register_capacity: u32) -> Self {
        Self {
            login: DashMap::new(),
            register: DashMap::new(),
            login_capacity: NonZeroU32::new(login_capacity).unwrap_or(DEFAULT_LOGIN_CAPACITY),
            register_capacity: NonZeroU32::new(register_capacity).unwrap_or(DEFAULT_REGISTER_CAPACITY),
        }
    }

    fn map(&self, bucket: Bucket) -> &DashMap<IpAddr, Arc<PerIpLimiter>> {
        match bucket {
            Bucket::Login => &self.login,
            Bucket::Register => &self.register,
        }
    }

    fn capacity(&self, bucket: Bucket) -> NonZeroU32 {
        match bucket {
            Bucket::Login => self.login_capacity,
            Bucket::Register => self.register_capacity,
        }
    }

    /// Returns `false` when the caller's bucket for this IP is empty.
    pub fn try_consume(&self, ip: IpAddr, bucket: Bucket) -> bool {
        let map = self.map(bucket);
        let quota = quota_for(self.capacity(bucket), bucket.window());
        let limiter = map
            .entry(ip)
            .or_insert_with(|| Arc::new(RateLimiter::direct(quota)))
            .clone();
        limiter.check().is_ok()
    }
}
