use chrono::Utc;

/// Time source for timestamp validation and cache expiry.
/// Injected so tests can control TTL expiry deterministically instead of
/// sleeping on the wall clock.
pub trait Clock: Send + Sync + 'static {
    /// Current time as Unix seconds.
    fn now_unix(&self) -> i64;
}

/// Production clock backed by the system wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Manually advanced clock for tests.
#[derive(Default)]
pub struct FixedClock(std::sync::atomic::AtomicI64);

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self(std::sync::atomic::AtomicI64::new(now))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}
