//! Daily Usage Limiter
//!
//! Counts audits per calendar day against an optional allowance. The
//! counter lives in an injected `UsageStore` and the date comes from an
//! injected `Clock`, so nothing here is process-global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::utils::error::{AuditError, AuditResult};

const DATE_KEY: &str = "usage.date";
const COUNT_KEY: &str = "usage.count";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// String key-value store for the counter.
pub trait UsageStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

/// Source of the current local date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Store kept in memory for the life of the process.
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsageStore for InMemoryUsageStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value);
        }
    }
}

/// Wall clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Per-day audit counter.
pub struct DailyUsageLimiter {
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    limit: Option<u32>,
    // Held across the read-check-write in `try_acquire`
    gate: Mutex<()>,
}

impl DailyUsageLimiter {
    pub fn new(store: Arc<dyn UsageStore>, clock: Arc<dyn Clock>, limit: Option<u32>) -> Self {
        Self {
            store,
            clock,
            limit,
            gate: Mutex::new(()),
        }
    }

    /// In-memory limiter on the system clock.
    pub fn in_memory(limit: Option<u32>) -> Self {
        Self::new(
            Arc::new(InMemoryUsageStore::new()),
            Arc::new(SystemClock),
            limit,
        )
    }

    /// Audits counted today.
    pub fn used_today(&self) -> u32 {
        let today = self.clock.today().format(DATE_FORMAT).to_string();
        match self.store.get(DATE_KEY) {
            Some(date) if date == today => self
                .store
                .get(COUNT_KEY)
                .and_then(|c| c.parse().ok())
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Audits still allowed today, `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.used_today()))
    }

    /// Count one audit, failing when today's allowance is spent.
    ///
    /// Returns the count including this audit.
    pub fn try_acquire(&self) -> AuditResult<u32> {
        let _gate = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let today = self.clock.today().format(DATE_FORMAT).to_string();
        if self.store.get(DATE_KEY).as_deref() != Some(today.as_str()) {
            debug!(date = %today, "Resetting daily usage counter");
            self.store.set(DATE_KEY, today);
            self.store.set(COUNT_KEY, "0".to_string());
        }

        let used = self.used_today();
        if let Some(limit) = self.limit {
            if used >= limit {
                info!(used, limit, "Daily audit limit reached");
                return Err(AuditError::DailyLimitReached(limit));
            }
        }

        let count = used + 1;
        self.store.set(COUNT_KEY, count.to_string());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock(Mutex<NaiveDate>);

    impl FixedClock {
        fn new(y: i32, m: u32, d: u32) -> Self {
            Self(Mutex::new(NaiveDate::from_ymd_opt(y, m, d).unwrap()))
        }

        fn set(&self, y: i32, m: u32, d: u32) {
            *self.0.lock().unwrap() = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        }
    }

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn test_limit_enforced() {
        let clock = Arc::new(FixedClock::new(2026, 3, 1));
        let limiter = DailyUsageLimiter::new(Arc::new(InMemoryUsageStore::new()), clock, Some(2));

        assert_eq!(limiter.try_acquire().unwrap(), 1);
        assert_eq!(limiter.try_acquire().unwrap(), 2);
        assert_eq!(limiter.remaining(), Some(0));
        assert!(matches!(
            limiter.try_acquire(),
            Err(AuditError::DailyLimitReached(2))
        ));
        assert_eq!(limiter.used_today(), 2);
    }

    #[test]
    fn test_resets_on_date_change() {
        let clock = Arc::new(FixedClock::new(2026, 3, 1));
        let limiter = DailyUsageLimiter::new(
            Arc::new(InMemoryUsageStore::new()),
            clock.clone(),
            Some(1),
        );

        limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_err());

        clock.set(2026, 3, 2);
        assert_eq!(limiter.used_today(), 0);
        assert_eq!(limiter.try_acquire().unwrap(), 1);
    }

    #[test]
    fn test_unlimited_still_counts() {
        let limiter = DailyUsageLimiter::new(
            Arc::new(InMemoryUsageStore::new()),
            Arc::new(FixedClock::new(2026, 1, 1)),
            None,
        );
        for expected in 1..=5 {
            assert_eq!(limiter.try_acquire().unwrap(), expected);
        }
        assert_eq!(limiter.remaining(), None);
    }

    /// Store whose reads stall, widening any gap between check and write.
    struct SlowStore(InMemoryUsageStore);

    impl UsageStore for SlowStore {
        fn get(&self, key: &str) -> Option<String> {
            std::thread::sleep(std::time::Duration::from_millis(2));
            self.0.get(key)
        }

        fn set(&self, key: &str, value: String) {
            self.0.set(key, value);
        }
    }

    #[test]
    fn test_concurrent_acquires_respect_limit() {
        let limiter = DailyUsageLimiter::new(
            Arc::new(SlowStore(InMemoryUsageStore::new())),
            Arc::new(FixedClock::new(2026, 6, 1)),
            Some(3),
        );

        let granted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| limiter.try_acquire().is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(granted, 3);
        assert_eq!(limiter.used_today(), 3);
    }

    #[test]
    fn test_shared_store_between_limiters() {
        let store: Arc<dyn UsageStore> = Arc::new(InMemoryUsageStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(2026, 5, 5));
        let first = DailyUsageLimiter::new(store.clone(), clock.clone(), Some(3));
        let second = DailyUsageLimiter::new(store, clock, Some(3));

        first.try_acquire().unwrap();
        assert_eq!(second.try_acquire().unwrap(), 2);
    }
}
