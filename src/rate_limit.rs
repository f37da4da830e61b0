use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counter keyed by client identity. Used to blunt credential
/// guessing on the auth endpoints; independent of the order flow.
#[derive(Clone)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    inner: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 20 attempts per 15 minutes, matching the storefront's auth policy.
    pub fn auth_default() -> Self {
        Self::new(20, Duration::from_secs(15 * 60))
    }

    /// Record an attempt for `key`; false when the window is exhausted.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("rate limiter poisoned");
        map.retain(|_, w| now.duration_since(w.started_at) < self.window);

        let window = map.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if window.count >= self.max {
            return false;
        }
        window.count += 1;
        true
    }
}
