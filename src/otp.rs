use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use rand::Rng;

/// Outcome of an OTP check. Missing, expired and mismatched codes are
/// distinct so callers can return distinct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Missing,
    Expired,
    Mismatch,
}

struct OtpEntry {
    code: String,
    expires_at: Instant,
}

/// In-process store for the admin 2-step login codes: keyed by email,
/// time-bounded, single-use. Kept out of the database so it is swappable
/// and testable in isolation.
#[derive(Clone, Default)]
pub struct OtpStore {
    inner: Arc<Mutex<HashMap<String, OtpEntry>>>,
}

impl OtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Six random decimal digits.
    pub fn generate_code() -> String {
        let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
        n.to_string()
    }

    /// Store a code for `key`, replacing any previous one.
    pub fn put(&self, key: &str, code: &str, ttl: Duration) {
        let mut map = self.inner.lock().expect("otp store poisoned");
        // Opportunistic cleanup so abandoned logins do not accumulate.
        let now = Instant::now();
        map.retain(|_, entry| entry.expires_at > now);
        map.insert(
            key.to_string(),
            OtpEntry {
                code: code.to_string(),
                expires_at: now + ttl,
            },
        );
    }

    /// Check and consume the code for `key`. A valid code is removed so it
    /// cannot be replayed; an expired one is removed so the caller must
    /// restart the login; a mismatch leaves the entry until it expires.
    pub fn consume(&self, key: &str, code: &str) -> OtpCheck {
        let mut map = self.inner.lock().expect("otp store poisoned");
        let Some(entry) = map.get(key) else {
            return OtpCheck::Missing;
        };
        if entry.expires_at <= Instant::now() {
            map.remove(key);
            return OtpCheck::Expired;
        }
        if entry.code != code {
            return OtpCheck::Mismatch;
        }
        map.remove(key);
        OtpCheck::Valid
    }
}
