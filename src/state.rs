use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    email::Mailer,
    otp::OtpStore,
    rate_limit::RateLimiter,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    /// Short-lived one-time codes for the admin 2-step login, keyed by email.
    pub otp: OtpStore,
    /// Per-email window throttling repeated auth attempts.
    pub auth_limiter: RateLimiter,
    pub mailer: Arc<dyn Mailer>,
}
