use std::time::Duration;

use pillow_shop_api::rate_limit::RateLimiter;

#[test]
fn allows_up_to_the_limit_then_blocks() {
    let limiter = RateLimiter::new(3, Duration::from_secs(60));

    assert!(limiter.allow("a@example.com"));
    assert!(limiter.allow("a@example.com"));
    assert!(limiter.allow("a@example.com"));
    assert!(!limiter.allow("a@example.com"));
    assert!(!limiter.allow("a@example.com"));
}

#[test]
fn keys_are_counted_independently() {
    let limiter = RateLimiter::new(1, Duration::from_secs(60));

    assert!(limiter.allow("a@example.com"));
    assert!(!limiter.allow("a@example.com"));
    // A different key still has its full budget.
    assert!(limiter.allow("b@example.com"));
}

#[test]
fn window_expiry_resets_the_count() {
    let limiter = RateLimiter::new(1, Duration::ZERO);

    assert!(limiter.allow("a@example.com"));
    // A zero-length window has already expired by the next call.
    assert!(limiter.allow("a@example.com"));
}
