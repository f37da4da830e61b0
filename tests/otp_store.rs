use std::time::Duration;

use pillow_shop_api::otp::{OtpCheck, OtpStore};

const TTL: Duration = Duration::from_secs(300);

#[test]
fn valid_code_is_single_use() {
    let store = OtpStore::new();
    store.put("admin@example.com", "123456", TTL);

    assert_eq!(store.consume("admin@example.com", "123456"), OtpCheck::Valid);
    // Consumed: replaying the same code must fail.
    assert_eq!(
        store.consume("admin@example.com", "123456"),
        OtpCheck::Missing
    );
}

#[test]
fn unknown_key_is_missing() {
    let store = OtpStore::new();
    assert_eq!(store.consume("nobody@example.com", "123456"), OtpCheck::Missing);
}

#[test]
fn wrong_code_is_mismatch_and_keeps_the_entry() {
    let store = OtpStore::new();
    store.put("admin@example.com", "123456", TTL);

    assert_eq!(
        store.consume("admin@example.com", "654321"),
        OtpCheck::Mismatch
    );
    // The entry survives a mismatch so the user can retry.
    assert_eq!(store.consume("admin@example.com", "123456"), OtpCheck::Valid);
}

#[test]
fn expired_code_is_rejected_and_removed() {
    let store = OtpStore::new();
    store.put("admin@example.com", "123456", Duration::ZERO);

    assert_eq!(
        store.consume("admin@example.com", "123456"),
        OtpCheck::Expired
    );
    assert_eq!(
        store.consume("admin@example.com", "123456"),
        OtpCheck::Missing
    );
}

#[test]
fn new_code_replaces_the_previous_one() {
    let store = OtpStore::new();
    store.put("admin@example.com", "111111", TTL);
    store.put("admin@example.com", "222222", TTL);

    assert_eq!(
        store.consume("admin@example.com", "111111"),
        OtpCheck::Mismatch
    );
    assert_eq!(store.consume("admin@example.com", "222222"), OtpCheck::Valid);
}

#[test]
fn generated_codes_are_six_digits() {
    for _ in 0..100 {
        let code = OtpStore::generate_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(code.chars().next(), Some('0'));
    }
}
