use chrono::Utc;
use pillow_shop_api::{
    entity::cart_items,
    models::OrderStatus,
    services::order_service::compute_totals,
};
use uuid::Uuid;

fn line(price: i64, quantity: i32) -> cart_items::Model {
    cart_items::Model {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        name: "Pillow".to_string(),
        price,
        image: None,
        quantity,
        created_at: Utc::now().into(),
    }
}

#[test]
fn totals_sum_quantities_and_snapshot_prices() {
    // Two units at 500 plus one unit at 300.
    let lines = vec![line(500, 2), line(300, 1)];
    assert_eq!(compute_totals(&lines), (3, 1300));
}

#[test]
fn totals_of_an_empty_cart_are_zero() {
    assert_eq!(compute_totals(&[]), (0, 0));
}

#[test]
fn status_round_trips_through_its_string_form() {
    for status in OrderStatus::ALL {
        assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
    }
}

#[test]
fn unknown_and_miscased_statuses_are_rejected() {
    assert_eq!(OrderStatus::parse("Refunded"), None);
    assert_eq!(OrderStatus::parse("placed"), None);
    assert_eq!(OrderStatus::parse(""), None);
}

#[test]
fn users_may_cancel_only_placed_orders() {
    assert!(OrderStatus::Placed.user_can_cancel());
    assert!(!OrderStatus::Confirmed.user_can_cancel());
    assert!(!OrderStatus::Shipped.user_can_cancel());
    assert!(!OrderStatus::Delivered.user_can_cancel());
    assert!(!OrderStatus::Cancelled.user_can_cancel());
}
