use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CreateOrderRequest, OrderCreated, OrderList, OrderWithItems},
    email::Email,
    entity::{
        addresses::{Column as AddrCol, Entity as Addresses},
        cart_items::{self, Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, ShippingAddress},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Totals over the cart's snapshot lines. The order freezes these at
/// creation; later catalog or cart changes cannot move them.
pub fn compute_totals(lines: &[cart_items::Model]) -> (i32, i64) {
    let total_items = lines.iter().map(|l| l.quantity).sum();
    let total_price = lines.iter().map(|l| l.price * l.quantity as i64).sum();
    (total_items, total_price)
}

/// Checkout. One transaction covers reading the cart, writing the order and
/// its frozen item copies, and clearing the cart, so a failure leaves no
/// half-created order. The cart rows are row-locked: a concurrent
/// double-submit waits, then observes the cleared cart and fails with
/// "Cart is empty" instead of double-charging.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderCreated>> {
    let txn = state.orm.begin().await?;

    // Ownership is verified server-side: the address must belong to the
    // caller, never taken on trust from input.
    let address = Addresses::find()
        .filter(
            Condition::all()
                .add(AddrCol::Id.eq(payload.address_id))
                .add(AddrCol::UserId.eq(user.user_id)),
        )
        .one(&txn)
        .await?;
    let Some(address) = address else {
        return Err(AppError::NotFound("Address not found".to_string()));
    };

    let lines = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if lines.is_empty() {
        return Err(AppError::Conflict("Cart is empty".to_string()));
    }

    let (total_items, total_price) = compute_totals(&lines);

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_items: Set(total_items),
        total_price: Set(total_price),
        status: Set(OrderStatus::Placed.as_str().to_string()),
        ship_full_name: Set(address.full_name),
        ship_phone: Set(address.phone),
        ship_street: Set(address.street),
        ship_city: Set(address.city),
        ship_pincode: Set(address.pincode),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    // Deep copies of the cart lines, not references: subsequent cart
    // mutations must not touch this order.
    for line in &lines {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            name: Set(line.name.clone()),
            price: Set(line.price),
            image: Set(line.image.clone()),
            quantity: Set(line.quantity),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    notify_order_placed(state, user.user_id, order.id, order.total_price);

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total_price": order.total_price })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed successfully",
        OrderCreated { order_id: order.id },
        Some(Meta::empty()),
    ))
}

/// Confirmation email in the background. Lookup or delivery failure is
/// logged and never rolls back or fails the order.
fn notify_order_placed(state: &AppState, user_id: Uuid, order_id: Uuid, total_price: i64) {
    let pool = state.pool.clone();
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        let recipient: Result<Option<(String, String)>, sqlx::Error> =
            sqlx::query_as("SELECT email, first_name FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&pool)
                .await;
        match recipient {
            Ok(Some((to, first_name))) => mailer.deliver(Email::OrderConfirmation {
                to,
                first_name,
                order_id,
                total_price,
            }),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "order confirmation lookup failed"),
        }
    });
}

pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success("OK", OrderList { orders }, None))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(id))
                .add(OrderCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    let Some(order) = order else {
        return Err(AppError::NotFound("Order not found".to_string()));
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// User-initiated cancellation, allowed only while the order is still
/// Placed. Any other state is a domain conflict, not a server error.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(id))
                .add(OrderCol::UserId.eq(user.user_id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let Some(order) = order else {
        return Err(AppError::NotFound("Order not found".to_string()));
    };

    let status = parse_status(&order.status)?;
    if !status.user_can_cancel() {
        return Err(AppError::Conflict(format!(
            "Order cannot be cancelled. Current status: {status}"
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order cancelled successfully",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = parse_status(&model.status)?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        total_items: model.total_items,
        total_price: model.total_price,
        status,
        address: ShippingAddress {
            full_name: model.ship_full_name,
            phone: model.ship_phone,
            street: model.ship_street,
            city: model.ship_city,
            pincode: model.ship_pincode,
        },
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        name: model.name,
        price: model.price,
        image: model.image,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn parse_status(value: &str) -> AppResult<OrderStatus> {
    OrderStatus::parse(value)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown order status: {value}")))
}
