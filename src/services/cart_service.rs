use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, CartList, RemoveFromCartRequest, UpdateCartRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Add a product to the caller's cart. The product's current name, price
/// and image are re-read from the catalog and snapshotted into the line;
/// client-supplied prices are never trusted. Adding a product that is
/// already in the cart increments the existing line's quantity.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let product: Option<(String, i64, Option<String>)> =
        sqlx::query_as("SELECT name, price, image FROM products WHERE id = $1")
            .bind(payload.product_id)
            .fetch_optional(&state.pool)
            .await?;
    let Some((name, price, image)) = product else {
        return Err(AppError::NotFound("Product not found".to_string()));
    };

    let item: CartItem = sqlx::query_as(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, name, price, image, quantity)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(name)
    .bind(price)
    .bind(image)
    .bind(payload.quantity)
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Added to cart", item, None))
}

/// The caller's cart. A user who never added anything gets an empty list,
/// never a 404.
pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let items: Vec<CartItem> = sqlx::query_as(
        "SELECT * FROM cart_items WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("OK", CartList { items }, None))
}

/// Set a line's quantity exactly (not additive). Quantity 0 removes the
/// line entirely.
pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.quantity < 0 {
        return Err(AppError::BadRequest("Quantity must be >= 0".to_string()));
    }

    let result = if payload.quantity == 0 {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(payload.product_id)
            .execute(&state.pool)
            .await?
    } else {
        sqlx::query("UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(payload.product_id)
            .bind(payload.quantity)
            .execute(&state.pool)
            .await?
    };

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Item not found in cart".to_string()));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Cart updated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Remove a line. Idempotent: removing an absent line is still a success.
pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    payload: RemoveFromCartRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user.user_id)
        .bind(payload.product_id)
        .execute(&state.pool)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Item removed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
