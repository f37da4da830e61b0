use uuid::Uuid;

use crate::{
    dto::address::{AddAddressRequest, AddressList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn add_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let validated = payload.validate().map_err(AppError::Validation)?;

    let address: Address = sqlx::query_as(
        r#"
        INSERT INTO addresses (id, user_id, full_name, phone, street, city, pincode)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(validated.full_name)
    .bind(validated.phone)
    .bind(validated.street)
    .bind(validated.city)
    .bind(validated.pincode)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Address saved", address, None))
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let addresses: Vec<Address> =
        sqlx::query_as("SELECT * FROM addresses WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.user_id)
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success("OK", AddressList { addresses }, None))
}

/// Owner-scoped delete: a foreign or unknown id resolves as NotFound, never
/// as another user's address.
pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Address not found".to_string()));
    }

    Ok(ApiResponse::success(
        "Address deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
