use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        admin::{
            AdminLoginInitiateRequest, AdminLoginVerifyRequest, StatsResponse,
            UpdateOrderStatusRequest, UserList,
        },
        auth::LoginResponse,
        orders::OrderList,
    },
    email::Email,
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult, FieldError},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus, PublicUser, User},
    otp::{OtpCheck, OtpStore},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{auth_service, order_service::order_from_entity},
    state::AppState,
};

const OTP_TTL: StdDuration = StdDuration::from_secs(5 * 60);

/// Step 1 of the admin 2-step login: verify credentials, hold a one-time
/// code in the TTL store keyed by email, and mail it in the background.
pub async fn login_initiate(
    state: &AppState,
    payload: AdminLoginInitiateRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if !state.auth_limiter.allow(payload.email.trim()) {
        return Err(AppError::TooManyRequests);
    }

    let email = payload.email.trim().to_lowercase();
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;
    let user = match user {
        Some(u) if u.is_admin => u,
        _ => return Err(AppError::Unauthorized("Admin account not found".to_string())),
    };

    if !auth_service::verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    let code = OtpStore::generate_code();
    state.otp.put(&email, &code, OTP_TTL);

    state.mailer.deliver(Email::AdminOtp {
        to: email,
        code,
    });

    Ok(ApiResponse::success(
        "OTP sent to your email",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Step 2: consume the one-time code and issue a 12-hour admin token.
pub async fn login_verify(
    state: &AppState,
    payload: AdminLoginVerifyRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let email = payload.email.trim().to_lowercase();

    match state.otp.consume(&email, payload.otp.trim()) {
        OtpCheck::Missing => {
            return Err(AppError::BadRequest(
                "OTP not found. Please login again.".to_string(),
            ));
        }
        OtpCheck::Expired => {
            return Err(AppError::BadRequest(
                "OTP expired. Please login again.".to_string(),
            ));
        }
        OtpCheck::Mismatch => {
            return Err(AppError::Unauthorized("Incorrect OTP".to_string()));
        }
        OtpCheck::Valid => {}
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;
    let user = match user {
        Some(u) if u.is_admin => u,
        _ => return Err(AppError::Unauthorized("Admin account not found".to_string())),
    };

    let token = auth_service::issue_token(user.id, true, Duration::hours(12))?;

    Ok(ApiResponse::success(
        "Login successful",
        LoginResponse {
            token,
            name: user.first_name,
            is_admin: true,
        },
        Some(Meta::empty()),
    ))
}

pub async fn stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<StatsResponse>> {
    ensure_admin(user)?;

    let (total_orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.pool)
        .await?;
    let (total_products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&state.pool)
        .await?;
    let (total_revenue,): (i64,) =
        sqlx::query_as("SELECT COALESCE(SUM(total_price), 0)::BIGINT FROM orders")
            .fetch_one(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "Stats",
        StatsResponse {
            total_orders,
            total_users,
            total_products,
            total_revenue,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;

    let users: Vec<PublicUser> = sqlx::query_as(
        r#"
        SELECT id, first_name, last_name, email, is_admin, is_verified, created_at
        FROM users
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("Users", UserList { users }, None))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let mut finder = Orders::find().filter(condition);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { orders }, Some(meta)))
}

/// Admin status override. The new status must be one of the five known
/// states; beyond that the admin may set any order to any state.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let Some(status) = OrderStatus::parse(&payload.status) else {
        return Err(AppError::Validation(vec![FieldError::new(
            "status",
            "Invalid status",
        )]));
    };

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let Some(existing) = existing else {
        return Err(AppError::NotFound("Order not found".to_string()));
    };

    let mut active: OrderActive = existing.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Status updated",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}
