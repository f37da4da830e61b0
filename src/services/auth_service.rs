use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use rand::{Rng, distributions::Alphanumeric};
use uuid::Uuid;

use crate::{
    dto::auth::{
        Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest,
        SignupRequest,
    },
    email::Email,
    error::{AppError, AppResult},
    models::{PublicUser, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn signup(
    state: &AppState,
    payload: SignupRequest,
) -> AppResult<ApiResponse<PublicUser>> {
    if !state.auth_limiter.allow(payload.email.trim()) {
        return Err(AppError::TooManyRequests);
    }
    payload.validate().map_err(AppError::Validation)?;

    let email = payload.email.trim().to_lowercase();
    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let verification_token = random_token();

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, first_name, last_name, email, password_hash, verification_token)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(&email)
    .bind(password_hash)
    .bind(&verification_token)
    .fetch_one(&state.pool)
    .await?;

    // Fire-and-forget; delivery failure never fails the signup.
    state.mailer.deliver(Email::Verification {
        to: user.email.clone(),
        first_name: user.first_name.clone(),
        token: verification_token,
    });

    Ok(ApiResponse::success(
        "Account created! Please check your email to verify your account before logging in.",
        public_user(user),
        None,
    ))
}

pub async fn verify_email(
    state: &AppState,
    token: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user: Option<User> = sqlx::query_as(
        r#"
        UPDATE users
        SET is_verified = TRUE, verification_token = NULL
        WHERE verification_token = $1
        RETURNING *
        "#,
    )
    .bind(token)
    .fetch_optional(&state.pool)
    .await?;
    let Some(user) = user else {
        return Err(AppError::BadRequest(
            "Invalid or expired verification link".to_string(),
        ));
    };

    state.mailer.deliver(Email::Welcome {
        to: user.email,
        first_name: user.first_name,
    });

    Ok(ApiResponse::success(
        "Email verified! You can now login.",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn login(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    if !state.auth_limiter.allow(payload.email.trim()) {
        return Err(AppError::TooManyRequests);
    }

    let email = payload.email.trim().to_lowercase();
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;
    let Some(user) = user else {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    };

    if !user.is_verified {
        return Err(AppError::Unauthorized(
            "Please verify your email before logging in. Check your inbox for the verification link."
                .to_string(),
        ));
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = issue_token(user.id, user.is_admin, Duration::days(7))?;

    Ok(ApiResponse::success(
        "Login successful",
        LoginResponse {
            token,
            name: user.first_name,
            is_admin: user.is_admin,
        },
        Some(Meta::empty()),
    ))
}

/// Always succeeds, to prevent email enumeration. When the account exists a
/// one-hour reset token is stored and mailed in the background.
pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if !state.auth_limiter.allow(payload.email.trim()) {
        return Err(AppError::TooManyRequests);
    }

    let email = payload.email.trim().to_lowercase();
    let reset_token = random_token();
    let expiry: DateTime<Utc> = Utc::now() + Duration::hours(1);

    let updated: Option<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE users
        SET reset_token = $2, reset_token_expiry = $3
        WHERE email = $1
        RETURNING id
        "#,
    )
    .bind(&email)
    .bind(&reset_token)
    .bind(expiry)
    .fetch_optional(&state.pool)
    .await?;

    if updated.is_some() {
        state.mailer.deliver(Email::PasswordReset {
            to: email,
            token: reset_token,
        });
    }

    Ok(ApiResponse::success(
        "If that email exists, a reset link has been sent.",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.password.chars().count() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let updated: Option<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE users
        SET password_hash = $2, reset_token = NULL, reset_token_expiry = NULL
        WHERE reset_token = $1 AND reset_token_expiry > now()
        RETURNING id
        "#,
    )
    .bind(&payload.token)
    .bind(password_hash)
    .fetch_optional(&state.pool)
    .await?;

    if updated.is_none() {
        return Err(AppError::BadRequest(
            "Invalid or expired reset link. Please request a new one.".to_string(),
        ));
    }

    Ok(ApiResponse::success(
        "Password reset successful! You can now login.",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Signed bearer token carrying the user id and the admin flag.
pub fn issue_token(user_id: Uuid, is_admin: bool, validity: Duration) -> AppResult<String> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(validity)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        is_admin,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

fn public_user(user: User) -> PublicUser {
    PublicUser {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        is_admin: user.is_admin,
        is_verified: user.is_verified,
        created_at: user.created_at,
    }
}
