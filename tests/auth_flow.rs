use std::sync::{Arc, Mutex};

use pillow_shop_api::{
    db::{create_orm_conn, create_pool},
    dto::auth::{ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest},
    email::{Email, Mailer},
    error::AppError,
    otp::OtpStore,
    rate_limit::RateLimiter,
    services::auth_service,
    state::AppState,
};

/// Captures outbound mail so the test can read verification and reset tokens.
#[derive(Default)]
struct CapturingMailer {
    sent: Mutex<Vec<Email>>,
}

impl Mailer for CapturingMailer {
    fn deliver(&self, email: Email) {
        self.sent.lock().unwrap().push(email);
    }
}

impl CapturingMailer {
    fn verification_token(&self) -> Option<String> {
        self.sent.lock().unwrap().iter().rev().find_map(|e| match e {
            Email::Verification { token, .. } => Some(token.clone()),
            _ => None,
        })
    }

    fn reset_token(&self) -> Option<String> {
        self.sent.lock().unwrap().iter().rev().find_map(|e| match e {
            Email::PasswordReset { token, .. } => Some(token.clone()),
            _ => None,
        })
    }
}

// Signup -> email verification -> login -> password reset -> login again.
#[tokio::test]
async fn signup_verify_login_and_reset_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };
    unsafe { std::env::set_var("JWT_SECRET", "integration-test-secret") };

    let mailer = Arc::new(CapturingMailer::default());
    let state = setup_state(&database_url, mailer.clone()).await?;

    let created = auth_service::signup(
        &state,
        SignupRequest {
            first_name: "Meera".into(),
            last_name: "Iyer".into(),
            email: "Meera@Example.com".into(),
            password: "secret-pass".into(),
        },
    )
    .await?
    .data
    .unwrap();
    // Emails are normalized to lowercase on the way in.
    assert_eq!(created.email, "meera@example.com");
    assert!(!created.is_verified);

    // The same email cannot sign up twice.
    let err = auth_service::signup(
        &state,
        SignupRequest {
            first_name: "Meera".into(),
            last_name: "Iyer".into(),
            email: "meera@example.com".into(),
            password: "secret-pass".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "User already exists");

    // Login is blocked until the email is verified.
    let err = auth_service::login(
        &state,
        LoginRequest {
            email: "meera@example.com".into(),
            password: "secret-pass".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let token = mailer.verification_token().expect("verification mail");
    auth_service::verify_email(&state, &token).await?;

    // The verification link is single-use.
    let err = auth_service::verify_email(&state, &token).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid or expired verification link");

    let login = auth_service::login(
        &state,
        LoginRequest {
            email: "meera@example.com".into(),
            password: "secret-pass".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(login.name, "Meera");
    assert!(!login.is_admin);
    assert!(!login.token.is_empty());

    // Wrong password and unknown account read the same to the caller.
    let wrong_password = auth_service::login(
        &state,
        LoginRequest {
            email: "meera@example.com".into(),
            password: "not-it".into(),
        },
    )
    .await
    .unwrap_err();
    let unknown_account = auth_service::login(
        &state,
        LoginRequest {
            email: "nobody@example.com".into(),
            password: "whatever".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(wrong_password.to_string(), "Invalid email or password");
    assert_eq!(unknown_account.to_string(), "Invalid email or password");

    // Forgot-password replies identically whether or not the account exists.
    let known = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: "meera@example.com".into(),
        },
    )
    .await?;
    let unknown = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: "nobody@example.com".into(),
        },
    )
    .await?;
    assert_eq!(known.message, unknown.message);

    let reset = mailer.reset_token().expect("reset mail");

    let err = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: "bogus".into(),
            password: "new-secret".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid or expired reset link. Please request a new one."
    );

    auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: reset.clone(),
            password: "new-secret".into(),
        },
    )
    .await?;

    // The reset token is cleared once used.
    let err = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: reset,
            password: "another-one".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Old password is out, new one is in.
    let err = auth_service::login(
        &state,
        LoginRequest {
            email: "meera@example.com".into(),
            password: "secret-pass".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    auth_service::login(
        &state,
        LoginRequest {
            email: "meera@example.com".into(),
            password: "new-secret".into(),
        },
    )
    .await?;

    // The fixed window eventually refuses further attempts for one email.
    let throttled_state = AppState {
        auth_limiter: RateLimiter::new(2, std::time::Duration::from_secs(60)),
        ..state.clone()
    };
    assert!(
        auth_service::login(
            &throttled_state,
            LoginRequest {
                email: "meera@example.com".into(),
                password: "new-secret".into(),
            },
        )
        .await
        .is_ok()
    );
    assert!(
        auth_service::login(
            &throttled_state,
            LoginRequest {
                email: "meera@example.com".into(),
                password: "new-secret".into(),
            },
        )
        .await
        .is_ok()
    );
    let err = auth_service::login(
        &throttled_state,
        LoginRequest {
            email: "meera@example.com".into(),
            password: "new-secret".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::TooManyRequests));

    Ok(())
}

async fn setup_state(database_url: &str, mailer: Arc<CapturingMailer>) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE order_items, orders, cart_items, addresses, audit_logs, products, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    let orm = create_orm_conn(database_url).await?;

    Ok(AppState {
        pool,
        orm,
        otp: OtpStore::new(),
        auth_limiter: RateLimiter::auth_default(),
        mailer,
    })
}
