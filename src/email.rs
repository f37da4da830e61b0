use uuid::Uuid;

/// Outbound transactional mail. Delivery is an external collaborator; the
/// service only decides what to send and never waits on the result.
#[derive(Debug, Clone)]
pub enum Email {
    Verification {
        to: String,
        first_name: String,
        token: String,
    },
    Welcome {
        to: String,
        first_name: String,
    },
    PasswordReset {
        to: String,
        token: String,
    },
    AdminOtp {
        to: String,
        code: String,
    },
    OrderConfirmation {
        to: String,
        first_name: String,
        order_id: Uuid,
        total_price: i64,
    },
}

/// Fire-and-forget delivery seam. Failures are the implementation's problem
/// to report (log); they must never surface to the triggering request.
pub trait Mailer: Send + Sync + 'static {
    fn deliver(&self, email: Email);
}

/// Default mailer: logs what would have been sent. Real delivery plugs in
/// behind the same trait.
pub struct LogMailer {
    pub client_url: String,
}

impl Mailer for LogMailer {
    fn deliver(&self, email: Email) {
        match email {
            Email::Verification {
                to,
                first_name,
                token,
            } => tracing::info!(
                %to,
                %first_name,
                url = %format!("{}/verify-email?token={token}", self.client_url),
                "verification email"
            ),
            Email::Welcome { to, first_name } => {
                tracing::info!(%to, %first_name, "welcome email")
            }
            Email::PasswordReset { to, token } => tracing::info!(
                %to,
                url = %format!("{}/reset-password?token={token}", self.client_url),
                "password reset email"
            ),
            Email::AdminOtp { to, code } => {
                tracing::info!(%to, %code, "admin login OTP email")
            }
            Email::OrderConfirmation {
                to,
                first_name,
                order_id,
                total_price,
            } => tracing::info!(
                %to,
                %first_name,
                %order_id,
                total_price,
                "order confirmation email"
            ),
        }
    }
}
