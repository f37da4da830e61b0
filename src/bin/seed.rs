use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use pillow_shop_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", true).await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123", false).await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    is_admin: bool,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, first_name, last_name, email, password_hash, is_admin, is_verified)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE)
        ON CONFLICT (email) DO UPDATE SET is_admin = EXCLUDED.is_admin
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(if is_admin { "Admin" } else { "Sample" })
    .bind("User")
    .bind(email)
    .bind(password_hash)
    .bind(is_admin)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (admin={is_admin})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        (
            "Classic Fibre Pillow",
            "KSP-001",
            "fibre-pillows",
            49900,
            "17x27 in",
            "800 g",
            "Soft hollow-fibre pillow for everyday comfort",
        ),
        (
            "Memory Foam Contour Pillow",
            "KSP-014",
            "memory-foam",
            129900,
            "14x23 in",
            "1.1 kg",
            "Contoured memory foam for neck support",
        ),
        (
            "Orthopedic Mattress 6in",
            "KSM-031",
            "mattresses",
            1499900,
            "72x36 in",
            "14 kg",
            "Medium-firm orthopedic bonded foam mattress",
        ),
        (
            "Bolster Pillow Pair",
            "KSP-022",
            "bolsters",
            69900,
            "9x22 in",
            "1.4 kg",
            "Set of two soft bolsters",
        ),
    ];

    for (name, code, category, price, size, weight, description) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, product_code, category, price, size, weight, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (product_code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(code)
        .bind(category)
        .bind(price as i64)
        .bind(size)
        .bind(weight)
        .bind(description)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
