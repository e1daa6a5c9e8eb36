use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use clinic_api::auth::passwords::PasswordService;
use clinic_api::auth::store::normalize_email;

#[derive(Parser, Debug)]
#[command(name = "create_staff", about = "Create a clinic staff account")]
struct Args {
    /// Email address for the account (case insensitive).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this account.
    #[arg(long)]
    password: String,

    /// Full name to associate with the account.
    #[arg(long)]
    full_name: String,

    /// Optional phone number.
    #[arg(long)]
    phone: Option<String>,

    /// Role to assign (`owner`, `admin`, `doctor` or `staff`).
    #[arg(long, default_value = "staff")]
    role: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let email = normalize_email(&args.email);

    if !matches!(args.role.as_str(), "owner" | "admin" | "doctor" | "staff") {
        return Err(format!("unknown role '{}'", args.role).into());
    }

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| "DATABASE_URL must be set to the clinic database")?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    clinic_api::db::run_migrations(&pool).await?;

    let password_hash = PasswordService::new().hash_password(&args.password)?;

    let staff_id: i32 = sqlx::query_scalar(
        "INSERT INTO staff (full_name, phone, email, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5) RETURNING staff_id",
    )
    .bind(&args.full_name)
    .bind(&args.phone)
    .bind(&email)
    .bind(&password_hash)
    .bind(&args.role)
    .fetch_one(&pool)
    .await?;

    log::info!("created staff account #{staff_id} ({email}, role {})", args.role);

    Ok(())
}
