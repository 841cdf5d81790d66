use std::io::{self, Write};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use expense_auth::auth::pg_store::PgCredentialStore;
use expense_auth::auth::store::NewCredential;
use expense_auth::auth::{AuthError, CredentialStore, PasswordService};
use expense_auth::db;

#[derive(Parser, Debug)]
#[command(
    name = "create_user",
    about = "Create an account directly in the credential database"
)]
struct Args {
    /// Login name, used as the token subject.
    #[arg(long)]
    username: String,

    /// Email address for the account (stored lowercased).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this user.
    #[arg(long)]
    password: String,

    /// Create the account disabled; it cannot log in or pass remote validation.
    #[arg(long)]
    disabled: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let username = args.username.trim().to_string();
    let email = args.email.trim().to_lowercase();

    if username.is_empty() || args.password.is_empty() {
        writeln!(io::stderr(), "error: username and password must not be empty")?;
        std::process::exit(1);
    }
    if !email.contains('@') {
        writeln!(io::stderr(), "error: email must contain '@'")?;
        std::process::exit(1);
    }
    if username.contains('@') {
        writeln!(io::stderr(), "error: username must not contain '@'")?;
        std::process::exit(1);
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    db::run_migrations(&pool).await?;

    let store = PgCredentialStore::new(pool);
    let password_hash = PasswordService::new()?.hash_password(&args.password)?;

    let credential = match store
        .insert(NewCredential {
            username,
            email,
            password_hash,
        })
        .await
    {
        Ok(credential) => credential,
        Err(AuthError::DuplicateSubject) => {
            writeln!(
                io::stderr(),
                "error: an account with that username or email already exists."
            )?;
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    if args.disabled {
        store.set_enabled(&credential.username, false).await?;
    }

    println!(
        "Created {} account '{}' with id {}",
        if args.disabled { "disabled" } else { "enabled" },
        credential.username,
        credential.id
    );
    Ok(())
}
