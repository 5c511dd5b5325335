//! `catalog`: run the catalog API, apply its schema, or create users.

use catalog_api::{
    apply_migrations, app_router, connect, ensure_database_exists, load_catalog, resolve,
    AppError, AppState, NewUser, Settings, UserService,
};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::process::ExitCode;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "catalog", version, about = "Library catalog API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply the catalog schema and serve the HTTP API.
    Serve,
    /// Apply the catalog schema and exit.
    Migrate,
    /// Create a new user.
    #[command(name = "app:create-user")]
    CreateUser {
        email: String,
        password: String,
        first_name: String,
        last_name: String,
        /// Make user an admin
        #[arg(short, long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("catalog_api=info,catalog=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let catalog = load_catalog(settings.catalog_path.as_deref()).await?;
    let model = resolve(&catalog)?;

    match cli.command {
        Command::Serve => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = connect(&settings).await?;
            apply_migrations(&pool, &catalog).await?;
            let listener = TcpListener::bind(&settings.bind_addr).await?;
            tracing::info!(addr = %listener.local_addr()?, "catalog API listening");
            let app = app_router(AppState::new(pool, model, settings));
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            tracing::info!("server stopped");
        }
        Command::Migrate => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = connect(&settings).await?;
            apply_migrations(&pool, &catalog).await?;
        }
        Command::CreateUser {
            email,
            password,
            first_name,
            last_name,
            admin,
        } => {
            let pool = connect(&settings).await?;
            let input = NewUser {
                email: &email,
                password: &password,
                first_name: &first_name,
                last_name: &last_name,
                admin,
            };
            let user = match UserService::create_user(&pool, &model, &input).await {
                Ok(user) => user,
                Err(AppError::Conflict(message)) => {
                    eprintln!("[ERROR] {}", message);
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            };
            println!(
                "[OK] User \"{}\" created successfully with role: {}",
                user.email,
                if admin { "ADMIN" } else { "USER" }
            );
            print_table(&user.summary());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_table(rows: &[(&str, String)]) {
    let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0).max("Property".len());
    let value_width = rows
        .iter()
        .map(|(_, v)| v.chars().count())
        .max()
        .unwrap_or(0)
        .max("Value".len());
    let rule = format!("{} {}", "-".repeat(key_width), "-".repeat(value_width));
    println!("{}", rule);
    println!("{:<kw$} {}", "Property", "Value", kw = key_width);
    println!("{}", rule);
    for (k, v) in rows {
        println!("{:<kw$} {}", k, v, kw = key_width);
    }
    println!("{}", rule);
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
