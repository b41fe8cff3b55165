use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::SecretString;

use spillover_core::MemberCode;
use spillover_engine::{AccountService, DownlineQuery, JwtIssuer, SaltedSha256Hasher, TreeMutator};
use spillover_settings::SpilloverSettings;
use spillover_store::{Database, MemberRepo};
use spillover_telemetry::TelemetryConfig;

#[derive(Parser)]
#[command(name = "spillover", about = "Binary-tree member placement service")]
struct Cli {
    /// Settings file (defaults to ~/.spillover/settings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create the root member of an empty tree.
    SeedRoot {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        mobile: String,
        #[arg(long)]
        password: String,
    },
}

struct Services {
    repo: Arc<MemberRepo>,
    accounts: Arc<AccountService>,
}

fn build_services(settings: &SpilloverSettings) -> anyhow::Result<Services> {
    let db_path = settings.database_path();
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    let repo = Arc::new(MemberRepo::new(db));

    let mutator = Arc::new(TreeMutator::new(
        repo.clone(),
        settings.tree.count_rule,
        settings.tree.max_placement_attempts,
    ));
    let tokens = JwtIssuer::new(
        &SecretString::from(settings.auth.jwt_secret.clone()),
        Duration::from_secs(settings.auth.token_ttl_secs),
    );
    let accounts = Arc::new(AccountService::new(
        repo.clone(),
        mutator,
        Arc::new(SaltedSha256Hasher::default()),
        Arc::new(tokens),
        MemberCode::from_raw(settings.tree.root_code.trim()),
    ));

    Ok(Services { repo, accounts })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => spillover_settings::load_settings_from_path(path),
        None => spillover_settings::load_settings(),
    }
    .context("failed to load settings")?;

    spillover_telemetry::init_telemetry(&TelemetryConfig::from_level_name(
        &settings.logging.level,
        settings.logging.json,
    ));

    let services = build_services(&settings)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::SeedRoot {
            name,
            email,
            mobile,
            password,
        } => {
            let (code, id) = services
                .accounts
                .seed_root(&name, &email, &mobile, &password)
                .map_err(|e| anyhow::anyhow!("seed-root failed: {}", e.public_message()))?;
            tracing::info!(%code, %id, "root member seeded");
            println!("{code}");
            Ok(())
        }
        Command::Serve => serve(&settings, services).await,
    }
}

async fn serve(settings: &SpilloverSettings, services: Services) -> anyhow::Result<()> {
    if settings.auth.uses_default_secret() {
        tracing::warn!("auth.jwtSecret is the built-in default; set SPILLOVER_JWT_SECRET");
    }
    tracing::info!(
        count_rule = ?settings.tree.count_rule,
        max_attempts = settings.tree.max_placement_attempts,
        "starting spillover server"
    );

    let state = spillover_server::AppState {
        downline: Arc::new(DownlineQuery::new(services.repo.clone())),
        accounts: services.accounts,
        repo: services.repo,
    };
    let config = spillover_server::ServerConfig {
        host: settings.server.host.clone(),
        port: settings.server.port,
    };
    let handle = spillover_server::start(config, state)
        .await
        .context("failed to start server")?;

    tracing::info!(port = handle.port, "spillover server ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}
