//! Service bootstrap: command line, tracing, database preparation and the HTTP server.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::ACCEPT;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::http::Method;
use clap::Parser;
use fieldx::fxstruct;
use garde::Validate;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::error;
use tracing::info;
use tracing::instrument;

use crate::catalog;
#[cfg(feature = "pg")]
use crate::db::driver::pg::Pg;
#[cfg(feature = "sqlite")]
use crate::db::driver::sqlite::Sqlite;
use crate::db::driver::DatabaseDriver;
use crate::db::driver::RetryPolicy;
use crate::db::migrations::Migrator;
use crate::error::LedgerError;
use crate::forecast::Forecaster;
use crate::http;
use crate::http::AppState;
use crate::inventory::Inventory;
use crate::ledger::Ledger;
use crate::types::Result;

#[derive(Debug, Clone, clap::Parser, Validate)]
#[fxstruct(no_new, get(copy))]
#[clap(about, version, author, name = "pharma-ledger")]
pub struct Cli {
    /// Address to listen on.
    #[clap(long, env = "PHARMA_HOST", default_value = "0.0.0.0")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    host: String,

    #[clap(long, short, env = "PHARMA_PORT", default_value_t = 5001)]
    #[garde(range(min = 1))]
    port: u16,

    /// Directory of the SQLite database file.
    #[clap(long, env = "PHARMA_SQLITE_PATH", default_value = ".")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    sqlite_path: PathBuf,

    /// Name of the SQLite database file.
    #[clap(long, env = "PHARMA_SQLITE_DB", default_value = "pharma.db")]
    #[fieldx(get(clone))]
    #[garde(length(min = 1))]
    sqlite_db: String,

    /// Use PostgreSQL instead of SQLite.
    #[clap(long, env = "PHARMA_PG", default_value_t = false)]
    #[garde(custom(Self::feature_enabled(cfg!(feature = "pg"), "pg")))]
    pg: bool,

    #[clap(long, env = "PHARMA_PG_HOST", default_value = "localhost")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_host: String,

    #[clap(long, env = "PHARMA_PG_PORT", default_value_t = 5432)]
    #[garde(skip)]
    pg_port: u16,

    #[clap(long, env = "PHARMA_PG_USER", default_value = "pharma")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_user: String,

    #[clap(long, env = "PHARMA_PG_PASSWORD", hide_env_values = true, default_value = "pharma")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_password: String,

    #[clap(long, env = "PHARMA_PG_DATABASE", default_value = "pharma")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_database: String,

    /// Size of the PostgreSQL connection pool.
    #[clap(long, env = "PHARMA_PG_MAX_CONNECTIONS", default_value_t = 20)]
    #[garde(range(min = 1))]
    pg_max_connections: u32,

    /// How many times to try connecting to the database on startup.
    #[clap(long, env = "PHARMA_DB_RETRIES", default_value_t = 5)]
    #[garde(range(min = 1))]
    db_retries: u32,

    /// Delay before the first reconnection attempt; doubled on every following one.
    #[clap(long, env = "PHARMA_DB_BACKOFF_MS", default_value_t = 500)]
    #[garde(range(min = 1))]
    db_backoff_ms: u64,

    /// Base URL of the demand prediction service.
    #[clap(long, env = "PHARMA_PREDICTOR_URL", default_value = "http://localhost:5002")]
    #[fieldx(get(clone))]
    #[garde(custom(Self::http_url))]
    predictor_url: String,

    /// Timeout of prediction service requests, in seconds.
    #[clap(long, env = "PHARMA_PREDICTOR_TIMEOUT", default_value_t = 30)]
    #[garde(range(min = 1))]
    predictor_timeout: u64,

    /// Origin allowed to make cross-origin requests.
    #[clap(long, env = "PHARMA_CORS_ORIGIN", default_value = "http://localhost:5173")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    cors_origin: String,

    /// File to send log into
    #[clap(long, env = "PHARMA_LOG_FILE")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    log_file: Option<PathBuf>,

    /// Don't populate an empty inventory with the sample drug.
    #[clap(long, env = "PHARMA_NO_SEED", default_value_t = false)]
    #[garde(skip)]
    no_seed: bool,
}

impl Cli {
    fn feature_enabled<'a>(enabled: bool, feature: &'static str) -> impl FnOnce(&'a bool, &()) -> garde::Result {
        move |value, _| {
            if !*value || enabled {
                Ok(())
            }
            else {
                Err(garde::Error::new(format!(
                    "this build doesn't support '{feature}' backend"
                )))
            }
        }
    }

    #[allow(clippy::ptr_arg)]
    fn http_url(value: &String, _: &()) -> garde::Result {
        if value.starts_with("http://") || value.starts_with("https://") {
            Ok(())
        }
        else {
            Err(garde::Error::new("must be an http:// or https:// URL"))
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let initial = Duration::from_millis(self.db_backoff_ms);
        RetryPolicy {
            attempts: self.db_retries,
            initial,
            max_delay: initial.saturating_mul(16),
        }
    }
}

fn setup_tracing(cli: &Cli) -> Result<()> {
    use std::io;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let dest_writer = Mutex::new(if let Some(log_file) = cli.log_file() {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(log_file)?;
        Box::new(file) as Box<dyn io::Write + Send>
    }
    else {
        Box::new(io::stdout()) as Box<dyn io::Write + Send>
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(dest_writer))
        .try_init()
        .map_err(|e| LedgerError::config(format!("cannot initialize tracing: {e}")))?;

    info!("Tracing initialized");
    Ok(())
}

/// Configure the connection, bring the schema up to date and fill in the reference data.
#[instrument(level = "debug", skip(db), fields(driver = db.name()))]
pub async fn prepare_db<D: DatabaseDriver>(db: &D) -> Result<()> {
    db.configure().await?;

    let conn = db.connection();
    Migrator::up(&conn, None).await?;
    catalog::seed_drug_types(&conn).await?;

    Ok(())
}

/// Wire the services over a prepared database.
pub fn build_state<D: DatabaseDriver>(db: Arc<D>, forecaster: Forecaster) -> Result<AppState<D>> {
    let ledger = Ledger::builder()
        .db(Arc::clone(&db))
        .build()
        .map_err(|e| LedgerError::config(format!("cannot build the ledger: {e}")))?;
    let inventory = Inventory::builder()
        .db(Arc::clone(&db))
        .build()
        .map_err(|e| LedgerError::config(format!("cannot build the inventory: {e}")))?;

    Ok(AppState {
        db,
        ledger: Arc::new(ledger),
        inventory: Arc::new(inventory),
        forecaster,
    })
}

pub fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin = origin
        .parse::<HeaderValue>()
        .map_err(|e| LedgerError::config(format!("invalid CORS origin '{origin}': {e}")))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
        .allow_credentials(true))
}

#[cfg(feature = "sqlite")]
async fn connect_sqlite(cli: &Cli) -> Result<Arc<Sqlite>> {
    let db_dir = cli.sqlite_path();
    let db_name = cli.sqlite_db();
    std::fs::create_dir_all(&db_dir)?;

    let (dir, name) = (&db_dir, db_name.as_str());
    let sqlite = cli
        .retry_policy()
        .connect("SQLite", move || Sqlite::connect(dir, name))
        .await?;

    info!("Connected to SQLite database {}", db_dir.join(&db_name).display());
    Ok(Arc::new(sqlite))
}

#[cfg(feature = "pg")]
async fn connect_pg(cli: &Cli) -> Result<Arc<Pg>> {
    let pg = Pg::builder()
        .host(cli.pg_host())
        .port(cli.pg_port())
        .user(cli.pg_user())
        .password(cli.pg_password())
        .database(cli.pg_database())
        .max_connections(cli.pg_max_connections())
        .build()
        .map_err(|e| LedgerError::config(format!("cannot set up PostgreSQL driver: {e}")))?;

    cli.retry_policy().connect("PostgreSQL", || pg.connect()).await?;

    info!("Connected to PostgreSQL database {}", pg.display_url());
    Ok(pg)
}

async fn serve<D: DatabaseDriver>(cli: &Cli, db: Arc<D>) -> Result<()> {
    prepare_db(db.as_ref()).await?;

    let forecaster = Forecaster::new(cli.predictor_url(), Duration::from_secs(cli.predictor_timeout()))?;
    let state = build_state(db, forecaster)?;
    if !cli.no_seed() {
        state.inventory.seed_sample_stock().await?;
    }

    let app = http::router(state, cors_layer(&cli.cors_origin())?);

    let listener = TcpListener::bind((cli.host().as_str(), cli.port())).await?;
    info!("Server is running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Parse the command line and run the service until it is asked to stop.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.validate()
        .map_err(|e| LedgerError::config(format!("invalid command line: {e}")))?;

    setup_tracing(&cli)?;

    if cli.pg() {
        #[cfg(feature = "pg")]
        return serve(&cli, connect_pg(&cli).await?).await;
    }

    #[cfg(feature = "sqlite")]
    return serve(&cli, connect_sqlite(&cli).await?).await;

    #[cfg(not(feature = "sqlite"))]
    Err(LedgerError::config("this build has no SQLite support; use --pg"))
}
