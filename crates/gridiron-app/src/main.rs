// League history batch entry point.
//
// Startup sequence:
// 1. Parse command line
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config
// 4. Open database
// 5. Rebuild snapshots and standings
// 6. Exit non-zero if any input was rejected

use gridiron_app::app::{self, RunOptions};
use gridiron_app::config;
use gridiron_app::db;
use gridiron_core::season::Season;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

/// Rebuild league contracts, picks, RFA rights and standings from history.
#[derive(Parser)]
#[command(name = "gridiron", version, about = "Keeper league history engine")]
struct Cli {
    /// Season to rebuild (default: every configured season)
    season: Option<Season>,

    /// Discard previously derived state before writing
    #[arg(long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse command line
    let cli = Cli::parse();

    // 2. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Gridiron starting up");

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, seasons {}-{}, {} regime tenures",
        config.league.name,
        config.league.first_season,
        config.league.current_season,
        config.regimes.len()
    );

    // 4. Open database
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 5. Rebuild snapshots and standings
    let options = RunOptions {
        season: cli.season,
        clear: cli.clear,
    };
    let summary = app::run(&config, &db, &options).await?;
    info!(
        "Wrote {} snapshot(s) and {} standings table(s)",
        summary.snapshots.len(),
        summary.standings.len()
    );

    // 6. Exit non-zero if any input was rejected
    if !summary.is_clean() {
        warn!("Run finished with rejected input");
        eprintln!("gridiron: some input could not be processed, see logs/gridiron.log");
        std::process::exit(summary.exit_code());
    }

    info!("Gridiron finished cleanly");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("gridiron.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridiron=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
