use std::env;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

use doc_registry::{config::AppConfig, state::AppState};

const USAGE: &str = "Usage: maintenance <migrate | health | stats | refresh-review-flags [YYYY-MM-DD]>";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("migrate") => migrate()?,
        Some("health") => health()?,
        Some("stats") => stats()?,
        Some("refresh-review-flags") => refresh_review_flags(args.next().as_deref())?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn connect() -> Result<AppState> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.database_url,
        pool_size = config.database_max_pool_size,
        transition_policy = %config.transition_policy,
        "loaded registry configuration"
    );
    AppState::connect(config).context("failed to open registry database")
}

fn migrate() -> Result<()> {
    connect()?;
    println!("Schema is up to date.");
    Ok(())
}

fn health() -> Result<()> {
    let state = connect()?;
    if state.db.health_check() {
        println!("ok");
        Ok(())
    } else {
        anyhow::bail!("database health check failed")
    }
}

fn stats() -> Result<()> {
    let state = connect()?;
    let stats = state
        .stats
        .collect(Utc::now().naive_utc(), state.config.stats_recent_window_days)
        .context("failed to collect statistics")?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn refresh_review_flags(date: Option<&str>) -> Result<()> {
    let today = match date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))?,
        None => Utc::now().date_naive(),
    };
    let state = connect()?;
    let sweep = state
        .review
        .refresh(today, state.config.review_due_window_days)
        .context("failed to refresh review flags")?;
    println!(
        "Flagged {} breached, {} review due, {} needing review.",
        sweep.breached, sweep.review_due, sweep.needs_review
    );
    Ok(())
}
