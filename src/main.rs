use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;

use nooze::cli::args::{Cli, Commands};
use nooze::cli::handlers;
use nooze::config::AppConfig;
use nooze::db::migrations::run_migrations;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Loading config")?;

    // Ensure data directory exists and open DB
    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    run_migrations(&conn)?;

    // A ring that was solved but never written to the log
    if let Some(day) = handlers::apply_pending_completion(&conn)
        .context("Applying pending completion")?
    {
        log::info!("recovered completion for {}", day);
    }

    match cli.command {
        Some(Commands::Alarm { action }) => handlers::handle_alarm(&conn, &config, &action)?,
        Some(Commands::Next) => handlers::handle_next(&conn)?,
        Some(Commands::Ring { force }) => handlers::handle_ring(&conn, &config, force)?,
        Some(Commands::Challenge { action }) => {
            handlers::handle_challenge(&conn, &config, &action)?
        }
        Some(Commands::Mark { args }) => handlers::handle_mark(&conn, &args)?,
        Some(Commands::Skip) => handlers::handle_skip(&conn)?,
        Some(Commands::Stats) => handlers::handle_stats(&conn)?,
        Some(Commands::Export { path }) => handlers::handle_export(&conn, path.as_deref())?,
        Some(Commands::Import { path }) => handlers::handle_import(&conn, &path)?,
        Some(Commands::Reset { yes }) => handlers::handle_reset(&conn, yes)?,
        None => handlers::handle_status(&conn)?,
    }

    Ok(())
}
