//! Command-line probe for the annotations core.
//!
//! # Responsibility
//! - Verify `wodb_core` linkage (`ping`).
//! - Seed and inspect a local database without a transport layer.
//!
//! Output is one JSON document per line so it can be piped into other tools.

use clap::{Parser, Subcommand};
use log::info;
use std::process::ExitCode;
use wodb_core::{
    init_logging_from_config, open_db, seed_default_sets, Actor, AnnotationService, CoreConfig,
    SetService, SqliteAnnotationRepository, SqliteSetRepository,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// `wodb_cli` arguments.
#[derive(Debug, Parser)]
#[command(
    name = "wodb_cli",
    about = "Seed and inspect a WODB annotations database",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print core ping and version.
    Ping,
    /// Upsert the default sets into the configured database.
    Seed,
    /// List sets as JSON lines.
    Sets,
    /// Print the annotations `viewer` may see in one set.
    Visible {
        viewer: String,
        #[arg(value_name = "SET")]
        set_id: String,
    },
    /// Submit all of `user`'s drafts in one set for review.
    Review {
        user: String,
        #[arg(value_name = "SET")]
        set_id: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> CliResult {
    match command {
        Command::Ping => {
            println!("wodb_core ping={}", wodb_core::ping());
            println!("wodb_core version={}", wodb_core::core_version());
        }
        Command::Seed => {
            let config = load_config()?;
            let conn = open_db(&config.db_path)?;
            let service = SetService::new(SqliteSetRepository::try_new(&conn)?);
            let count = seed_default_sets(&service)?;
            info!("event=cli_seed module=cli status=ok count={count}");
            println!("seeded {count} sets into {}", config.db_path.display());
        }
        Command::Sets => {
            let conn = open_db(load_config()?.db_path)?;
            let service = SetService::new(SqliteSetRepository::try_new(&conn)?);
            for set in service.list_sets()? {
                println!("{}", serde_json::to_string(&set)?);
            }
        }
        Command::Visible { viewer, set_id } => {
            let conn = open_db(load_config()?.db_path)?;
            let service = AnnotationService::new(SqliteAnnotationRepository::try_new(&conn)?);
            for annotation in service.visible_annotations(&viewer, &set_id)? {
                println!("{}", serde_json::to_string(&annotation)?);
            }
        }
        Command::Review { user, set_id } => {
            let conn = open_db(load_config()?.db_path)?;
            let service = AnnotationService::new(SqliteAnnotationRepository::try_new(&conn)?);
            let changed = service.request_review(&Actor::member(user), &set_id)?;
            for annotation in &changed {
                println!("{}", serde_json::to_string(annotation)?);
            }
            info!(
                "event=cli_review module=cli status=ok set_id={} changed={}",
                set_id,
                changed.len()
            );
        }
    }
    Ok(())
}

/// Resolves environment configuration and starts file logging when configured.
fn load_config() -> Result<CoreConfig, Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env()?;
    init_logging_from_config(&config)?;
    Ok(config)
}
