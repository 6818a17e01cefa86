//! Command-line entry point for the positions service.
//!
//! # Responsibility
//! - Load configuration from the environment and open the store.
//! - Dispatch one API request per invocation and print the JSON response.
//!
//! # Invariants
//! - A missing `DATABASE_URL` aborts before any store access.
//! - Exit status is non-zero for fatal startup errors and non-2xx responses.

use clap::{Parser, Subcommand};
use log::error;
use positions_api::handle_request;
use positions_core::db::migrations::{current_user_version, latest_version};
use positions_core::{core_version, init_logging, ping, AppConfig};
use rusqlite::Connection;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "positions", version, about = "Organizational position tree")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a health check.
    Ping,
    /// Open the database, apply migrations and report the schema version.
    Init,
    /// Run one request, e.g. `request GET /positions`.
    Request {
        /// HTTP method (GET, POST, PUT, DELETE).
        method: String,
        /// Request path, e.g. `/positions/children/<id>`.
        path: String,
        /// Raw JSON body for POST and PUT.
        body: Option<String>,
    },
}

fn main() -> ExitCode {
    match Cli::parse().command {
        Command::Ping => {
            println!("positions_core ping={} version={}", ping(), core_version());
            ExitCode::SUCCESS
        }
        Command::Init => with_store(|conn| match current_user_version(conn) {
            Ok(version) => {
                println!("schema_version={version} latest={}", latest_version());
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to read schema version: {err}");
                ExitCode::FAILURE
            }
        }),
        Command::Request { method, path, body } => with_store(|conn| {
            let response = handle_request(conn, &method, &path, body.as_deref());
            println!("{}", response.status);
            match serde_json::to_string_pretty(&response.body) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("failed to render response: {err}"),
            }
            if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }),
    }
}

/// Loads configuration, starts logging and opens the store, then runs `action`.
fn with_store(action: impl FnOnce(&Connection) -> ExitCode) -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("logging setup failed: {err}");
            return ExitCode::from(2);
        }
    }

    match config.database.open() {
        Ok(conn) => action(&conn),
        Err(err) => {
            error!("event=cli_start module=cli status=error error_code=db_open_failed error={err}");
            eprintln!("failed to open database: {err}");
            ExitCode::from(2)
        }
    }
}
