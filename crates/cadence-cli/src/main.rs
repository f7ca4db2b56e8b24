use cadence_core::db;
use cadence_core::error::CoreError;
use cadence_core::models::EngineConfig;
use cadence_core::repository::SqliteRepository;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod cli;
mod commands;
mod config;
mod views;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::new().unwrap_or_default();

    let db_pool = match db::establish_connection(&config.db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let repository = SqliteRepository::new(
        db_pool,
        EngineConfig {
            lookahead_days: config.recurrence.lookahead_days,
        },
    );

    let cli = cli::Cli::parse();
    let owner = cli.owner.or(config.owner_id).unwrap_or_else(Uuid::nil);
    let tenant = config.tenant_id.unwrap_or_else(Uuid::nil);

    let result = match cli.command {
        cli::Commands::Add(command) => {
            commands::add::add_task(&repository, tenant, owner, command).await
        }
        cli::Commands::List(command) => {
            commands::list::list_tasks(&repository, owner, command).await
        }
        cli::Commands::Reconcile(command) => {
            commands::reconcile::reconcile(&repository, owner, command).await
        }
        cli::Commands::Commit(command) => {
            commands::commit::commit_task(&repository, owner, command).await
        }
        cli::Commands::Uncommit(command) => {
            commands::commit::uncommit_task(&repository, owner, command).await
        }
        cli::Commands::Pause(command) => {
            commands::recurrence::pause_series(&repository, owner, command).await
        }
        cli::Commands::Resume(command) => {
            commands::recurrence::resume_series(&repository, owner, command).await
        }
        cli::Commands::Delete(command) => {
            commands::delete::delete_task(&repository, owner, command).await
        }
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} Task not found: {}", "Error:".style(error_style), s);
            }
            CoreError::Validation(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidRule(e) => {
                eprintln!(
                    "{} Invalid recurrence rule: {}",
                    "Error:".style(error_style),
                    e.to_string().yellow()
                );
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
