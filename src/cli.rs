use crate::api::{build_router, AppState};
use crate::category_manager::{CategoryError, CategoryManager};
use crate::config::{ConfigError, ConfigManager};
use crate::logging;
use crate::models::MAX_TODOS_PER_CATEGORY;
use crate::storage::{SqliteStorage, StorageError};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "capped-todos", version, about = "Todo tracker with five tasks per category")]
pub struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true, env = "CAPPED_TODOS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to listen on, overrides server.bind
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Read and change configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Add a category
    Add { name: String },
    /// List categories and how full they are
    List,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
    List,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ConfigManager::new(cli.config.as_deref())?;
    logging::init_tracing(config.log_json())?;

    match cli.command {
        Command::Serve { bind } => {
            let bind = match bind {
                Some(addr) => addr,
                None => config.bind_address()?,
            };
            let storage = SqliteStorage::new(config.storage_path())?;
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(serve(storage, bind))
        }
        Command::Category { action } => {
            let storage = SqliteStorage::new(config.storage_path())?;
            let manager = CategoryManager::new(&storage);
            match action {
                CategoryCommand::Add { name } => {
                    let category = manager.add_category(&name)?;
                    println!("Added category {} (id {})", category.name, category.id);
                }
                CategoryCommand::List => {
                    let categories = manager.list_categories()?;
                    if categories.is_empty() {
                        println!("No categories");
                    }
                    for category in categories {
                        println!(
                            "{}\t{}\t{}/{} tasks",
                            category.id,
                            category.name,
                            category.todos.len(),
                            MAX_TODOS_PER_CATEGORY
                        );
                    }
                }
            }
            Ok(())
        }
        Command::Config { action } => {
            match action {
                ConfigCommand::Get { key } => match config.get(&key)? {
                    Some(value) => println!("{}", value),
                    None => println!("(not set)"),
                },
                ConfigCommand::Set { key, value } => {
                    config.set(&key, &value)?;
                    println!("Set {} = {}", key, value);
                }
                ConfigCommand::Unset { key } => {
                    config.unset(&key)?;
                    println!("Unset {}", key);
                }
                ConfigCommand::List => {
                    for (key, value, is_default) in config.list() {
                        if is_default {
                            println!("{} = {} (default)", key, value);
                        } else {
                            println!("{} = {}", key, value);
                        }
                    }
                }
            }
            Ok(())
        }
    }
}

async fn serve(storage: SqliteStorage, bind: SocketAddr) -> Result<(), CliError> {
    let db_path = storage.path().display().to_string();
    let app = build_router(AppState::new(Arc::new(storage)));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, db = %db_path, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
