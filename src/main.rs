use clap::{Parser, Subcommand};
use nas_sync::{relative_to_root, select_protocol, CancellationToken, Protocol};
use std::path::{Path, PathBuf};

mod database;
mod error;
mod models;
mod services;

use error::AppError;
use services::{catalog_service, sync_service};

/// Photo catalog with NAS synchronization
#[derive(Parser, Debug)]
#[command(name = "photo-nas", version, about)]
struct Cli {
    /// Settings file
    #[arg(short, long, default_value = "photo-nas.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Write a settings file for a NAS
    Init {
        host: String,
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        /// 445 selects SMB
        #[arg(long)]
        port: Option<u16>,
        /// Remote directory, or `share/path` for SMB
        #[arg(long)]
        remote_path: Option<String>,
        #[arg(long)]
        use_https: bool,
        /// Replace an existing settings file
        #[arg(long)]
        force: bool,
    },
    #[command(flatten)]
    Run(Command),
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add all images below a directory to the catalog
    Import { dir: PathBuf },
    /// Mark a photo as favorite
    Favorite {
        id: String,
        /// Remove the mark instead
        #[arg(long)]
        unset: bool,
    },
    /// Show the catalog
    Photos,
    /// Check that the NAS is reachable
    Test,
    /// Upload the catalog to the NAS
    Sync {
        /// Only upload favorites, regardless of the settings file
        #[arg(long)]
        favorites_only: bool,
        /// Maximum parallel uploads
        #[arg(long)]
        concurrency: Option<usize>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List files in the remote directory (WebDAV)
    List,
    /// Create the remote directory (WebDAV)
    Mkdir,
    /// Fetch a file from the remote directory into the cache
    Download { remote_path: String },
    /// Show when the last successful sync happened
    LastSync,
}

fn init_logging() {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("photo-nas"),
    );

    #[cfg(not(target_os = "android"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

fn require_webdav(settings: &models::SyncSettings, what: &str) -> Result<(), AppError> {
    match select_protocol(&settings.nas) {
        Protocol::WebDav => Ok(()),
        Protocol::Smb => Err(AppError::Validation(format!(
            "{} is only available for WebDAV targets",
            what
        ))),
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        CliCommand::Init {
            host,
            username,
            password,
            port,
            remote_path,
            use_https,
            force,
        } => {
            let nas = nas_sync::NasConfig {
                port,
                remote_path,
                use_https,
                ..nas_sync::NasConfig::new(host, username, password)
            };
            nas.validate()?;
            sync_service::write_settings_template(&cli.config, nas, force)?;
            println!("Wrote {}", cli.config.display());
            Ok(())
        }
        CliCommand::Run(command) => run_command(&cli.config, command).await,
    }
}

async fn run_command(config_path: &Path, command: Command) -> Result<(), AppError> {
    let mut settings = sync_service::load_sync_settings(config_path)?;
    let conn = database::init_database(&settings.database_path)?;

    match command {
        Command::Import { dir } => {
            let count = catalog_service::import_directory(&conn, &dir)?;
            println!("Imported {} photos", count);
        }
        Command::Favorite { id, unset } => {
            catalog_service::set_favorite(&conn, &id, !unset)?;
            let photo = catalog_service::get_photo(&conn, &id)?;
            let state = if photo.is_favorite { "favorite" } else { "not a favorite" };
            println!("{} is {}", photo.filename, state);
        }
        Command::Photos => {
            for photo in catalog_service::list_photos(&conn)? {
                let star = if photo.is_favorite { "*" } else { " " };
                println!(
                    "{} {}  {:<40} {:>10}  {}",
                    star, photo.id, photo.filename, photo.size, photo.mime_type
                );
            }
        }
        Command::Test => {
            let context = sync_service::NasContext::new(settings)?;
            let config = &context.settings.nas;
            let protocol = select_protocol(config);
            if context.service.test_connection(config).await {
                println!("{} connection to {} OK", protocol, config.host);
            } else {
                return Err(AppError::Other(format!(
                    "{} connection to {} failed",
                    protocol, config.host
                )));
            }
        }
        Command::Sync {
            favorites_only,
            concurrency,
            json,
        } => {
            if let Some(n) = concurrency {
                settings.concurrency = n;
            }
            let context = sync_service::NasContext::new(settings)?;

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, finishing uploads in flight");
                    on_ctrl_c.cancel();
                }
            });

            let result =
                sync_service::sync_catalog(&conn, &context, favorites_only, &cancel).await?;
            if json {
                let text = serde_json::to_string_pretty(&result)
                    .map_err(|e| AppError::Other(format!("JSON serialize failed: {}", e)))?;
                println!("{}", text);
            } else {
                println!("{} uploaded, {} failed", result.successful, result.failed);
                for failure in &result.failures {
                    println!("  {}: {}", failure.photo_id, failure.reason);
                }
                if result.cancelled {
                    println!("Sync was cancelled");
                }
            }
        }
        Command::List => {
            require_webdav(&settings, "Listing")?;
            let context = sync_service::NasContext::new(settings)?;
            let config = &context.settings.nas;
            for href in context.webdav.try_list_remote_files(config).await? {
                println!("{}", relative_to_root(config, &href));
            }
        }
        Command::Mkdir => {
            require_webdav(&settings, "Creating directories")?;
            let context = sync_service::NasContext::new(settings)?;
            context
                .webdav
                .try_create_remote_directory(&context.settings.nas)
                .await?;
            println!("Remote directory ready");
        }
        Command::Download { remote_path } => {
            let context = sync_service::NasContext::new(settings)?;
            let config = &context.settings.nas;
            match select_protocol(config) {
                Protocol::WebDav => {
                    let photo = context.webdav.try_download_photo(&remote_path, config).await?;
                    println!("{} ({} bytes, {})", photo.uri, photo.size, photo.mime_type);
                }
                Protocol::Smb => {
                    let local = context.smb.try_download_to_cache(&remote_path, config).await?;
                    let size = std::fs::metadata(&local)?.len();
                    println!("file://{} ({} bytes)", local.display(), size);
                }
            }
        }
        Command::LastSync => {
            let context = sync_service::NasContext::new(settings)?;
            match context.last_sync() {
                Some(ts) => println!(
                    "{}",
                    ts.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
                ),
                None => println!("Never"),
            }
        }
    }

    Ok(())
}
