use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use galleryimage::{
    AppState, Config, create_app,
    gallery::{
        MemoryStore,
        image_processing::{FormatHint, sanitize_report},
    },
    login::{User, UserDatabase, is_valid_username},
    open_storage,
    rbac::Grant,
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Check image files the way uploads are checked
    Sanitize {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Manage users
    #[command(subcommand)]
    User(UserCommands),
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    /// List all users and their grants
    List {
        /// Path to users database file
        #[arg(short, long, default_value = "users.toml")]
        database: String,
    },
    /// Add a new user
    Add {
        username: String,
        password: String,
        /// Grant as TYPE[:ID[:PERMISSION]], e.g. GALLERYIMAGE_RESOURCE:*:CREATE
        #[arg(short, long = "grant")]
        grants: Vec<Grant>,
        /// Path to users database file
        #[arg(short, long, default_value = "users.toml")]
        database: String,
    },
    /// Remove a user
    Remove {
        username: String,
        /// Path to users database file
        #[arg(short, long, default_value = "users.toml")]
        database: String,
    },
    /// Add a grant to an existing user
    Grant {
        username: String,
        grant: Grant,
        /// Path to users database file
        #[arg(short, long, default_value = "users.toml")]
        database: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::User(user_cmd)) => handle_user_command(user_cmd).await,
        Some(Commands::Sanitize { files }) => handle_sanitize_command(files).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(cli.config, port, host, quit_after).await,
        None => run_server(cli.config, None, None, None).await,
    }
}

async fn handle_sanitize_command(files: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut failures = 0;

    for path in files {
        let bytes = tokio::fs::read(&path).await?;
        let file_name = path.file_name().and_then(|name| name.to_str()).map(str::to_owned);

        let result = tokio::task::spawn_blocking(move || {
            let hint = FormatHint {
                content_type: None,
                file_name: file_name.as_deref(),
            };
            sanitize_report(&bytes, hint)
        })
        .await?;

        match result {
            Ok(report) => {
                println!(
                    "{}: ok ({:?}, {}x{}, re-encoded to {} bytes)",
                    path.display(),
                    report.format,
                    report.width,
                    report.height,
                    report.encoded_len
                );
                if let Some(len) = report.metadata.icc_profile_len {
                    println!("  embedded ICC profile: {} bytes", len);
                }
                if report.metadata.has_exif {
                    println!("  embedded EXIF block");
                }
            }
            Err(e) => {
                println!("{}: rejected ({})", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        eprintln!("{} file(s) failed sanitization", failures);
        std::process::exit(1);
    }
    Ok(())
}

async fn load_existing_database(database: &str) -> Result<UserDatabase, Box<dyn std::error::Error>> {
    let db_path = Path::new(database);
    if !db_path.exists() {
        eprintln!("Error: No user database found at: {}", database);
        std::process::exit(1);
    }
    Ok(UserDatabase::load_from_file(db_path).await?)
}

async fn handle_user_command(cmd: UserCommands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        UserCommands::List { database } => {
            let db_path = Path::new(&database);
            let db = if db_path.exists() {
                UserDatabase::load_from_file(db_path).await?
            } else {
                println!("No user database found at: {}", database);
                return Ok(());
            };

            if db.users.is_empty() {
                println!("No users in database");
            } else {
                println!("Users in database:");
                let mut usernames: Vec<_> = db.users.keys().collect();
                usernames.sort();
                for username in usernames {
                    println!("  {}", username);
                    for grant in &db.users[username].grants {
                        println!("    {}", grant);
                    }
                }
            }
        }
        UserCommands::Add {
            username,
            password,
            grants,
            database,
        } => {
            let db_path = Path::new(&database);
            let mut db = if db_path.exists() {
                UserDatabase::load_from_file(db_path).await?
            } else {
                println!("Creating new user database at: {}", database);
                UserDatabase::new()
            };

            let username = username.trim().to_lowercase();
            if !is_valid_username(&username) {
                eprintln!("Error: Invalid username '{}'", username);
                std::process::exit(1);
            }
            if db.get_user(&username).is_some() {
                eprintln!("Error: User '{}' already exists", username);
                std::process::exit(1);
            }

            let mut user = User::new(&password)?;
            user.grants = grants;
            let grant_count = user.grants.len();

            db.add_user(username.clone(), user);
            db.save_to_file(db_path).await?;
            println!("Added user '{}' with {} grant(s)", username, grant_count);
        }
        UserCommands::Remove { username, database } => {
            let mut db = load_existing_database(&database).await?;

            let username = username.trim().to_lowercase();
            if db.remove_user(&username).is_some() {
                db.save_to_file(Path::new(&database)).await?;
                println!("Removed user '{}'", username);
            } else {
                eprintln!("Error: User '{}' not found", username);
                std::process::exit(1);
            }
        }
        UserCommands::Grant {
            username,
            grant,
            database,
        } => {
            let mut db = load_existing_database(&database).await?;

            let username = username.trim().to_lowercase();
            if let Some(user) = db.get_user_mut(&username) {
                if !user.grants.contains(&grant) {
                    user.grants.push(grant.clone());
                }
                db.save_to_file(Path::new(&database)).await?;
                println!("Granted {} to '{}'", grant, username);
            } else {
                eprintln!("Error: User '{}' not found", username);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_server(
    config_path: PathBuf,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = if config_path.exists() {
        let config_content = std::fs::read_to_string(&config_path)?;
        toml_edit::de::from_str::<Config>(&config_content)?
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Config::default()
    };

    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Configuration loaded from: {:?}", config_path);
    info!("Data file: {:?}", config.storage.data_file);
    info!("Asset directory: {:?}", config.storage.asset_directory);

    if let Err(errors) = startup_checks::perform_startup_checks(&config).await {
        for error in &errors {
            tracing::error!("Startup check failed: {}", error);
        }
        tracing::error!("Critical startup check failed, exiting");
        return Err("Critical startup check failed".into());
    }

    let (store, assets) = open_storage(&config.storage).await?;
    let users = UserDatabase::load_or_default(&config.app.user_database).await?;
    info!("Loaded {} user(s)", users.users.len());

    let interval_minutes = config.storage.save_interval_minutes;
    if config.storage.data_file.is_some() && interval_minutes > 0 {
        info!(
            "Starting periodic store snapshot every {} minutes",
            interval_minutes
        );
        MemoryStore::start_periodic_save(store.clone(), interval_minutes);
    }

    let app = create_app(AppState::new(
        config.clone(),
        store.clone(),
        assets,
        users,
    ));

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Shutting down - saving store snapshot...");
    if let Err(e) = store.save().await {
        tracing::error!("Failed to save store snapshot on shutdown: {}", e);
    } else {
        info!("Store snapshot saved successfully");
    }

    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
