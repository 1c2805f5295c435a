//! CLI argument definitions for the castgate binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Storage backend type
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    /// SQLite database (default, production-ready)
    Sqlite,
    /// PostgreSQL database (for shared deployments)
    Postgres,
    /// In-memory with JSON persistence (for development and small deployments)
    Inmemory,
}

/// castgate credential and session server
#[derive(Parser, Debug)]
#[command(name = "castgate")]
#[command(about = "castgate: accounts, sessions and stream keys for a broadcast server")]
#[command(version)]
pub struct Cli {
    /// Output machine-readable JSON from administrative commands
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the castgate server
    Serve(ServeArgs),
    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Check health of a running castgate server
    Health(HealthArgs),
}

/// Storage and credential options shared by every command that opens the store.
#[derive(clap::Args, Debug, Clone)]
pub struct BackendConfig {
    /// Storage backend to use
    #[arg(short, long, default_value = "sqlite", env = "CASTGATE_BACKEND")]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For SQLite: stores castgate.db
    /// For InMemory: stores users.json
    #[arg(short = 'D', long, env = "CASTGATE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// PostgreSQL connection URL (required when backend=postgres)
    #[arg(long, env = "CASTGATE_POSTGRES_URL")]
    pub postgres_url: Option<String>,

    /// Secret keying the stream-key lookup index.
    /// Must stay the same for the lifetime of the user store.
    #[arg(long, env = "CASTGATE_LOOKUP_KEY", hide_env_values = true)]
    pub lookup_key: Option<String>,

    /// Argon2id memory cost in KiB
    #[arg(long, env = "CASTGATE_HASH_MEMORY_KIB")]
    pub hash_memory_kib: Option<u32>,

    /// Argon2id number of passes
    #[arg(long, env = "CASTGATE_HASH_ITERATIONS")]
    pub hash_iterations: Option<u32>,

    /// Argon2id degree of parallelism
    #[arg(long, env = "CASTGATE_HASH_PARALLELISM")]
    pub hash_parallelism: Option<u32>,
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "CASTGATE_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "CASTGATE_HOST")]
    pub host: String,

    #[command(flatten)]
    pub backend_config: BackendConfig,

    /// Base64 key for session cookies, at least 64 bytes once decoded.
    /// A random key is generated when absent, so sessions end on restart.
    #[arg(long, env = "CASTGATE_SESSION_KEY", hide_env_values = true)]
    pub session_key: Option<String>,

    /// Name of the session cookie
    #[arg(long, default_value = castgate::constants::SESSION_COOKIE, env = "CASTGATE_COOKIE_NAME")]
    pub cookie_name: String,

    /// Mark the session cookie Secure (HTTPS only)
    #[arg(long, env = "CASTGATE_COOKIE_SECURE")]
    pub cookie_secure: bool,

    /// Session cookie lifetime in seconds; omit for a browser-session cookie
    #[arg(long, env = "CASTGATE_SESSION_MAX_AGE_SECS")]
    pub session_max_age_secs: Option<u64>,

    /// Bound on store calls made while serving a request, in seconds
    #[arg(
        long,
        default_value_t = castgate::constants::DEFAULT_REQUEST_TIMEOUT_SECS,
        env = "CASTGATE_REQUEST_TIMEOUT_SECS"
    )]
    pub request_timeout_secs: u64,

    /// Username of the admin account seeded into an empty store
    #[arg(long, env = "CASTGATE_ADMIN_USERNAME", requires = "admin_password")]
    pub admin_username: Option<String>,

    /// Password of the seeded admin account
    #[arg(long, env = "CASTGATE_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Stream key of the seeded admin account; generated when absent
    #[arg(long, env = "CASTGATE_ADMIN_STREAM_KEY", hide_env_values = true)]
    pub admin_stream_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user
    Add(UserAddArgs),
    /// Delete a user
    Remove(UserTargetArgs),
    /// List all users
    List(UserListArgs),
    /// Change a user's password
    Passwd(UserPasswdArgs),
    /// Replace a user's stream key
    RotateKey(UserRotateKeyArgs),
}

/// Arguments for `user add`
#[derive(clap::Args, Debug)]
pub struct UserAddArgs {
    /// Username of the new account
    pub username: String,

    /// Login password; generated and printed once when absent
    #[arg(long)]
    pub password: Option<String>,

    /// Stream key; generated and printed once when absent
    #[arg(long)]
    pub stream_key: Option<String>,

    #[command(flatten)]
    pub backend_config: BackendConfig,
}

/// Arguments for commands that act on one existing user
#[derive(clap::Args, Debug)]
pub struct UserTargetArgs {
    /// Username of the account
    pub username: String,

    #[command(flatten)]
    pub backend_config: BackendConfig,
}

/// Arguments for `user list`
#[derive(clap::Args, Debug)]
pub struct UserListArgs {
    #[command(flatten)]
    pub backend_config: BackendConfig,
}

/// Arguments for `user passwd`
#[derive(clap::Args, Debug)]
pub struct UserPasswdArgs {
    /// Username of the account
    pub username: String,

    /// The new password
    #[arg(long = "new")]
    pub new_password: String,

    /// The current password. Without it the password is reset unconditionally.
    #[arg(long)]
    pub current: Option<String>,

    #[command(flatten)]
    pub backend_config: BackendConfig,
}

/// Arguments for `user rotate-key`
#[derive(clap::Args, Debug)]
pub struct UserRotateKeyArgs {
    /// Username of the account
    pub username: String,

    /// The new stream key; generated and printed once when absent
    #[arg(long)]
    pub stream_key: Option<String>,

    #[command(flatten)]
    pub backend_config: BackendConfig,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the server to check
    #[arg(long, default_value = "http://127.0.0.1:3000", env = "CASTGATE_URL")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}
