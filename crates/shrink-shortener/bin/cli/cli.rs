use clap::{Parser, Subcommand, ValueEnum};
use shrink_storage::{Backend, JournalOptions, StorageConfig, StorageOptions};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const STORAGE_BACKEND_ENV: &str = "SHRINK_STORAGE_BACKEND";
pub const FILE_STORAGE_PATH_ENV: &str = "SHRINK_FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "SHRINK_DATABASE_DSN";
pub const BASE_URL_ENV: &str = "SHRINK_BASE_URL";
pub const UNIQUE_ORIGINAL_URLS_ENV: &str = "SHRINK_UNIQUE_ORIGINAL_URLS";
pub const JOURNAL_SYNC_ENV: &str = "SHRINK_JOURNAL_SYNC";
pub const CODE_LENGTH_ENV: &str = "SHRINK_CODE_LENGTH";
pub const LOG_FORMAT_ENV: &str = "SHRINK_LOG_FORMAT";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_FILE_STORAGE_PATH: &str = "short-url-db.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "memory")]
    Memory,
    #[value(name = "file")]
    File,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Memory => write!(f, "memory"),
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "shrink", about = "Administer a shrink URL store")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::File,
        global = true
    )]
    pub storage: StorageBackendArg,

    #[arg(
        long,
        env = FILE_STORAGE_PATH_ENV,
        default_value = DEFAULT_FILE_STORAGE_PATH,
        global = true
    )]
    pub file_storage_path: PathBuf,

    #[arg(long, env = DATABASE_DSN_ENV, global = true)]
    pub database_dsn: Option<String>,

    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Reject a second record for an original URL already stored.
    #[arg(long, env = UNIQUE_ORIGINAL_URLS_ENV, global = true)]
    pub unique_original_urls: bool,

    /// fsync the journal after every append.
    #[arg(long, env = JOURNAL_SYNC_ENV, global = true)]
    pub journal_sync: bool,

    #[arg(long, env = CODE_LENGTH_ENV, default_value_t = shrink_generator::random::CODE_LENGTH, global = true)]
    pub code_length: usize,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten a URL.
    Shorten {
        url: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Print the original URL behind a short code.
    Resolve { code: String },
    /// List the live URLs of an owner.
    List {
        #[arg(long)]
        owner: String,
    },
    /// Delete short codes owned by an owner.
    Delete {
        #[arg(long)]
        owner: String,
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Print record and owner counts.
    Stats,
    /// Check backend connectivity.
    Ping,
    /// Issue a fresh owner id.
    NewOwner,
}

impl CLI {
    pub fn storage_config(&self) -> anyhow::Result<StorageConfig> {
        let backend = match self.storage {
            StorageBackendArg::Memory => Backend::Memory,
            StorageBackendArg::File => Backend::File(
                JournalOptions::builder()
                    .path(self.file_storage_path.clone())
                    .sync(self.journal_sync)
                    .build(),
            ),
            StorageBackendArg::Postgres => {
                let dsn = self
                    .database_dsn
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("--database-dsn is required when storage backend is postgres"))?;
                Backend::Postgres { dsn }
            }
        };

        Ok(StorageConfig {
            backend,
            options: StorageOptions::builder()
                .base_url(self.base_url.clone())
                .unique_original_urls(self.unique_original_urls)
                .build(),
        })
    }
}
