//! Command-line interface parsing for graphsnap
//!
//! This module handles parsing of CLI arguments using clap and turns the raw
//! strings into typed actions (categories, output formats, snapshot keys and
//! cache areas) before anything touches the network or the cache.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::{CacheArea, CacheConfig};
use crate::data::{Category, OutputFormat};
use crate::remote::TwitterConfig;
use crate::resolver::Thresholds;
use crate::snapshot::SnapshotId;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified category name is not recognized
    #[error("Invalid category: '{0}'. Valid categories: friends, followers, fans, stans")]
    InvalidCategory(String),

    /// The specified output format is not recognized
    #[error("Invalid format: '{0}'. Valid formats: mapping, handles, ids")]
    InvalidFormat(String),

    /// The specified snapshot key is not an integer timestamp
    #[error("Invalid snapshot key: '{0}'. Snapshot keys are integer timestamps")]
    InvalidSnapshotKey(String),

    /// The specified cache area is not recognized
    #[error("Invalid cache area: '{0}'. Valid areas: users, lists, tweets, snapshots")]
    InvalidArea(String),

    /// No cache directory was given and none could be determined
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,
}

/// graphsnap - cache a social graph, derive fans and stans, diff snapshots
#[derive(Parser, Debug)]
#[command(name = "graphsnap")]
#[command(about = "Social graph snapshots: friends, followers, fans and stans")]
#[command(version)]
pub struct Cli {
    /// Cache directory (defaults to the platform cache directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print one relationship category of a subject
    ///
    /// Examples:
    ///   graphsnap list jack fans
    ///   graphsnap list jack friends --format handles --force
    List {
        /// Subject username
        username: String,
        /// One of: friends, followers, fans, stans
        category: String,
        /// One of: mapping, handles, ids
        #[arg(long, default_value = "mapping")]
        format: String,
        /// Refresh from the API even if the cache is fresh
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        remote: RemoteArgs,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Capture a snapshot of all four categories
    Snapshot {
        /// Subject username
        username: String,
        /// Refresh friends and followers from the API first
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        remote: RemoteArgs,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Show a stored snapshot (the most recent by default)
    Show {
        /// Snapshot key (integer timestamp)
        key: Option<String>,
    },
    /// List stored snapshot keys
    Snapshots,
    /// Compare two snapshots (the two most recent by default)
    Diff {
        /// Older snapshot key
        from: Option<String>,
        /// Newer snapshot key
        to: Option<String>,
    },
    /// Print a cached status record, fetching it if absent
    Status {
        /// Status ID
        id: u64,
        /// Refetch even if cached
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Remove every entry in one cache area
    Purge {
        /// One of: users, lists, tweets, snapshots
        area: String,
    },
}

/// Remote API connection settings
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// App-only bearer token for the API
    #[arg(long, env = "GRAPHSNAP_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Base URL of the API
    #[arg(long, env = "GRAPHSNAP_API_URL", default_value = "https://api.twitter.com/1.1")]
    pub api_url: String,
}

impl RemoteArgs {
    pub fn to_config(&self) -> TwitterConfig {
        TwitterConfig {
            bearer_token: self.bearer_token.clone(),
            base_url: self.api_url.clone(),
            ..Default::default()
        }
    }
}

/// Cache staleness settings; negative values never refresh by age
#[derive(Args, Debug, Clone)]
pub struct ThresholdArgs {
    /// Maximum age in days of cached user records
    #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
    pub users_days: i64,

    /// Maximum age in days of cached relationship lists
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub lists_days: i64,
}

impl ThresholdArgs {
    pub fn to_thresholds(&self) -> Thresholds {
        Thresholds {
            users_days: self.users_days,
            lists_days: self.lists_days,
        }
    }
}

/// A fully-parsed command
#[derive(Debug, Clone)]
pub enum Action {
    List {
        username: String,
        category: Category,
        format: OutputFormat,
        force: bool,
        remote: TwitterConfig,
        thresholds: Thresholds,
    },
    Capture {
        username: String,
        force: bool,
        remote: TwitterConfig,
        thresholds: Thresholds,
    },
    Show {
        key: Option<SnapshotId>,
    },
    ListSnapshots,
    Diff {
        from: Option<SnapshotId>,
        to: Option<SnapshotId>,
    },
    Status {
        id: u64,
        force: bool,
        remote: TwitterConfig,
    },
    Purge {
        area: CacheArea,
    },
}

/// Parses a category argument into a Category.
pub fn parse_category_arg(s: &str) -> Result<Category, CliError> {
    Category::parse(s).ok_or_else(|| CliError::InvalidCategory(s.to_string()))
}

/// Parses an output format argument into an OutputFormat.
pub fn parse_format_arg(s: &str) -> Result<OutputFormat, CliError> {
    OutputFormat::parse(s).ok_or_else(|| CliError::InvalidFormat(s.to_string()))
}

/// Parses a snapshot key argument into a SnapshotId.
pub fn parse_snapshot_key_arg(s: &str) -> Result<SnapshotId, CliError> {
    s.parse()
        .map_err(|_| CliError::InvalidSnapshotKey(s.to_string()))
}

/// Parses a cache area argument into a CacheArea.
pub fn parse_area_arg(s: &str) -> Result<CacheArea, CliError> {
    s.parse().map_err(CliError::InvalidArea)
}

fn parse_optional_key(s: &Option<String>) -> Result<Option<SnapshotId>, CliError> {
    s.as_deref().map(parse_snapshot_key_arg).transpose()
}

impl Action {
    /// Creates an Action from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(Action)` with typed arguments
    /// * `Err(CliError)` if any argument is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let action = match &cli.command {
            Command::List {
                username,
                category,
                format,
                force,
                remote,
                thresholds,
            } => Action::List {
                username: username.clone(),
                category: parse_category_arg(category)?,
                format: parse_format_arg(format)?,
                force: *force,
                remote: remote.to_config(),
                thresholds: thresholds.to_thresholds(),
            },
            Command::Snapshot {
                username,
                force,
                remote,
                thresholds,
            } => Action::Capture {
                username: username.clone(),
                force: *force,
                remote: remote.to_config(),
                thresholds: thresholds.to_thresholds(),
            },
            Command::Show { key } => Action::Show {
                key: parse_optional_key(key)?,
            },
            Command::Snapshots => Action::ListSnapshots,
            Command::Diff { from, to } => Action::Diff {
                from: parse_optional_key(from)?,
                to: parse_optional_key(to)?,
            },
            Command::Status { id, force, remote } => Action::Status {
                id: *id,
                force: *force,
                remote: remote.to_config(),
            },
            Command::Purge { area } => Action::Purge {
                area: parse_area_arg(area)?,
            },
        };
        Ok(action)
    }
}

/// Resolves the cache configuration from `--cache-dir` or the platform default.
pub fn cache_config(cli: &Cli) -> Result<CacheConfig, CliError> {
    match &cli.cache_dir {
        Some(dir) => Ok(CacheConfig::with_root(dir)),
        None => CacheConfig::new().ok_or(CliError::NoCacheDir),
    }
}
