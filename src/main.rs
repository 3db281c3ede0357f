//! graphsnap - cache a social graph and track how it changes
//!
//! Resolves a subject's friends, followers, fans and stans through the
//! Twitter API with an on-disk cache, and captures/compares snapshots.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use graphsnap::cli::{cache_config, Action, Cli};
use graphsnap::resolver::cached_status;
use graphsnap::{
    CacheArea, CacheStore, RelationshipResolver, SnapshotManager, TwitterClient, UserRecord,
};

/// Sets up stderr logging; `RUST_LOG` takes precedence over `--verbose`
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "graphsnap=debug"
    } else {
        "graphsnap=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Looks up a cached handle for display, without touching the network
fn cached_handle(store: &CacheStore, id: u64) -> Option<String> {
    store
        .get::<UserRecord>(CacheArea::Users, &id.to_string())
        .ok()
        .and_then(|entry| entry.payload.handle().map(str::to_string))
}

async fn run(action: Action, store: CacheStore) -> Result<(), Box<dyn std::error::Error>> {
    let snapshots = SnapshotManager::new(store.clone());

    match action {
        Action::List {
            username,
            category,
            format,
            force,
            remote,
            thresholds,
        } => {
            let client = TwitterClient::new(remote);
            let mut resolver =
                RelationshipResolver::new(username, client, store)?.with_thresholds(thresholds);
            let projection = resolver.relationship(category, force, format).await?;
            print!("{}", projection);
        }
        Action::Capture {
            username,
            force,
            remote,
            thresholds,
        } => {
            let client = TwitterClient::new(remote);
            let mut resolver =
                RelationshipResolver::new(username, client, store)?.with_thresholds(thresholds);
            let key = snapshots.capture(&mut resolver, force).await?;
            println!("{}", key);
        }
        Action::Show { key } => {
            let loaded = snapshots.load(key)?;
            let snapshot = &loaded.snapshot;
            println!("snapshot  {}", loaded.meta.key);
            println!("created   {}", loaded.meta.created.to_rfc3339());
            println!("path      {}", loaded.meta.full_path.display());
            println!("username  {}", snapshot.username);
            for &category in graphsnap::Category::all() {
                println!("{:<9} {}", category.as_str(), snapshot.count(category));
            }
        }
        Action::ListSnapshots => {
            for key in snapshots.list()? {
                match key.created() {
                    Some(created) => println!("{}\t{}", key, created.to_rfc3339()),
                    None => println!("{}", key),
                }
            }
        }
        Action::Diff { from, to } => {
            let (from, to, result) = snapshots.compare(from, to)?;
            println!(
                "{} ({}) -> {} ({})",
                from.meta.key, from.snapshot.username, to.meta.key, to.snapshot.username
            );
            if result.is_empty() {
                println!("no changes");
            }
            let mut rendered = String::new();
            result.write_labelled(&mut rendered, |id| cached_handle(&store, id))?;
            print!("{}", rendered);
        }
        Action::Status { id, force, remote } => {
            let client = TwitterClient::new(remote);
            let record = cached_status(&client, &store, id, force).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Action::Purge { area } => {
            let removed = store.purge(area)?;
            println!("removed {} entries from {}", removed, area);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match (cache_config(&cli), Action::from_cli(&cli)) {
        (Ok(config), Ok(action)) => run(action, CacheStore::new(config)).await,
        (Err(e), _) | (_, Err(e)) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
