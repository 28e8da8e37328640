mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Command, SearchArgs, SyncArgs};
use podarchive::directory::{append_to_feed_list, search};
use podarchive::utils::read_feed_list;
use podarchive::{Archiver, Config};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Sync(args) => run_sync(args).await,
        Command::Search(args) => run_search(args).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "podarchive=debug" } else { "podarchive=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

async fn run_sync(args: SyncArgs) -> Result<()> {
    if args.url.is_none() && args.file.is_none() {
        bail!("an input file containing URLs or a URL is required");
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(path) = args.path {
        config.download_dir = path;
    }
    if let Some(concurrent) = args.concurrent {
        config.max_concurrent_downloads = concurrent;
    }
    if let Some(fetcher) = args.downloader {
        config.fetcher = fetcher;
    }

    let feed_list = match &args.file {
        Some(file) => Some(read_feed_list(file)?),
        None => None,
    };

    let archiver = Archiver::new(config)?;
    let mut events = archiver.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    eprintln!("({} status messages dropped)", missed)
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if let Some(urls) = feed_list {
        let report = archiver.sync_all(&urls).await;
        if !report.failed.is_empty() {
            eprintln!("{} of {} feeds failed", report.failed.len(), urls.len());
        }
    }

    let result = match &args.url {
        Some(url) => archiver.sync_feed(url).await.map(|_| ()),
        None => Ok(()),
    };

    // Closing the channel ends the printer once it has drained
    drop(archiver);
    printer.await.ok();

    Ok(result?)
}

async fn run_search(args: SearchArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(limit) = args.limit {
        config.directory.limit = limit;
    }

    let term = args.term.join(" ");
    let client = reqwest::Client::new();
    let results = search(&client, &config.directory, &config.user_agent, &term).await?;

    if results.is_empty() {
        println!("No results found!");
        return Ok(());
    }
    for (index, result) in results.iter().enumerate() {
        println!("{}: {} by {}", index + 1, result.name, result.artist);
    }

    if let (Some(choice), Some(list)) = (args.add, args.list.as_deref()) {
        let Some(result) = choice.checked_sub(1).and_then(|i| results.get(i)) else {
            bail!("Invalid selection!");
        };
        append_to_feed_list(list, result).await?;
        println!("Successfully added {}.", result.name);
    }
    Ok(())
}
