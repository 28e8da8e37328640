use clap::{Args, Parser, Subcommand};
use podarchive::FetcherKind;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "podarchive",
    version,
    about = "Archive podcast feeds locally, downloading only new episodes"
)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download new episodes of one or more feeds
    Sync(SyncArgs),
    /// Search the podcast directory and optionally add a result to a feed list
    Search(SearchArgs),
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// RSS/Atom URL of a podcast
    #[arg(short, long)]
    pub url: Option<String>,

    /// File with one feed URL per line (lines not starting with "http" are ignored)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Directory to store podcasts in
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Fetch implementation to download with
    #[arg(short, long, value_enum)]
    pub downloader: Option<FetcherKind>,

    /// Number of concurrent downloads per feed
    #[arg(short, long)]
    pub concurrent: Option<usize>,

    /// JSON config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Keywords to search for
    #[arg(required = true)]
    pub term: Vec<String>,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Add the result with this number (as listed) to the feed list
    #[arg(short, long, requires = "list")]
    pub add: Option<usize>,

    /// Feed list file to append to; created if missing
    #[arg(long)]
    pub list: Option<PathBuf>,

    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
