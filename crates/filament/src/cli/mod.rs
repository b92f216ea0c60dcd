use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filament::fetch::ReqwestClient;
use filament::{FetchConfig, FingerprintMode, Ingestor};
use home::home_dir;
use serde::Serialize;

mod buffer;
mod cache;
mod fetch;
mod fingerprint;

#[derive(Debug, Parser)]
#[command(name = "filament", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[arg(long, global = true, help = "Cache root [default: $FILAMENT_ROOT or ~/.filament]")]
    root:   Option<PathBuf>,
    #[arg(long, global = true, help = "TOML file with fetch settings")]
    config: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = FingerprintMode::Exact, help = "Fingerprint mode: exact or proxy")]
    mode:   FingerprintMode,
    #[command(subcommand)]
    cmd:    Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "f", name = "fetch", about = "Download URLs into the cache and print their nodes")]
    Fetch(fetch::FetchArg),
    #[command(alias = "fp", name = "fingerprint", about = "Print fingerprints of local files")]
    Fingerprint(fingerprint::FingerprintArg),
    #[command(name = "cache", about = "Inspect the content cache")]
    Cache(cache::CacheArg),
    #[command(alias = "b", name = "buffer", about = "Materialize a file's bytes as a buffer node")]
    Buffer(buffer::BufferArg),
}

impl App {
    pub async fn run(self) -> Result<()> {
        let env = Env::resolve(&self)?;
        match self.cmd {
            Commands::Fetch(arg) => arg.run(&env).await,
            Commands::Fingerprint(arg) => arg.run(&env).await,
            Commands::Cache(arg) => arg.run(&env),
            Commands::Buffer(arg) => arg.run(&env).await,
        }
    }
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Env {
    root:   PathBuf,
    config: FetchConfig,
    mode:   FingerprintMode,
}

impl Env {
    fn resolve(app: &App) -> Result<Self> {
        let root = match (&app.root, std::env::var_os("FILAMENT_ROOT")) {
            (Some(root), _) => root.clone(),
            (None, Some(root)) => PathBuf::from(root),
            (None, None) => home_dir().context("Failed to get home directory")?.join(".filament"),
        };
        let config = FetchConfig::load(app.config.as_deref()).context("Failed to load fetch configuration")?;

        Ok(Self {
            root,
            config,
            mode: app.mode,
        })
    }

    pub fn mode(&self) -> FingerprintMode { self.mode }

    pub fn ingestor(&self) -> Result<Ingestor<ReqwestClient>> {
        Ingestor::builder(&self.root)
            .config(self.config.clone())
            .fingerprint_mode(self.mode)
            .build_default()
            .with_context(|| format!("Failed to open cache at {}", self.root.display()))
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
