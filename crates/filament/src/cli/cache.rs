use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use filament::AcquisitionRequest;

use super::{Env, print_json};

#[derive(Debug, Args)]
pub struct CacheArg {
    #[command(subcommand)]
    cmd: CacheCommands,
}

#[derive(Debug, Subcommand)]
enum CacheCommands {
    #[command(name = "show", about = "Print the cache entry for a URL")]
    Show(ShowArg),
}

#[derive(Debug, Args)]
struct ShowArg {
    url:       String,
    #[arg(long, help = "File name override the entry was fetched with")]
    name:      Option<String>,
    #[arg(long = "ext", help = "Extension override the entry was fetched with")]
    extension: Option<String>,
}

impl CacheArg {
    pub fn run(self, env: &Env) -> Result<()> {
        match self.cmd {
            CacheCommands::Show(arg) => arg.run(env),
        }
    }
}

impl ShowArg {
    fn run(self, env: &Env) -> Result<()> {
        let mut request = AcquisitionRequest::new(&self.url);
        if let Some(name) = &self.name {
            request = request.name(name);
        }
        if let Some(extension) = &self.extension {
            request = request.extension(extension);
        }

        let ingestor = env.ingestor()?;
        match ingestor.cache().get(&request.cache_key())? {
            Some(entry) => print_json(&entry),
            None => bail!("no cache entry for {}", self.url),
        }
    }
}
