use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use filament::NodeId;

use super::{Env, print_json};

#[derive(Debug, Args)]
pub struct BufferArg {
    #[arg(help = "File whose bytes are materialized")]
    path:   PathBuf,
    #[arg(long, help = "Name for the materialized file")]
    name:   Option<String>,
    #[arg(long, help = "Parent node id")]
    parent: Option<String>,
}

impl BufferArg {
    pub async fn run(self, env: &Env) -> Result<()> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        let ingestor = env.ingestor()?;
        let node = ingestor
            .materialize_from_buffer(&bytes, self.name.as_deref(), self.parent.map(NodeId::from))
            .await?;
        print_json(&node)
    }
}
