use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use filament::verify::compute_fingerprint;
use filament::{Fingerprint, FingerprintMode};
use serde::Serialize;

use super::{Env, print_json};

#[derive(Debug, Args)]
pub struct FingerprintArg {
    #[arg(required = true, help = "Files to fingerprint")]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Report {
    path:        PathBuf,
    mode:        FingerprintMode,
    fingerprint: Fingerprint,
    display:     String,
}

impl FingerprintArg {
    pub async fn run(self, env: &Env) -> Result<()> {
        let mode = env.mode();
        let mut reports = Vec::with_capacity(self.paths.len());
        for path in self.paths {
            let target = path.clone();
            let fingerprint = tokio::task::spawn_blocking(move || compute_fingerprint(&target, mode))
                .await?
                .with_context(|| format!("Failed to fingerprint {}", path.display()))?;
            reports.push(Report {
                display: fingerprint.to_string(),
                path,
                mode,
                fingerprint,
            });
        }
        print_json(&reports)
    }
}
