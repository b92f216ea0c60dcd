use anyhow::{Result, bail};
use clap::Args;
use filament::{AcquisitionRequest, Credentials};
use futures_util::future::join_all;
use tracing::{error, info};

use super::{Env, print_json};

#[derive(Debug, Args)]
pub struct FetchArg {
    #[arg(required = true, help = "URLs to acquire")]
    urls:      Vec<String>,
    #[arg(long, help = "File name override (single URL only)")]
    name:      Option<String>,
    #[arg(long = "ext", help = "Extension override")]
    extension: Option<String>,
    #[arg(long = "header", value_name = "KEY:VALUE", value_parser = parse_header, help = "Extra request header")]
    headers:   Vec<(String, String)>,
    #[arg(long, help = "Basic auth user name")]
    user:      Option<String>,
    #[arg(long, requires = "user", help = "Basic auth password")]
    password:  Option<String>,
    #[arg(long, conflicts_with = "user", help = "Bearer token")]
    token:     Option<String>,
    #[arg(long, help = "Parent node id attached to every node")]
    parent:    Option<String>,
}

impl FetchArg {
    pub async fn run(self, env: &Env) -> Result<()> {
        if self.name.is_some() && self.urls.len() > 1 {
            bail!("--name applies to a single URL");
        }

        let ingestor = env.ingestor()?;
        let requests: Vec<_> = self.urls.iter().map(|url| self.request(url)).collect();
        let results = join_all(requests.into_iter().map(|r| ingestor.acquire_remote_file(r))).await;

        let mut nodes = Vec::with_capacity(results.len());
        let mut failed = 0;
        for (url, result) in self.urls.iter().zip(results) {
            match result {
                Ok(node) => nodes.push(node),
                Err(e) => {
                    error!(%url, kind = %e.kind(), "{e}");
                    failed += 1;
                }
            }
        }
        print_json(&nodes)?;

        let metrics = ingestor.metrics();
        info!(
            completed = metrics.completed,
            cache_hits = metrics.cache_hits,
            attempts = metrics.attempts,
            peak = metrics.peak,
            bytes = metrics.bytes_fetched,
            "fetch finished"
        );
        if failed > 0 {
            bail!("{failed} of {} URLs failed", self.urls.len());
        }
        Ok(())
    }

    fn request(&self, url: &str) -> AcquisitionRequest {
        let mut request = AcquisitionRequest::new(url);
        if let Some(name) = &self.name {
            request = request.name(name);
        }
        if let Some(extension) = &self.extension {
            request = request.extension(extension);
        }
        if let Some(parent) = &self.parent {
            request = request.parent(parent);
        }
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        if let Some(user) = &self.user {
            request = request.auth(Credentials::basic(user, self.password.clone()));
        } else if let Some(token) = &self.token {
            request = request.auth(Credentials::bearer(token));
        }
        request
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected KEY:VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty header name in {raw:?}"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_parsing() {
        assert_eq!(parse_header("Accept: image/*").unwrap(), ("Accept".into(), "image/*".into()));
        assert_eq!(parse_header("X-Url:http://a").unwrap(), ("X-Url".into(), "http://a".into()));
        assert!(parse_header("novalue").is_err());
        assert!(parse_header(": x").is_err());
    }
}
