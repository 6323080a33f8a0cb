use crate::options::Config;
use anyhow::{Context, Result};
use fivetran_lib::{Client, ClientBuilder};
use std::time::Duration;

/// Creates a client according to the command-line config
pub(crate) fn create(cfg: &Config) -> Result<Client> {
    let timeout = Duration::from_secs(cfg.timeout);

    ClientBuilder::builder()
        .base_url(cfg.base_url.clone())
        .api_key(cfg.api_key.clone())
        .api_secret(cfg.api_secret.clone())
        .timeout(timeout)
        .user_agent(cfg.user_agent.clone())
        .max_concurrency(cfg.max_concurrency)
        .cache_ttl(cfg.cache_ttl)
        .default_retry_after(cfg.retry_after)
        .page_size(cfg.page_size)
        .build()
        .client()
        .context("Failed to create request client")
}
