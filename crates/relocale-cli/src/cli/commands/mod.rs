//! CLI command handlers. Each command is in its own file.

mod check_mappings;
mod pages;
mod preview;
mod run;

use anyhow::{Context, Result};
use relocale_core::cms::{HubSpotClient, RetryPolicy};
use relocale_core::config::RelocaleConfig;
use relocale_core::mapping::MappingStore;

pub use check_mappings::run_check_mappings;
pub use pages::run_list_pages;
pub use preview::run_preview;
pub use run::{read_page_ids, run_pages, PageSelection};

/// Loads both mapping tables named by the config. Failure is fatal.
fn load_store(cfg: &RelocaleConfig) -> Result<MappingStore> {
    MappingStore::load(&cfg.link_mappings_path, &cfg.image_mappings_path)
        .context("load mapping tables")
}

/// Builds the CMS client; a missing credential is fatal.
fn hubspot_client(cfg: &RelocaleConfig) -> Result<HubSpotClient> {
    let api_key = cfg.require_api_key()?;
    let client = HubSpotClient::new(&cfg.cms_base_url, api_key)
        .with_context(|| format!("CMS base URL {}", cfg.cms_base_url))?
        .with_retry_policy(RetryPolicy::from(&cfg.retry_config()));
    Ok(client)
}
