//! `relocale pages` – list page IDs from the CMS.

use anyhow::{Context, Result};
use relocale_core::cms::CmsClient;
use relocale_core::config::RelocaleConfig;

use super::hubspot_client;

pub async fn run_list_pages(cfg: &RelocaleConfig) -> Result<()> {
    let client = hubspot_client(cfg)?;
    let ids = client.list_page_ids().await.context("list CMS pages")?;
    if ids.is_empty() {
        println!("No pages.");
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}
