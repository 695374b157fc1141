//! `relocale run` – rewrite CMS pages in batches.

use anyhow::{bail, Context, Result};
use relocale_core::cms::CmsClient;
use relocale_core::config::RelocaleConfig;
use relocale_core::orchestrator::Orchestrator;
use relocale_core::rewrite::RewriteEngine;
use std::fs;
use std::path::{Path, PathBuf};

use super::{hubspot_client, load_store};

/// Where the page IDs of a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelection {
    /// IDs from the command line and/or a file, in that order.
    Explicit {
        ids: Vec<String>,
        pages_file: Option<PathBuf>,
    },
    /// Every page the CMS lists.
    All,
}

impl PageSelection {
    pub fn from_args(ids: Vec<String>, pages_file: Option<PathBuf>, all: bool) -> Self {
        if all {
            PageSelection::All
        } else {
            PageSelection::Explicit { ids, pages_file }
        }
    }
}

/// Reads page IDs from text: one per line, blank lines and `#` comments skipped.
pub fn read_page_ids(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn read_page_ids_file(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(read_page_ids(&text))
}

pub async fn run_pages(cfg: &RelocaleConfig, selection: PageSelection) -> Result<()> {
    // Fatal conditions first: credential, batch size, mapping tables.
    let client = hubspot_client(cfg)?;
    let batch_size = cfg.batch_size()?;
    let store = load_store(cfg)?;
    let engine = RewriteEngine::new(&store, cfg.rewrite_mode).context("build rewrite engine")?;

    let ids = match selection {
        PageSelection::All => client.list_page_ids().await.context("list CMS pages")?,
        PageSelection::Explicit { mut ids, pages_file } => {
            if let Some(path) = pages_file {
                ids.extend(read_page_ids_file(&path)?);
            }
            if ids.is_empty() {
                bail!("no page IDs given (pass IDs, --pages-file, or --all)");
            }
            ids
        }
    };
    if ids.is_empty() {
        println!("No pages to process.");
        return Ok(());
    }

    tracing::info!(
        pages = ids.len(),
        batch_size = batch_size.get(),
        mode = %cfg.rewrite_mode,
        "starting run"
    );
    let orchestrator = Orchestrator::new(&client, &engine);
    let summary = orchestrator.run_batched(&ids, batch_size).await;

    let failed: Vec<(&str, String)> = summary
        .failed()
        .map(|(id, e)| (id, format!("{e:#}")))
        .collect();
    println!(
        "Processed {} page(s) in {} batch(es): {} succeeded, {} failed.",
        summary.total(),
        summary.batches.len(),
        summary.succeeded(),
        failed.len()
    );
    for (id, err) in &failed {
        println!("  failed {id}: {err}");
    }
    tracing::info!(
        succeeded = summary.succeeded(),
        failed = failed.len(),
        "translation run completed"
    );
    Ok(())
}
