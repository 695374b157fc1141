//! `relocale preview` – rewrite a local HTML file without touching the CMS.

use anyhow::{Context, Result};
use relocale_core::config::RelocaleConfig;
use relocale_core::rewrite::RewriteEngine;
use std::fs;
use std::path::Path;

use super::load_store;

/// Prints the rewritten markup to stdout and the report to stderr.
pub fn run_preview(cfg: &RelocaleConfig, file: &Path) -> Result<()> {
    let content =
        fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let store = load_store(cfg)?;
    let engine = RewriteEngine::new(&store, cfg.rewrite_mode).context("build rewrite engine")?;
    let out = engine.rewrite(&content);
    print!("{}", out.content);
    let r = out.report;
    eprintln!(
        "links: {} -> {} (replaced {}), images: {} -> {} (replaced {})",
        r.links_before,
        r.links_after,
        r.links_replaced(),
        r.images_before,
        r.images_after,
        r.images_replaced()
    );
    Ok(())
}
