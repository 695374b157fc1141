//! `relocale check-mappings` – validate mapping tables.

use anyhow::{Context, Result};
use relocale_core::config::RelocaleConfig;
use relocale_core::rewrite::RewriteEngine;

use super::load_store;

pub fn run_check_mappings(cfg: &RelocaleConfig) -> Result<()> {
    let store = load_store(cfg)?;
    // Single-pass mode combines patterns, which can fail on its own.
    RewriteEngine::new(&store, cfg.rewrite_mode).context("build rewrite engine")?;
    println!(
        "{} link mapping(s) from {}",
        store.links().len(),
        cfg.link_mappings_path.display()
    );
    println!(
        "{} image mapping(s) from {}",
        store.images().len(),
        cfg.image_mappings_path.display()
    );
    println!("rewrite mode: {}", cfg.rewrite_mode);
    Ok(())
}
