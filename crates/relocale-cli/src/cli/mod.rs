//! CLI for relocale.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use relocale_core::config::{self, RelocaleConfig};
use relocale_core::logging;
use relocale_core::rewrite::RewriteMode;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use commands::{run_check_mappings, run_list_pages, run_pages, run_preview, PageSelection};

/// Top-level CLI for relocale.
#[derive(Debug, Parser)]
#[command(name = "relocale")]
#[command(about = "Rewrite locale-specific links and images in CMS pages", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Mapping table and rewrite mode overrides shared by several commands.
#[derive(Debug, Clone, Default, Args)]
pub struct MappingArgs {
    /// CSV file with link mappings (overrides config and LINK_MAPPINGS_PATH).
    #[arg(long, value_name = "FILE")]
    pub link_mappings: Option<PathBuf>,
    /// CSV file with image mappings (overrides config and IMAGE_MAPPINGS_PATH).
    #[arg(long, value_name = "FILE")]
    pub image_mappings: Option<PathBuf>,
    /// How mappings are applied: "sequential" or "single-pass".
    #[arg(long, value_name = "MODE")]
    pub mode: Option<RewriteMode>,
}

impl MappingArgs {
    fn apply(&self, cfg: &mut RelocaleConfig) {
        if let Some(p) = &self.link_mappings {
            cfg.link_mappings_path = p.clone();
        }
        if let Some(p) = &self.image_mappings {
            cfg.image_mappings_path = p.clone();
        }
        if let Some(mode) = self.mode {
            cfg.rewrite_mode = mode;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Rewrite pages in the CMS, in batches.
    Run {
        /// Page IDs to process, in order.
        ids: Vec<String>,
        /// File with one page ID per line (blank lines and `#` comments ignored).
        #[arg(long, value_name = "FILE")]
        pages_file: Option<PathBuf>,
        /// Process every page the CMS lists.
        #[arg(long, conflicts_with_all = ["ids", "pages_file"])]
        all: bool,
        /// Pages per batch (overrides config and BATCH_SIZE).
        #[arg(long, value_name = "N")]
        batch_size: Option<NonZeroUsize>,
        #[command(flatten)]
        mappings: MappingArgs,
    },

    /// List page IDs known to the CMS.
    Pages,

    /// Rewrite a local HTML file and print the result; nothing is sent to the CMS.
    Preview {
        /// HTML file to rewrite.
        file: PathBuf,
        #[command(flatten)]
        mappings: MappingArgs,
    },

    /// Load and validate the mapping tables.
    CheckMappings {
        #[command(flatten)]
        mappings: MappingArgs,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        if logging::init_logging(cfg.log_file_path.as_deref()).is_err() {
            logging::init_logging_stderr();
        }
        tracing::debug!("loaded config: {:?}", cfg.redacted());

        match cli.command {
            CliCommand::Run {
                ids,
                pages_file,
                all,
                batch_size,
                mappings,
            } => {
                mappings.apply(&mut cfg);
                if let Some(n) = batch_size {
                    cfg.batch_size = n.get();
                }
                let selection = PageSelection::from_args(ids, pages_file, all);
                run_pages(&cfg, selection).await?;
            }
            CliCommand::Pages => run_list_pages(&cfg).await?,
            CliCommand::Preview { file, mappings } => {
                mappings.apply(&mut cfg);
                run_preview(&cfg, &file)?;
            }
            CliCommand::CheckMappings { mappings } => {
                mappings.apply(&mut cfg);
                run_check_mappings(&cfg)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
