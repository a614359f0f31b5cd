use crate::config::{CliOverrides, PartialDeck, ResolvedDeck};
use crate::error::Result;
use std::path::Path;
use tracing::info;

pub mod check;
pub mod run;

/// Reads the deck at `path` and merges the command-line overrides into it.
pub(crate) fn load_deck(path: &Path, overrides: &CliOverrides) -> Result<ResolvedDeck> {
    let partial = PartialDeck::from_file(path)?;
    info!("Merging deck with command-line overrides...");
    let deck_dir = path.parent().unwrap_or_else(|| Path::new("."));
    partial.merge_with_cli(overrides, deck_dir)
}
