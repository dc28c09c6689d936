//! Non-interactive comparison of a merge pair

use anyhow::Result;
use colored::*;

use super::connect;
use crate::cli::output::print_diffs;
use crate::config::Config;
use crate::services::dedupe::MergeDataService;
use crate::workflow::{FieldDiff, MergePair, MergeSelection};

pub async fn handle_compare_command(config: &Config, entity: &str, pair_key: &str) -> Result<()> {
    let pair: MergePair = pair_key.parse()?;
    let service = connect(config, entity)?;

    let entries = service.fetch_comparison(&pair.key()).await?;
    let total = entries.len();
    let diffs: Vec<FieldDiff> = entries
        .into_values()
        .filter_map(FieldDiff::from_entry)
        .collect();

    println!(
        "Master {} / Duplicate {}",
        pair.surviving().to_string().cyan(),
        pair.losing().to_string().magenta()
    );
    print_diffs(&diffs, &MergeSelection::default());
    println!("{} of {} field(s) differ", diffs.len(), total);
    Ok(())
}
