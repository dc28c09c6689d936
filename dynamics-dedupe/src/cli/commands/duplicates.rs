//! Non-interactive duplicate listing

use anyhow::Result;

use super::connect;
use crate::cli::output::print_duplicates;
use crate::config::Config;
use crate::services::dedupe::DuplicateLookupService;
use crate::workflow::{ColumnSpec, DuplicateRow, RecordRef};

pub async fn handle_duplicates_command(
    config: &Config,
    entity: &str,
    record_id: &str,
    offset: usize,
    limit: usize,
) -> Result<()> {
    let service = connect(config, entity)?;
    let record_id = RecordRef::new(record_id)?;

    let page = service.fetch_candidates(&record_id, offset, limit).await?;
    let columns = ColumnSpec::build(&service.entity().primary_name, page.columns);
    let rows: Vec<DuplicateRow> = page
        .rows
        .into_iter()
        .map(DuplicateRow::from_projection)
        .collect();

    print_duplicates(&columns, &rows);
    Ok(())
}
