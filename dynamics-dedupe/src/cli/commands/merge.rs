//! Interactive merge session
//!
//! Drives the two workflow panels from the terminal: pick a candidate from
//! the duplicate list, choose the winning value per differing field, then
//! merge. Re-parenting runs in the background and is waited for on exit.

use anyhow::Result;
use colored::*;
use dialoguer::{Confirm, Select, theme::ColorfulTheme};
use std::sync::Arc;

use super::connect;
use crate::cli::output::{ConsoleNotifier, print_diffs, print_duplicates};
use crate::config::Config;
use crate::services::dedupe::NotificationSink;
use crate::workflow::{
    DuplicateListPanel, DuplicateRow, MergeComparisonPanel, RecordRef, Side, ViewState,
    WorkflowSignal, display_value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareAction {
    ChooseFields,
    SelectAll(Side),
    Merge,
    Previous,
    Cancel,
}

impl CompareAction {
    const ALL: [CompareAction; 6] = [
        CompareAction::ChooseFields,
        CompareAction::SelectAll(Side::Master),
        CompareAction::SelectAll(Side::Duplicate),
        CompareAction::Merge,
        CompareAction::Previous,
        CompareAction::Cancel,
    ];

    fn label(&self) -> String {
        match self {
            CompareAction::ChooseFields => "Choose field values".to_string(),
            CompareAction::SelectAll(side) => format!("Select all from {}", side.label()),
            CompareAction::Merge => "Merge".to_string(),
            CompareAction::Previous => "Back to duplicates".to_string(),
            CompareAction::Cancel => "Cancel".to_string(),
        }
    }
}

pub async fn handle_merge_command(
    config: &Config,
    entity: &str,
    record_id: &str,
    offset: usize,
    limit: usize,
) -> Result<()> {
    let record_id = RecordRef::new(record_id)?;
    let service = connect(config, entity)?;
    let label_field = service.entity().primary_name.clone();

    let notifier: Arc<dyn NotificationSink> = Arc::new(ConsoleNotifier);
    let services = service.collaborators(notifier);
    let lookup = Arc::clone(&services.lookup);
    let comparison = MergeComparisonPanel::new(services, config.workflow.reparent_mode());
    let mut panel = DuplicateListPanel::new(lookup, comparison, label_field.clone());

    if panel.load_duplicates(record_id, offset, limit).await.is_none() {
        run_session(&mut panel, &label_field).await?;
    }

    let pending = panel.comparison().pending_reparents();
    if pending > 0 {
        println!("{}", "Waiting for re-parenting to finish...".dimmed());
    }
    panel.comparison_mut().settle_reparenting().await;
    Ok(())
}

async fn run_session(
    panel: &mut DuplicateListPanel<MergeComparisonPanel>,
    label_field: &str,
) -> Result<()> {
    let theme = ColorfulTheme::default();

    while !panel.is_closed() {
        match panel.view() {
            ViewState::ListView => {
                let rows = panel.rows().unwrap_or_default().to_vec();
                if let Some(columns) = panel.columns() {
                    print_duplicates(columns, &rows);
                }
                if rows.is_empty() {
                    panel.close().await;
                    break;
                }

                let mut items: Vec<String> =
                    rows.iter().map(|row| row_choice(row, label_field)).collect();
                items.push("Quit".to_string());

                let choice = Select::with_theme(&theme)
                    .with_prompt("Select a duplicate to merge")
                    .items(&items)
                    .default(0)
                    .interact()?;

                match rows.get(choice) {
                    Some(row) => panel.select_row(row).await,
                    None => {
                        panel.close().await;
                    }
                }
            }
            ViewState::CompareView => {
                let signal = compare_step(panel.comparison_mut(), &theme).await?;
                if let Some(signal) = signal {
                    panel.handle_signal(signal).await;
                }
            }
        }
    }
    Ok(())
}

/// One round of the comparison view. Returns the signal the panel emitted.
async fn compare_step(
    comparison: &mut MergeComparisonPanel,
    theme: &ColorfulTheme,
) -> Result<Option<WorkflowSignal>> {
    if let Some(pair) = comparison.pair() {
        println!();
        println!(
            "Master {} / Duplicate {}",
            pair.surviving().to_string().cyan(),
            pair.losing().to_string().magenta()
        );
    }
    print_diffs(comparison.diffs(), comparison.selection());

    let labels: Vec<String> = CompareAction::ALL.iter().map(|a| a.label()).collect();
    let choice = Select::with_theme(theme)
        .with_prompt("What next?")
        .items(&labels)
        .default(0)
        .interact()?;

    let signal = match CompareAction::ALL[choice] {
        CompareAction::ChooseFields => {
            choose_fields(comparison, theme)?;
            None
        }
        CompareAction::SelectAll(side) => {
            comparison.select_all_from_side(side);
            None
        }
        CompareAction::Merge => {
            let confirmed = Confirm::with_theme(theme)
                .with_prompt(format!(
                    "Merge {} field(s) into the master record?",
                    comparison.selection().len()
                ))
                .default(true)
                .interact()?;
            if confirmed {
                comparison.submit_merge().await
            } else {
                None
            }
        }
        CompareAction::Previous => Some(comparison.previous().await),
        CompareAction::Cancel => Some(comparison.cancel().await),
    };
    Ok(signal)
}

fn choose_fields(comparison: &mut MergeComparisonPanel, theme: &ColorfulTheme) -> Result<()> {
    let diffs = comparison.diffs().to_vec();

    for diff in &diffs {
        let items = [
            format!("{}: {}", Side::Master.label(), display_value(diff.val1())),
            format!("{}: {}", Side::Duplicate.label(), display_value(diff.val2())),
            "Skip".to_string(),
        ];
        let default = match comparison.selection().get(&diff.field_name) {
            Some(value) if value == diff.val2() => 1,
            Some(_) => 0,
            None => 2,
        };

        let choice = Select::with_theme(theme)
            .with_prompt(diff.field_name.as_str())
            .items(&items)
            .default(default)
            .interact()?;

        match choice {
            0 => comparison.activate(diff.control(Side::Master)),
            1 => comparison.activate(diff.control(Side::Duplicate)),
            _ => {}
        }
    }
    Ok(())
}

fn row_choice(row: &DuplicateRow, label_field: &str) -> String {
    let label = row.display_value(label_field);
    if label.is_empty() {
        row.identifier().to_string()
    } else {
        format!("{} {}", label, row.record_link.dimmed())
    }
}
