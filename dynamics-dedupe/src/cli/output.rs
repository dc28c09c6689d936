//! Terminal rendering for the merge workflow

use colored::*;
use log::info;

use crate::services::dedupe::NotificationSink;
use crate::workflow::{
    Column, ColumnSpec, DuplicateRow, FieldDiff, MergeSelection, Notification, Variant,
    display_value,
};

/// Prints notifications as colored one-liners on stderr
pub struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn show(&self, notification: Notification) {
        info!("{}", notification);
        let title = match notification.variant {
            Variant::Success => notification.title.bright_green().bold(),
            Variant::Error => notification.title.bright_red().bold(),
            Variant::Warning => notification.title.bright_yellow().bold(),
            Variant::Info => notification.title.bright_blue().bold(),
        };
        eprintln!("{} {}", title, notification.message);
    }
}

/// Header and cells of the duplicate list, one row per candidate
pub fn duplicate_table(columns: &ColumnSpec, rows: &[DuplicateRow]) -> (Vec<String>, Vec<Vec<String>>) {
    let header = columns
        .columns()
        .iter()
        .map(|column| match column {
            Column::Link { label, .. } => label.clone(),
            Column::Data(meta) => meta.label.clone(),
            Column::Actions(_) => "Actions".to_string(),
        })
        .collect();

    let cells = rows
        .iter()
        .map(|row| {
            columns
                .columns()
                .iter()
                .map(|column| match column {
                    Column::Link { label_field, .. } => {
                        let label = row.display_value(label_field);
                        if label.is_empty() {
                            row.record_link.clone()
                        } else {
                            format!("{} ({})", label, row.record_link)
                        }
                    }
                    Column::Data(meta) => row.display_value(&meta.field_name),
                    Column::Actions(actions) => actions
                        .iter()
                        .map(|a| a.label.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                })
                .collect()
        })
        .collect();

    (header, cells)
}

pub fn print_duplicates(columns: &ColumnSpec, rows: &[DuplicateRow]) {
    if rows.is_empty() {
        println!("{}", "No duplicates found".yellow());
        return;
    }

    let (header, cells) = duplicate_table(columns, rows);
    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(&header[..]).bold());
    for row in &cells {
        println!("{}", line(&row[..]));
    }
    println!("{} candidate(s)", rows.len().to_string().cyan());
}

/// Differing fields with the current choice marked
pub fn print_diffs(diffs: &[FieldDiff], selection: &MergeSelection) {
    if diffs.is_empty() {
        println!("{}", "No differing fields".yellow());
        return;
    }

    for diff in diffs {
        let chosen = selection.get(&diff.field_name);
        let marker = |value: &serde_json::Value| {
            if chosen == Some(value) { "*".bright_green().bold() } else { " ".normal() }
        };

        println!("{}", diff.field_name.bold());
        println!(
            "  {} {:<10} {}",
            marker(diff.val1()),
            "Master".cyan(),
            display_value(diff.val1())
        );
        println!(
            "  {} {:<10} {}",
            marker(diff.val2()),
            "Duplicate".magenta(),
            display_value(diff.val2())
        );
    }
}
