//! Printing the run report.

use std::path::Path;

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};
use vaultpack_core::convert::{ConversionReport, UnresolvedReference};

/// Report plus the archive location, for `--json`.
#[derive(Serialize)]
struct SummaryOutput<'a> {
    archive: String,
    #[serde(flatten)]
    report: &'a ConversionReport,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Item")]
    item: &'static str,
    #[tabled(rename = "Count")]
    count: String,
}

#[derive(Tabled)]
struct UnresolvedRow {
    #[tabled(rename = "Document")]
    document: String,
    #[tabled(rename = "Reference")]
    reference: String,
}

impl From<&UnresolvedReference> for UnresolvedRow {
    fn from(r: &UnresolvedReference) -> Self {
        Self { document: r.document.clone(), reference: r.reference.clone() }
    }
}

pub fn print(report: &ConversionReport, archive: &Path, json: bool) {
    if json {
        let output = SummaryOutput { archive: archive.display().to_string(), report };
        match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Failed to serialize summary: {e}"),
        }
        return;
    }

    println!("Exported to {}", archive.display());
    println!("{}", Table::new(count_rows(report)).with(Style::rounded()));

    if !report.unresolved.is_empty() {
        println!();
        println!("Unresolved references:");
        let rows: Vec<UnresolvedRow> = report.unresolved.iter().map(UnresolvedRow::from).collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }
}

fn count_rows(report: &ConversionReport) -> Vec<CountRow> {
    let row = |item, count: usize| CountRow { item, count: count.to_string() };
    vec![
        row("Containers", report.containers),
        row("Documents", report.documents),
        row("Attachments", report.attachments),
        row("Placeholders", report.placeholders),
        row("Excluded", report.excluded),
        row("Skipped", report.skipped),
        row("Unresolved references", report.unresolved.len()),
        CountRow { item: "Archive bytes", count: report.archive_bytes.to_string() },
    ]
}
