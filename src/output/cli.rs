use crate::model::Record;
use crate::monitor::{PersistState, RunSummary};
use crate::store::TrackedEntry;
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Change")]
    change: &'static str,
    #[tabled(rename = "Repository")]
    name: String,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct TrackedRow {
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "CVE")]
    identifier: String,
    #[tabled(rename = "Repositories")]
    records: usize,
}

pub fn print_cli_table(summary: &RunSummary) -> Result<()> {
    println!();
    if let Some(date) = summary.date {
        println!("Run for {} (query: {})", date.format("%Y-%m-%d"), summary.query);
    }
    println!(
        "Queries: {} ({} failed)  Keys: {} ({} failed)  Rejected records: {}",
        summary.queries,
        summary.failed_queries,
        summary.keys_processed,
        summary.keys_failed,
        summary.rejected_records
    );
    println!();

    if summary.added.is_empty() && summary.updated.is_empty() {
        println!("No new or updated repositories.");
    } else {
        let rows: Vec<RecordRow> = summary
            .added
            .iter()
            .map(|r| row("new", r))
            .chain(summary.updated.iter().map(|r| row("updated", r)))
            .collect();

        println!(
            "{} new, {} updated:",
            summary.added.len(),
            summary.updated.len()
        );
        println!();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    if let Some(state) = summary.persisted {
        if state == PersistState::Incomplete {
            println!();
            println!("Warning: some results could not be saved, see log output.");
        }
    }

    if let Some(report) = summary.notified {
        println!();
        println!(
            "Notifications: {} sent, {} failed",
            report.sent, report.failed
        );
    }

    Ok(())
}

pub fn print_tracked_table(entries: &[TrackedEntry]) -> Result<()> {
    if entries.is_empty() {
        println!("No tracked CVEs.");
        return Ok(());
    }

    let total: usize = entries.iter().map(|e| e.records).sum();
    println!(
        "Tracking {} CVEs with {} repositories:",
        entries.len(),
        total
    );
    println!();

    let rows: Vec<TrackedRow> = entries
        .iter()
        .map(|e| TrackedRow {
            year: e.year.clone(),
            identifier: e.identifier.clone(),
            records: e.records,
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    Ok(())
}

fn row(change: &'static str, record: &Record) -> RecordRow {
    RecordRow {
        change,
        name: truncate(&record.name, 40),
        owner: record.owner.login.clone(),
        url: record.html_url.clone(),
        description: truncate(record.summary(), 50),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
