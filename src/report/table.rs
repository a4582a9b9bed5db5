//! Terminal table rendering for the snapshot listing.
//!
//! One row per snapshot: id, capture timestamp, directory size at capture
//! time, bytes currently stored in the database, and the storage technique.

use crate::engine::SnapshotSummary;
use crate::util::format_bytes;

pub fn render(summaries: &[SnapshotSummary]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<10} {:<20} {:<12} {:<12} {:<10}\n",
        "SNAPSHOT", "TIMESTAMP", "DIR SIZE", "STORED", "TECHNIQUE"
    ));
    output.push_str(&"-".repeat(68));
    output.push('\n');

    for summary in summaries {
        let datetime = chrono::DateTime::from_timestamp(summary.record.timestamp, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        output.push_str(&format!(
            "{:<10} {:<20} {:<12} {:<12} {:<10}\n",
            summary.record.id,
            datetime,
            format_bytes(summary.record.directory_size),
            format_bytes(summary.stored_size),
            summary.record.technique.as_str()
        ));
    }

    output
}
