pub mod table;

use crate::engine::SnapshotSummary;
use crate::util::format_bytes;

pub fn print(summaries: &[SnapshotSummary], total_stored: u64) {
    if summaries.is_empty() {
        println!("No snapshots found. Run 'snapvault snapshot <dir>' to create one.");
        return;
    }

    print!("{}", table::render(summaries));
    println!("\nTotal stored size: {}", format_bytes(total_stored));
}
