//! History listing command.

use console::style;

use tagfetch::config::Settings;
use tagfetch::history::JsonHistory;
use tagfetch::utils::format_size;

/// List recorded sessions, most recent last.
pub fn cmd_history(settings: &Settings, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let history = JsonHistory::load(&settings.history_file);
    let entries = history.entries();
    let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));
    let shown = &entries[skip..];

    if json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!(
            "{} No sessions recorded in {}",
            style("!").yellow(),
            history.path().display()
        );
        return Ok(());
    }

    for entry in shown {
        println!(
            "{} {}  {}",
            style("•").cyan(),
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            style(&entry.query_tags).bold()
        );
        println!(
            "    {} files, {}, {:.1}s, {:.1} MB/min, {} duplicates skipped -> {}",
            entry.file_count,
            format_size(entry.total_size_bytes),
            entry.duration_seconds,
            entry.avg_speed_mbps,
            entry.skipped_duplicates,
            entry.folder_name
        );
    }

    Ok(())
}
