//! Size estimate command.

use console::style;

use tagfetch::catalog::{estimate_total_size, ESTIMATE_SAMPLE_SIZE};
use tagfetch::config::Settings;
use tagfetch::credentials::Credentials;
use tagfetch::utils::format_size;

use super::build_catalog;

/// Print the sampled size estimate for `count` posts matching `tags`.
pub async fn cmd_estimate(
    settings: &Settings,
    tags: &str,
    count: usize,
    credentials: Option<Credentials>,
) -> anyhow::Result<()> {
    let catalog = build_catalog(settings, credentials)?;

    match estimate_total_size(&catalog, tags, count).await {
        Some(bytes) => {
            println!(
                "{} {} posts for '{}': about {}",
                style("✓").green(),
                count,
                tags,
                format_size(bytes)
            );
            println!(
                "  {} Based on the first {} matching posts",
                style("→").dim(),
                ESTIMATE_SAMPLE_SIZE
            );
        }
        None => println!(
            "{} No size information available for '{}'",
            style("!").yellow(),
            tags
        ),
    }

    Ok(())
}
