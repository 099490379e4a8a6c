//! Download command.

use std::sync::Arc;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, watch};

use tagfetch::archive::zip_directory;
use tagfetch::catalog::{estimate_total_size, CatalogClient, HttpCatalog};
use tagfetch::config::Settings;
use tagfetch::credentials::Credentials;
use tagfetch::history::{JsonHistory, SummarySink};
use tagfetch::services::{
    DownloadEvent, DownloadSession, ProgressReporter, SessionReport, SessionRequest, StopReason,
};
use tagfetch::storage::{session_output_dir, FsStorage};
use tagfetch::utils::{format_duration, format_size, sanitize_folder_name};

use super::build_catalog;

/// Resolved options of one `download` invocation.
pub struct DownloadArgs {
    pub tags: String,
    pub count: usize,
    pub workers: usize,
    pub folder: Option<String>,
    pub zip: bool,
    pub skip_duplicates: bool,
    pub estimate: bool,
    pub record_history: bool,
    pub credentials: Option<Credentials>,
}

/// Download posts matching a tag query.
pub async fn cmd_download(settings: &Settings, args: DownloadArgs) -> anyhow::Result<()> {
    let folder_name = sanitize_folder_name(args.folder.as_deref().unwrap_or(&args.tags));
    let output_dir = session_output_dir(&settings.output_root, &folder_name);

    let catalog = connect(settings, args.credentials.clone()).await?;
    let catalog: Arc<dyn CatalogClient> = Arc::new(catalog);

    if args.estimate {
        match estimate_total_size(catalog.as_ref(), &args.tags, args.count).await {
            Some(bytes) => println!(
                "{} Estimated total size: {}",
                style("→").cyan(),
                format_size(bytes)
            ),
            None => println!("{} Could not estimate total size", style("!").yellow()),
        }
    }

    println!(
        "{} Downloading {} posts for '{}' into {} ({} workers)",
        style("→").cyan(),
        args.count,
        args.tags,
        output_dir.display(),
        args.workers
    );

    let session = DownloadSession::new(catalog, Arc::new(FsStorage));
    let mut request = SessionRequest::new(args.tags.clone(), args.count, output_dir.clone());
    request.concurrency = args.workers;
    request.skip_duplicates = args.skip_duplicates;
    request.page_cap = settings.page_cap;
    request.page_delay = settings.page_delay();

    // Ctrl-C stops dispatching; in-flight downloads finish.
    let (abort_tx, abort_rx) = watch::channel(false);
    let signal_handler = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = abort_tx.send(true);
        }
    });

    let bar = ProgressBar::new(args.count as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("valid progress template")
            .progress_chars("█▓░"),
    );
    let reporter = ProgressReporter::new(session.tracker(), session.counters(), args.count)
        .with_interval(settings.report_interval())
        .spawn(bar.clone());

    // Event channel for per-item notices
    let (event_tx, mut event_rx) = mpsc::channel::<DownloadEvent>(100);
    let event_bar = bar.clone();
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                DownloadEvent::Failed {
                    post_id, error, ..
                } => {
                    let label = post_id.map_or_else(|| "post".to_string(), |id| format!("post {}", id));
                    event_bar.println(format!("{} {}: {}", style("✗").red(), label, error));
                }
                DownloadEvent::PageFetched {
                    page,
                    posts,
                    dispatched,
                } if dispatched < posts => {
                    event_bar.println(format!(
                        "  {} page {}: {} of {} posts have no downloadable file",
                        style("→").dim(),
                        page,
                        posts - dispatched,
                        posts
                    ));
                }
                _ => {}
            }
        }
    });

    let result = session.run(&request, abort_rx, event_tx).await;

    signal_handler.abort();
    let _ = event_handler.await;
    reporter.abort();
    let report = match result {
        Ok(report) => {
            bar.set_position(report.completed as u64 + report.duplicates as u64);
            bar.finish_and_clear();
            report
        }
        Err(e) => {
            bar.abandon();
            return Err(e).context("Download session could not start");
        }
    };

    print_summary(&report);

    if args.record_history {
        let mut history = JsonHistory::load(&settings.history_file);
        if let Err(e) = history.record(&report.summary()) {
            println!("{} Failed to record history: {}", style("!").yellow(), e);
        }
    }

    if args.zip {
        let zip_path = settings.output_root.join(format!("{}.zip", folder_name));
        let src = report.output_dir.clone();
        let dest = zip_path.clone();
        let files = tokio::task::spawn_blocking(move || zip_directory(&src, &dest))
            .await
            .context("Zip task failed")?
            .with_context(|| format!("Failed to create {}", zip_path.display()))?;
        println!(
            "{} Zipped {} files into {}",
            style("✓").green(),
            files,
            zip_path.display()
        );
    }

    Ok(())
}

/// Build the catalog client, falling back to anonymous access when the
/// credentials are rejected.
async fn connect(
    settings: &Settings,
    credentials: Option<Credentials>,
) -> anyhow::Result<HttpCatalog> {
    let catalog = build_catalog(settings, credentials)?;
    if !catalog.is_authenticated() {
        return Ok(catalog);
    }

    match catalog.verify_credentials().await {
        Ok(()) => {
            println!("{} Authenticated", style("✓").green());
            Ok(catalog)
        }
        Err(e) => {
            println!(
                "{} Credentials rejected ({}), continuing without authentication",
                style("!").yellow(),
                e
            );
            build_catalog(settings, None)
        }
    }
}

fn print_summary(report: &SessionReport) {
    let mark = match report.stop_reason {
        StopReason::TargetReached | StopReason::Exhausted => style("✓").green(),
        StopReason::PaginationError(_) | StopReason::Aborted => style("!").yellow(),
    };
    println!(
        "{} Downloaded {} files ({}) in {}",
        mark,
        report.completed,
        format_size(report.total_bytes),
        format_duration(report.duration)
    );
    println!(
        "  {} Average speed: {:.1} MB/min",
        style("→").dim(),
        report.megabytes_per_minute()
    );
    if report.duplicates > 0 {
        println!(
            "  {} {} duplicates skipped",
            style("→").dim(),
            report.duplicates
        );
    }
    if report.failed > 0 {
        println!("  {} {} failed", style("→").dim(), report.failed);
    }
    if report.unresolvable > 0 {
        println!(
            "  {} {} posts had no downloadable file",
            style("→").dim(),
            report.unresolvable
        );
    }
    println!("  {} Stopped: {}", style("→").dim(), report.stop_reason);
    println!("  {} Saved to {}", style("→").dim(), report.output_dir.display());
}
