pub mod cli;
pub mod error;
pub mod repl;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tracing::info;

use crate::client::{LoadOutcome, PagedSelection, view};
use crate::config::Config;
use crate::source::MemorySource;
use cli::{BulkArgs, Cli, Command};
use error::CliError;

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply(&cli.source.to_overrides());
    config.validate()?;
    let codec = config.codec()?;
    let source = build_source(&config)?;
    info!(
        target: "pageset::app",
        page_size = config.page_size,
        marker_base = config.marker_base,
        total = source.total(),
        pages = source.page_count(),
        "session configured"
    );
    let client = PagedSelection::new(source, codec);

    match cli.command {
        Some(Command::Bulk(args)) => run_bulk(client, &args, &mut io::stdout()).await,
        Some(Command::Browse) | None => {
            let input = BufReader::new(tokio::io::stdin());
            repl::run(client, input, &mut io::stdout()).await
        }
    }
}

fn build_source(config: &Config) -> Result<Arc<MemorySource>, CliError> {
    let source = match config.records_file.as_deref() {
        Some(path) => MemorySource::from_json_file(path, config.page_size)?,
        None => MemorySource::generated(config.total_records, config.page_size, config.id_base),
    };
    let source = source
        .with_latency(Duration::from_millis(config.latency_ms))
        .with_jitter(Duration::from_millis(config.jitter_ms))
        .with_failing_pages(config.fail_pages.iter().copied());
    Ok(Arc::new(source))
}

/// Loads page 1, bulk-selects, then walks `--visit` printing each page.
pub async fn run_bulk<W: Write>(
    mut client: PagedSelection,
    args: &BulkArgs,
    out: &mut W,
) -> Result<(), CliError> {
    if let LoadOutcome::Failed(err) = client.goto_page(1).await {
        return Err(err.into());
    }
    let selected = client.on_bulk_select(args.count.as_deref())?;
    info!(target: "pageset::app", selected, "bulk selection applied");
    writeln!(out, "selected the first {selected} records")?;
    write!(out, "{}", view::render_page(&client))?;

    for &page in &args.visit {
        match client.goto_page(page).await {
            LoadOutcome::Applied(report) => {
                writeln!(
                    out,
                    "\nloaded page {} (resolved {}, {} pending elsewhere)",
                    report.page, report.resolved, report.pending_elsewhere
                )?;
                write!(out, "{}", view::render_page(&client))?;
            }
            LoadOutcome::Failed(err) => writeln!(out, "\nerror: {err}")?,
            LoadOutcome::Stale { .. } => {}
        }
    }

    if args.ids {
        let ids: Vec<String> = client
            .selection()
            .raw_ids()
            .iter()
            .map(i64::to_string)
            .collect();
        writeln!(out, "\nids: {}", ids.join(" "))?;
    }
    out.flush()?;
    Ok(())
}
