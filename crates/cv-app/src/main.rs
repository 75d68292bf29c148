//! Headless call-recording browser

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use cv_core::{
    BrowserState, DatasetFetcher, DatasetId, DateRange, FetchOutcome, FilterSnapshot, PageAction,
    PaginationCoordinator,
};
use cv_data::{
    BrowserConfig, CursorFetcher, DatasetDefinition, HttpTransport, MetadataTransport,
    RecordingLocator, SessionFetcher,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod render;

use cli::{Cli, Command, SearchArgs};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse `Key=v1,v2` arguments through the dataset's filter vocabulary
fn parse_filters(definition: &DatasetDefinition, args: &[String]) -> Result<FilterSnapshot> {
    let mut filters = definition.filter_set();
    for arg in args {
        let (key, values) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("filter '{}' is not KEY=VALUES", arg))?;
        let key = key.trim();
        filters.set_active(key, true)?;
        filters.set_text(key, values)?;
    }
    Ok(filters.snapshot())
}

fn print_page(coordinator: &PaginationCoordinator, definition: &DatasetDefinition) {
    let state = coordinator.state();
    if let Some(badge) = render::badge(coordinator, definition) {
        println!("{}", badge);
    }
    println!("{}", render::table(&state, definition));
    println!("{}", render::pager(coordinator));
}

fn check(outcome: FetchOutcome, coordinator: &PaginationCoordinator) -> Result<()> {
    if outcome == FetchOutcome::Failed {
        let message = coordinator
            .state()
            .error
            .map(|e| e.message)
            .unwrap_or_default();
        bail!("{} request failed: {}", coordinator.dataset(), message);
    }
    Ok(())
}

async fn browse(
    browser: &BrowserState,
    fetcher: Arc<dyn DatasetFetcher>,
    search: &SearchArgs,
    scope: Option<String>,
) -> Result<Arc<PaginationCoordinator>> {
    let definition = DatasetDefinition::of(fetcher.dataset());
    let range = DateRange::parse(&search.from, &search.to).map_err(|e| anyhow!("{}", e))?;
    let filters = parse_filters(&definition, &search.filters)?;

    let coordinator = browser.mount(fetcher);
    coordinator.set_scope(scope).await?;
    coordinator.set_filters(filters.clone());
    let outcome = coordinator.search(range).await?;
    check(outcome, &coordinator)?;

    // Session searches start unfiltered; narrow them in a second step
    if !filters.is_empty() && !coordinator.state().has_filters {
        let outcome = coordinator.dispatch(PageAction::ApplyFilters).await?;
        check(outcome, &coordinator)?;
    }
    Ok(coordinator)
}

async fn save_recording(
    browser: &BrowserState,
    locator: &RecordingLocator,
    search: &SearchArgs,
    opco: Option<&str>,
) -> Result<()> {
    let (Some(row), Some(out)) = (search.recording, search.out.as_ref()) else {
        return Ok(());
    };
    if !browser.select(row) {
        bail!("row {} is not on the loaded page", row);
    }
    let selection = browser
        .selected()
        .ok_or_else(|| anyhow!("selection was cleared"))?;

    let request = locator.locate(selection.dataset, &selection.record, opco)?;
    let bytes = locator.fetch(&request).await?;
    std::fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;
    info!(
        "Saved {} ({} bytes) to {}",
        request.file_name,
        bytes.len(),
        out.display()
    );
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => BrowserConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BrowserConfig::from_env()?,
    };
    debug!("Using API at {}", config.api_base_url);

    let transport: Arc<dyn MetadataTransport> = Arc::new(HttpTransport::new(
        &config.api_base_url,
        config.metadata_timeout()?,
    )?);
    let locator = RecordingLocator::new(transport.clone(), &config)?;

    match &cli.command {
        Command::Talkdesk { search, pages } => {
            let browser = BrowserState::new(DatasetId::Talkdesk);
            let fetcher = Arc::new(CursorFetcher::new(transport, &config.talkdesk));
            let definition = fetcher.definition().clone();
            let coordinator = browse(&browser, fetcher, search, None).await?;
            print_page(&coordinator, &definition);

            for _ in 1..*pages {
                if !coordinator.state().has_next {
                    break;
                }
                let outcome = coordinator.dispatch(PageAction::Next).await?;
                check(outcome, &coordinator)?;
                print_page(&coordinator, &definition);
            }
            save_recording(&browser, &locator, search, None).await
        }
        Command::Vpi { search, opco, page } => {
            let browser = BrowserState::new(DatasetId::Vpi);
            let opco = opco.unwrap_or(config.vpi.opco).to_string();
            let fetcher = Arc::new(SessionFetcher::new(transport, &config.vpi));
            let definition = fetcher.definition().clone();
            let coordinator = browse(&browser, fetcher, search, Some(opco.clone())).await?;

            if *page > 1 {
                let outcome = coordinator.dispatch(PageAction::Goto(*page)).await?;
                check(outcome, &coordinator)?;
            }
            print_page(&coordinator, &definition);
            save_recording(&browser, &locator, search, Some(&opco)).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli).await
}
