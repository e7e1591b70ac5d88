use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;

use tailscope_api::{ApiClient, LogApi};
use tailscope_core::{
    AiProvider, DEFAULT_PAGE_LIMIT, FacetFilter, FilterState, LogLevel, LogRecord,
    QueryTranslator, SavedSearchStore, SearchOrchestrator, SearchView, Tailer,
};

mod config;

use config::Config;

/// Tailscope - live tailing and faceted search against the log dashboard API
#[derive(Parser, Debug)]
#[command(name = "tailscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the dashboard API (overrides the config file)
    #[arg(long)]
    url: Option<String>,

    /// Bearer token (overrides config file and TAILSCOPE_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Path to a config file (default: ./tailscope.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Follow the live tail instead of running a search
    #[arg(long)]
    follow: bool,

    /// Translate a natural-language query into filters before searching
    #[arg(long, value_name = "QUERY")]
    translate: Option<String>,

    /// Pin the AI provider for --translate (a|b)
    #[arg(long)]
    provider: Option<String>,

    /// Free-text query
    #[arg(long)]
    query: Option<String>,

    /// Levels to include (repeatable): debug, info, warn, error, fatal
    #[arg(long = "level", value_name = "LEVEL")]
    levels: Vec<String>,

    /// Sources to include (repeatable)
    #[arg(long = "source", value_name = "SOURCE")]
    sources: Vec<String>,

    /// Facet constraints as key=value (repeatable)
    #[arg(long = "facet", value_name = "KEY=VALUE")]
    facets: Vec<String>,

    /// Search window: the last N hours
    #[arg(long, default_value = "1")]
    last_hours: i64,

    /// Results per page
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
    limit: u64,

    /// Page to fetch
    #[arg(long, default_value = "1")]
    page: u64,

    /// List saved searches and exit
    #[arg(long)]
    list_saved: bool,

    /// Save the assembled filter state under this name
    #[arg(long, value_name = "NAME")]
    save: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run_app(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    let base_url = args
        .url
        .clone()
        .or(config.server.base_url.clone())
        .context("No API base URL given (use --url or the config file)")?;

    let token = args
        .token
        .clone()
        .or_else(|| {
            std::env::var("TAILSCOPE_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
        })
        .or(config.server.token.clone())
        .unwrap_or_default();

    let api: Arc<dyn LogApi> = Arc::new(ApiClient::new(base_url, token)?);

    if args.list_saved {
        return list_saved(api).await;
    }

    let mut filter = build_filter(&args)?;

    if let Some(nl_query) = &args.translate {
        let translator = QueryTranslator::new(Arc::clone(&api));
        let provider = match &args.provider {
            Some(raw) => Some(
                AiProvider::from_str(raw)
                    .with_context(|| format!("Unknown provider '{raw}' (expected a or b)"))?,
            ),
            None => None,
        };
        let generated = translator.translate(nl_query, provider).await?;
        filter.apply_generated(generated);
        println!("Translated filters: {}", describe_filter(&filter));
    }

    if let Some(name) = &args.save {
        let store = SavedSearchStore::new(Arc::clone(&api));
        let saved = store.create(name, filter.clone()).await?;
        println!("Saved search '{}' ({})", saved.name, saved.id);
    }

    if args.follow {
        follow(api, &config).await
    } else {
        search_once(api, filter, &args).await
    }
}

/// Build the filter state from command-line flags
fn build_filter(args: &Args) -> Result<FilterState> {
    let mut filter = FilterState::last_hour(Utc::now());
    filter.start_time = filter.end_time - chrono::Duration::hours(args.last_hours.max(1));
    filter.query = args.query.clone().filter(|q| !q.trim().is_empty());

    for raw in &args.levels {
        let level =
            LogLevel::from_str(raw).with_context(|| format!("Unknown log level '{raw}'"))?;
        filter.levels.insert(level);
    }

    filter.sources.extend(args.sources.iter().cloned());

    for raw in &args.facets {
        let (key, value) = raw
            .split_once('=')
            .with_context(|| format!("Facet '{raw}' is not of the form key=value"))?;
        let facet = FacetFilter::new(key, value);
        if !facet.is_well_formed() {
            bail!("Facet '{raw}' has a blank key or value");
        }
        filter.add_facet(facet);
    }

    Ok(filter)
}

/// One-shot search: run the orchestrator once and print the result
async fn search_once(api: Arc<dyn LogApi>, filter: FilterState, args: &Args) -> Result<()> {
    let orchestrator = SearchOrchestrator::with_limit(api, args.limit);
    let mut updates = orchestrator.subscribe();

    orchestrator.set_filter_state(filter);
    orchestrator.search_now();
    updates.changed().await?;

    // Page navigation needs the first response's totals before it can
    // clamp, so the requested page is applied with a second fetch
    if args.page > 1 && orchestrator.set_page(args.page) {
        updates.changed().await?;
    }

    let view = updates.borrow().clone();
    if let Some(error) = &view.last_error {
        bail!("Search failed: {error}");
    }

    print_view(&view);
    Ok(())
}

fn print_view(view: &SearchView) {
    for record in &view.records {
        print_record(record);
    }

    if !view.histogram.is_empty() {
        println!();
        let max = view
            .histogram
            .iter()
            .map(|b| b.count)
            .max()
            .unwrap_or(1)
            .max(1);
        for bucket in &view.histogram {
            let width = ((bucket.count * 40) / max) as usize;
            println!(
                "{}  {:>6}  {}",
                bucket.time.format("%H:%M:%S"),
                bucket.count,
                "#".repeat(width)
            );
        }
    }

    let p = view.pagination;
    println!();
    println!(
        "Page {} of {} ({} records total)",
        p.page, p.total_pages, p.total
    );
}

/// Follow mode: start the tailer and print records as they arrive
async fn follow(api: Arc<dyn LogApi>, config: &Config) -> Result<()> {
    let interval = Duration::from_secs(config.poll_interval_secs.unwrap_or(3));
    let mut tailer = Tailer::with_interval(api, interval);
    tailer.start();

    let mut printed_up_to: Option<DateTime<Utc>> = None;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                for record in tailer.snapshot() {
                    if printed_up_to.is_none_or(|t| record.timestamp > t) {
                        print_record(&record);
                        printed_up_to = Some(record.timestamp);
                    }
                }
            }
        }
    }

    tailer.stop();
    Ok(())
}

async fn list_saved(api: Arc<dyn LogApi>) -> Result<()> {
    let store = SavedSearchStore::new(api);
    let searches = store.list().await?;
    if searches.is_empty() {
        println!("No saved searches");
        return Ok(());
    }
    for search in searches {
        println!(
            "{}  {}  [{}]",
            search.created_at.format("%Y-%m-%d %H:%M"),
            search.name,
            describe_filter(&search.query)
        );
    }
    Ok(())
}

fn print_record(record: &LogRecord) {
    println!(
        "{}  {:<5}  {:<16}  {}",
        record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        record.level.as_str(),
        record.source,
        record.message
    );
}

fn describe_filter(filter: &FilterState) -> String {
    let mut parts = Vec::new();
    if let Some(query) = &filter.query {
        parts.push(format!("query=\"{query}\""));
    }
    if !filter.levels.is_empty() {
        let levels: Vec<_> = filter.levels.iter().map(|l| l.as_str()).collect();
        parts.push(format!("levels={}", levels.join(",")));
    }
    if !filter.sources.is_empty() {
        let sources: Vec<_> = filter.sources.iter().cloned().collect();
        parts.push(format!("sources={}", sources.join(",")));
    }
    for facet in &filter.facets {
        parts.push(format!("{}={}", facet.key, facet.value));
    }
    if parts.is_empty() {
        "no filters".to_string()
    } else {
        parts.join(" ")
    }
}
