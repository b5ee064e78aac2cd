use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;

use feedline::api::{Category, FeedItem, HttpArticlesApi};
use feedline::config::Config;
use feedline::reader::{
    HeadlessViewport, MemoryLocation, ObservedIds, ReaderDeps, ReaderOptions, ReaderSession,
};
use feedline::storage::{Database, DatabaseError};
use feedline::util::{strip_control_chars, truncate_to_width};
use feedline::visibility::IntersectionEvent;

/// Env var that takes precedence over `api_token` in the config file.
const TOKEN_ENV: &str = "FEEDLINE_API_TOKEN";

/// Get the config directory path (~/.config/feedline/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedline"))
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
        .filter(|&w| w >= 20)
        .unwrap_or(80)
}

fn print_item(index: usize, item: &FeedItem, width: usize) {
    let title = strip_control_chars(&item.title);
    println!(
        "{:>3}. {}",
        index + 1,
        truncate_to_width(&title, width.saturating_sub(5))
    );
    let author = strip_control_chars(&item.author);
    let byline = format!(
        "     {} · {} min · {}",
        if author.is_empty() { "Unknown" } else { &*author },
        item.reading_time_mins,
        item.published_at.format("%Y-%m-%d")
    );
    println!("{}", truncate_to_width(&byline, width));
}

#[derive(Parser, Debug)]
#[command(name = "feedline", about = "Resumable article feed reader")]
struct Args {
    /// Articles API base URL (overrides config)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Search text
    #[arg(long)]
    query: Option<String>,

    /// Category filter (e.g. Science)
    #[arg(long, value_name = "NAME")]
    category: Option<Category>,

    /// Load at least this many pages' worth of items
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Discard the saved session before starting
    #[arg(long)]
    reset_session: bool,

    /// Config file path (default ~/.config/feedline/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(?config, "Effective configuration");

    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| config.api_base_url.clone());
    let token = std::env::var(TOKEN_ENV)
        .ok()
        .filter(|t| !t.is_empty())
        .or_else(|| config.api_token.clone())
        .map(SecretString::from);

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!("feedline/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let api = HttpArticlesApi::new(client, &base_url, token)
        .with_context(|| format!("Invalid API base URL '{}'", base_url))?;

    let db_path = config_dir.join("session.db");
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of feedline appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let viewport = HeadlessViewport::new();
    let location = MemoryLocation::new();
    let options = ReaderOptions::from(&config);
    let target_items = args.pages.max(1) * options.page_size.max(1) as usize;
    let (mut session, mut events) = ReaderSession::<usize>::new(
        ReaderDeps {
            api: Arc::new(api),
            storage: Arc::new(db),
            source: Box::new(ObservedIds::new()),
            viewport: Box::new(viewport.clone()),
            location: Box::new(location.clone()),
        },
        options,
    );

    if args.reset_session {
        session.clear_saved().await;
        println!("Session reset.");
    }

    session.mount().await;
    if let Some(query) = &args.query {
        session.submit_search(query.clone()).await;
    }
    if let Some(category) = args.category {
        session.set_category(Some(category)).await;
    }

    loop {
        if !session.controller().is_loading() {
            let controller = session.controller();
            if controller.items().len() >= target_items
                || !controller.has_more()
                || controller.error().is_some()
            {
                break;
            }
            session.on_sentinel(true);
            if !session.controller().is_loading() {
                break;
            }
        }

        let Some(event) = events.recv().await else {
            break;
        };
        let outcome = session.handle_event(event).await;
        tracing::debug!(?outcome, items = session.items().len(), "Fetch completed");
    }

    if session.on_frame() {
        tracing::info!(offset = viewport.offset(), "Restored scroll position");
    }

    let width = terminal_width();
    let ids: Vec<String> = session.items().iter().map(|i| i.id.clone()).collect();
    for (index, item) in session.items().iter().enumerate() {
        print_item(index, item, width);
    }
    for (row, id) in ids.iter().enumerate() {
        session.register_item(id, Some(row));
    }
    if let Some(first) = ids.first() {
        session.on_intersections(&[IntersectionEvent::new(first.clone(), 1.0)]);
    }

    println!();
    println!("{}", session.view().status_line());
    if let Some(path) = location.current() {
        println!("Now reading: {}", path);
    }

    session.flush().await;
    session.persist().await;
    Ok(())
}
