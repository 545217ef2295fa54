//! # Radar Económico
//!
//! A terminal news radar for the Argentine economy. It polls a set of RSS
//! feeds (or scrapes section pages), asks a local Ollama model for a
//! one-sentence digest of every story, scores the digest's sentiment and shows
//! the result as a table that can be filtered, exported and sent to Telegram.
//!
//! ## Features
//!
//! - Three presets: Gemma 3 with a date filter, DeepSeek R1 without one, and
//!   HTML scraping with Gemma 3 1B
//! - Whole runs cached for the preset's lifetime, keyed by source set and cap
//! - Filters by publication window (1, 3 or 5 days) and keyword
//! - CSV, JSON, Markdown, Excel and Word exports
//! - Telegram and email notifications
//!
//! ## Usage
//!
//! ```sh
//! radar_economico --variant gemma --sources Infobae,Clarin
//! radar_economico --variant deepseek --once --keyword dólar
//! ```
//!
//! ## Architecture
//!
//! 1. **Registry**: source tags resolved to feed or page URLs
//! 2. **Fetching**: entries retrieved per source, capped, failures skipped
//! 3. **Digest**: one Ollama request per entry, fallback text on failure
//! 4. **Sentiment**: lexical polarity of the digest
//! 5. **Cache**: the whole pass memoized with a TTL
//! 6. **Session**: filters, table, exports and notifications on top

use chrono::Local;
use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cache;
mod cli;
mod config;
mod error;
mod filter;
mod models;
mod notify;
mod outputs;
mod pipeline;
mod registry;
mod scrapers;
mod sentiment;
mod session;
mod utils;

use api::OllamaClient;
use cache::PipelineCache;
use cli::Cli;
use config::Config;
use filter::DateWindow;
use notify::{AnyNotifier, EmailNotifier, EmailSettings, TelegramNotifier};
use pipeline::Pipeline;
use registry::SourceRegistry;
use scrapers::HttpSource;
use session::{Command, Session, Step, View};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(local_time = %Local::now().to_rfc3339(), "radar_economico starting up");

    let args = Cli::parse();
    debug!(?args.variant, ?args.config, ?args.sources, "Parsed CLI arguments");

    let mut config = Config::load(args.variant, args.config.as_deref())?;
    if let Some(url) = &args.ollama_url {
        config.ollama_url = url.clone();
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    config.validate()?;
    info!(
        variant = ?args.variant,
        model = %config.model,
        sources = config.sources.len(),
        ttl_secs = config.cache_ttl_secs,
        "Configuration loaded"
    );

    let registry = SourceRegistry::from_config(&config);
    for tag in &args.sources {
        registry.resolve(tag)?;
    }

    let window = match (config.date_filter, args.days) {
        (true, days) => DateWindow::LastDays(days.unwrap_or(config.default_days)),
        (false, Some(_)) => {
            warn!("This preset has no date filter; --days ignored");
            DateWindow::Any
        }
        (false, None) => DateWindow::Any,
    };
    let view = View {
        sources: args.sources.iter().unique().cloned().collect(),
        total_cap: args.max_items.unwrap_or(config.default_total_cap),
        window,
        keyword: args.keyword.clone(),
    };

    let mut notifiers = Vec::new();
    if let (Some(token), Some(chat_id)) = (&args.telegram_token, &args.telegram_chat_id) {
        match TelegramNotifier::new(token, chat_id) {
            Ok(notifier) => notifiers.push(AnyNotifier::Telegram(notifier)),
            Err(e) => warn!(error = %e, "Telegram disabled"),
        }
    }
    if let (Some(user), Some(password), Some(to)) = (&args.smtp_user, &args.smtp_password, &args.email_to) {
        let settings = EmailSettings {
            host: args.smtp_host.clone(),
            port: args.smtp_port,
            username: user.clone(),
            password: password.clone(),
            from: args.email_from.clone(),
            to: to.clone(),
        };
        match EmailNotifier::new(&settings) {
            Ok(notifier) => notifiers.push(AnyNotifier::Email(notifier)),
            Err(e) => warn!(error = %e, "Email disabled"),
        }
    }
    debug!(notifiers = notifiers.len(), "Notification channels ready");

    let pipeline = Pipeline::new(
        registry,
        HttpSource::new(config.feed_timeout_secs)?,
        OllamaClient::from_config(&config)?,
        PipelineCache::new(Duration::from_secs(config.cache_ttl_secs)),
        config.target_offset()?,
        Duration::from_millis(config.polite_delay_ms),
    );
    let mut session = Session::new(pipeline, notifiers, view, config.date_filter);

    if args.once {
        if let Step::Output(text) = session.execute(Command::Show).await {
            print!("{}", text);
        }
    } else {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        session.run(stdin, tokio::io::stdout()).await?;
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    Ok(())
}
