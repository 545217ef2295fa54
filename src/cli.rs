//! Command-line interface definitions for the economy news radar.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Connection settings can also be provided via environment variables.

use crate::config::{DAY_CHOICES, MAX_TOTAL_CAP, MIN_TOTAL_CAP, Variant};
use crate::notify::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the news radar.
///
/// The variant picks the preset (sources, model, cache lifetime, date filter);
/// an optional YAML file overrides it, and the remaining flags set the initial
/// view of the interactive session.
///
/// # Examples
///
/// ```sh
/// # Interactive session with the default preset
/// radar_economico
///
/// # One table of Clarín and Infobae headlines mentioning the dollar, then exit
/// radar_economico --sources Clarin,Infobae --keyword dólar --once
///
/// # Scraping preset against a remote Ollama
/// radar_economico --variant scraping --ollama-url http://gpu-box:11434
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Dashboard preset to run
    #[arg(short, long, value_enum, default_value_t = Variant::Gemma)]
    pub variant: Variant,

    /// Optional path to a YAML file overriding the preset
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-separated source tags to start with (default: all)
    #[arg(short, long, value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Total number of articles to request across the selected sources
    #[arg(short = 'n', long, value_parser = parse_total_cap)]
    pub max_items: Option<usize>,

    /// Only show articles from the last N days (1, 3 or 5)
    #[arg(short, long, value_parser = parse_days)]
    pub days: Option<u32>,

    /// Only show articles whose digest or title contains this text
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Print the table once and exit instead of starting a session
    #[arg(long)]
    pub once: bool,

    /// Base URL of the Ollama server
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Model name passed to Ollama
    #[arg(long, env = "OLLAMA_MODEL")]
    pub model: Option<String>,

    /// Telegram bot token for the `notify` command
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Telegram chat id for the `notify` command
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// SMTP relay for email notifications (implicit TLS)
    #[arg(long, env = "SMTP_HOST", default_value = DEFAULT_SMTP_HOST)]
    pub smtp_host: String,

    /// SMTP port
    #[arg(long, env = "SMTP_PORT", default_value_t = DEFAULT_SMTP_PORT)]
    pub smtp_port: u16,

    /// SMTP login, also the sender unless `--email-from` is given
    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: Option<String>,

    /// SMTP password or app password
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Sender address for email notifications
    #[arg(long, env = "EMAIL_FROM")]
    pub email_from: Option<String>,

    /// Recipient address for email notifications
    #[arg(long, env = "EMAIL_TO")]
    pub email_to: Option<String>,
}

fn parse_total_cap(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("not a number: {}", s))?;
    if (MIN_TOTAL_CAP..=MAX_TOTAL_CAP).contains(&n) {
        Ok(n)
    } else {
        Err(format!("must be between {} and {}", MIN_TOTAL_CAP, MAX_TOTAL_CAP))
    }
}

fn parse_days(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| format!("not a number: {}", s))?;
    if DAY_CHOICES.contains(&n) {
        Ok(n)
    } else {
        Err(format!("must be one of {:?}", DAY_CHOICES))
    }
}
