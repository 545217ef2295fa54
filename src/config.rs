//! Runtime configuration and the built-in dashboard presets.
//!
//! Each [`Variant`] describes one dashboard flavour as plain data:
//! which sources to poll and how, which model to call, how long results stay
//! cached and whether the date filter is offered. A YAML file may override any
//! field of the chosen preset.
//!
//! # Example
//!
//! ```yaml
//! model: "gemma3:4b"
//! cache_ttl_secs: 900
//! sources:
//!   - tag: Infobae
//!     url: https://www.infobae.com/feeds/rss/economia.xml
//! ```

use crate::error::{Error, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const SPANISH_INSTRUCTION: &str = "Genera un resumen de una oración del siguiente contenido de noticias e imprima solo esa oración.";
const ENGLISH_INSTRUCTION: &str =
    "Give a one sentence summary of the following news content, and only print that one sentence";

/// Bounds of the user-facing total item cap.
pub const MIN_TOTAL_CAP: usize = 5;
pub const MAX_TOTAL_CAP: usize = 30;

/// Day windows offered by the date filter.
pub const DAY_CHOICES: [u32; 3] = [1, 3, 5];

/// The dashboard flavour to reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// RSS feeds, Gemma 3 4B, one hour cache, date filter enabled.
    Gemma,
    /// RSS feeds, DeepSeek R1 14B, thirty minute cache, no date filter.
    Deepseek,
    /// Scraped section pages, Gemma 3 1B, English prompt, one hour cache.
    Scraping,
}

/// How entries are retrieved from a source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    Rss,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub tag: String,
    pub url: String,
}

impl SourceConfig {
    fn new(tag: &str, url: &str) -> Self {
        Self {
            tag: tag.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub fetch_mode: FetchMode,
    pub sources: Vec<SourceConfig>,
    pub ollama_url: String,
    pub model: String,
    /// Instruction placed before the article text in the prompt.
    pub prompt_instruction: String,
    pub temperature: f32,
    pub generate_timeout_secs: u64,
    pub feed_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    /// Pause after each digest request.
    pub polite_delay_ms: u64,
    /// Offset publication dates are normalized to (Argentina is -3).
    pub utc_offset_hours: i32,
    /// Whether views are restricted to the last N days.
    pub date_filter: bool,
    pub default_days: u32,
    pub default_total_cap: usize,
}

impl Config {
    /// Built-in settings for a dashboard variant.
    pub fn preset(variant: Variant) -> Self {
        let rss_sources = vec![
            SourceConfig::new("Infobae", "https://www.infobae.com/feeds/rss/economia.xml"),
            SourceConfig::new("AmbitoFin", "https://www.ambito.com/rss/finanzas.xml"),
            SourceConfig::new("AmbitoEcon", "https://www.ambito.com/rss/economia.xml"),
            SourceConfig::new("CronistaFin", "https://www.cronista.com/files/rss/finanzas-mercados.xml"),
            SourceConfig::new("CronistaEcon", "https://www.cronista.com/files/rss/economia-politica.xml"),
            SourceConfig::new("LaNacion", "https://www.lanacion.com.ar/rss/economia.xml"),
            SourceConfig::new("Clarin", "https://www.clarin.com/rss/economia"),
        ];

        let base = Config {
            fetch_mode: FetchMode::Rss,
            sources: rss_sources,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model: "gemma3:latest".to_string(),
            prompt_instruction: SPANISH_INSTRUCTION.to_string(),
            temperature: 0.3,
            generate_timeout_secs: 60,
            feed_timeout_secs: 30,
            cache_ttl_secs: 3600,
            polite_delay_ms: 100,
            utc_offset_hours: -3,
            date_filter: true,
            default_days: 3,
            default_total_cap: 10,
        };

        match variant {
            Variant::Gemma => base,
            Variant::Deepseek => Config {
                model: "deepseek-r1:14b".to_string(),
                cache_ttl_secs: 1800,
                date_filter: false,
                ..base
            },
            Variant::Scraping => Config {
                fetch_mode: FetchMode::Html,
                sources: vec![
                    SourceConfig::new("Infobae", "https://www.infobae.com/economia/"),
                    SourceConfig::new("Ambito", "https://www.ambito.com/economia"),
                    SourceConfig::new("Cronista", "https://www.cronista.com/ultimas-noticias/"),
                ],
                model: "gemma3:1b".to_string(),
                prompt_instruction: ENGLISH_INSTRUCTION.to_string(),
                generate_timeout_secs: 120,
                date_filter: false,
                ..base
            },
        }
    }

    /// Load the preset for `variant`, apply an optional YAML override file and validate.
    #[instrument(level = "info", skip_all, fields(?variant))]
    pub fn load(variant: Variant, path: Option<&Path>) -> Result<Self> {
        let mut config = Self::preset(variant);
        if let Some(path) = path {
            let raw = std::fs::read_to_string(path)?;
            let overrides: ConfigOverrides = serde_yaml::from_str(&raw)?;
            overrides.apply_to(&mut config);
            info!(path = %path.display(), "Applied configuration overrides");
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(Error::Config("at least one source is required".to_string()));
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.tag.as_str()) {
                return Err(Error::Config(format!("duplicate source tag: {}", source.tag)));
            }
            Url::parse(&source.url)
                .map_err(|e| Error::Config(format!("invalid URL for {}: {}", source.tag, e)))?;
        }
        Url::parse(&self.ollama_url)?;
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature out of range: {}",
                self.temperature
            )));
        }
        if self.cache_ttl_secs == 0 {
            return Err(Error::Config("cache_ttl_secs must be positive".to_string()));
        }
        if !DAY_CHOICES.contains(&self.default_days) {
            return Err(Error::Config(format!(
                "default_days must be one of {:?}",
                DAY_CHOICES
            )));
        }
        if !(MIN_TOTAL_CAP..=MAX_TOTAL_CAP).contains(&self.default_total_cap) {
            return Err(Error::Config(format!(
                "default_total_cap must be within {}..={}",
                MIN_TOTAL_CAP, MAX_TOTAL_CAP
            )));
        }
        self.target_offset()?;
        Ok(())
    }

    /// Offset publication dates are normalized to.
    pub fn target_offset(&self) -> Result<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::Config(format!("invalid utc_offset_hours: {}", self.utc_offset_hours))
            })
    }
}

/// Partial configuration read from YAML; every present field replaces the preset's.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverrides {
    fetch_mode: Option<FetchMode>,
    sources: Option<Vec<SourceConfig>>,
    ollama_url: Option<String>,
    model: Option<String>,
    prompt_instruction: Option<String>,
    temperature: Option<f32>,
    generate_timeout_secs: Option<u64>,
    feed_timeout_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    polite_delay_ms: Option<u64>,
    utc_offset_hours: Option<i32>,
    date_filter: Option<bool>,
    default_days: Option<u32>,
    default_total_cap: Option<usize>,
}

impl ConfigOverrides {
    fn apply_to(self, config: &mut Config) {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }
        apply!(
            fetch_mode,
            sources,
            ollama_url,
            model,
            prompt_instruction,
            temperature,
            generate_timeout_secs,
            feed_timeout_secs,
            cache_ttl_secs,
            polite_delay_ms,
            utc_offset_hours,
            date_filter,
            default_days,
            default_total_cap,
        );
    }
}
