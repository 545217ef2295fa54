//! Line-oriented terminal session.
//!
//! Each line read from the input is one [`Command`]. Every command that shows
//! data re-runs the pipeline for the current selection, which is answered
//! from the cache while it is fresh, then filters and renders the result.
//! Export and notification failures are printed and the session carries on.
//!
//! ```text
//! > sources Clarin,Infobae
//! > search dólar
//! > export csv noticias.csv
//! > refresh
//! ```

use crate::api::Summarize;
use crate::cache::Clock;
use crate::config::{DAY_CHOICES, MAX_TOTAL_CAP, MIN_TOTAL_CAP};
use crate::error::{Error, Result};
use crate::filter::{DateWindow, Filter, filter};
use crate::models::Article;
use crate::notify::{Channel, Notifier};
use crate::outputs::table::{EMPTY_MESSAGE, render_summary, render_table};
use crate::outputs::{ExportFormat, export};
use crate::pipeline::Pipeline;
use crate::scrapers::EntrySource;
use chrono::{NaiveDate, Utc};
use itertools::Itertools;
use std::fmt::Write as _;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, instrument};

pub const DEFAULT_SUBJECT: &str = "Noticias Económicas";

const HELP: &str = "\
Comandos:
  show                         vuelve a mostrar la tabla
  sources <tag,tag,..|all>     elige las fuentes
  max <n>                      total de noticias (5-30)
  days <1|3|5>                 ventana de fechas en días
  search <texto>               filtra por palabra clave
  clear                        quita la palabra clave
  refresh                      descarta el caché y vuelve a consultar
  export <formato> <ruta>      exporta la vista actual (csv, json, md, xlsx, docx)
  notify [telegram|email] [asunto]
                               envía la vista actual
  summary                      sentimiento por fuente
  help                         esta ayuda
  quit                         salir
";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    /// Empty means every registered source.
    Sources(Vec<String>),
    Max(usize),
    Days(u32),
    Search(String),
    Clear,
    Refresh,
    Export(ExportFormat, PathBuf),
    /// No channel means every configured one.
    Notify {
        channel: Option<Channel>,
        subject: Option<String>,
    },
    Summary,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> std::result::Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "show" | "ls" => Command::Show,
            "sources" => {
                if rest.is_empty() || rest.eq_ignore_ascii_case("all") {
                    Command::Sources(Vec::new())
                } else {
                    let tags: Vec<String> = rest
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .unique()
                        .collect();
                    Command::Sources(tags)
                }
            }
            "max" => {
                let n: usize = rest.parse().map_err(|_| format!("max espera un número: {:?}", rest))?;
                if !(MIN_TOTAL_CAP..=MAX_TOTAL_CAP).contains(&n) {
                    return Err(format!("max debe estar entre {} y {}", MIN_TOTAL_CAP, MAX_TOTAL_CAP));
                }
                Command::Max(n)
            }
            "days" => {
                let n: u32 = rest.parse().map_err(|_| format!("days espera un número: {:?}", rest))?;
                if !DAY_CHOICES.contains(&n) {
                    return Err(format!("days debe ser uno de {:?}", DAY_CHOICES));
                }
                Command::Days(n)
            }
            "search" => Command::Search(rest.to_string()),
            "clear" => Command::Clear,
            "refresh" => Command::Refresh,
            "export" => {
                let (format, path) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "uso: export <csv|json|md|xlsx|docx> <ruta>".to_string())?;
                let format: ExportFormat = format.parse().map_err(|e: Error| e.to_string())?;
                Command::Export(format, PathBuf::from(path.trim()))
            }
            "notify" => {
                let (first, tail) = match rest.split_once(char::is_whitespace) {
                    Some((first, tail)) => (first, tail.trim()),
                    None => (rest, ""),
                };
                let (channel, subject) = match Channel::from_word(first) {
                    Some(channel) => (Some(channel), tail),
                    None => (None, rest),
                };
                Command::Notify {
                    channel,
                    subject: Some(subject.to_string()).filter(|s| !s.is_empty()),
                }
            }
            "summary" => Command::Summary,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("comando desconocido: {} (probá `help`)", other)),
        };
        Ok(Some(command))
    }
}

/// What the user is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Selected source tags; empty means all.
    pub sources: Vec<String>,
    pub total_cap: usize,
    pub window: DateWindow,
    pub keyword: Option<String>,
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Output(String),
    Quit,
}

pub struct Session<S, G, C, N>
where
    C: Clock,
{
    pipeline: Pipeline<S, G, C>,
    notifiers: Vec<N>,
    view: View,
    date_filter: bool,
}

impl<S, G, C, N> Session<S, G, C, N>
where
    S: EntrySource,
    G: Summarize,
    C: Clock,
    N: Notifier,
{
    /// `date_filter` says whether the `days` command is offered at all.
    pub fn new(pipeline: Pipeline<S, G, C>, notifiers: Vec<N>, view: View, date_filter: bool) -> Self {
        Self {
            pipeline,
            notifiers,
            view,
            date_filter,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    fn selection(&self) -> Vec<String> {
        if self.view.sources.is_empty() {
            self.pipeline.registry().tags().map(str::to_string).collect()
        } else {
            self.view.sources.clone()
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.pipeline.offset()).date_naive()
    }

    /// Run (or reuse) the pipeline for the current selection and apply the view's filters.
    pub async fn current(&self) -> Result<Vec<Article>> {
        let results = self.pipeline.run(&self.selection(), self.view.total_cap).await?;
        let f = Filter {
            window: self.view.window,
            keyword: self.view.keyword.clone(),
        };
        Ok(filter(&results, &f, self.today()))
    }

    async fn show(&self) -> Result<String> {
        let articles = self.current().await?;
        let mut out = self.status_line();
        out.push_str(&render_table(&articles));
        Ok(out)
    }

    fn status_line(&self) -> String {
        let sources = if self.view.sources.is_empty() {
            "todas".to_string()
        } else {
            self.view.sources.join(",")
        };
        let window = match self.view.window {
            DateWindow::Any => "sin filtro".to_string(),
            DateWindow::LastDays(n) => format!("últimos {} días", n),
        };
        let stats = self.pipeline.cache_stats();
        let mut line = format!(
            "[fuentes: {} | máx: {} | fechas: {}",
            sources, self.view.total_cap, window
        );
        if let Some(keyword) = &self.view.keyword {
            let _ = write!(line, " | búsqueda: {:?}", keyword);
        }
        let _ = writeln!(line, " | caché: {} entradas, {} consultas]", stats.entries, stats.computed);
        line
    }

    async fn notify(&self, channel: Option<Channel>, subject: Option<String>) -> Result<String> {
        let targets: Vec<&N> = self
            .notifiers
            .iter()
            .filter(|n| channel.is_none_or(|c| n.channel() == c))
            .collect();
        if targets.is_empty() {
            let missing = match channel {
                Some(Channel::Telegram) => "Telegram no configurado (TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID)",
                Some(Channel::Email) => "correo no configurado (SMTP_USER / SMTP_PASSWORD / EMAIL_TO)",
                None => "ningún canal de notificación configurado",
            };
            return Err(Error::Notification(missing.to_string()));
        }

        let articles = self.current().await?;
        let body = notification_body(&articles);
        let subject = subject.as_deref().unwrap_or(DEFAULT_SUBJECT);
        let mut out = String::new();
        for notifier in targets {
            notifier.send(subject, &body).await?;
            let _ = writeln!(out, "Mensaje enviado por {}.", notifier.channel().label());
        }
        Ok(out)
    }

    async fn try_execute(&mut self, command: Command) -> Result<Step> {
        let output = match command {
            Command::Quit => return Ok(Step::Quit),
            Command::Help => HELP.to_string(),
            Command::Show => self.show().await?,
            Command::Sources(tags) => {
                for tag in &tags {
                    self.pipeline.registry().resolve(tag)?;
                }
                self.view.sources = tags;
                self.show().await?
            }
            Command::Max(n) => {
                self.view.total_cap = n;
                self.show().await?
            }
            Command::Days(n) => {
                if !self.date_filter {
                    return Ok(Step::Output(
                        "Este modo no filtra por fecha; se muestran todas las noticias.\n".to_string(),
                    ));
                }
                self.view.window = DateWindow::LastDays(n);
                self.show().await?
            }
            Command::Search(text) => {
                self.view.keyword = Some(text).filter(|t| !t.trim().is_empty());
                self.show().await?
            }
            Command::Clear => {
                self.view.keyword = None;
                self.show().await?
            }
            Command::Refresh => {
                self.pipeline.refresh();
                self.show().await?
            }
            Command::Export(format, path) => {
                let articles = self.current().await?;
                if articles.is_empty() {
                    format!("{}\n", EMPTY_MESSAGE)
                } else {
                    export(&articles, format, &path).await?;
                    format!("Exportadas {} noticias a {}\n", articles.len(), path.display())
                }
            }
            Command::Notify { channel, subject } => self.notify(channel, subject).await?,
            Command::Summary => render_summary(&self.current().await?),
        };
        Ok(Step::Output(output))
    }

    /// Execute one command. Errors are rendered as output, never propagated.
    #[instrument(level = "info", skip(self))]
    pub async fn execute(&mut self, command: Command) -> Step {
        match self.try_execute(command).await {
            Ok(step) => step,
            Err(e) => {
                error!(error = %e, "Command failed");
                Step::Output(format!("Error: {}\n", e))
            }
        }
    }

    /// Read commands from `input` until EOF or `quit`, writing responses to `output`.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let first = self.execute(Command::Show).await;
        if let Step::Output(text) = first {
            output.write_all(text.as_bytes()).await?;
        }
        output.write_all(b"> ").await?;
        output.flush().await?;

        while let Some(line) = lines.next_line().await? {
            let text = match Command::parse(&line) {
                Ok(None) => String::new(),
                Ok(Some(command)) => match self.execute(command).await {
                    Step::Output(text) => text,
                    Step::Quit => break,
                },
                Err(message) => format!("{}\n", message),
            };
            output.write_all(text.as_bytes()).await?;
            output.write_all(b"> ").await?;
            output.flush().await?;
        }
        info!(view = ?self.view(), "Session finished");
        Ok(())
    }
}

/// Plain-text digest list for notifications.
pub fn notification_body(articles: &[Article]) -> String {
    if articles.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }
    articles
        .iter()
        .map(|a| {
            format!(
                "[{}] {} ({})\n{}\n{}",
                a.source,
                a.title,
                a.sentiment.label(),
                a.digest,
                a.link
            )
        })
        .join("\n\n")
}
