//! Outbound notifications with the current view.
//!
//! Two channels exist: Telegram through the Bot API and email over SMTP with
//! implicit TLS. A notification failure is reported to the user and never
//! touches the cached results.

use crate::error::{Error, Result};
use crate::utils::truncate_for_log;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than this.
const TELEGRAM_MAX_CHARS: usize = 4096;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Where a notification goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Telegram,
    Email,
}

impl Channel {
    /// Accepts the words used by the `notify` command.
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "telegram" => Some(Channel::Telegram),
            "email" | "mail" | "correo" => Some(Channel::Email),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Channel::Telegram => "Telegram",
            Channel::Email => "correo",
        }
    }
}

pub trait Notifier {
    fn channel(&self) -> Channel;
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

/// Posts messages through the Telegram Bot API `sendMessage` method.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: Url,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> Result<Self> {
        Self::with_base_url(TELEGRAM_API, token, chat_id)
    }

    /// Same as [`TelegramNotifier::new`] against another API host.
    pub fn with_base_url(base_url: &str, token: &str, chat_id: &str) -> Result<Self> {
        if token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(Error::Notification("Telegram token and chat id are required".to_string()));
        }
        let endpoint = Url::parse(base_url)?.join(&format!("/bot{}/sendMessage", token.trim()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            client,
            endpoint,
            chat_id: chat_id.trim().to_string(),
        })
    }
}

fn compose(subject: &str, body: &str) -> String {
    let text = if subject.trim().is_empty() {
        body.to_string()
    } else {
        format!("{}\n\n{}", subject.trim(), body)
    };
    if text.chars().count() <= TELEGRAM_MAX_CHARS {
        text
    } else {
        let kept: String = text.chars().take(TELEGRAM_MAX_CHARS - 1).collect();
        format!("{}…", kept)
    }
}

impl Notifier for TelegramNotifier {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    #[instrument(level = "info", skip_all, fields(chat_id = %self.chat_id, subject = %subject))]
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = SendMessage {
            chat_id: &self.chat_id,
            text: compose(subject, body),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&message)
            .send()
            .await
            .map_err(|e| Error::Notification(format!("sending to Telegram: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, body = %truncate_for_log(&detail, 200), "Telegram rejected message");
            return Err(Error::Notification(format!("Telegram answered HTTP {}", status.as_u16())));
        }

        info!(chars = message.text.chars().count(), "Sent Telegram notification");
        Ok(())
    }
}

/// SMTP account used by [`EmailNotifier`].
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address; the username when `None`.
    pub from: Option<String>,
    pub to: String,
}

fn mailbox(role: &str, address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| Error::Notification(format!("invalid {} address {:?}: {}", role, address, e)))
}

/// Sends plain-text mail through an SMTP relay with implicit TLS.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        if settings.username.trim().is_empty() || settings.password.is_empty() {
            return Err(Error::Notification("SMTP user and password are required".to_string()));
        }
        let from = mailbox("sender", settings.from.as_deref().unwrap_or(&settings.username))?;
        let to = mailbox("recipient", &settings.to)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(settings.host.trim())
            .map_err(|e| Error::Notification(format!("SMTP relay {}: {}", settings.host, e)))?
            .port(settings.port)
            .credentials(Credentials::new(settings.username.trim().to_string(), settings.password.clone()))
            .timeout(Some(Duration::from_secs(15)))
            .build();
        Ok(Self { transport, from, to })
    }

    fn message(&self, subject: &str, body: &str) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject.trim())
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::Notification(format!("building email: {}", e)))
    }
}

impl Notifier for EmailNotifier {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    #[instrument(level = "info", skip_all, fields(to = %self.to, subject = %subject))]
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.message(subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Notification(format!("sending email: {}", e)))?;
        info!(chars = body.chars().count(), "Sent email notification");
        Ok(())
    }
}

/// Every configured notifier, so a session can hold a mix of channels.
pub enum AnyNotifier {
    Telegram(TelegramNotifier),
    Email(EmailNotifier),
}

impl Notifier for AnyNotifier {
    fn channel(&self) -> Channel {
        match self {
            AnyNotifier::Telegram(n) => n.channel(),
            AnyNotifier::Email(n) => n.channel(),
        }
    }

    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        match self {
            AnyNotifier::Telegram(n) => n.send(subject, body).await,
            AnyNotifier::Email(n) => n.send(subject, body).await,
        }
    }
}
