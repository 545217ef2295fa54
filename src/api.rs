//! Digest generation against a local Ollama server.
//!
//! Every article summary is sent once to `POST {ollama_url}/api/generate` with
//! streaming disabled. Failures are not errors from the caller's point of
//! view: [`Summarize::summarize`] always returns a [`Digest`], and a failed
//! generation carries a structured [`SummaryFailure`] that is rendered into a
//! readable fallback sentence exactly once, by [`Digest::into_text`].
//!
//! # Architecture
//!
//! - [`Summarize`]: the seam the pipeline depends on
//! - [`OllamaClient`]: the HTTP implementation
//!
//! There is no retry: one attempt per article, bounded by the client timeout.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// Why a digest could not be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryFailure {
    Timeout,
    Status(u16),
    Transport(String),
    MalformedBody(String),
}

impl fmt::Display for SummaryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryFailure::Timeout => f.write_str("request timed out"),
            SummaryFailure::Status(code) => write!(f, "HTTP status {}", code),
            SummaryFailure::Transport(detail) => write!(f, "transport error: {}", detail),
            SummaryFailure::MalformedBody(detail) => write!(f, "malformed response: {}", detail),
        }
    }
}

/// Outcome of one digest request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Digest {
    Generated(String),
    Unavailable(SummaryFailure),
}

impl Digest {
    /// Text shown and classified downstream; failures become a fallback sentence.
    pub fn into_text(self) -> String {
        match self {
            Digest::Generated(text) => text,
            Digest::Unavailable(failure) => format!("(Resumen no disponible: {})", failure),
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Digest::Generated(_))
    }
}

/// Something that turns article text into a one-sentence [`Digest`].
pub trait Summarize {
    async fn summarize(&self, text: &str) -> Digest;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// [`Summarize`] implementation backed by Ollama's generate endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: Url,
    model: String,
    instruction: String,
    temperature: f32,
}

/// `{base}/api/generate`, keeping any path prefix on `base` (reverse proxies).
fn generate_endpoint(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("api/generate")?)
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: &str,
        instruction: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = generate_endpoint(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
            instruction: instruction.to_string(),
            temperature,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.ollama_url,
            &config.model,
            &config.prompt_instruction,
            config.temperature,
            Duration::from_secs(config.generate_timeout_secs),
        )
    }

    fn prompt(&self, text: &str) -> String {
        format!("{}:\n{}", self.instruction.trim_end_matches(':'), text)
    }

    async fn generate(&self, text: &str) -> std::result::Result<String, SummaryFailure> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: self.prompt(text),
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummaryFailure::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(classify_transport)?;
        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            debug!(body = %truncate_for_log(&body, 300), "Unexpected generate response");
            SummaryFailure::MalformedBody(e.to_string())
        })?;

        let digest = parsed.response.trim();
        if digest.is_empty() {
            return Err(SummaryFailure::MalformedBody("empty response".to_string()));
        }
        Ok(digest.to_string())
    }
}

fn classify_transport(e: reqwest::Error) -> SummaryFailure {
    if e.is_timeout() {
        SummaryFailure::Timeout
    } else {
        SummaryFailure::Transport(e.to_string())
    }
}

impl Summarize for OllamaClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model, chars = text.len()))]
    async fn summarize(&self, text: &str) -> Digest {
        let t0 = Instant::now();
        let result = self.generate(text).await;
        let elapsed_ms = t0.elapsed().as_millis();

        match result {
            Ok(digest) => {
                debug!(elapsed_ms, digest = %truncate_for_log(&digest, 120), "Generated digest");
                Digest::Generated(digest)
            }
            Err(failure) => {
                warn!(elapsed_ms, error = %failure, "Digest generation failed; using fallback");
                Digest::Unavailable(failure)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;
    use crate::sentiment;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, read the full request, answer with `response`.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client(base_url: &str, timeout: Duration) -> OllamaClient {
        OllamaClient::new(base_url, "gemma3:latest", "Resumí en una oración.", 0.3, timeout).unwrap()
    }

    #[tokio::test]
    async fn test_successful_generation_is_trimmed() {
        let body = r#"{"model":"gemma3:latest","response":"  La inflación se desaceleró en abril.\n","done":true}"#;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .into_boxed_str(),
        );
        let (url, server) = serve_once(response).await;

        let digest = client(&url, Duration::from_secs(5)).summarize("texto de la nota").await;
        assert_eq!(
            digest,
            Digest::Generated("La inflación se desaceleró en abril.".to_string())
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/generate"));
        assert!(request.contains(r#""stream":false"#));
        assert!(request.contains(r#""model":"gemma3:latest""#));
        assert!(request.contains("Resumí en una oración.:\\ntexto de la nota"));
    }

    #[tokio::test]
    async fn test_non_success_status_falls_back() {
        let (url, _server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let digest = client(&url, Duration::from_secs(5)).summarize("texto").await;
        assert_eq!(digest, Digest::Unavailable(SummaryFailure::Status(500)));

        let text = digest.into_text();
        assert!(text.contains("no disponible"));
        assert!(text.contains("500"));
        // fallback text is an ordinary digest for the classifier
        assert_eq!(sentiment::classify(&text), Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_missing_response_field_falls_back() {
        let (url, _server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 13\r\nConnection: close\r\n\r\n{\"done\":true}",
        )
        .await;

        let digest = client(&url, Duration::from_secs(5)).summarize("texto").await;
        assert!(matches!(digest, Digest::Unavailable(SummaryFailure::MalformedBody(_))));
        assert!(!digest.into_text().is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused_falls_back() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let digest = client(&format!("http://{}", addr), Duration::from_secs(5))
            .summarize("texto")
            .await;
        assert!(matches!(digest, Digest::Unavailable(SummaryFailure::Transport(_))));
        assert!(digest.into_text().starts_with("(Resumen no disponible:"));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let digest = client(&format!("http://{}", addr), Duration::from_millis(200))
            .summarize("texto")
            .await;
        assert_eq!(digest, Digest::Unavailable(SummaryFailure::Timeout));
        assert!(digest.clone().into_text().contains("timed out"));
        assert!(!digest.is_generated());
    }

    #[test]
    fn test_prompt_joins_instruction_and_text() {
        let client = client("http://localhost:11434", Duration::from_secs(1));
        assert_eq!(client.prompt("hola"), "Resumí en una oración.:\nhola");
        assert_eq!(client.endpoint.as_str(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let cases = [
            ("http://host/ollama", "http://host/ollama/api/generate"),
            ("http://host/ollama/", "http://host/ollama/api/generate"),
            ("http://localhost:11434/", "http://localhost:11434/api/generate"),
        ];
        for (base, expected) in cases {
            assert_eq!(generate_endpoint(base).unwrap().as_str(), expected);
        }
        assert!(matches!(generate_endpoint("not a url"), Err(Error::Url(_))));
    }
}
