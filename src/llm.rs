use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Buffered fragments between the HTTP reader and the consumer
const FRAGMENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
    top_p: f64,
}

/// One NDJSON line of an Ollama chat stream
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Streaming chat client for a local Ollama server
#[derive(Clone)]
pub struct ModelClient {
    config: ModelConfig,
    http: reqwest::Client,
}

impl ModelClient {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Start a chat completion and return its text fragments as they arrive.
    ///
    /// Fails only if the request cannot be started; errors in the middle of
    /// the stream are delivered through the channel.
    pub async fn stream_chat(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
    ) -> Result<mpsc::Receiver<Result<String>>> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(history.iter().cloned());

        let body = ChatRequest {
            model: &self.config.model,
            messages,
            stream: true,
            options: ChatOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
            },
        };

        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));
        debug!("Calling model {} at {}", self.config.model, url);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Llm(format!("LLM API call failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let truncated: String = text.chars().take(200).collect();
            return Err(AgentError::Llm(format!("LLM HTTP {}: {}", status, truncated)));
        }

        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        tokio::spawn(pump_fragments(response, tx));
        Ok(rx)
    }

    /// Convenience: wait for the whole answer.
    pub async fn chat(&self, system_prompt: &str, history: &[ChatMessage]) -> Result<String> {
        let mut rx = self.stream_chat(system_prompt, history).await?;
        let mut answer = String::new();
        while let Some(fragment) = rx.recv().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }
}

async fn pump_fragments(mut response: reqwest::Response, tx: mpsc::Sender<Result<String>>) {
    let mut decoder = NdjsonDecoder::default();
    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(Err(AgentError::Http(e))).await;
                return;
            }
        };
        for item in decoder.push(&chunk) {
            let done = matches!(item, Ok(Decoded::Done));
            let forward = match item {
                Ok(Decoded::Fragment(text)) => Some(Ok(text)),
                Ok(Decoded::Done) => None,
                Err(e) => Some(Err(e)),
            };
            if let Some(message) = forward {
                if tx.send(message).await.is_err() {
                    debug!("Model stream consumer went away");
                    return;
                }
            }
            if done {
                return;
            }
        }
    }
    if decoder.has_pending() {
        warn!("Model stream ended with an incomplete line");
    }
}

#[derive(Debug, PartialEq)]
enum Decoded {
    Fragment(String),
    Done,
}

/// Splits a byte stream into newline-delimited JSON chunks.
#[derive(Debug, Default)]
struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<Decoded>> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            out.extend(decode_line(line));
        }
        out
    }

    fn has_pending(&self) -> bool {
        self.buffer.iter().any(|b| !b.is_ascii_whitespace())
    }
}

fn decode_line(line: &str) -> Vec<Result<Decoded>> {
    let chunk: ChatChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => return vec![Err(AgentError::Json(e))],
    };
    if let Some(error) = chunk.error {
        return vec![Err(AgentError::Llm(error))];
    }
    let mut out = Vec::new();
    if let Some(message) = chunk.message {
        if !message.content.is_empty() {
            out.push(Ok(Decoded::Fragment(message.content)));
        }
    }
    if chunk.done {
        out.push(Ok(Decoded::Done));
    }
    out
}
