//! HTTP Server for the warehouse chat UI
//! Simple HTTP server using tokio and basic HTTP handling

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use warehouse_chat::chat::ChatService;
use warehouse_chat::config::AppConfig;
use warehouse_chat::db::MssqlDataStore;
use warehouse_chat::error::AgentError;
use warehouse_chat::llm::{ChatMessage, ModelClient};
use warehouse_chat::tools::{DataTools, ToolRequest, ACTIONS};

/// Largest request (headers + body) accepted
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

const ERROR_PART: &str = "3:\"An error occurred while generating the answer.\"\n";
const TIMEOUT_PART: &str = "3:\"The answer took too long and was cut off.\"\n";

struct AppState {
    chat: ChatService,
    tools: DataTools,
    chat_timeout: Duration,
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequestBody {
    messages: Vec<ChatMessage>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let store = MssqlDataStore::from_config(&config.database)?;
    let tools = DataTools::new(Arc::new(store));
    let model = ModelClient::new(config.model.clone());
    let state = Arc::new(AppState {
        chat: ChatService::new(tools.clone(), model),
        tools,
        chat_timeout: config.chat_timeout,
    });

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("🚀 Warehouse chat server listening on {}", config.bind_addr);
    info!("Model {} at {}", config.model.model, config.model.host);

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("📥 New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&state)));
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) {
    let request = match read_request(&mut stream).await {
        Ok(Some(request)) => request,
        Ok(None) => {
            let response = create_response(400, "Bad Request", r#"{"error":"Malformed request"}"#);
            send_response(&mut stream, &response).await;
            return;
        }
        Err(e) => {
            warn!("Failed to read from stream: {}", e);
            return;
        }
    };

    info!("🔍 Request: {} {}", request.method, request.path);
    if let Some(agent) = request.headers.get("user-agent") {
        debug!("User agent: {}", agent);
    }

    let result = match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/api/chat") => handle_chat(&mut stream, &state, &request.body).await,
        _ => {
            let response = handle_request(&request, &state).await;
            stream.write_all(response.as_bytes()).await
        }
    };

    if let Err(e) = result {
        error!("Failed to write response: {}", e);
    }
}

/// Write a complete response, logging instead of propagating a failed write.
async fn send_response<W: AsyncWrite + Unpin>(stream: &mut W, response: &str) -> bool {
    match stream.write_all(response.as_bytes()).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to write response: {}", e);
            false
        }
    }
}

/// Read the head, then as much body as Content-Length announces.
/// `Ok(None)` means the bytes did not form an HTTP request.
async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> std::io::Result<Option<HttpRequest>> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find_head_end(&data) {
            break pos;
        }
        if data.len() > MAX_REQUEST_BYTES {
            return Ok(None);
        }
        let size = stream.read(&mut buffer).await?;
        if size == 0 {
            return Ok(None);
        }
        data.extend_from_slice(&buffer[..size]);
    };

    let head = String::from_utf8_lossy(&data[..head_end]).to_string();
    let Some((method, path, headers)) = parse_head(&head) else {
        return Ok(None);
    };

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if content_length > MAX_REQUEST_BYTES {
        return Ok(None);
    }

    let body_start = head_end + 4;
    while data.len() < body_start + content_length {
        let size = stream.read(&mut buffer).await?;
        if size == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..size]);
    }
    let body_end = data.len().min(body_start + content_length);
    let body = String::from_utf8_lossy(&data[body_start..body_end]).to_string();

    Ok(Some(HttpRequest {
        method,
        path,
        headers,
        body,
    }))
}

fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_head(head: &str) -> Option<(String, String, HashMap<String, String>)> {
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }

    let method = parts[0].to_string();
    let mut path = parts[1].to_string();

    // Remove query parameters if present
    if let Some(query_start) = path.find('?') {
        path.truncate(query_start);
    }

    // Normalize path (remove trailing slash except for root)
    path = path.trim_end_matches('/').to_string();
    if path.is_empty() {
        path = "/".to_string();
    }

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    Some((method, path, headers))
}

async fn handle_request(request: &HttpRequest, state: &AppState) -> String {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/api/health") => {
            let body = match state.tools.store().health_check().await {
                Ok(true) => serde_json::json!({
                    "status": "ok",
                    "service": "warehouse-chat",
                    "database": "connected"
                }),
                Ok(false) => serde_json::json!({
                    "status": "degraded",
                    "service": "warehouse-chat",
                    "database": "unexpected response"
                }),
                Err(e) => serde_json::json!({
                    "status": "degraded",
                    "service": "warehouse-chat",
                    "database": "unavailable",
                    "error": e.to_string()
                }),
            };
            create_response(200, "OK", &body.to_string())
        }
        ("GET", "/api/query") => {
            let body = serde_json::json!({
                "message": "Warehouse query API is running",
                "availableActions": ACTIONS,
                "description": "Read-only view access for the chat assistant"
            });
            create_response(200, "OK", &body.to_string())
        }
        ("POST", "/api/query") => {
            let tool_request: ToolRequest = match serde_json::from_str(&request.body) {
                Ok(r) => r,
                Err(_) => {
                    return create_response(400, "Bad Request", r#"{"error":"Invalid JSON body"}"#);
                }
            };
            info!("Data tool called with action: {}", tool_request.action);

            match state.tools.dispatch(&tool_request).await {
                Ok(response) => {
                    let body = serde_json::to_string(&response)
                        .unwrap_or_else(|_| r#"{"error":"Failed to serialize response"}"#.to_string());
                    if response.success() {
                        create_response(200, "OK", &body)
                    } else {
                        create_response(500, "Internal Server Error", &body)
                    }
                }
                Err(AgentError::InvalidRequest(msg)) => {
                    create_response(400, "Bad Request", &serde_json::json!({ "error": msg }).to_string())
                }
                Err(e) => {
                    error!("❌ Data tool failed: {}", e);
                    create_response(500, "Internal Server Error", r#"{"error":"Internal server error"}"#)
                }
            }
        }
        ("OPTIONS", _) => {
            // Handle CORS preflight
            create_response(200, "OK", "")
        }
        (method, path) => {
            warn!("❌ 404: {} {} not found", method, path);
            create_response(
                404,
                "Not Found",
                &serde_json::json!({ "error": format!("Endpoint not found: {} {}", method, path) }).to_string(),
            )
        }
    }
}

/// Stream the model answer in the data-stream text format the chat UI reads:
/// one `0:"<fragment>"` line per fragment, then `d:`.
async fn handle_chat<W: AsyncWrite + Unpin>(
    stream: &mut W,
    state: &AppState,
    body: &str,
) -> std::io::Result<()> {
    let messages = match serde_json::from_str::<ChatRequestBody>(body) {
        Ok(parsed) => parsed.messages,
        Err(_) => {
            let response = create_response(400, "Bad Request", r#"{"error":"messages are required"}"#);
            return stream.write_all(response.as_bytes()).await;
        }
    };

    let deadline = Instant::now() + state.chat_timeout;
    let rx = match timeout_at(deadline, state.chat.respond(&messages)).await {
        Ok(Ok(rx)) => rx,
        Ok(Err(e)) => {
            error!("Chat API Error: {}", e);
            let response = create_response(500, "Internal Server Error", r#"{"error":"Internal server error"}"#);
            return stream.write_all(response.as_bytes()).await;
        }
        Err(_) => {
            warn!("Chat turn exceeded {}s before streaming started", state.chat_timeout.as_secs());
            stream.write_all(stream_headers().as_bytes()).await?;
            stream.write_all(TIMEOUT_PART.as_bytes()).await?;
            stream.write_all(b"d:\n").await?;
            return stream.flush().await;
        }
    };

    stream.write_all(stream_headers().as_bytes()).await?;
    forward_fragments(stream, rx, deadline).await
}

/// Copy model fragments to the client until the stream ends, fails, or the
/// deadline passes, then close the data stream with `d:`.
async fn forward_fragments<W: AsyncWrite + Unpin>(
    stream: &mut W,
    mut rx: mpsc::Receiver<warehouse_chat::Result<String>>,
    deadline: Instant,
) -> std::io::Result<()> {
    loop {
        match timeout_at(deadline, rx.recv()).await {
            Ok(Some(Ok(text))) => stream.write_all(format_fragment(&text).as_bytes()).await?,
            Ok(Some(Err(e))) => {
                error!("Streaming error: {}", e);
                stream.write_all(ERROR_PART.as_bytes()).await?;
                break;
            }
            Ok(None) => break,
            Err(_) => {
                warn!("Chat response deadline reached, closing stream");
                stream.write_all(TIMEOUT_PART.as_bytes()).await?;
                break;
            }
        }
    }
    stream.write_all(b"d:\n").await?;
    stream.flush().await
}

fn format_fragment(text: &str) -> String {
    format!("0:{}\n", serde_json::Value::String(text.to_string()))
}

fn stream_headers() -> String {
    "HTTP/1.1 200 OK\r\n\
     Content-Type: text/plain; charset=utf-8\r\n\
     Cache-Control: no-cache\r\n\
     Access-Control-Allow-Origin: *\r\n\
     Connection: close\r\n\
     \r\n"
        .to_string()
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}
