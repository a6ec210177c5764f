use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, warn};

use super::decode::Utf8Decoder;
use super::{ChunkSource, ReadStep, TranslateRequest, Transport};
use crate::session::{CancelHandle, SessionError};

type BodyStream = BoxStream<'static, reqwest::Result<Bytes>>;

/// HTTP client for the translate endpoint. Session workers are plain
/// threads, so each call blocks on a small runtime owned by the transport;
/// every await is raced against the session's cancel token.
pub(crate) struct HttpTransport {
    client: Client,
    endpoint: String,
    runtime: Runtime,
}

impl HttpTransport {
    pub(crate) fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("roletalk-http")
            .enable_all()
            .build()
            .context("build http runtime")?;
        // No overall timeout: a reply streams for as long as the model talks.
        let client = {
            let _guard = runtime.enter();
            Client::builder()
                .connect_timeout(connect_timeout)
                .build()
                .context("build http client")?
        };
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            runtime,
        })
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        request: &TranslateRequest,
        cancel: &CancelHandle,
    ) -> std::result::Result<Box<dyn ChunkSource>, SessionError> {
        let handle = self.runtime.handle().clone();
        let send = self.client.post(&self.endpoint).json(request).send();
        let response = handle.block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    Err(SessionError::Request("cancelled before response".to_string()))
                }
                sent = send => sent.map_err(|e| SessionError::Request(e.to_string())),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = handle.block_on(async {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => String::new(),
                    text = response.text() => text.unwrap_or_default(),
                }
            });
            let message = error_detail(&body)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "translate endpoint returned an error");
            return Err(SessionError::Http {
                status: status.as_u16(),
                message,
            });
        }

        debug!(status = status.as_u16(), "response stream opened");
        Ok(Box::new(HttpChunkSource {
            handle,
            body: Some(response.bytes_stream().boxed()),
            decoder: Utf8Decoder::default(),
        }))
    }
}

/// Pull a human-readable message out of a `{"detail": ...}` error body.
/// Falsy details (`null`, `""`, `false`, `0`) count as missing.
pub(super) fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// Response body being read. `body` is dropped as soon as the session is
/// cancelled or the stream ends, which releases the connection.
struct HttpChunkSource {
    handle: Handle,
    body: Option<BodyStream>,
    decoder: Utf8Decoder,
}

impl ChunkSource for HttpChunkSource {
    fn read_step(&mut self, cancel: &CancelHandle) -> ReadStep {
        loop {
            if cancel.is_cancelled() {
                self.body = None;
                return ReadStep::Cancelled;
            }
            let Some(body) = self.body.as_mut() else {
                return ReadStep::Done;
            };
            let next = self.handle.block_on(async {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    item = body.next() => Some(item),
                }
            });
            match next {
                None => {
                    self.body = None;
                    debug!(session = cancel.session(), "body read aborted");
                    return ReadStep::Cancelled;
                }
                Some(None) => {
                    self.body = None;
                    if let Some(tail) = self.decoder.finish() {
                        return ReadStep::Chunk(tail);
                    }
                }
                Some(Some(Ok(bytes))) => {
                    let text = self.decoder.decode(&bytes);
                    if !text.is_empty() {
                        return ReadStep::Chunk(text);
                    }
                }
                Some(Some(Err(e))) => {
                    self.body = None;
                    return ReadStep::Failed(SessionError::Stream(e.to_string()));
                }
            }
        }
    }
}
