//! HTTP access to the scrape server: the SSE progress stream and the CSV download.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use reqwest::{
    header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE},
    multipart, Client, StatusCode,
};
use shared::{
    domain::FormData,
    protocol::{DOWNLOAD_PATH, SCRAPE_PATH},
    sse::SseDecoder,
};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

const EVENT_STREAM_MIME: &str = "text/event-stream";

#[async_trait]
pub trait ScrapeTransport: Send + Sync {
    /// Resolves the progress endpoint for a serialized form. Performs no I/O.
    fn progress_endpoint(&self, query: &str) -> Result<Url, TransportError>;

    async fn open_progress_stream(
        &self,
        endpoint: Url,
    ) -> Result<Box<dyn ProgressStream>, TransportError>;

    /// Posts the form and returns the response body of a 2xx response.
    async fn download(&self, form: &FormData) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
pub trait ProgressStream: Send {
    /// Next `message` event payload.
    ///
    /// A stream that ends on its own yields one `UnexpectedEnd` error and then `None`.
    async fn next_message(&mut self) -> Option<Result<String, TransportError>>;

    /// Releases the connection. Idempotent.
    fn close(&mut self);
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> Result<Self, TransportError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            http,
            base_url: Url::parse(server_url.trim())?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl ScrapeTransport for HttpTransport {
    fn progress_endpoint(&self, query: &str) -> Result<Url, TransportError> {
        let mut endpoint = self.endpoint(SCRAPE_PATH)?;
        endpoint.set_query(Some(query));
        Ok(endpoint)
    }

    async fn open_progress_stream(
        &self,
        endpoint: Url,
    ) -> Result<Box<dyn ProgressStream>, TransportError> {
        let response = self
            .http
            .get(endpoint.clone())
            .header(ACCEPT, EVENT_STREAM_MIME)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::Status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type
            .to_ascii_lowercase()
            .starts_with(EVENT_STREAM_MIME)
        {
            return Err(TransportError::UnexpectedContentType(content_type));
        }

        debug!(%endpoint, "progress stream connected");
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TransportError::from))
            .boxed();
        Ok(Box::new(SseProgressStream::new(body)))
    }

    async fn download(&self, form: &FormData) -> Result<Vec<u8>, TransportError> {
        let endpoint = self.endpoint(DOWNLOAD_PATH)?;
        let body = form
            .entries()
            .fold(multipart::Form::new(), |body, (name, value)| {
                body.text(name.to_string(), value.to_string())
            });

        let response = self.http.post(endpoint).multipart(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Turns a raw byte stream into `message` event payloads.
pub struct SseProgressStream {
    body: Option<BoxStream<'static, Result<Vec<u8>, TransportError>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
}

impl SseProgressStream {
    pub fn new(body: BoxStream<'static, Result<Vec<u8>, TransportError>>) -> Self {
        Self {
            body: Some(body),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }
    }
}

#[async_trait]
impl ProgressStream for SseProgressStream {
    async fn next_message(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            if let Some(payload) = self.pending.pop_front() {
                return Some(Ok(payload));
            }
            let body = self.body.as_mut()?;
            match body.next().await {
                Some(Ok(chunk)) => {
                    let events = match self.decoder.feed(&chunk) {
                        Ok(events) => events,
                        Err(err) => {
                            self.body = None;
                            return Some(Err(err.into()));
                        }
                    };
                    for event in events {
                        if event.is_message() {
                            self.pending.push_back(event.data);
                        } else {
                            debug!(event = %event.event, "ignoring named sse event");
                        }
                    }
                }
                Some(Err(err)) => {
                    self.body = None;
                    return Some(Err(err));
                }
                None => {
                    self.body = None;
                    return Some(Err(TransportError::UnexpectedEnd));
                }
            }
        }
    }

    fn close(&mut self) {
        if self.body.take().is_some() {
            debug!("progress stream closed");
        }
        self.pending.clear();
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
