use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::error::TransportError;
use super::resolver::{self, ResolverHandle};
use super::types::{Headers, Method, Request, Response};

/// Overall transfer timeout, connect phase included
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);
/// Connect phase timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(300);
/// TCP keep-alive idle interval
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(120);
/// Maximum redirects followed per transfer
pub const MAX_REDIRECTS: usize = 10;

/// Split a raw header line into a trimmed name/value pair.
///
/// The line is split on the first colon only, so values may contain colons.
/// Lines without a colon (status lines, the blank terminator) yield `None`.
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    const WS: &[char] = &[' ', '\t', '\r', '\n'];

    let (name, value) = line.split_once(':')?;
    let name = name.trim_matches(WS);
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim_matches(WS).to_string()))
}

/// Accumulates the body and headers of one transfer as they stream in
#[derive(Debug, Default)]
pub struct TransferSink {
    body: Vec<u8>,
    headers: Headers,
}

impl TransferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a body chunk
    pub fn write_body(&mut self, chunk: &[u8]) -> usize {
        self.body.extend_from_slice(chunk);
        chunk.len()
    }

    /// Record one raw header line; a repeated name overwrites the earlier value
    pub fn header_line(&mut self, line: &str) {
        if let Some((name, value)) = parse_header_line(line) {
            self.headers.insert(name, value);
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Turn the collected data into a completed response
    pub fn into_response(self, status_code: i64) -> Response {
        Response {
            status_code,
            body: self.body,
            headers: self.headers,
            error: None,
        }
    }
}

/// One reusable network connection.
///
/// A transport is owned by the pool and lent to exactly one task at a time; it is
/// never shared. Native resources are released when it is dropped.
#[async_trait]
pub trait Transport: Send {
    /// Perform `request`, streaming body and headers into `sink`.
    /// Returns the HTTP status on transport success.
    async fn perform(
        &mut self,
        request: &Request,
        sink: &mut TransferSink,
    ) -> Result<i64, TransportError>;
}

/// Builds the connections a pool is initialized with
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Transport>, TransportError>;
}

/// Transport backed by a dedicated `reqwest` client
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a connection with the fixed transport policy.
    ///
    /// TLS connections offer `h2` and `http/1.1` through ALPN (`native-tls-alpn`),
    /// so HTTP/2 is used wherever the server accepts it.
    pub fn new(resolver: &ResolverHandle) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .tcp_nodelay(true)
            .pool_max_idle_per_host(1)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .dns_resolver(resolver.resolver())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(
        &mut self,
        request: &Request,
        sink: &mut TransferSink,
    ) -> Result<i64, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if request.method == Method::Post {
            // A Vec body has a known length, so Content-Length is always sent
            builder = builder.body(request.body.clone().unwrap_or_default());
        }

        let mut response = builder.send().await?;
        let status = i64::from(response.status().as_u16());

        // Headers arrive already parsed, with names lowercased by `http`; they are
        // replayed as raw lines so every transport shares one header sink.
        for (name, value) in response.headers() {
            let line = format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
            sink.header_line(&line);
        }

        while let Some(chunk) = response.chunk().await? {
            sink.write_body(&chunk);
        }

        Ok(status)
    }
}

/// Factory for [`HttpTransport`] connections sharing the process-wide DNS cache
pub struct HttpTransportFactory {
    resolver: ResolverHandle,
}

impl HttpTransportFactory {
    pub fn new() -> Self {
        Self {
            resolver: resolver::acquire(),
        }
    }

    pub fn shared() -> Arc<dyn TransportFactory> {
        Arc::new(Self::new())
    }
}

impl Default for HttpTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(HttpTransport::new(&self.resolver)?))
    }
}
