//! Scripted transports for driving the engine without a network

#![allow(dead_code)]

use arber_http::http::{Request, TransferSink, Transport, TransportError, TransportFactory};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock connections observed
#[derive(Default)]
pub struct Probe {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub performed: Mutex<Vec<String>>,
}

impl Probe {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn performed(&self) -> Vec<String> {
        self.performed.lock().unwrap().clone()
    }
}

/// Builds connections that answer every request with a fixed status and body.
///
/// URLs containing `/fail` produce a transport error and URLs containing
/// `/panic` panic mid-transfer. POST requests echo their body.
pub struct MockFactory {
    pub probe: Arc<Probe>,
    status: i64,
    body: Vec<u8>,
    delay: Duration,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(Probe::default()),
            status: 200,
            body: b"{}".to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(mut self, status: i64) -> Self {
        self.status = status;
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl TransportFactory for MockFactory {
    fn create(&self) -> Result<Box<dyn Transport>, TransportError> {
        self.probe.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockTransport {
            probe: self.probe.clone(),
            status: self.status,
            body: self.body.clone(),
            delay: self.delay,
        }))
    }
}

struct MockTransport {
    probe: Arc<Probe>,
    status: i64,
    body: Vec<u8>,
    delay: Duration,
}

#[async_trait]
impl Transport for MockTransport {
    async fn perform(
        &mut self,
        request: &Request,
        sink: &mut TransferSink,
    ) -> Result<i64, TransportError> {
        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.probe.performed.lock().unwrap().push(request.url.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);

        if request.url.contains("/panic") {
            panic!("transport blew up");
        }
        if request.url.contains("/fail") {
            return Err(TransportError::new("mock connection refused"));
        }

        sink.header_line("Content-Type: application/json\r\n");
        sink.header_line(&format!("X-Request-Url: {}", request.url));
        match &request.body {
            Some(body) => sink.write_body(body),
            None => sink.write_body(&self.body),
        };
        Ok(self.status)
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.probe.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}
