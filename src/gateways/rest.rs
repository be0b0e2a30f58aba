use serde::de::DeserializeOwned;

use super::{GatewayError, GATEWAY_POOL_SIZE};
use crate::http::{AsyncHttpEngine, Headers, ShutdownReport};

/// A venue's REST base URL plus the engine its requests run on
pub struct RestEndpoint {
    base_url: String,
    engine: AsyncHttpEngine,
}

impl RestEndpoint {
    /// Start an engine with [`GATEWAY_POOL_SIZE`] connections for `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_engine(base_url, AsyncHttpEngine::new(), GATEWAY_POOL_SIZE)
    }

    /// Use a caller supplied engine, initializing it with `pool_size` connections
    pub fn with_engine(
        base_url: impl Into<String>,
        engine: AsyncHttpEngine,
        pool_size: usize,
    ) -> Result<Self, GatewayError> {
        engine.initialize(pool_size)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            engine,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn engine(&self) -> &AsyncHttpEngine {
        &self.engine
    }

    /// GET `{base_url}{path}` and decode the JSON body
    pub async fn get_json<T>(&self, path: &str, headers: Headers) -> Result<T, GatewayError>
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        let url = format!("{}{}", self.base_url, path);
        let payload = self.engine.submit_get_typed::<T>(url, headers).wait().await?;
        Ok(payload)
    }

    pub async fn shutdown(&self) -> ShutdownReport {
        self.engine.shutdown().await
    }
}

/// Headers sent with every book request
pub fn json_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("Accept".to_string(), "application/json".to_string());
    headers
}
