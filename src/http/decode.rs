use serde::de::DeserializeOwned;

use super::error::EngineError;
use super::types::Response;

/// Map a non-2xx response to the matching failure.
///
/// The message prefers the transport diagnostic and falls back to the body text.
pub fn check_status(response: &Response) -> Result<(), EngineError> {
    if response.is_success() {
        return Ok(());
    }
    if response.is_pool_exhausted() {
        return Err(EngineError::PoolExhausted);
    }

    let detail = match response.error.as_deref() {
        Some(error) if !error.is_empty() => error.to_string(),
        _ => response.text().into_owned(),
    };

    if response.is_transport_failure() {
        Err(EngineError::Transport(detail))
    } else {
        Err(EngineError::Http {
            status: response.status_code,
            detail,
        })
    }
}

/// Decode a successful response body as JSON into `T`
pub fn decode_response<T: DeserializeOwned>(response: &Response) -> Result<T, EngineError> {
    check_status(response)?;
    serde_json::from_slice(&response.body).map_err(|e| {
        EngineError::Decode(format!(
            "failed to decode {} from response body: {}",
            std::any::type_name::<T>(),
            e
        ))
    })
}
