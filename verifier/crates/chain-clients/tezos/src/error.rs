use reqwest::StatusCode;
use verifier_chain_client_interface::ChainClientError;

/// Map a transport error onto the shared chain error, keeping the
/// retryable/non-retryable split intact.
pub fn from_reqwest_error(operation: impl Into<String>, source: reqwest::Error) -> ChainClientError {
    let operation = operation.into();

    if source.is_timeout() || source.is_connect() || source.is_request() {
        let message = if source.is_timeout() {
            "request timed out".to_string()
        } else if source.is_connect() {
            format!("connection failed: {}", source)
        } else {
            format!("request failed: {}", source)
        };
        ChainClientError::NetworkError { operation, message }
    } else if let Some(status) = source.status() {
        ChainClientError::ApiError { operation, status: status.as_u16(), message: source.to_string() }
    } else if source.is_decode() {
        ChainClientError::ParseError { operation, message: source.to_string() }
    } else {
        ChainClientError::NetworkError { operation, message: source.to_string() }
    }
}

pub fn api_error(operation: impl Into<String>, status: StatusCode, message: impl Into<String>) -> ChainClientError {
    ChainClientError::ApiError { operation: operation.into(), status: status.as_u16(), message: message.into() }
}

pub fn parse_error(operation: impl Into<String>, message: impl Into<String>) -> ChainClientError {
    ChainClientError::ParseError { operation: operation.into(), message: message.into() }
}
