use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for the upload and listing flows.
///
/// "Container already exists" is deliberately not represented here: it is an
/// expected condition reported through [`crate::client::ContainerStatus`],
/// not an error.
#[derive(Debug, Error)]
pub enum Error {
    /// A required environment variable is absent or empty.
    #[error("AZURE_STORAGE_ACCOUNT_NAME or AZURE_STORAGE_SAS_TOKEN environment variables not set")]
    MissingConfig,

    /// The local file slated for upload does not exist.
    #[error("File does not exist: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// The local file vanished or became unreadable after the existence check.
    #[error("failed to read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The account name does not yield a parseable endpoint URL.
    #[error("invalid storage endpoint for account '{account}': {source}")]
    InvalidEndpoint {
        account: String,
        #[source]
        source: url::ParseError,
    },

    /// The endpoint URL cannot carry request path segments.
    #[error("endpoint '{endpoint}' does not accept path segments")]
    EndpointNotABase { endpoint: String },

    /// The request never produced a usable response.
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The storage service answered with a non-success status.
    #[error("{operation} failed: HTTP {status}: {message}")]
    Service {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The service response could not be decoded.
    #[error("failed to decode {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ACCOUNT_ENV_VAR, SAS_TOKEN_ENV_VAR};

    #[test]
    fn missing_config_names_both_variables() {
        let message = Error::MissingConfig.to_string();
        assert!(message.contains(ACCOUNT_ENV_VAR));
        assert!(message.contains(SAS_TOKEN_ENV_VAR));
    }

    #[test]
    fn file_not_found_keeps_contractual_wording() {
        let err = Error::FileNotFound {
            path: PathBuf::from("missing.bin"),
        };
        assert_eq!(err.to_string(), "File does not exist: missing.bin");
    }

    #[test]
    fn service_error_reports_operation_and_status() {
        let err = Error::Service {
            operation: "create container",
            status: 403,
            message: "AuthenticationFailed".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "create container failed: HTTP 403: AuthenticationFailed"
        );
    }
}
