//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use satchel_domain::SatchelError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SatchelError);

impl From<InfraError> for SatchelError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SatchelError> for InfraError {
    fn from(value: SatchelError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSatchelError {
    fn into_satchel(self) -> SatchelError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SatchelError */
/* -------------------------------------------------------------------------- */

impl IntoSatchelError for HttpError {
    fn into_satchel(self) -> SatchelError {
        if self.is_timeout() {
            return SatchelError::Timeout("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SatchelError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => SatchelError::NotFound(message),
                400..=499 => SatchelError::InvalidInput(message),
                _ => SatchelError::Network(message),
            };
        }

        SatchelError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_satchel())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → SatchelError */
/* -------------------------------------------------------------------------- */

impl IntoSatchelError for std::io::Error {
    fn into_satchel(self) -> SatchelError {
        match self.kind() {
            std::io::ErrorKind::NotFound => {
                SatchelError::NotFound(format!("file not found: {self}"))
            }
            _ => SatchelError::Storage(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_satchel())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → SatchelError */
/* -------------------------------------------------------------------------- */

impl IntoSatchelError for serde_json::Error {
    fn into_satchel(self) -> SatchelError {
        SatchelError::Serialization(self.to_string())
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_satchel())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
