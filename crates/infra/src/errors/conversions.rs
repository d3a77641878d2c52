//! Conversions from external infrastructure errors into domain errors.

use portico_domain::PorticoError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub PorticoError);

impl From<InfraError> for PorticoError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<PorticoError> for InfraError {
    fn from(value: PorticoError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoPorticoError {
    fn into_portico(self) -> PorticoError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → PorticoError */
/* -------------------------------------------------------------------------- */

impl IntoPorticoError for HttpError {
    fn into_portico(self) -> PorticoError {
        if self.is_timeout() {
            return PorticoError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return PorticoError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => PorticoError::Auth(message),
                404 => PorticoError::NotFound(message),
                400..=499 => PorticoError::InvalidInput(message),
                _ => PorticoError::Network(message),
            };
        }

        PorticoError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_portico())
    }
}
