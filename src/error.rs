use thiserror::Error;

/// Shown for any carrier failure that is not a validation rejection.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while contacting the carrier. Please try again.";

/// Uniform error shape produced by every `CarrierGateway` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CarrierError {
    /// Field-level validation messages returned by the carrier.
    #[error("carrier rejected the request: {}", .0.join(", "))]
    FieldErrors(Vec<String>),
    /// A single descriptive message returned by the carrier.
    #[error("carrier error: {0}")]
    Message(String),
    /// Network failure, timeout, cancellation, or a non-validation HTTP failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl CarrierError {
    /// Collapses the error into the single string shown to the user.
    pub fn display_message(&self) -> String {
        match self {
            CarrierError::FieldErrors(items) if !items.is_empty() => items.join(", "),
            CarrierError::Message(msg) if !msg.trim().is_empty() => msg.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Carrier(#[from] CarrierError),
    #[error("inconsistent workflow state: {0}")]
    InconsistentState(String),
    #[error("another step is already in progress")]
    Busy,
}

impl WorkflowError {
    pub fn display_message(&self) -> String {
        match self {
            WorkflowError::Validation(msg) | WorkflowError::InconsistentState(msg) => msg.clone(),
            WorkflowError::Carrier(err) => err.display_message(),
            WorkflowError::Busy => "Please wait for the current request to finish.".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Carrier(#[from] CarrierError),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_joined_with_comma() {
        let err = CarrierError::FieldErrors(vec!["email invalid".into(), "vin invalid".into()]);
        assert_eq!(err.display_message(), "email invalid, vin invalid");
    }

    #[test]
    fn test_transport_uses_generic_message() {
        let err = CarrierError::Transport("connection refused".into());
        assert_eq!(err.display_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_empty_payloads_fall_back() {
        assert_eq!(
            CarrierError::FieldErrors(vec![]).display_message(),
            GENERIC_FAILURE_MESSAGE
        );
        assert_eq!(
            CarrierError::Message("  ".into()).display_message(),
            GENERIC_FAILURE_MESSAGE
        );
    }

    #[test]
    fn test_workflow_error_wraps_carrier_message() {
        let err: WorkflowError = CarrierError::Message("Quote expired".into()).into();
        assert_eq!(err.display_message(), "Quote expired");
    }
}
