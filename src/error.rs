use thiserror::Error;

/// Errors surfaced by a provisioning run
///
/// Every variant is fatal to the run that produced it; nothing here is retried
/// internally except `NotFound`, and only when the caller opts in through the
/// lookup retry settings.
#[derive(Debug, Error)]
pub enum Error {
  /// A required configuration value is missing or empty
  #[error("Configuration error: {0}")]
  Configuration(String),

  /// The provider session could not be established
  #[error("Unable to authenticate with AWS using profile '{profile}' in '{region}': {message}")]
  Authentication {
    profile: String,
    region: String,
    message: String,
  },

  /// A declared resource spec is malformed
  #[error("Validation error: {0}")]
  Validation(String),

  /// The API rejected a create call
  #[error("Failed to create {resource}: {source}")]
  ResourceCreation {
    resource: String,
    #[source]
    source: Box<Error>,
  },

  /// A policy attachment failed after zero or more earlier attachments succeeded
  ///
  /// Attachments that succeeded are left in place.
  #[error("Failed to attach {failed} to role {role} (attached: [{}]): {source}", .attached.join(", "))]
  PartialAttachment {
    role: String,
    attached: Vec<String>,
    failed: String,
    #[source]
    source: Box<Error>,
  },

  /// The resource is not (yet) visible through the API
  #[error("{resource} not found")]
  NotFound { resource: String },

  /// A lookup response did not carry the expected nested structure
  #[error("Unexpected shape for {resource}: {detail}")]
  ShapeMismatch { resource: String, detail: String },

  /// Raw AWS API failure
  #[error("{operation} failed: {message}")]
  Api { operation: String, message: String },
}

impl Error {
  pub(crate) fn api(operation: &str, message: impl Into<String>) -> Self {
    Error::Api {
      operation: operation.to_string(),
      message: message.into(),
    }
  }

  pub(crate) fn creation(resource: &str, source: Error) -> Self {
    Error::ResourceCreation {
      resource: resource.to_string(),
      source: Box::new(source),
    }
  }

  pub(crate) fn shape(resource: &str, detail: &str) -> Self {
    Error::ShapeMismatch {
      resource: resource.to_string(),
      detail: detail.to_string(),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
