//! Error types for the risk-assessment engine and its service boundary.
//!
//! Only an unknown material key stops a request outright. Everything the HTTP
//! layer rejects is a [`RequestError`], and faults in the qualitative guidance
//! are [`AlertError`]s that the composer recovers from locally.

use thiserror::Error;

/// Errors that prevent an assessment from producing scores.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssessmentError {
    /// The material key is not one of the catalog's supported materials.
    #[error("Invalid material type: {0}")]
    UnknownMaterial(String),

    /// A profile band has zero width, so deviations cannot be normalized.
    #[error("Degenerate {field} range for {material}: min and max are equal")]
    DegenerateRange { material: String, field: &'static str },
}

/// Integrity faults detected while building the material catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// A band is zero-width or inverted.
    #[error("Invalid {field} range for {material}: [{min}, {max}]")]
    DegenerateRange {
        material: String,
        field: &'static str,
        min: f64,
        max: f64,
    },

    /// The nominal speed ceiling must be strictly positive.
    #[error("Invalid max speed for {material}: {max_speed} mm/s")]
    NonPositiveMaxSpeed { material: String, max_speed: f64 },
}

/// Faults raised while composing alerts; recovered inside `assess`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    /// A parameter consulted by the alert rules is NaN or infinite.
    #[error("Parameter '{field}' is not a finite number")]
    NonFiniteInput { field: &'static str },
}

/// Errors related to configuration and application setup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid configuration values provided.
    #[error("Invalid value '{value}' for {var_name}: {reason}")]
    InvalidValue {
        var_name: &'static str,
        value: String,
        reason: String,
    },
}

/// Rejections produced while turning an HTTP request into print parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    /// The body is not a JSON object.
    #[error("Invalid JSON format")]
    InvalidJson,

    /// One or more required fields are absent.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// A field is present but has the wrong type.
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// The declared body exceeds the configured limit.
    #[error("Request body of {size} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { size: usize, limit: usize },

    /// The request line and headers do not fit in the head limit.
    #[error("Request header exceeds the {limit} byte limit")]
    HeaderTooLarge { limit: usize },
}

impl RequestError {
    /// HTTP status used when the request is rejected with this error.
    pub fn status(&self) -> u16 {
        match self {
            RequestError::BodyTooLarge { .. } => 413,
            RequestError::HeaderTooLarge { .. } => 431,
            _ => 400,
        }
    }
}
