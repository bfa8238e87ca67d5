//! Error types for the layout generation engine.
//!
//! Every fallible operation in this crate returns `Result<T, LayoutError>`.
//! Errors are plain values: generation never panics on bad input, and the two
//! bounded retry loops (BSP split redraw, merge epsilon widening) fall through
//! to one of these variants instead of looping.

/// Errors that can occur while generating or serializing a layout.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// Invalid configuration (e.g. min_room_area > max_room_area).
    /// Reported before any generation starts.
    Config(String),
    /// The algorithm could not satisfy a structural invariant
    /// (connectivity unreachable, resource bound exceeded).
    Generation(String),
    /// Numerical ambiguity that survived epsilon widening, with the
    /// offending coordinates for diagnosis.
    Geometry { message: String, x: f64, y: f64 },
    /// JSON encoding/decoding failure or schema version mismatch.
    Serialization(String),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::Config(msg) => write!(f, "Configuration error: {}", msg),
            LayoutError::Generation(msg) => write!(f, "Generation error: {}", msg),
            LayoutError::Geometry { message, x, y } => {
                write!(f, "Geometry error at ({}, {}): {}", x, y, message)
            }
            LayoutError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for LayoutError {}

impl From<serde_json::Error> for LayoutError {
    fn from(e: serde_json::Error) -> Self {
        LayoutError::Serialization(e.to_string())
    }
}
