//! Error types for the collision engine
//!
//! Load-time operations (config parsing, geometry registration) return these
//! errors so a terrain load can be aborted cleanly. Tick-time queries never
//! fail; they report contact through `bool`/`Option` return values.

use thiserror::Error;

/// Errors raised while loading configuration streams.
///
/// Every variant is fatal for the load that produced it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Standard I/O error while reading a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure (collision config, terrain objects).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The `[general]` section declares a version other than the supported one.
    #[error("ground model config version {found:?} is not supported (expected {expected})")]
    VersionMismatch { found: Option<i32>, expected: i32 },

    /// A recognised key carries a value that cannot be parsed.
    #[error("line {line}: invalid value '{value}' for '{key}' in section [{section}]")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        line: usize,
    },

    /// A line is neither a section header, a comment nor a `key = value` pair.
    #[error("line {line}: cannot parse '{text}'")]
    Syntax { line: usize, text: String },

    /// A ground model violates its parameter invariants after resolution.
    #[error("ground model '{name}' is invalid: {reason}")]
    InvalidGroundModel { name: String, reason: String },

    /// One of the distinguished default ground models was never declared.
    #[error("default ground model '{0}' is not registered")]
    MissingDefaultModel(String),
}

/// Errors raised while registering static collision geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// Triangle normal is shorter than the degeneracy epsilon.
    #[error("degenerate collision triangle (|n| = {normal_length})")]
    DegenerateTriangle { normal_length: f32 },

    /// Box extents are not ordered component-wise.
    #[error("collision box has lo > hi on at least one axis")]
    InvertedBox,

    /// Box indices must stay below the triangle index base of the hash.
    #[error("too many collision boxes (limit {limit})")]
    TooManyBoxes { limit: usize },

    /// Triangle indices must fit the hash element encoding.
    #[error("too many collision triangles (limit {limit})")]
    TooManyTriangles { limit: usize },

    /// A mesh index buffer references a vertex that does not exist.
    #[error("mesh index {index} out of range ({vertex_count} vertices)")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Errors reported by user event handlers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EventError {
    /// The script callback behind `handler` failed.
    #[error("event handler {handler} failed: {message}")]
    Handler { handler: i32, message: String },
}

impl EventError {
    /// Convenience constructor for handler failures.
    pub fn handler<S: Into<String>>(handler: i32, message: S) -> Self {
        Self::Handler {
            handler,
            message: message.into(),
        }
    }
}
