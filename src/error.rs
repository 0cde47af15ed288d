//! Error and warning types for the scene translator.

use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for bundle loading and manifest writing.
///
/// The translation core never fails with this type: missing or malformed
/// source data is skipped and reported through [`ExportWarning`].
#[derive(Error, Debug)]
pub enum ExportError {
    /// Failed to read or parse a ZIP archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read, decode or encode an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bundle has no scene description or an invalid layout.
    #[error("Invalid scene bundle: {0}")]
    InvalidBundle(String),

    /// A bitmap referenced by a baked image has no pixel data.
    #[error("Missing bitmap: {0}")]
    MissingBitmap(String),
}

/// Structural problems that make a single mesh unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// `sum(face_vertex_counts)` does not match the face index list.
    #[error("face vertex counts sum to {expected} but {actual} face indices were given")]
    IndexCountMismatch { expected: usize, actual: usize },

    /// A face index points past the end of the position array.
    #[error("face index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Non-fatal conditions surfaced once at the end of an export run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ExportWarning {
    /// A joint kind the rig conversion does not understand.
    #[error("unsupported joint kind '{kind}' on {path}; exported as a static joint")]
    UnsupportedJoint { path: String, kind: String },

    /// A bone transform carries shear that TRS tracks cannot represent.
    #[error("shear in transform of {path} was dropped")]
    Shear { path: String },

    /// A node was skipped because its mesh data was unusable.
    #[error("skipped mesh {path}: {reason}")]
    SkippedMesh { path: String, reason: String },

    /// A mapping layer references a bitmap without pixel data.
    #[error("bitmap '{name}' has no pixel data; layer ignored")]
    MissingBitmap { name: String },

    /// A mesh references a joint that is not part of any exported skeleton.
    #[error("mesh {path} references a joint outside every skeleton; skin dropped")]
    UnresolvedJoint { path: String },

    /// A reference node points at a node that was never exported.
    #[error("reference {path} points at an unknown node; reference dropped")]
    DanglingReference { path: String },
}
