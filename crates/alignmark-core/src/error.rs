use thiserror::Error;

/// Errors raised while building layout geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Unsupported unit '{0}' (expected one of in, mm, um, nm)")]
    UnsupportedUnit(String),

    #[error("Geometry assembly failed: {0}")]
    GeometryAssembly(String),

    #[error("No glyph for character {0:?}")]
    UnsupportedGlyph(char),

    #[error("Cell '{0}' already exists")]
    DuplicateCell(String),

    #[error("Cell '{0}' is not defined in this layout")]
    UnknownCell(String),
}
