use thiserror::Error;

/// Errors surfaced at the boundary of this crate.
///
/// Cancellation is deliberately not a variant here: per the halt contract,
/// observing `halt` mid-render is a normal return with partial output, not a
/// failure (see `render::render`). Allocation failure is not catchable in
/// Rust and is not represented either; it aborts the process.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("invalid region: {0}")]
    InvalidRegion(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
