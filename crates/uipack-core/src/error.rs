use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UiPackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Missing atlas image: {0}")]
    MissingAtlas(PathBuf),
    #[error("Export path exists but is not a directory: {0}")]
    InvalidOutput(PathBuf),
    #[error("Atlas tile ({col}, {row}) is outside the atlas")]
    TileOutOfBounds { col: u32, row: u32 },
    #[error("Atlas layout does not map module '{0}'")]
    UnknownModule(String),
    #[error("Encoding error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, UiPackError>;
