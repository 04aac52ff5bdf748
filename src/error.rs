#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("channel {channel} out of range; family has {count} channels")]
    InvalidChannel { channel: usize, count: usize },

    #[error("unknown satellite family: {0}")]
    UnknownFamily(String),

    /// Named pixel-start variant is not present in the offset table.
    #[error("unknown pixel offset variant: {0}")]
    UnknownVariant(String),

    #[error("invalid offset table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("raster shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
