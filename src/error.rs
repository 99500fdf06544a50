use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    Conflict,

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("archive unreadable: {0}")]
    ArchiveCorrupt(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
