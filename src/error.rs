use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovrepError {
    #[error("line number must be positive, got {0}")]
    InvalidLineNumber(u32),

    #[error("invalid line value: {0}")]
    InvalidLineValue(String),

    #[error("line {0} is already tracked")]
    DuplicateLine(u32),

    #[error("path already present in report: {0}")]
    DuplicatePath(String),

    #[error("malformed diff section: {0}")]
    MalformedDiff(String),

    #[error("diff segments out of order or overlapping at old line {0}")]
    OverlappingSegments(u32),

    #[error("invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unsupported report format version {0}")]
    UnsupportedVersion(u32),

    #[error("line session references unknown session id {0}")]
    UnknownSession(u32),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CovrepError>;
