use std::path::PathBuf;

pub type PackResult<T> = Result<T, PackError>;

#[derive(thiserror::Error, Debug)]
pub enum PackError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid dimension error: color size {width}x{height} must be positive")]
    InvalidDimension { width: u32, height: u32 },

    #[error("decode error: '{}': {message}", path.display())]
    Decode { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload too large: {len} bytes plus the 8-byte box header exceeds u32::MAX")]
    PayloadTooLarge { len: u64 },

    #[error("format error: {0}")]
    Format(String),

    #[error("process failure: '{program}' exited with {status}: {stderr}")]
    Process {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{failed} of {total} frame(s) failed, first failure: {first}")]
    Aggregated {
        failed: u64,
        total: u64,
        first: Box<PackError>,
    },

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PackError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// The first recorded failure when this is an aggregate, otherwise `self`.
    pub fn root(&self) -> &PackError {
        match self {
            Self::Aggregated { first, .. } => first.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for PackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}
