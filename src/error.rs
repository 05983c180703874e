use std::path::PathBuf;

use thiserror::Error;

use crate::geometry::Rect;

pub type PrepResult<T> = Result<T, PrepError>;

/// Errors raised while preparing figures.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("failed to decode image {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write image {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("file I/O error: {path}")]
    FileIO {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("crop region {region} does not overlap the {width}x{height} image")]
    EmptyCrop { region: Rect, width: u32, height: u32 },

    #[error("file name {name} has no trailing sequence number")]
    MissingSequence { name: String },

    #[error("sequence number {number} with offset {offset} is negative")]
    NegativeSequence { number: i64, offset: i64 },

    #[error("sequence number {number} with offset {offset} does not fit in 64 bits")]
    SequenceOverflow { number: i64, offset: i64 },

    #[error("not cropped in this run: {path}")]
    NotCropped { path: PathBuf },

    #[error("index {index} is out of range for {len} images")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("interactive window failed: {0}")]
    Ui(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PrepError {
    pub fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    pub fn encode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Encode {
            path: path.into(),
            source,
        }
    }

    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIO {
            path: path.into(),
            source,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
