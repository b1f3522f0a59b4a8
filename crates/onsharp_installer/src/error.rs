use std::{io, path::PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

use crate::platform::Platform;

/// Every way an install run can end early.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(
        "no server config found at {path:?}: the installer must be placed in the server directory"
    )]
    MissingConfig { path: PathBuf },

    #[error("{platform} is not supported: onsharp only supports windows and linux")]
    UnsupportedPlatform { platform: Platform },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("invalid install manifest: {0}")]
    Parse(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("invalid server config {path:?}: {reason}")]
    ConfigFormat { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Missing config and unsupported platform end the run without it being
    /// a process failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingConfig { .. } | Self::UnsupportedPlatform { .. }
        )
    }
}

#[derive(Debug, Error)]
#[error("request to {url} failed: {kind}")]
pub struct NetworkError {
    pub url: String,
    #[source]
    pub kind: NetworkErrorKind,
}

#[derive(Debug, Error)]
pub enum NetworkErrorKind {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    Status(StatusCode),
}

impl NetworkError {
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self {
            url: url.into(),
            kind: NetworkErrorKind::Transport(source),
        }
    }

    pub fn status(url: impl Into<String>, status: StatusCode) -> Self {
        Self {
            url: url.into(),
            kind: NetworkErrorKind::Status(status),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("malformed archive {archive:?}: {source}")]
    Archive {
        archive: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("archive entry {entry:?} escapes the destination directory")]
    UnsafeEntry { entry: String },
    #[error("archive entry {entry:?} would overwrite the archive being extracted")]
    OverwritesArchive { entry: String },
    #[error("writing {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
