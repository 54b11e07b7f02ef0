use std::path::PathBuf;
use thiserror::Error;

/// Failure of a throughput or capacity probe against one directory.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to create benchmark file in {path}: {source}")]
    CreateScratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write benchmark data to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to sync benchmark file in {path}: {source}")]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stat filesystem at {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid throughput measurement for {path}: {mbps} MB/s")]
    InvalidMeasurement { path: PathBuf, mbps: f64 },
}

impl ProbeError {
    pub fn create_scratch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateScratch {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn sync(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Sync {
            path: path.into(),
            source,
        }
    }

    pub fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }

    /// Directory the failing probe ran against.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::CreateScratch { path, .. }
            | Self::Write { path, .. }
            | Self::Sync { path, .. }
            | Self::Stat { path, .. }
            | Self::InvalidMeasurement { path, .. } => path,
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("workspace configuration error: {reason}")]
    Config { reason: String },

    #[error("no workspaces available")]
    NoWorkspaces,

    #[error("no workspace has sufficient space for a {file_size} byte file")]
    Selection { file_size: u64 },

    #[error("failed to create temp file in {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl WorkspaceError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("invalid config value: {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
