use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("cannot open database {path}")]
    Connection {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("schema setup failed")]
    Schema(#[source] rusqlite::Error),

    #[error("cannot read bibliography directory {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("failed to import entry {key}")]
    Write {
        key: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("report query failed")]
    Report(#[source] rusqlite::Error),

    #[error("cannot render report as JSON")]
    Render(#[source] serde_json::Error),

    #[error("export to {} failed", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Fatal categories get distinct process exit codes.
    pub fn status_code(&self) -> u8 {
        match self {
            AppError::Connection { .. } => 2,
            AppError::Schema(_) => 3,
            AppError::Read { .. } => 4,
            AppError::Parse { .. } => 4,
            AppError::Write { .. } => 5,
            AppError::Report(_) | AppError::Render(_) => 6,
            AppError::Export { .. } => 7,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status_code())
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
