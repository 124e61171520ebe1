use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to encode model artifact")]
    Encode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to decode model artifact '{0}'")]
    Decode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to read model artifact '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write model artifact '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to list artifact directory '{0}'")]
    ListDir(PathBuf, #[source] std::io::Error),

    #[error("Artifact '{path}' has format {found}, expected {expected}")]
    FormatMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("Artifact version {version} already exists at '{path}'")]
    VersionExists { version: u32, path: PathBuf },

    #[error("No model artifact found in '{0}'")]
    NoArtifact(PathBuf),
}
