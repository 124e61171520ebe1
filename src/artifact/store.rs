use crate::artifact::error::ArtifactError;
use crate::training::model::RainfallModel;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Layout version of the artifact file. Bump when [`RainfallModel`] changes shape.
pub const ARTIFACT_FORMAT: u32 = 1;

const EXTENSION: &str = "bin";

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format: u32,
    model: &'a RainfallModel,
}

#[derive(Deserialize)]
struct Artifact {
    format: u32,
    model: RainfallModel,
}

/// Directory of `{prefix}_v{N}.bin` files. Files are written once and never replaced.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    prefix: String,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.to_string(),
        }
    }

    pub fn path_for(&self, version: u32) -> PathBuf {
        self.dir.join(format!("{}_v{}.{}", self.prefix, version, EXTENSION))
    }

    fn parse_version(&self, file_name: &str) -> Option<u32> {
        file_name
            .strip_prefix(&self.prefix)?
            .strip_prefix("_v")?
            .strip_suffix(EXTENSION)?
            .strip_suffix('.')?
            .parse()
            .ok()
    }

    /// Versions present on disk, ascending. A missing directory has none.
    pub fn versions(&self) -> Result<Vec<u32>, ArtifactError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ArtifactError::ListDir(self.dir.clone(), e)),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ArtifactError::ListDir(self.dir.clone(), e))?;
            if let Some(version) = entry.file_name().to_str().and_then(|n| self.parse_version(n)) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    pub fn latest_version(&self) -> Result<Option<u32>, ArtifactError> {
        Ok(self.versions()?.last().copied())
    }

    pub fn next_version(&self) -> Result<u32, ArtifactError> {
        Ok(self.latest_version()?.map_or(1, |v| v + 1))
    }

    /// Writes `model` as version `model.version` through a temp file in the same
    /// directory, failing if that version already exists.
    pub fn save(&self, model: &RainfallModel) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(model.version);
        if path.exists() {
            return Err(ArtifactError::VersionExists {
                version: model.version,
                path,
            });
        }
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ArtifactError::Write(self.dir.clone(), e))?;

        let bytes = bincode::serde::encode_to_vec(
            ArtifactRef {
                format: ARTIFACT_FORMAT,
                model,
            },
            BINCODE_CONFIG,
        )
        .map_err(|e| ArtifactError::Encode(Box::new(e)))?;

        let mut temp_file =
            NamedTempFile::new_in(&self.dir).map_err(|e| ArtifactError::Write(path.clone(), e))?;
        temp_file
            .write_all(&bytes)
            .and_then(|_| temp_file.flush())
            .map_err(|e| ArtifactError::Write(path.clone(), e))?;
        temp_file.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                ArtifactError::VersionExists {
                    version: model.version,
                    path: path.clone(),
                }
            } else {
                ArtifactError::Write(path.clone(), e.error)
            }
        })?;

        info!("Saved model v{} ({} bytes) to {}", model.version, bytes.len(), path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<RainfallModel, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|e| ArtifactError::Read(path.to_path_buf(), e))?;
        let decode_err =
            |e: bincode::error::DecodeError| ArtifactError::Decode(path.to_path_buf(), Box::new(e));

        let (format, _) =
            bincode::serde::decode_from_slice::<u32, _>(&bytes, BINCODE_CONFIG).map_err(decode_err)?;
        if format != ARTIFACT_FORMAT {
            return Err(ArtifactError::FormatMismatch {
                path: path.to_path_buf(),
                expected: ARTIFACT_FORMAT,
                found: format,
            });
        }
        let (artifact, _) =
            bincode::serde::decode_from_slice::<Artifact, _>(&bytes, BINCODE_CONFIG)
                .map_err(decode_err)?;
        debug!(
            "Loaded model v{} (format {}) from {}",
            artifact.model.version,
            artifact.format,
            path.display()
        );
        Ok(artifact.model)
    }

    /// Loads the highest version on disk.
    pub fn load_latest(&self) -> Result<RainfallModel, ArtifactError> {
        let version = self
            .latest_version()?
            .ok_or_else(|| ArtifactError::NoArtifact(self.dir.clone()))?;
        Self::load(&self.path_for(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::model::tests::{scenario, small_config, synthetic_engineered};
    use crate::training::train;

    fn model(version: u32) -> Result<RainfallModel, Box<dyn std::error::Error>> {
        let df = synthetic_engineered(200)?;
        Ok(train(&df, &small_config(), 42, version)?.0)
    }

    #[test]
    fn save_load_predict_is_identical() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let store = ModelStore::new(tmp.path(), "rainfall_model");
        let model = model(1)?;

        let path = store.save(&model)?;
        assert_eq!(path, tmp.path().join("rainfall_model_v1.bin"));

        let loaded = ModelStore::load(&path)?;
        assert_eq!(loaded, model);
        assert_eq!(loaded.predict(&scenario())?, model.predict(&scenario())?);
        Ok(())
    }

    #[test]
    fn versions_are_never_overwritten() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let store = ModelStore::new(tmp.path(), "rainfall_model");
        let model = model(1)?;
        store.save(&model)?;

        let result = store.save(&model);
        assert!(matches!(result, Err(ArtifactError::VersionExists { version: 1, .. })));
        Ok(())
    }

    #[test]
    fn latest_is_highest_version() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let store = ModelStore::new(tmp.path(), "rainfall_model");
        assert_eq!(store.next_version()?, 1);
        assert!(matches!(store.load_latest(), Err(ArtifactError::NoArtifact(_))));

        let base = model(2)?;
        store.save(&base)?;
        store.save(&RainfallModel {
            version: 10,
            ..base.clone()
        })?;
        std::fs::write(tmp.path().join("rainfall_model_vX.bin"), b"junk")?;
        std::fs::write(tmp.path().join("other_v99.bin"), b"junk")?;

        assert_eq!(store.versions()?, vec![2, 10]);
        assert_eq!(store.next_version()?, 11);
        assert_eq!(store.load_latest()?.version, 10);
        Ok(())
    }

    #[test]
    fn foreign_format_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("rainfall_model_v1.bin");
        let bytes = bincode::serde::encode_to_vec(999u32, BINCODE_CONFIG)?;
        std::fs::write(&path, bytes)?;

        match ModelStore::load(&path) {
            Err(ArtifactError::FormatMismatch { found, .. }) => assert_eq!(found, 999),
            other => panic!("expected format mismatch, got {other:?}"),
        }
        Ok(())
    }
}
