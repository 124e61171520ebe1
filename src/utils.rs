use crate::error::RainfallError;
use log::info;
use std::io;
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "rainfall";

pub fn get_data_dir() -> Result<PathBuf, RainfallError> {
    dirs::data_local_dir()
        .ok_or(RainfallError::DataDirResolution)
        .map(|p| p.join(DATA_DIR_NAME))
}

pub fn ensure_dir_exists(path: &Path) -> Result<(), RainfallError> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(RainfallError::DataDirCreation(
                    path.to_path_buf(),
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "path exists but is not a directory",
                    ),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating data directory: {}", path.display());
            std::fs::create_dir_all(path)
                .map_err(|e| RainfallError::DataDirCreation(path.to_path_buf(), e))
        }
        Err(e) => Err(RainfallError::DataDirCreation(path.to_path_buf(), e)),
    }
}
