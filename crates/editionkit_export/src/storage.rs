//! Artifact storage seam and a filesystem implementation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use md5::{Digest, Md5};

use crate::conf::{C_ARTIFACT_EXTENSION, C_ARTIFACT_SUBDIR};
use crate::spec::{ExportError, SpecArtifactLocation};

/// Destination for serialized workbooks.
pub trait ArtifactStorage {
    /// Persist `bytes` under `file_name` and return where they landed.
    fn write_artifact(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<SpecArtifactLocation, ExportError>;

    /// Remove a previously written artifact. A missing file is not an error.
    fn delete_artifact(&self, location: &SpecArtifactLocation) -> Result<(), ExportError>;

    /// Where an artifact named `file_name` is (or would be) stored.
    fn locate_artifact(&self, file_name: &str) -> SpecArtifactLocation;
}

impl<A: ArtifactStorage + ?Sized> ArtifactStorage for &A {
    fn write_artifact(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<SpecArtifactLocation, ExportError> {
        (**self).write_artifact(bytes, file_name)
    }

    fn delete_artifact(&self, location: &SpecArtifactLocation) -> Result<(), ExportError> {
        (**self).delete_artifact(location)
    }

    fn locate_artifact(&self, file_name: &str) -> SpecArtifactLocation {
        (**self).locate_artifact(file_name)
    }
}

/// Stores artifacts under `<dir_base>/export-edition-protocol/`.
#[derive(Debug, Clone)]
pub struct FsArtifactStorage {
    dir_base: PathBuf,
    url_base: String,
}

impl FsArtifactStorage {
    /// `dir_base` is the uploads root; `url_base` its public URL.
    pub fn new(dir_base: impl Into<PathBuf>, url_base: impl Into<String>) -> Self {
        Self {
            dir_base: dir_base.into(),
            url_base: url_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Directory artifacts are written to.
    pub fn dir_artifacts(&self) -> PathBuf {
        self.dir_base.join(C_ARTIFACT_SUBDIR)
    }

    fn derive_url(&self, file_name: &str) -> String {
        format!("{}/{C_ARTIFACT_SUBDIR}/{file_name}", self.url_base)
    }
}

impl ArtifactStorage for FsArtifactStorage {
    fn write_artifact(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<SpecArtifactLocation, ExportError> {
        let dir_artifacts = self.dir_artifacts();
        fs::create_dir_all(&dir_artifacts).map_err(|e| ExportError::Io {
            path: dir_artifacts.clone(),
            source: e,
        })?;

        let location = self.locate_artifact(file_name);
        let path_dst = location.path.clone();
        let path_part = derive_part_path(&path_dst);
        if let Err(e) = fs::write(&path_part, bytes) {
            remove_quietly(&path_part);
            return Err(ExportError::Io {
                path: path_part,
                source: e,
            });
        }
        if let Err(e) = fs::rename(&path_part, &path_dst) {
            remove_quietly(&path_part);
            return Err(ExportError::Io {
                path: path_dst,
                source: e,
            });
        }
        debug!("wrote artifact {} ({} bytes)", path_dst.display(), bytes.len());
        Ok(location)
    }

    fn delete_artifact(&self, location: &SpecArtifactLocation) -> Result<(), ExportError> {
        match fs::remove_file(&location.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ExportError::Io {
                path: location.path.clone(),
                source: e,
            }),
        }
    }

    fn locate_artifact(&self, file_name: &str) -> SpecArtifactLocation {
        SpecArtifactLocation {
            path: self.dir_artifacts().join(file_name),
            url: self.derive_url(file_name),
        }
    }
}

/// Artifact file name: hex md5 of the year followed by the unix time.
pub fn derive_artifact_file_name(year: i32, n_unix_time: i64) -> String {
    let digest = Md5::digest(format!("{year}{n_unix_time}").as_bytes());
    format!("{}.{C_ARTIFACT_EXTENSION}", hex::encode(digest))
}

fn derive_part_path(path_dst: &Path) -> PathBuf {
    let mut c_name = path_dst.as_os_str().to_os_string();
    c_name.push(".part");
    PathBuf::from(c_name)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != ErrorKind::NotFound
    {
        warn!("failed to remove partial artifact {}: {e}", path.display());
    }
}
