use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::StackError;
use crate::intrinsic;

/// ECR repository the asset publisher pushes images to.
pub const CONTAINER_ASSETS_REPOSITORY: &str = "fargate-nodejs-container-assets";

/// A docker image built from a local directory at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerImageAsset {
    /// SHA-256 of the build context, platform and build arguments
    pub hash: String,
    pub directory: PathBuf,
    /// Docker platform, e.g. `linux/arm64`
    pub platform: String,
    pub build_args: IndexMap<String, String>,
}

impl DockerImageAsset {
    /// Fingerprint `directory` and describe the image to build from it.
    pub fn from_directory(
        directory: &Path,
        platform: &str,
        build_args: IndexMap<String, String>,
    ) -> Result<Self, StackError> {
        let mut hasher = Sha256::new();
        hash_directory(directory, &mut hasher)?;
        hasher.update(platform.as_bytes());
        hasher.update(b"\0");
        for (key, value) in &build_args {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }

        Ok(Self {
            hash: format!("{:x}", hasher.finalize()),
            directory: directory.to_path_buf(),
            platform: platform.to_owned(),
            build_args,
        })
    }

    /// Image URI the task definition references.
    pub fn image_uri(&self) -> Value {
        intrinsic::sub(format!(
            "${{{account}}}.dkr.ecr.${{{region}}}.${{{suffix}}}/{repo}:{tag}",
            account = intrinsic::ACCOUNT_ID,
            region = intrinsic::REGION,
            suffix = intrinsic::URL_SUFFIX,
            repo = CONTAINER_ASSETS_REPOSITORY,
            tag = self.hash,
        ))
    }

    /// Entry for the `dockerImages` section of the asset manifest.
    pub fn manifest_entry(&self) -> Value {
        json!({
            "source": {
                "directory": self.directory.display().to_string(),
                "platform": self.platform,
                "dockerBuildArgs": self.build_args,
            },
            "destinations": {
                "current_account-current_region": {
                    "repositoryName": CONTAINER_ASSETS_REPOSITORY,
                    "imageTag": self.hash,
                }
            }
        })
    }
}

/// Feed every regular file under `root`, in sorted path order, into the
/// hasher as `<relative path>\0<content length><content>`.
fn hash_directory(root: &Path, hasher: &mut Sha256) -> Result<(), StackError> {
    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| StackError::AssetWalk {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        // Walked entries always sit under the walk root.
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let content = std::fs::read(path).map_err(|e| StackError::AssetHash {
            path: path.to_path_buf(),
            source: e,
        })?;

        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(&content);
    }
    Ok(())
}
