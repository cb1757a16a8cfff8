use std::path::{Path, PathBuf};

/// Directory inside the project root holding ejected build files.
pub const EJECT_DIR: &str = ".fargate";

/// Ejects the Dockerfile into the project directory.
///
/// After ejecting, bundling copies `.fargate/Dockerfile` into the build
/// context instead of generating one.
pub fn eject(project_root: &Path, dockerfile_content: &str) -> Result<PathBuf, EjectError> {
    let eject_dir = project_root.join(EJECT_DIR);
    std::fs::create_dir_all(&eject_dir).map_err(|e| EjectError::CreateDir {
        path: eject_dir.clone(),
        source: e,
    })?;

    let dockerfile_path = ejected_dockerfile_path(project_root);
    if dockerfile_path.exists() {
        return Err(EjectError::AlreadyEjected(dockerfile_path));
    }

    std::fs::write(&dockerfile_path, dockerfile_content).map_err(|e| EjectError::Write {
        path: dockerfile_path.clone(),
        source: e,
    })?;

    Ok(dockerfile_path)
}

pub fn ejected_dockerfile_path(project_root: &Path) -> PathBuf {
    project_root.join(EJECT_DIR).join("Dockerfile")
}

/// Check if the project has an ejected Dockerfile.
pub fn is_ejected(project_root: &Path) -> bool {
    ejected_dockerfile_path(project_root).exists()
}

/// Load ejected Dockerfile content.
pub fn load_ejected_dockerfile(project_root: &Path) -> Result<String, EjectError> {
    let path = ejected_dockerfile_path(project_root);
    std::fs::read_to_string(&path).map_err(|e| EjectError::Read { path, source: e })
}

#[derive(Debug, thiserror::Error)]
pub enum EjectError {
    #[error("failed to create .fargate directory at {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Dockerfile already ejected at {0}; edit directly or delete to re-eject")]
    AlreadyEjected(PathBuf),
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read ejected Dockerfile at {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}
