//! Node.js project discovery.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

/// File that marks the root of a Node.js project.
pub const PROJECT_MANIFEST: &str = "package.json";

/// Walk from `start` up through its ancestors and return the first directory
/// containing a `package.json`.
///
/// Returns `start` unchanged when no ancestor (including the filesystem
/// root) has one. For a relative `start`, the empty ancestor is the current
/// directory and is returned as `.`.
///
/// # Examples
///
/// ```no_run
/// use fargate_nodejs_core::find_project_root;
/// use std::path::Path;
///
/// let root = find_project_root(Path::new("/work/app/src/handlers"));
/// println!("project root: {}", root.display());
/// ```
pub fn find_project_root(start: &Path) -> PathBuf {
    let found = start
        .ancestors()
        .find(|dir| dir.join(PROJECT_MANIFEST).is_file());

    match found {
        Some(dir) if dir.as_os_str().is_empty() => {
            tracing::debug!(start = %start.display(), root = ".", "project root found");
            PathBuf::from(".")
        }
        Some(dir) => {
            tracing::debug!(start = %start.display(), root = %dir.display(), "project root found");
            dir.to_path_buf()
        }
        None => {
            tracing::debug!(start = %start.display(), "no package.json above start path");
            start.to_path_buf()
        }
    }
}

/// Supported dependency lock files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockFile {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl LockFile {
    /// Detection order when several lock files are present.
    pub const ALL: [LockFile; 4] = [Self::Npm, Self::Yarn, Self::Pnpm, Self::Bun];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Npm => "package-lock.json",
            Self::Yarn => "yarn.lock",
            Self::Pnpm => "pnpm-lock.yaml",
            Self::Bun => "bun.lockb",
        }
    }

    /// Classify a lock file by its file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::ALL.into_iter().find(|l| l.file_name() == name)
    }
}

/// Find the first known lock file directly inside `project_root`.
pub fn detect_lock_file(project_root: &Path) -> Option<PathBuf> {
    LockFile::ALL
        .iter()
        .map(|l| project_root.join(l.file_name()))
        .find(|p| p.is_file())
}

/// The parts of package.json the bundler cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: IndexMap<String, String>,
}

impl PackageJson {
    /// Read `package.json` from the given directory.
    pub fn read(project_root: &Path) -> crate::Result<Self> {
        let path = project_root.join(PROJECT_MANIFEST);
        let content =
            std::fs::read_to_string(&path).map_err(|e| crate::Error::PackageJsonRead {
                path: path.clone(),
                source: e,
            })?;
        serde_json::from_str(&content)
            .map_err(|e| crate::Error::PackageJsonParse { path, source: e })
    }

    /// Declared version range of a module, production dependencies first.
    pub fn version_of(&self, module: &str) -> Option<&str> {
        self.dependencies
            .get(module)
            .or_else(|| self.dev_dependencies.get(module))
            .map(String::as_str)
    }
}
