use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── package.json ──
    #[error("failed to read {path}")]
    PackageJsonRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    PackageJsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to resolve path {path}")]
    PathResolve {
        path: PathBuf,
        source: std::io::Error,
    },
}
