use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("invalid construct id {0:?}: must contain at least one ASCII letter or digit")]
    InvalidId(String),

    #[error("duplicate logical id {0} in stack")]
    DuplicateLogicalId(String),

    #[error("no resource with logical id {0} in stack")]
    UnknownResource(String),

    #[error("resource {logical_id} is a {actual}, expected {expected}")]
    UnexpectedType {
        logical_id: String,
        expected: &'static str,
        actual: &'static str,
    },

    // ── Provisioning constraints ──
    #[error(
        "invalid Fargate task size: cpu {cpu} with {memory} MiB memory is not a supported combination"
    )]
    InvalidTaskSize { cpu: String, memory: String },

    #[error("listener rule priority {0} is outside 1..=50000")]
    InvalidListenerRulePriority(u32),

    #[error("scalable target min capacity {min} exceeds max capacity {max}")]
    InvalidCapacity { min: u32, max: u32 },

    #[error("log retention of {0} days is not supported by CloudWatch Logs")]
    InvalidLogRetention(u32),

    // ── Rendering ──
    #[error("failed to hash asset directory {path}")]
    AssetHash {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk asset directory {path}")]
    AssetWalk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to serialize resource {logical_id}")]
    Serialize {
        logical_id: String,
        source: serde_json::Error,
    },
}
