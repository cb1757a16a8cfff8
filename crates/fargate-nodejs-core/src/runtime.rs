use std::fmt;

use serde::{Deserialize, Serialize};

/// Node.js major version the service runs on.
///
/// The version is passed to esbuild as `--target=node<major>` and to the
/// image build as the `NODE_VERSION` build argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRuntime {
    #[serde(rename = "16")]
    Node16,
    #[default]
    #[serde(rename = "18")]
    Node18,
    #[serde(rename = "20")]
    Node20,
    #[serde(rename = "22")]
    Node22,
}

impl NodeRuntime {
    pub const ALL: [NodeRuntime; 4] = [Self::Node16, Self::Node18, Self::Node20, Self::Node22];

    /// Major version string, e.g. `"20"`.
    pub fn major(self) -> &'static str {
        match self {
            Self::Node16 => "16",
            Self::Node18 => "18",
            Self::Node20 => "20",
            Self::Node22 => "22",
        }
    }

    /// esbuild target for this runtime, e.g. `"node20"`.
    pub fn esbuild_target(self) -> String {
        format!("node{}", self.major())
    }
}

impl fmt::Display for NodeRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.major())
    }
}

/// CPU architecture of the Fargate task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuArchitecture {
    #[default]
    #[serde(alias = "x86-64", alias = "amd64")]
    X86_64,
    #[serde(alias = "aarch64")]
    Arm64,
}

impl CpuArchitecture {
    /// Value used in the task definition's `RuntimePlatform`.
    pub fn ecs_name(self) -> &'static str {
        match self {
            Self::X86_64 => "X86_64",
            Self::Arm64 => "ARM64",
        }
    }

    /// Docker build platform for the image asset.
    pub fn docker_platform(self) -> &'static str {
        match self {
            Self::X86_64 => "linux/amd64",
            Self::Arm64 => "linux/arm64",
        }
    }
}
