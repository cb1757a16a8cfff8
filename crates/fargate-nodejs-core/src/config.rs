use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::runtime::{CpuArchitecture, NodeRuntime};

/// Name of the configuration file read from the project directory.
pub const CONFIG_FILE: &str = "fargate.toml";

/// fargate.toml configuration: every property of a Fargate Node.js service.
///
/// All fields are optional except `entry`, which is checked when the
/// service is composed rather than when the file is parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceProps {
    /// Path to the entry file (JavaScript or TypeScript)
    pub entry: Option<PathBuf>,
    /// Name of the exported handler (defaults to `handler`)
    pub handler: Option<String>,
    /// Project root (defaults to the nearest ancestor with a package.json)
    pub project_root: Option<PathBuf>,
    /// Lock file path (package-lock.json, yarn.lock, pnpm-lock.yaml)
    pub deps_lock_file_path: Option<PathBuf>,

    /// Node.js runtime version (defaults to 18)
    pub runtime: Option<NodeRuntime>,
    /// Task CPU architecture (defaults to x86_64)
    pub architecture: Option<CpuArchitecture>,
    /// CPU units (defaults to 256)
    pub cpu: Option<u32>,
    /// Memory in MiB (defaults to 512)
    pub memory_limit_mib: Option<u32>,
    /// Container working directory (defaults to /app)
    pub working_directory: Option<String>,
    /// Port the container listens on; only mapped when set or when a load balancer is configured
    pub container_port: Option<u16>,

    /// Desired number of tasks (defaults to 1)
    pub desired_count: Option<u32>,
    pub service_name: Option<String>,
    pub min_healthy_percent: Option<u32>,
    pub max_healthy_percent: Option<u32>,
    #[serde(default)]
    pub assign_public_ip: bool,
    #[serde(default)]
    pub enable_execute_command: bool,

    /// Existing VPC (defaults to a new two-AZ VPC)
    pub vpc: Option<ExistingVpc>,
    /// Existing cluster (defaults to a new cluster)
    pub cluster: Option<ExistingCluster>,
    /// Existing security groups; a new one is created when empty
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    /// Subnet placement override
    pub vpc_subnets: Option<SubnetSelection>,
    pub execution_role_arn: Option<String>,
    pub task_role_arn: Option<String>,
    /// Existing log group name (defaults to a new log group)
    pub log_group_name: Option<String>,
    /// Log retention in days (defaults to 7)
    pub log_retention_days: Option<u32>,

    #[serde(default)]
    pub bundling: BundlingOptions,
    pub health_check: Option<HealthCheckConfig>,
    pub auto_scaling: Option<AutoScalingConfig>,
    pub load_balancer: Option<LoadBalancerConfig>,

    /// Container environment variables, in declaration order
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    /// Container secrets, in declaration order
    #[serde(default)]
    pub secrets: IndexMap<String, SecretSource>,
    /// Extra docker build arguments
    #[serde(default)]
    pub build_args: IndexMap<String, String>,
}

/// An existing VPC to deploy into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingVpc {
    pub vpc_id: String,
    #[serde(default)]
    pub public_subnet_ids: Vec<String>,
    #[serde(default)]
    pub private_subnet_ids: Vec<String>,
}

/// An existing ECS cluster to deploy into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingCluster {
    pub cluster_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    Public,
    PrivateWithEgress,
}

/// Where the service's tasks are placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetSelection {
    SubnetType(SubnetType),
    SubnetIds(Vec<String>),
}

/// Source of a container secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretSource {
    SecretsManager {
        secret_arn: String,
        /// JSON key inside the secret value
        field: Option<String>,
    },
    SsmParameter {
        parameter_name: String,
    },
}

/// Container-level health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Defaults to `["CMD-SHELL", "exit 0"]`
    #[serde(default)]
    pub command: Vec<String>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub start_period_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoScalingConfig {
    pub min_capacity: Option<u32>,
    pub max_capacity: Option<u32>,
    /// Target CPU utilization percentage
    pub target_cpu_utilization: Option<f64>,
    /// Target memory utilization percentage
    pub target_memory_utilization: Option<f64>,
    pub scale_in_cooldown_secs: Option<u64>,
    pub scale_out_cooldown_secs: Option<u64>,
    /// Name of an SQS queue whose depth drives step scaling
    pub sqs_queue_name: Option<String>,
    /// Visible messages per task before scaling out (defaults to 5)
    pub messages_per_task: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerConfig {
    /// ARN of the application load balancer
    pub load_balancer_arn: String,
    /// Existing listener; a new HTTP listener on port 80 is created when absent
    pub listener_arn: Option<String>,
    pub priority: Option<u32>,
    #[serde(default)]
    pub path_patterns: Vec<String>,
    #[serde(default)]
    pub host_headers: Vec<String>,
    pub health_check_path: Option<String>,
    pub health_check_interval_secs: Option<u64>,
    pub deregistration_delay_secs: Option<u64>,
}

/// esbuild and image bundling options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundlingOptions {
    pub minify: Option<bool>,
    pub source_map: Option<bool>,
    /// esbuild target override (defaults to `node<runtime>`)
    pub target: Option<String>,
    /// Modules left unresolved by esbuild
    #[serde(default)]
    pub external_modules: Vec<String>,
    /// Modules installed with npm inside the image instead of bundled
    #[serde(default)]
    pub node_modules: Vec<String>,
    #[serde(default)]
    pub command_hooks: CommandHooks,
    /// Extra esbuild flags as `name = value` (`--name=value`)
    #[serde(default)]
    pub esbuild_args: IndexMap<String, String>,
    /// Inline all dependencies (defaults to true)
    pub bundle_all: Option<bool>,
    /// Base image for the generated Dockerfile
    pub docker_image: Option<String>,
    pub charset: Option<Charset>,
    pub format: Option<OutputFormat>,
    pub keep_names: Option<bool>,
    pub log_level: Option<LogLevel>,
}

/// Shell commands run around bundling.
///
/// `{input_dir}` and `{output_dir}` are substituted before execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandHooks {
    #[serde(default)]
    pub before_bundling: Vec<String>,
    #[serde(default)]
    pub before_install: Vec<String>,
    #[serde(default)]
    pub after_bundling: Vec<String>,
}

impl CommandHooks {
    pub fn is_empty(&self) -> bool {
        self.before_bundling.is_empty()
            && self.before_install.is_empty()
            && self.after_bundling.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    #[default]
    Ascii,
    Utf8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Cjs,
    Esm,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cjs => "cjs",
            Self::Esm => "esm",
        }
    }

    /// File name of the bundled output for this format.
    pub fn outfile_name(self) -> &'static str {
        match self {
            Self::Cjs => "index.js",
            Self::Esm => "index.mjs",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    #[default]
    Warning,
    Error,
    Silent,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Silent => "silent",
        }
    }
}

impl ServiceProps {
    /// Load from fargate.toml in the given directory, or return defaults if not found.
    ///
    /// Relative `entry`, `project_root` and `deps_lock_file_path` values are
    /// resolved against `project_dir`.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.clone(),
                source: e,
            })?;
        let mut props: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path,
            source: e,
        })?;

        for path in [
            props.entry.as_mut(),
            props.project_root.as_mut(),
            props.deps_lock_file_path.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = project_dir.join(&*path);
            }
        }

        Ok(props)
    }
}
