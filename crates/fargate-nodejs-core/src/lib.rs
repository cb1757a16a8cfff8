//! Core types and configuration for fargate-nodejs.
//!
//! This crate defines the `fargate.toml` schema ([`ServiceProps`]),
//! Node.js project discovery ([`find_project_root`], [`PackageJson`]),
//! and shared error types.

pub mod config;
pub mod error;
pub mod project;
pub mod runtime;

pub use config::{
    AutoScalingConfig, BundlingOptions, CONFIG_FILE, Charset, CommandHooks, ExistingCluster,
    ExistingVpc, HealthCheckConfig, LoadBalancerConfig, LogLevel, OutputFormat, SecretSource,
    ServiceProps, SubnetSelection, SubnetType,
};
pub use error::{Error, Result};
pub use project::{LockFile, PROJECT_MANIFEST, PackageJson, detect_lock_file, find_project_root};
pub use runtime::{CpuArchitecture, NodeRuntime};
