//! The defaulting pass: [`ServiceProps`] in, [`ResolvedConfig`] out.
//!
//! Every default is applied here exactly once. Construction reads the
//! resolved values and never re-checks whether a property was supplied.

use std::path::{Path, PathBuf};

use fargate_nodejs_build::BundlingRequest;
use fargate_nodejs_core::{
    CpuArchitecture, ExistingCluster, ExistingVpc, NodeRuntime, SecretSource, ServiceProps,
    SubnetSelection, detect_lock_file, find_project_root,
};
use indexmap::IndexMap;

use crate::error::{ConfigError, Result};

/// Port substituted when a load balancer is configured without `container_port`.
pub const DEFAULT_LOAD_BALANCED_PORT: u16 = 3000;

pub const DEFAULT_CPU: u32 = 256;
pub const DEFAULT_MEMORY_MIB: u32 = 512;
pub const DEFAULT_WORKING_DIRECTORY: &str = "/app";
pub const DEFAULT_HANDLER: &str = "handler";
pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 7;

/// Service properties with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Absolute path to the entry file
    pub entry: PathBuf,
    pub project_root: PathBuf,
    pub runtime: NodeRuntime,
    pub architecture: CpuArchitecture,
    pub cpu: u32,
    pub memory_limit_mib: u32,
    /// `None` when the service takes no inbound traffic (workers, scheduled jobs)
    pub container_port: Option<u16>,
    pub desired_count: u32,
    pub service_name: Option<String>,
    pub min_healthy_percent: u32,
    pub max_healthy_percent: u32,
    pub assign_public_ip: bool,
    pub enable_execute_command: bool,
    pub vpc: Option<ExistingVpc>,
    pub cluster: Option<ExistingCluster>,
    pub security_group_ids: Vec<String>,
    pub vpc_subnets: Option<SubnetSelection>,
    pub execution_role_arn: Option<String>,
    pub task_role_arn: Option<String>,
    pub log_group_name: Option<String>,
    pub log_retention_days: u32,
    pub health_check: Option<ResolvedHealthCheck>,
    pub load_balancer: Option<ResolvedLoadBalancer>,
    pub auto_scaling: Option<ResolvedAutoScaling>,
    pub environment: IndexMap<String, String>,
    pub secrets: IndexMap<String, SecretSource>,
    pub build_args: IndexMap<String, String>,
    /// Ready-to-run bundler input
    pub bundling: BundlingRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHealthCheck {
    pub command: Vec<String>,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub retries: u32,
    pub start_period_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLoadBalancer {
    pub load_balancer_arn: String,
    /// Existing listener; `None` creates an HTTP listener on port 80
    pub listener_arn: Option<String>,
    pub priority: u32,
    pub path_patterns: Vec<String>,
    pub host_headers: Vec<String>,
    pub health_check_path: String,
    pub health_check_interval_secs: u64,
    pub deregistration_delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAutoScaling {
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub target_cpu_utilization: Option<f64>,
    pub target_memory_utilization: Option<f64>,
    pub scale_in_cooldown_secs: u64,
    pub scale_out_cooldown_secs: u64,
    pub queue: Option<QueueScaling>,
}

/// Step scaling on the visible message count of an SQS queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueScaling {
    pub queue_name: String,
    pub messages_per_task: u32,
}

impl ResolvedConfig {
    /// Apply every default to `props`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EntryRequired`] when `entry` is absent or empty
    /// - a project error when the entry path cannot be made absolute
    pub fn resolve(props: &ServiceProps) -> Result<Self> {
        let entry = props
            .entry
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::EntryRequired)?;
        let entry = absolute(entry)?;

        let project_root = match (&props.project_root, &props.deps_lock_file_path) {
            (Some(root), _) => absolute(root)?,
            (None, Some(lock)) => match absolute(lock)?.parent() {
                Some(dir) => dir.to_path_buf(),
                None => find_project_root(entry_dir(&entry)),
            },
            (None, None) => find_project_root(entry_dir(&entry)),
        };
        let lock_file = match &props.deps_lock_file_path {
            Some(lock) => Some(absolute(lock)?),
            None => detect_lock_file(&project_root),
        };

        let runtime = given_or(props.runtime, Default::default());
        let working_directory = given_or(
            props.working_directory.clone(),
            DEFAULT_WORKING_DIRECTORY.to_owned(),
        );
        let handler = given_or(props.handler.clone(), DEFAULT_HANDLER.to_owned());

        let container_port = props.container_port.or(props
            .load_balancer
            .as_ref()
            .map(|_| DEFAULT_LOAD_BALANCED_PORT));

        let bundling = {
            let opts = &props.bundling;
            let mut req = BundlingRequest::new(entry.clone(), project_root.clone(), runtime);
            req.target = opts.target.clone();
            req.minify = given_or(opts.minify, false);
            req.source_map = given_or(opts.source_map, false);
            req.external_modules = opts.external_modules.clone();
            req.node_modules = opts.node_modules.clone();
            req.bundle_all = given_or(opts.bundle_all, true);
            req.format = given_or(opts.format, Default::default());
            req.charset = given_or(opts.charset, Default::default());
            req.keep_names = given_or(opts.keep_names, false);
            req.log_level = given_or(opts.log_level, Default::default());
            req.esbuild_args = opts.esbuild_args.clone();
            req.command_hooks = opts.command_hooks.clone();
            req.docker_image = opts.docker_image.clone();
            req.working_directory = working_directory;
            req.handler = handler;
            req.lock_file = lock_file;
            req
        };

        let health_check = props.health_check.as_ref().map(|hc| ResolvedHealthCheck {
            command: if hc.command.is_empty() {
                vec!["CMD-SHELL".to_owned(), "exit 0".to_owned()]
            } else {
                hc.command.clone()
            },
            interval_secs: given_or(hc.interval_secs, 30),
            timeout_secs: given_or(hc.timeout_secs, 5),
            retries: given_or(hc.retries, 3),
            start_period_secs: given_or(hc.start_period_secs, 0),
        });

        let load_balancer = props.load_balancer.as_ref().map(|lb| {
            let mut path_patterns = lb.path_patterns.clone();
            if path_patterns.is_empty() && lb.host_headers.is_empty() {
                path_patterns.push("/*".to_owned());
            }
            ResolvedLoadBalancer {
                load_balancer_arn: lb.load_balancer_arn.clone(),
                listener_arn: lb.listener_arn.clone(),
                priority: given_or(lb.priority, 1),
                path_patterns,
                host_headers: lb.host_headers.clone(),
                health_check_path: given_or(
                    lb.health_check_path.clone(),
                    "/health".to_owned(),
                ),
                health_check_interval_secs: given_or(lb.health_check_interval_secs, 30),
                deregistration_delay_secs: given_or(lb.deregistration_delay_secs, 30),
            }
        });

        let auto_scaling = match &props.auto_scaling {
            Some(scaling) => {
                let queue = match &scaling.sqs_queue_name {
                    Some(queue_name) => {
                        let messages_per_task = given_or(scaling.messages_per_task, 5);
                        if messages_per_task == 0 {
                            return Err(ConfigError::ZeroMessagesPerTask.into());
                        }
                        Some(QueueScaling {
                            queue_name: queue_name.clone(),
                            messages_per_task,
                        })
                    }
                    None => None,
                };
                Some(ResolvedAutoScaling {
                    min_capacity: given_or(scaling.min_capacity, 1),
                    max_capacity: given_or(scaling.max_capacity, 10),
                    target_cpu_utilization: scaling.target_cpu_utilization,
                    target_memory_utilization: scaling.target_memory_utilization,
                    scale_in_cooldown_secs: given_or(scaling.scale_in_cooldown_secs, 300),
                    scale_out_cooldown_secs: given_or(scaling.scale_out_cooldown_secs, 60),
                    queue,
                })
            }
            None => None,
        };

        let resolved = Self {
            entry,
            project_root,
            runtime,
            architecture: given_or(props.architecture, Default::default()),
            cpu: given_or(props.cpu, DEFAULT_CPU),
            memory_limit_mib: given_or(props.memory_limit_mib, DEFAULT_MEMORY_MIB),
            container_port,
            desired_count: given_or(props.desired_count, 1),
            service_name: props.service_name.clone(),
            min_healthy_percent: given_or(props.min_healthy_percent, 100),
            max_healthy_percent: given_or(props.max_healthy_percent, 200),
            assign_public_ip: props.assign_public_ip,
            enable_execute_command: props.enable_execute_command,
            vpc: props.vpc.clone(),
            cluster: props.cluster.clone(),
            security_group_ids: props.security_group_ids.clone(),
            vpc_subnets: props.vpc_subnets.clone(),
            execution_role_arn: props.execution_role_arn.clone(),
            task_role_arn: props.task_role_arn.clone(),
            log_group_name: props.log_group_name.clone(),
            log_retention_days: given_or(props.log_retention_days, DEFAULT_LOG_RETENTION_DAYS),
            health_check,
            load_balancer,
            auto_scaling,
            environment: props.environment.clone(),
            secrets: props.secrets.clone(),
            build_args: props.build_args.clone(),
            bundling,
        };

        tracing::debug!(
            entry = %resolved.entry.display(),
            project_root = %resolved.project_root.display(),
            runtime = %resolved.runtime,
            port = ?resolved.container_port,
            "resolved service config"
        );
        Ok(resolved)
    }

    /// Docker build arguments: `NODE_VERSION`, overridden by user-supplied keys.
    pub fn image_build_args(&self) -> IndexMap<String, String> {
        let mut args = IndexMap::new();
        args.insert("NODE_VERSION".to_owned(), self.runtime.major().to_owned());
        for (key, value) in &self.build_args {
            args.insert(key.clone(), value.clone());
        }
        args
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        fargate_nodejs_core::Error::PathResolve {
            path: path.to_path_buf(),
            source: e,
        }
        .into()
    })
}

fn entry_dir(entry: &Path) -> &Path {
    match entry.parent() {
        Some(dir) => dir,
        None => entry,
    }
}

/// `value` when the property was given, `default` otherwise.
fn given_or<T>(value: Option<T>, default: T) -> T {
    match value {
        Some(value) => value,
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fargate_nodejs_core::{AutoScalingConfig, LoadBalancerConfig};

    use crate::error::Error;

    fn props() -> ServiceProps {
        ServiceProps {
            entry: Some(PathBuf::from("/work/app/src/index.ts")),
            project_root: Some(PathBuf::from("/work/app")),
            ..ServiceProps::default()
        }
    }

    #[test]
    fn missing_entry_is_rejected() {
        let err = ResolvedConfig::resolve(&ServiceProps::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::EntryRequired)));

        let empty = ServiceProps {
            entry: Some(PathBuf::new()),
            ..ServiceProps::default()
        };
        let err = ResolvedConfig::resolve(&empty).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::EntryRequired)));
    }

    #[test]
    fn defaults() {
        let cfg = ResolvedConfig::resolve(&props()).unwrap();
        assert_eq!(cfg.runtime, NodeRuntime::Node18);
        assert_eq!(cfg.architecture, CpuArchitecture::X86_64);
        assert_eq!(cfg.cpu, 256);
        assert_eq!(cfg.memory_limit_mib, 512);
        assert_eq!(cfg.container_port, None);
        assert_eq!(cfg.desired_count, 1);
        assert_eq!((cfg.min_healthy_percent, cfg.max_healthy_percent), (100, 200));
        assert_eq!(cfg.log_retention_days, 7);
        assert_eq!(cfg.bundling.working_directory, "/app");
        assert_eq!(cfg.bundling.handler, "handler");
        assert!(cfg.bundling.bundle_all);
        assert!(!cfg.bundling.minify);
        assert!(cfg.load_balancer.is_none());
        assert!(cfg.auto_scaling.is_none());
    }

    #[test]
    fn relative_entry_becomes_absolute() {
        let props = ServiceProps {
            entry: Some(PathBuf::from("src/index.ts")),
            project_root: Some(PathBuf::from("/work/app")),
            ..ServiceProps::default()
        };
        let cfg = ResolvedConfig::resolve(&props).unwrap();
        assert!(cfg.entry.is_absolute());
        assert!(cfg.entry.ends_with("src/index.ts"));
    }

    #[test]
    fn lock_file_parent_is_project_root() {
        let props = ServiceProps {
            entry: Some(PathBuf::from("/work/app/src/index.ts")),
            deps_lock_file_path: Some(PathBuf::from("/work/package-lock.json")),
            ..ServiceProps::default()
        };
        let cfg = ResolvedConfig::resolve(&props).unwrap();
        assert_eq!(cfg.project_root, PathBuf::from("/work"));
        assert_eq!(
            cfg.bundling.lock_file,
            Some(PathBuf::from("/work/package-lock.json"))
        );
    }

    #[test]
    fn load_balancer_substitutes_port_and_defaults() {
        let props = ServiceProps {
            load_balancer: Some(LoadBalancerConfig {
                load_balancer_arn: "arn:aws:elasticloadbalancing:lb".to_owned(),
                ..LoadBalancerConfig::default()
            }),
            ..props()
        };
        let cfg = ResolvedConfig::resolve(&props).unwrap();
        assert_eq!(cfg.container_port, Some(3000));

        let lb = cfg.load_balancer.unwrap();
        assert_eq!(lb.priority, 1);
        assert_eq!(lb.path_patterns, vec!["/*"]);
        assert_eq!(lb.health_check_path, "/health");
        assert_eq!(lb.health_check_interval_secs, 30);
        assert_eq!(lb.deregistration_delay_secs, 30);
    }

    #[test]
    fn explicit_port_wins_over_load_balancer_default() {
        let props = ServiceProps {
            container_port: Some(8080),
            load_balancer: Some(LoadBalancerConfig::default()),
            ..props()
        };
        assert_eq!(
            ResolvedConfig::resolve(&props).unwrap().container_port,
            Some(8080)
        );
    }

    #[test]
    fn host_headers_suppress_default_path_condition() {
        let props = ServiceProps {
            load_balancer: Some(LoadBalancerConfig {
                host_headers: vec!["api.example.com".to_owned()],
                ..LoadBalancerConfig::default()
            }),
            ..props()
        };
        let lb = ResolvedConfig::resolve(&props).unwrap().load_balancer.unwrap();
        assert!(lb.path_patterns.is_empty());
    }

    #[test]
    fn zero_values_are_kept() {
        let props = ServiceProps {
            desired_count: Some(0),
            auto_scaling: Some(AutoScalingConfig {
                min_capacity: Some(0),
                scale_in_cooldown_secs: Some(0),
                ..AutoScalingConfig::default()
            }),
            ..props()
        };
        let cfg = ResolvedConfig::resolve(&props).unwrap();
        assert_eq!(cfg.desired_count, 0);
        let scaling = cfg.auto_scaling.unwrap();
        assert_eq!(scaling.min_capacity, 0);
        assert_eq!(scaling.max_capacity, 10);
        assert_eq!(scaling.scale_in_cooldown_secs, 0);
        assert_eq!(scaling.scale_out_cooldown_secs, 60);
    }

    #[test]
    fn zero_messages_per_task_rejected() {
        let props = ServiceProps {
            auto_scaling: Some(AutoScalingConfig {
                sqs_queue_name: Some("jobs".to_owned()),
                messages_per_task: Some(0),
                ..AutoScalingConfig::default()
            }),
            ..props()
        };
        assert!(matches!(
            ResolvedConfig::resolve(&props),
            Err(Error::Config(ConfigError::ZeroMessagesPerTask))
        ));
    }

    #[test]
    fn user_build_args_override_node_version() {
        let mut props = props();
        props.runtime = Some(NodeRuntime::Node20);
        props.build_args.insert("EXTRA".to_owned(), "1".to_owned());
        let cfg = ResolvedConfig::resolve(&props).unwrap();
        let args = cfg.image_build_args();
        assert_eq!(args["NODE_VERSION"], "20");
        assert_eq!(args["EXTRA"], "1");

        props.build_args.insert("NODE_VERSION".to_owned(), "20.11".to_owned());
        let args = ResolvedConfig::resolve(&props).unwrap().image_build_args();
        assert_eq!(args["NODE_VERSION"], "20.11");
        assert_eq!(args.get_index(0).map(|(k, _)| k.as_str()), Some("NODE_VERSION"));
    }
}
