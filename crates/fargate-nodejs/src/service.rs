use fargate_nodejs_build::{BundleArtifact, Bundler};
use fargate_nodejs_core::{SecretSource, ServiceProps};
use fargate_nodejs_stack::resource::Resource;
use fargate_nodejs_stack::resource::ec2::{SecurityGroup, SecurityGroupRule};
use fargate_nodejs_stack::resource::ecs::{
    AwsvpcConfiguration, Cluster, ContainerDefinition, ContainerHealthCheck,
    DeploymentConfiguration, LogConfiguration, NetworkConfiguration, PortMapping, RuntimePlatform,
    Service, TaskDefinition,
};
use fargate_nodejs_stack::resource::iam::{Policy, PolicyDocument, PolicyStatement, Role};
use fargate_nodejs_stack::resource::logs::LogGroup;
use fargate_nodejs_stack::{
    DockerImageAsset, LogicalId, RemovalPolicy, Scope, Stack, StackError, intrinsic,
};
use indexmap::IndexMap;
use serde_json::{Value, json};

use crate::error::{ConfigError, Result};
use crate::network::Network;
use crate::permissions::{self, ECS_TASKS_PRINCIPAL};
use crate::resolve::ResolvedConfig;
use crate::{load_balancer, scaling};

/// Name of the single container in the task definition.
pub const CONTAINER_NAME: &str = "Container";
/// `awslogs-stream-prefix` of the container's log configuration.
pub const LOG_STREAM_PREFIX: &str = "fargate-nodejs";

const EXECUTION_POLICY_ID: &str = "FargateTaskDefExecutionRoleDefaultPolicy";
const TASK_POLICY_ID: &str = "FargateTaskDefTaskRoleDefaultPolicy";

/// An IAM role the task uses: declared in this stack or imported by ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
    Created(LogicalId),
    Imported(String),
}

impl RoleRef {
    pub fn arn(&self) -> Value {
        match self {
            Self::Created(id) => id.get_att("Arn"),
            Self::Imported(arn) => intrinsic::literal(arn),
        }
    }
}

/// A Node.js service running on ECS Fargate.
///
/// Construction bundles the entry point, then declares the network,
/// cluster, task definition, container, service and optional load
/// balancer and auto scaling resources into a [`Stack`]. The fields are
/// handles into that stack.
#[derive(Debug, Clone)]
pub struct FargateNodejsService {
    prefix: String,
    pub network: Network,
    /// Cluster name, as a template value
    pub cluster: Value,
    /// Set when the cluster was created in this stack
    pub cluster_id: Option<LogicalId>,
    pub task_definition: LogicalId,
    pub execution_role: RoleRef,
    pub task_role: RoleRef,
    /// Log group name, as a template value
    pub log_group: Value,
    pub security_groups: Vec<Value>,
    /// Set when the security group was created in this stack
    pub security_group: Option<LogicalId>,
    pub service: LogicalId,
    pub target_group: Option<LogicalId>,
    pub scalable_target: Option<LogicalId>,
    /// Image URI of the bundled build context
    pub image: Value,
    pub bundle: BundleArtifact,
    pub container_port: Option<u16>,
    execution_policy: Option<LogicalId>,
    task_policy: Option<LogicalId>,
}

impl FargateNodejsService {
    /// Resolve `props` and compose the service under construct `id`.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::EntryRequired`] before bundling when
    /// `entry` is missing. Bundler and stack errors propagate unchanged.
    pub fn new(
        stack: &mut Stack,
        id: &str,
        props: &ServiceProps,
        bundler: &impl Bundler,
    ) -> Result<Self> {
        let config = ResolvedConfig::resolve(props)?;
        Self::from_resolved(stack, id, &config, bundler)
    }

    /// Compose the service from an already-resolved configuration.
    pub fn from_resolved(
        stack: &mut Stack,
        id: &str,
        config: &ResolvedConfig,
        bundler: &impl Bundler,
    ) -> Result<Self> {
        if config.load_balancer.is_some() && config.container_port.is_none() {
            return Err(ConfigError::LoadBalancerWithoutPort.into());
        }

        let bundle = bundler.bundle(&config.bundling)?;
        tracing::info!(dir = %bundle.directory.display(), construct = id, "bundled service");

        let mut scope = stack.scope(id)?;
        let prefix = scope.prefix().to_owned();

        let network = match &config.vpc {
            Some(vpc) => Network::imported(vpc),
            None => Network::create(&mut scope, if config.assign_public_ip { 0 } else { 1 })?,
        };
        let subnets =
            network.select_subnets(config.vpc_subnets.as_ref(), config.assign_public_ip)?;

        let (cluster_id, cluster) = match &config.cluster {
            Some(existing) => (None, intrinsic::literal(&existing.cluster_name)),
            None => {
                let created = scope.add("FargateCluster", Cluster::default())?;
                let name = created.reference();
                (Some(created), name)
            }
        };

        let execution_role = match &config.execution_role_arn {
            Some(arn) => RoleRef::Imported(arn.clone()),
            None => RoleRef::Created(scope.add(
                "FargateTaskDefExecutionRole",
                Role::for_service(ECS_TASKS_PRINCIPAL),
            )?),
        };
        let task_role = match &config.task_role_arn {
            Some(arn) => RoleRef::Imported(arn.clone()),
            None => RoleRef::Created(
                scope.add("FargateTaskDefTaskRole", Role::for_service(ECS_TASKS_PRINCIPAL))?,
            ),
        };

        let family = scope.logical_id("FargateTaskDef")?;
        let task_definition = scope.add(
            "FargateTaskDef",
            TaskDefinition {
                family,
                cpu: config.cpu.to_string(),
                memory: config.memory_limit_mib.to_string(),
                network_mode: "awsvpc".to_owned(),
                requires_compatibilities: vec!["FARGATE".to_owned()],
                runtime_platform: RuntimePlatform {
                    cpu_architecture: config.architecture.ecs_name().to_owned(),
                    operating_system_family: "LINUX".to_owned(),
                },
                execution_role_arn: execution_role.arn(),
                task_role_arn: task_role.arn(),
                container_definitions: Vec::new(),
            },
        )?;

        let (log_group, log_group_arn) = match &config.log_group_name {
            Some(name) => (intrinsic::literal(name), permissions::log_group_arn(name)),
            None => {
                let created = scope.add(
                    "FargateLogGroup",
                    LogGroup {
                        log_group_name: None,
                        retention_in_days: config.log_retention_days,
                    },
                )?;
                scope
                    .stack()
                    .set_removal_policy(&created, RemovalPolicy::Delete)?;
                (created.reference(), created.get_att("Arn"))
            }
        };

        let asset = DockerImageAsset::from_directory(
            &bundle.directory,
            config.architecture.docker_platform(),
            config.image_build_args(),
        )?;
        let image = scope.stack().add_docker_image_asset(asset);

        let container = container_definition(config, image.clone(), log_group.clone());
        task_definition_mut(scope.stack(), &task_definition)?
            .container_definitions
            .push(container);

        let execution_policy = match &execution_role {
            RoleRef::Created(role) => {
                let mut statements = permissions::execution_statements(log_group_arn);
                statements.extend(config.secrets.values().map(permissions::secret_read_statement));
                Some(declare_policy(&mut scope, EXECUTION_POLICY_ID, role, statements)?)
            }
            RoleRef::Imported(arn) => {
                if !config.secrets.is_empty() {
                    tracing::warn!(
                        role = %arn,
                        "execution role is imported; grant it read access to the container secrets"
                    );
                }
                None
            }
        };

        let (security_groups, security_group) = if config.security_group_ids.is_empty() {
            let ingress = config
                .container_port
                .into_iter()
                .map(|port| {
                    SecurityGroupRule::tcp_from_anywhere(
                        port,
                        "Allow inbound traffic on container port",
                    )
                })
                .collect();
            let group = scope.add(
                "FargateSecurityGroup",
                SecurityGroup {
                    group_description: format!("Security group for {id}"),
                    vpc_id: network.vpc_id.clone(),
                    security_group_egress: vec![SecurityGroupRule::allow_all_outbound()],
                    security_group_ingress: ingress,
                },
            )?;
            (vec![group.get_att("GroupId")], Some(group))
        } else {
            if let Some(port) = config.container_port {
                tracing::warn!(
                    port,
                    "security groups are imported; not adding an ingress rule for the container port"
                );
            }
            let imported = config
                .security_group_ids
                .iter()
                .map(intrinsic::literal)
                .collect();
            (imported, None)
        };

        let service = scope.add(
            "FargateService",
            Service {
                cluster: cluster.clone(),
                task_definition: task_definition.reference(),
                launch_type: "FARGATE".to_owned(),
                desired_count: config.desired_count,
                service_name: config.service_name.clone(),
                deployment_configuration: DeploymentConfiguration {
                    maximum_percent: config.max_healthy_percent,
                    minimum_healthy_percent: config.min_healthy_percent,
                },
                enable_execute_command: config.enable_execute_command,
                network_configuration: NetworkConfiguration {
                    awsvpc_configuration: AwsvpcConfiguration {
                        assign_public_ip: if config.assign_public_ip {
                            "ENABLED"
                        } else {
                            "DISABLED"
                        }
                        .to_owned(),
                        security_groups: security_groups.clone(),
                        subnets,
                    },
                },
                load_balancers: Vec::new(),
                health_check_grace_period_seconds: None,
            },
        )?;

        let target_group = match (&config.load_balancer, config.container_port) {
            (Some(lb), Some(port)) => Some(load_balancer::attach(
                &mut scope,
                lb,
                &service,
                CONTAINER_NAME,
                port,
                network.vpc_id.clone(),
            )?),
            _ => None,
        };

        let scalable_target = match &config.auto_scaling {
            Some(auto_scaling) => Some(scaling::configure(
                &mut scope,
                auto_scaling,
                cluster.clone(),
                &service,
            )?),
            None => None,
        };

        let mut composed = Self {
            prefix,
            network,
            cluster,
            cluster_id,
            task_definition,
            execution_role,
            task_role,
            log_group,
            security_groups,
            security_group,
            service,
            target_group,
            scalable_target,
            image,
            bundle,
            container_port: config.container_port,
            execution_policy,
            task_policy: None,
        };

        if config.enable_execute_command {
            match &config.task_role_arn {
                Some(arn) => tracing::warn!(
                    role = %arn,
                    "task role is imported; execute-command needs ssmmessages permissions on it"
                ),
                None => {
                    composed.grant_permissions(stack, permissions::execute_command_statements())?;
                }
            }
        }

        tracing::info!(
            construct = id,
            service = %composed.service,
            resources = stack.len(),
            "composed Fargate service"
        );
        Ok(composed)
    }

    /// Set a container environment variable, replacing an existing value.
    pub fn add_environment(&self, stack: &mut Stack, key: &str, value: &str) -> Result<()> {
        self.container_mut(stack)?.add_environment(key, value);
        Ok(())
    }

    /// Add a container secret and grant the execution role read access to it.
    pub fn add_secret(&self, stack: &mut Stack, key: &str, secret: &SecretSource) -> Result<()> {
        self.container_mut(stack)?
            .add_secret(key, permissions::secret_value_from(secret));

        match &self.execution_policy {
            Some(policy) => policy_mut(stack, policy)?
                .policy_document
                .statement
                .push(permissions::secret_read_statement(secret)),
            None => tracing::warn!(
                secret = key,
                "execution role is imported; grant it read access to the secret"
            ),
        }
        Ok(())
    }

    /// Append statements to the task role's default policy, declaring the
    /// policy on first use.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ImportedTaskRole`] when the task role was imported.
    pub fn grant_permissions(
        &mut self,
        stack: &mut Stack,
        statements: impl IntoIterator<Item = PolicyStatement>,
    ) -> Result<()> {
        let role = match &self.task_role {
            RoleRef::Created(role) => role.clone(),
            RoleRef::Imported(arn) => {
                return Err(ConfigError::ImportedTaskRole { arn: arn.clone() }.into());
            }
        };
        let statements: Vec<_> = statements.into_iter().collect();
        if statements.is_empty() {
            return Ok(());
        }

        if let Some(policy) = &self.task_policy {
            policy_mut(stack, policy)?
                .policy_document
                .statement
                .extend(statements);
            return Ok(());
        }

        let mut scope = stack.scope(&self.prefix)?;
        let policy = declare_policy(&mut scope, TASK_POLICY_ID, &role, statements)?;
        tracing::debug!(policy = %policy, "declared task role default policy");
        self.task_policy = Some(policy);
        Ok(())
    }

    /// Default policy of the task role, once [`grant_permissions`](Self::grant_permissions) declared it.
    pub fn task_policy(&self) -> Option<&LogicalId> {
        self.task_policy.as_ref()
    }

    pub fn execution_policy(&self) -> Option<&LogicalId> {
        self.execution_policy.as_ref()
    }

    fn container_mut<'s>(&self, stack: &'s mut Stack) -> Result<&'s mut ContainerDefinition> {
        let task_definition = task_definition_mut(stack, &self.task_definition)?;
        task_definition
            .container_mut(CONTAINER_NAME)
            .ok_or_else(|| {
                StackError::UnknownResource(format!("{}/{CONTAINER_NAME}", self.task_definition))
                    .into()
            })
    }
}

fn container_definition(config: &ResolvedConfig, image: Value, log_group: Value) -> ContainerDefinition {
    let mut log_options = IndexMap::new();
    log_options.insert("awslogs-group".to_owned(), log_group);
    log_options.insert(
        "awslogs-stream-prefix".to_owned(),
        json!(LOG_STREAM_PREFIX),
    );
    log_options.insert(
        "awslogs-region".to_owned(),
        intrinsic::reference(intrinsic::REGION),
    );

    let mut container = ContainerDefinition {
        name: CONTAINER_NAME.to_owned(),
        image,
        essential: true,
        environment: Vec::new(),
        secrets: Vec::new(),
        port_mappings: config
            .container_port
            .into_iter()
            .map(|port| PortMapping {
                container_port: port,
                protocol: "tcp".to_owned(),
            })
            .collect(),
        log_configuration: LogConfiguration {
            log_driver: "awslogs".to_owned(),
            options: log_options,
        },
        working_directory: config.bundling.working_directory.clone(),
        health_check: config.health_check.as_ref().map(|hc| ContainerHealthCheck {
            command: hc.command.clone(),
            interval: hc.interval_secs,
            timeout: hc.timeout_secs,
            retries: hc.retries,
            start_period: hc.start_period_secs,
        }),
    };
    for (key, value) in &config.environment {
        container.add_environment(key, value);
    }
    for (key, secret) in &config.secrets {
        container.add_secret(key, permissions::secret_value_from(secret));
    }
    container
}

fn declare_policy(
    scope: &mut Scope<'_>,
    id: &str,
    role: &LogicalId,
    statements: Vec<PolicyStatement>,
) -> std::result::Result<LogicalId, StackError> {
    let policy_name = scope.logical_id(id)?;
    scope.add(
        id,
        Policy {
            policy_name,
            policy_document: PolicyDocument::new(statements),
            roles: vec![role.reference()],
        },
    )
}

fn task_definition_mut<'s>(
    stack: &'s mut Stack,
    id: &LogicalId,
) -> std::result::Result<&'s mut TaskDefinition, StackError> {
    match stack.get_mut(id) {
        Some(Resource::TaskDefinition(td)) => Ok(td),
        Some(other) => Err(StackError::UnexpectedType {
            logical_id: id.to_string(),
            expected: "AWS::ECS::TaskDefinition",
            actual: other.type_name(),
        }),
        None => Err(StackError::UnknownResource(id.to_string())),
    }
}

fn policy_mut<'s>(
    stack: &'s mut Stack,
    id: &LogicalId,
) -> std::result::Result<&'s mut Policy, StackError> {
    match stack.get_mut(id) {
        Some(Resource::Policy(policy)) => Ok(policy),
        Some(other) => Err(StackError::UnexpectedType {
            logical_id: id.to_string(),
            expected: "AWS::IAM::Policy",
            actual: other.type_name(),
        }),
        None => Err(StackError::UnknownResource(id.to_string())),
    }
}
