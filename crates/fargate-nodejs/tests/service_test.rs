use std::path::{Path, PathBuf};

use fargate_nodejs::build::{BundleArtifact, BundleError, Bundler, BundlingRequest};
use fargate_nodejs::stack::resource::iam::PolicyStatement;
use fargate_nodejs::stack::resource::types;
use fargate_nodejs::stack::{Stack, StackError, intrinsic};
use fargate_nodejs::{
    AutoScalingConfig, ConfigError, CpuArchitecture, Error, ExistingCluster, ExistingVpc,
    FargateNodejsService, HealthCheckConfig, LoadBalancerConfig, NodeRuntime, ResolvedConfig,
    SecretSource, ServiceProps,
};
use mockall::mock;
use serde_json::{Value, json};
use tempfile::TempDir;

mock! {
    Esbuild {}

    impl Bundler for Esbuild {
        fn bundle(&self, request: &BundlingRequest) -> Result<BundleArtifact, BundleError>;
    }
}

fn build_context() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.js"), "console.log('hi')").unwrap();
    std::fs::write(dir.path().join("Dockerfile"), "FROM node:18-alpine\n").unwrap();
    dir
}

fn bundler(context: &Path) -> MockEsbuild {
    let directory = context.to_path_buf();
    let mut mock = MockEsbuild::new();
    mock.expect_bundle().times(1).returning(move |req| {
        Ok(BundleArtifact {
            directory: directory.clone(),
            outfile: directory.join(req.outfile_name()),
        })
    });
    mock
}

fn unused_bundler() -> MockEsbuild {
    let mut mock = MockEsbuild::new();
    mock.expect_bundle().times(0);
    mock
}

fn props() -> ServiceProps {
    ServiceProps {
        entry: Some(PathBuf::from("/work/app/src/index.ts")),
        project_root: Some(PathBuf::from("/work/app")),
        ..ServiceProps::default()
    }
}

fn compose(props: &ServiceProps) -> (Stack, FargateNodejsService, TempDir) {
    let context = build_context();
    let mut stack = Stack::new("TestStack");
    let service =
        FargateNodejsService::new(&mut stack, "Api", props, &bundler(context.path())).unwrap();
    (stack, service, context)
}

/// Properties of the single resource of `type_name`.
fn only(stack: &Stack, type_name: &str) -> Value {
    let mut found = stack.resources_of_type(type_name);
    let (_, resource) = found.next().unwrap();
    assert!(found.next().is_none(), "more than one {type_name}");
    resource.properties().unwrap()
}

fn container(stack: &Stack) -> Value {
    only(stack, types::TASK_DEFINITION)["ContainerDefinitions"][0].clone()
}

// ── Defaults ──

#[test]
fn default_props_create_one_of_each() {
    let (stack, _, _ctx) = compose(&props());

    assert_eq!(stack.resource_count(types::VPC), 1);
    assert_eq!(stack.resource_count(types::CLUSTER), 1);
    assert_eq!(stack.resource_count(types::TASK_DEFINITION), 1);
    assert_eq!(stack.resource_count(types::SERVICE), 1);
    assert_eq!(stack.resource_count(types::SUBNET), 4);
    assert_eq!(stack.resource_count(types::NAT_GATEWAY), 1);
    assert_eq!(stack.resource_count(types::SECURITY_GROUP), 1);
    assert_eq!(stack.resource_count(types::LOG_GROUP), 1);
    assert_eq!(stack.resource_count(types::ROLE), 2);
    assert_eq!(stack.resource_count(types::POLICY), 1);
    assert_eq!(stack.resource_count(types::TARGET_GROUP), 0);
    assert_eq!(stack.resource_count(types::SCALABLE_TARGET), 0);
}

#[test]
fn default_task_and_service_settings() {
    let (stack, _, _ctx) = compose(&props());

    let task = only(&stack, types::TASK_DEFINITION);
    assert_eq!(task["Cpu"], "256");
    assert_eq!(task["Memory"], "512");
    assert_eq!(task["NetworkMode"], "awsvpc");
    assert_eq!(task["RequiresCompatibilities"], json!(["FARGATE"]));
    assert_eq!(
        task["RuntimePlatform"],
        json!({"CpuArchitecture": "X86_64", "OperatingSystemFamily": "LINUX"})
    );

    let service = only(&stack, types::SERVICE);
    assert_eq!(service["LaunchType"], "FARGATE");
    assert_eq!(service["DesiredCount"], 1);
    assert_eq!(service["EnableExecuteCommand"], false);
    assert_eq!(
        service["DeploymentConfiguration"],
        json!({"MaximumPercent": 200, "MinimumHealthyPercent": 100})
    );
    let awsvpc = &service["NetworkConfiguration"]["AwsvpcConfiguration"];
    assert_eq!(awsvpc["AssignPublicIp"], "DISABLED");
    assert_eq!(
        awsvpc["Subnets"],
        json!([
            {"Ref": "ApiFargateVpcPrivateSubnet1Subnet"},
            {"Ref": "ApiFargateVpcPrivateSubnet2Subnet"}
        ])
    );
}

#[test]
fn container_logs_to_created_log_group() {
    let (stack, _, _ctx) = compose(&props());

    let container = container(&stack);
    assert_eq!(container["Name"], "Container");
    assert_eq!(container["WorkingDirectory"], "/app");
    assert_eq!(container["LogConfiguration"]["LogDriver"], "awslogs");
    assert_eq!(
        container["LogConfiguration"]["Options"]["awslogs-group"],
        json!({"Ref": "ApiFargateLogGroup"})
    );
    assert_eq!(
        container["LogConfiguration"]["Options"]["awslogs-stream-prefix"],
        "fargate-nodejs"
    );

    assert_eq!(only(&stack, types::LOG_GROUP)["RetentionInDays"], 7);
    let template = stack.template().unwrap();
    assert_eq!(
        template["Resources"]["ApiFargateLogGroup"]["DeletionPolicy"],
        "Delete"
    );
}

#[test]
fn bundler_receives_resolved_request() {
    let context = build_context();
    let directory = context.path().to_path_buf();
    let mut mock = MockEsbuild::new();
    mock.expect_bundle()
        .withf(|req| {
            req.runtime == NodeRuntime::Node20
                && req.minify
                && req.entry_path == Path::new("/work/app/src/index.ts")
                && req.project_root == Path::new("/work/app")
                && req.working_directory == "/app"
        })
        .times(1)
        .returning(move |req| {
            Ok(BundleArtifact {
                directory: directory.clone(),
                outfile: directory.join(req.outfile_name()),
            })
        });

    let mut props = props();
    props.runtime = Some(NodeRuntime::Node20);
    props.bundling.minify = Some(true);

    let mut stack = Stack::new("TestStack");
    FargateNodejsService::new(&mut stack, "Api", &props, &mock).unwrap();
}

// ── Imports ──

#[test]
fn existing_vpc_and_cluster_are_not_created() {
    let props = ServiceProps {
        vpc: Some(ExistingVpc {
            vpc_id: "vpc-123".to_owned(),
            public_subnet_ids: vec![],
            private_subnet_ids: vec!["subnet-a".to_owned(), "subnet-b".to_owned()],
        }),
        cluster: Some(ExistingCluster {
            cluster_name: "shared".to_owned(),
        }),
        ..props()
    };
    let (stack, service, _ctx) = compose(&props);

    assert_eq!(stack.resource_count(types::VPC), 0);
    assert_eq!(stack.resource_count(types::SUBNET), 0);
    assert_eq!(stack.resource_count(types::CLUSTER), 0);
    assert!(service.cluster_id.is_none());

    let svc = only(&stack, types::SERVICE);
    assert_eq!(svc["Cluster"], "shared");
    assert_eq!(
        svc["NetworkConfiguration"]["AwsvpcConfiguration"]["Subnets"],
        json!(["subnet-a", "subnet-b"])
    );
    assert_eq!(only(&stack, types::SECURITY_GROUP)["VpcId"], "vpc-123");
}

#[test]
fn imported_vpc_without_matching_subnets_fails() {
    let props = ServiceProps {
        vpc: Some(ExistingVpc {
            vpc_id: "vpc-123".to_owned(),
            public_subnet_ids: vec![],
            private_subnet_ids: vec![],
        }),
        ..props()
    };
    let context = build_context();
    let mut stack = Stack::new("TestStack");
    let err = FargateNodejsService::new(&mut stack, "Api", &props, &bundler(context.path()))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::NoSubnets {
            selection: "private"
        })
    ));
}

#[test]
fn imported_security_groups_get_no_ingress() {
    let props = ServiceProps {
        container_port: Some(8080),
        security_group_ids: vec!["sg-1".to_owned()],
        ..props()
    };
    let (stack, service, _ctx) = compose(&props);

    assert_eq!(stack.resource_count(types::SECURITY_GROUP), 0);
    assert!(service.security_group.is_none());
    assert_eq!(
        only(&stack, types::SERVICE)["NetworkConfiguration"]["AwsvpcConfiguration"]["SecurityGroups"],
        json!(["sg-1"])
    );
    // The port is still mapped on the container.
    assert_eq!(container(&stack)["PortMappings"][0]["ContainerPort"], 8080);
}

#[test]
fn imported_roles_are_referenced_by_arn() {
    let props = ServiceProps {
        execution_role_arn: Some("arn:aws:iam::1:role/exec".to_owned()),
        task_role_arn: Some("arn:aws:iam::1:role/task".to_owned()),
        ..props()
    };
    let (stack, _, _ctx) = compose(&props);

    assert_eq!(stack.resource_count(types::ROLE), 0);
    assert_eq!(stack.resource_count(types::POLICY), 0);
    let task = only(&stack, types::TASK_DEFINITION);
    assert_eq!(task["ExecutionRoleArn"], "arn:aws:iam::1:role/exec");
    assert_eq!(task["TaskRoleArn"], "arn:aws:iam::1:role/task");
}

// ── Sizing and placement ──

#[test]
fn cpu_and_memory_are_rendered_as_strings() {
    let props = ServiceProps {
        cpu: Some(512),
        memory_limit_mib: Some(1024),
        ..props()
    };
    let (stack, _, _ctx) = compose(&props);

    let task = only(&stack, types::TASK_DEFINITION);
    assert_eq!(task["Cpu"], "512");
    assert_eq!(task["Memory"], "1024");
}

#[test]
fn unsupported_task_size_is_rejected() {
    let props = ServiceProps {
        cpu: Some(256),
        memory_limit_mib: Some(4096),
        ..props()
    };
    let context = build_context();
    let mut stack = Stack::new("TestStack");
    let err = FargateNodejsService::new(&mut stack, "Api", &props, &bundler(context.path()))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Stack(StackError::InvalidTaskSize { .. })
    ));
}

#[test]
fn public_ip_uses_public_subnets_without_nat() {
    let props = ServiceProps {
        assign_public_ip: true,
        ..props()
    };
    let (stack, _, _ctx) = compose(&props);

    assert_eq!(stack.resource_count(types::NAT_GATEWAY), 0);
    let awsvpc = &only(&stack, types::SERVICE)["NetworkConfiguration"]["AwsvpcConfiguration"];
    assert_eq!(awsvpc["AssignPublicIp"], "ENABLED");
    assert_eq!(
        awsvpc["Subnets"],
        json!([
            {"Ref": "ApiFargateVpcPublicSubnet1Subnet"},
            {"Ref": "ApiFargateVpcPublicSubnet2Subnet"}
        ])
    );
}

#[test]
fn arm64_sets_platform_and_build_args() {
    let mut props = props();
    props.architecture = Some(CpuArchitecture::Arm64);
    props.runtime = Some(NodeRuntime::Node20);
    props
        .build_args
        .insert("NPM_TOKEN".to_owned(), "secret".to_owned());
    let (stack, service, _ctx) = compose(&props);

    assert_eq!(
        only(&stack, types::TASK_DEFINITION)["RuntimePlatform"]["CpuArchitecture"],
        "ARM64"
    );
    let manifest = stack.asset_manifest();
    let images = manifest["dockerImages"].as_object().unwrap();
    assert_eq!(images.len(), 1);
    let (_, image) = images.iter().next().unwrap();
    assert_eq!(image["source"]["platform"], "linux/arm64");
    assert_eq!(
        image["source"]["dockerBuildArgs"],
        json!({"NODE_VERSION": "20", "NPM_TOKEN": "secret"})
    );
    assert_eq!(container(&stack)["Image"], service.image);
}

// ── Container ──

#[test]
fn environment_keeps_declaration_order() {
    let mut props = props();
    props
        .environment
        .insert("NODE_ENV".to_owned(), "production".to_owned());
    props
        .environment
        .insert("API_KEY".to_owned(), "test-key".to_owned());
    let (stack, _, _ctx) = compose(&props);

    assert_eq!(
        container(&stack)["Environment"],
        json!([
            {"Name": "NODE_ENV", "Value": "production"},
            {"Name": "API_KEY", "Value": "test-key"}
        ])
    );
}

#[test]
fn no_port_means_no_mapping_and_no_ingress() {
    let (stack, service, _ctx) = compose(&props());

    assert!(container(&stack).get("PortMappings").is_none());
    assert!(
        only(&stack, types::SECURITY_GROUP)
            .get("SecurityGroupIngress")
            .is_none()
    );
    assert_eq!(stack.resource_count(types::SERVICE), 1);
    assert_eq!(service.container_port, None);
}

#[test]
fn container_port_maps_and_opens_ingress() {
    let props = ServiceProps {
        container_port: Some(8080),
        ..props()
    };
    let (stack, _, _ctx) = compose(&props);

    assert_eq!(
        container(&stack)["PortMappings"],
        json!([{"ContainerPort": 8080, "Protocol": "tcp"}])
    );
    let ingress = &only(&stack, types::SECURITY_GROUP)["SecurityGroupIngress"];
    assert_eq!(ingress[0]["FromPort"], 8080);
    assert_eq!(ingress[0]["ToPort"], 8080);
    assert_eq!(ingress[0]["CidrIp"], "0.0.0.0/0");
    assert_eq!(ingress[0]["IpProtocol"], "tcp");
}

#[test]
fn health_check_defaults() {
    let props = ServiceProps {
        health_check: Some(HealthCheckConfig::default()),
        ..props()
    };
    let (stack, _, _ctx) = compose(&props);

    assert_eq!(
        container(&stack)["HealthCheck"],
        json!({
            "Command": ["CMD-SHELL", "exit 0"],
            "Interval": 30,
            "Timeout": 5,
            "Retries": 3,
            "StartPeriod": 0
        })
    );
}

#[test]
fn secrets_are_referenced_and_readable_by_execution_role() {
    let mut props = props();
    props.secrets.insert(
        "DB_PASSWORD".to_owned(),
        SecretSource::SecretsManager {
            secret_arn: "arn:aws:secretsmanager:us-east-1:1:secret:db".to_owned(),
            field: None,
        },
    );
    let (stack, _, _ctx) = compose(&props);

    assert_eq!(
        container(&stack)["Secrets"],
        json!([{"Name": "DB_PASSWORD", "ValueFrom": "arn:aws:secretsmanager:us-east-1:1:secret:db"}])
    );
    let policy = only(&stack, types::POLICY);
    let statements = policy["PolicyDocument"]["Statement"].as_array().unwrap();
    assert!(statements.iter().any(|s| {
        s["Action"] == json!(["secretsmanager:GetSecretValue", "secretsmanager:DescribeSecret"])
    }));
}

// ── Load balancer ──

fn load_balancer() -> LoadBalancerConfig {
    LoadBalancerConfig {
        load_balancer_arn: "arn:aws:elasticloadbalancing:us-east-1:1:loadbalancer/app/alb/1"
            .to_owned(),
        ..LoadBalancerConfig::default()
    }
}

#[test]
fn load_balancer_without_port_substitutes_3000() {
    let props = ServiceProps {
        load_balancer: Some(load_balancer()),
        ..props()
    };
    let (stack, service, _ctx) = compose(&props);

    assert_eq!(service.container_port, Some(3000));
    assert_eq!(container(&stack)["PortMappings"][0]["ContainerPort"], 3000);

    let target_group = only(&stack, types::TARGET_GROUP);
    assert_eq!(target_group["Port"], 3000);
    assert_eq!(target_group["TargetType"], "ip");
    assert_eq!(target_group["HealthCheckPath"], "/health");
    assert_eq!(target_group["HealthCheckIntervalSeconds"], 30);
    assert_eq!(
        target_group["TargetGroupAttributes"],
        json!([{"Key": "deregistration_delay.timeout_seconds", "Value": "30"}])
    );

    let listener = only(&stack, types::LISTENER);
    assert_eq!(listener["Port"], 80);
    assert_eq!(listener["Protocol"], "HTTP");

    let rule = only(&stack, types::LISTENER_RULE);
    assert_eq!(rule["Priority"], 1);
    assert_eq!(
        rule["Conditions"],
        json!([{"Field": "path-pattern", "PathPatternConfig": {"Values": ["/*"]}}])
    );
    assert_eq!(rule["Actions"][0]["Type"], "forward");

    let svc = only(&stack, types::SERVICE);
    assert_eq!(
        svc["LoadBalancers"],
        json!([{
            "ContainerName": "Container",
            "ContainerPort": 3000,
            "TargetGroupArn": {"Ref": "ApiFargateTargetGroup"}
        }])
    );
    let template = stack.template().unwrap();
    assert_eq!(
        template["Resources"]["ApiFargateService"]["DependsOn"],
        json!(["ApiFargateListenerRule"])
    );
}

#[test]
fn existing_listener_and_conditions() {
    let props = ServiceProps {
        container_port: Some(8080),
        load_balancer: Some(LoadBalancerConfig {
            listener_arn: Some("arn:listener".to_owned()),
            priority: Some(10),
            path_patterns: vec!["/api/*".to_owned()],
            host_headers: vec!["api.example.com".to_owned()],
            ..load_balancer()
        }),
        ..props()
    };
    let (stack, _, _ctx) = compose(&props);

    assert_eq!(stack.resource_count(types::LISTENER), 0);
    let rule = only(&stack, types::LISTENER_RULE);
    assert_eq!(rule["ListenerArn"], "arn:listener");
    assert_eq!(rule["Priority"], 10);
    assert_eq!(rule["Conditions"].as_array().unwrap().len(), 2);
    assert_eq!(only(&stack, types::TARGET_GROUP)["Port"], 8080);
}

#[test]
fn resolved_load_balancer_without_port_fails_before_declaring() {
    let mut config = ResolvedConfig::resolve(&ServiceProps {
        load_balancer: Some(load_balancer()),
        ..props()
    })
    .unwrap();
    config.container_port = None;

    let mut stack = Stack::new("TestStack");
    let err = FargateNodejsService::from_resolved(&mut stack, "Api", &config, &unused_bundler())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Config(ConfigError::LoadBalancerWithoutPort)
    ));
    assert_eq!(stack.resource_count(types::LISTENER), 0);
    assert_eq!(stack.resource_count(types::TARGET_GROUP), 0);
    assert_eq!(stack.resource_count(types::LISTENER_RULE), 0);
}

#[test]
fn listener_rule_priority_out_of_range() {
    let props = ServiceProps {
        load_balancer: Some(LoadBalancerConfig {
            priority: Some(0),
            ..load_balancer()
        }),
        ..props()
    };
    let context = build_context();
    let mut stack = Stack::new("TestStack");
    let err = FargateNodejsService::new(&mut stack, "Api", &props, &bundler(context.path()))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Stack(StackError::InvalidListenerRulePriority(0))
    ));
}

// ── Auto scaling ──

#[test]
fn cpu_target_tracking() {
    let props = ServiceProps {
        auto_scaling: Some(AutoScalingConfig {
            min_capacity: Some(2),
            max_capacity: Some(10),
            target_cpu_utilization: Some(70.0),
            ..AutoScalingConfig::default()
        }),
        ..props()
    };
    let (stack, service, _ctx) = compose(&props);

    assert!(service.scalable_target.is_some());
    let target = only(&stack, types::SCALABLE_TARGET);
    assert_eq!(target["MinCapacity"], 2);
    assert_eq!(target["MaxCapacity"], 10);
    assert_eq!(target["ScalableDimension"], "ecs:service:DesiredCount");
    assert_eq!(
        target["ResourceId"],
        intrinsic::join(
            "/",
            vec![
                json!("service"),
                json!({"Ref": "ApiFargateCluster"}),
                json!({"Fn::GetAtt": ["ApiFargateService", "Name"]}),
            ]
        )
    );

    let policy = only(&stack, types::SCALING_POLICY);
    assert_eq!(policy["PolicyType"], "TargetTrackingScaling");
    let tracking = &policy["TargetTrackingScalingPolicyConfiguration"];
    assert_eq!(tracking["TargetValue"], json!(70.0));
    assert_eq!(
        tracking["PredefinedMetricSpecification"]["PredefinedMetricType"],
        "ECSServiceAverageCPUUtilization"
    );
    assert_eq!(tracking["ScaleInCooldown"], 300);
    assert_eq!(tracking["ScaleOutCooldown"], 60);
}

#[test]
fn cpu_and_memory_policies() {
    let props = ServiceProps {
        auto_scaling: Some(AutoScalingConfig {
            target_cpu_utilization: Some(60.0),
            target_memory_utilization: Some(80.0),
            ..AutoScalingConfig::default()
        }),
        ..props()
    };
    let (stack, _, _ctx) = compose(&props);

    assert_eq!(stack.resource_count(types::SCALABLE_TARGET), 1);
    assert_eq!(stack.resource_count(types::SCALING_POLICY), 2);
    assert_eq!(stack.resource_count(types::ALARM), 0);
}

#[test]
fn queue_depth_step_scaling() {
    let props = ServiceProps {
        auto_scaling: Some(AutoScalingConfig {
            sqs_queue_name: Some("jobs".to_owned()),
            ..AutoScalingConfig::default()
        }),
        ..props()
    };
    let (stack, _, _ctx) = compose(&props);

    assert_eq!(stack.resource_count(types::SCALING_POLICY), 2);
    assert_eq!(stack.resource_count(types::ALARM), 2);

    let template = stack.template().unwrap();
    let resources = &template["Resources"];

    let upper = &resources["ApiFargateSqsScalingUpperPolicy"]["Properties"];
    let steps = &upper["StepScalingPolicyConfiguration"];
    assert_eq!(steps["AdjustmentType"], "ChangeInCapacity");
    assert_eq!(steps["Cooldown"], 60);
    assert_eq!(
        steps["StepAdjustments"],
        json!([
            {"MetricIntervalLowerBound": 0.0, "MetricIntervalUpperBound": 5.0, "ScalingAdjustment": 1},
            {"MetricIntervalLowerBound": 5.0, "MetricIntervalUpperBound": 15.0, "ScalingAdjustment": 2},
            {"MetricIntervalLowerBound": 15.0, "ScalingAdjustment": 3}
        ])
    );

    let upper_alarm = &resources["ApiFargateSqsScalingUpperAlarm"]["Properties"];
    assert_eq!(upper_alarm["Threshold"], json!(5.0));
    assert_eq!(upper_alarm["ComparisonOperator"], "GreaterThanOrEqualToThreshold");
    assert_eq!(upper_alarm["MetricName"], "ApproximateNumberOfMessagesVisible");
    assert_eq!(upper_alarm["Namespace"], "AWS/SQS");
    assert_eq!(upper_alarm["Period"], 60);
    assert_eq!(upper_alarm["Statistic"], "Average");
    assert_eq!(
        upper_alarm["Dimensions"],
        json!([{"Name": "QueueName", "Value": "jobs"}])
    );
    assert_eq!(
        upper_alarm["AlarmActions"],
        json!([{"Ref": "ApiFargateSqsScalingUpperPolicy"}])
    );

    let lower = &resources["ApiFargateSqsScalingLowerPolicy"]["Properties"];
    assert_eq!(
        lower["StepScalingPolicyConfiguration"]["StepAdjustments"],
        json!([{"MetricIntervalUpperBound": 0.0, "ScalingAdjustment": -1}])
    );
    assert_eq!(lower["StepScalingPolicyConfiguration"]["Cooldown"], 300);
    let lower_alarm = &resources["ApiFargateSqsScalingLowerAlarm"]["Properties"];
    assert_eq!(lower_alarm["Threshold"], json!(0.0));
    assert_eq!(lower_alarm["ComparisonOperator"], "LessThanOrEqualToThreshold");
}

#[test]
fn min_above_max_is_rejected() {
    let props = ServiceProps {
        auto_scaling: Some(AutoScalingConfig {
            min_capacity: Some(5),
            max_capacity: Some(2),
            ..AutoScalingConfig::default()
        }),
        ..props()
    };
    let context = build_context();
    let mut stack = Stack::new("TestStack");
    let err = FargateNodejsService::new(&mut stack, "Api", &props, &bundler(context.path()))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Stack(StackError::InvalidCapacity { min: 5, max: 2 })
    ));
}

// ── Failures before construction ──

#[test]
fn missing_entry_fails_before_bundling() {
    let mut stack = Stack::new("TestStack");
    let err = FargateNodejsService::new(
        &mut stack,
        "Api",
        &ServiceProps::default(),
        &unused_bundler(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::EntryRequired)));
    assert!(stack.is_empty());
}

#[test]
fn bundle_failure_propagates() {
    let mut mock = MockEsbuild::new();
    mock.expect_bundle()
        .returning(|req| Err(BundleError::EntryNotFound(req.entry_path.clone())));

    let mut stack = Stack::new("TestStack");
    let err = FargateNodejsService::new(&mut stack, "Api", &props(), &mock).unwrap_err();
    assert!(matches!(
        err,
        Error::Bundle(BundleError::EntryNotFound(path)) if path == Path::new("/work/app/src/index.ts")
    ));
    assert!(stack.is_empty());
}

#[test]
fn duplicate_construct_id_is_rejected() {
    let context = build_context();
    let mut stack = Stack::new("TestStack");
    FargateNodejsService::new(&mut stack, "Api", &props(), &bundler(context.path())).unwrap();
    let err = FargateNodejsService::new(&mut stack, "Api", &props(), &bundler(context.path()))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Stack(StackError::DuplicateLogicalId(_))
    ));
}

#[test]
fn two_services_share_a_stack() {
    let context = build_context();
    let mut stack = Stack::new("TestStack");
    FargateNodejsService::new(&mut stack, "Api", &props(), &bundler(context.path())).unwrap();
    FargateNodejsService::new(&mut stack, "Worker", &props(), &bundler(context.path())).unwrap();

    assert_eq!(stack.resource_count(types::SERVICE), 2);
    // Same build context, one image.
    assert_eq!(stack.docker_image_assets().count(), 1);
}

// ── Mutators ──

#[test]
fn add_environment_after_construction() {
    let (mut stack, service, _ctx) = compose(&props());
    service
        .add_environment(&mut stack, "FEATURE_FLAG", "on")
        .unwrap();
    service
        .add_environment(&mut stack, "FEATURE_FLAG", "off")
        .unwrap();

    assert_eq!(
        container(&stack)["Environment"],
        json!([{"Name": "FEATURE_FLAG", "Value": "off"}])
    );
}

#[test]
fn add_secret_grants_read_to_execution_role() {
    let (mut stack, service, _ctx) = compose(&props());
    service
        .add_secret(
            &mut stack,
            "TOKEN",
            &SecretSource::SsmParameter {
                parameter_name: "/app/token".to_owned(),
            },
        )
        .unwrap();

    assert_eq!(container(&stack)["Secrets"][0]["Name"], "TOKEN");
    let policy = only(&stack, types::POLICY);
    let statements = policy["PolicyDocument"]["Statement"].as_array().unwrap();
    assert!(
        statements
            .iter()
            .any(|s| s["Action"].as_array().unwrap().contains(&json!("ssm:GetParameters")))
    );
}

#[test]
fn grant_permissions_declares_policy_once() {
    let (mut stack, mut service, _ctx) = compose(&props());
    assert!(service.task_policy().is_none());

    service
        .grant_permissions(
            &mut stack,
            [PolicyStatement::allow(
                ["s3:GetObject"],
                vec![json!("arn:aws:s3:::bucket/*")],
            )],
        )
        .unwrap();
    service
        .grant_permissions(
            &mut stack,
            [PolicyStatement::allow(
                ["sqs:ReceiveMessage"],
                vec![json!("arn:aws:sqs:us-east-1:1:jobs")],
            )],
        )
        .unwrap();

    assert_eq!(stack.resource_count(types::POLICY), 2);
    let template = stack.template().unwrap();
    let policy = &template["Resources"]["ApiFargateTaskDefTaskRoleDefaultPolicy"]["Properties"];
    assert_eq!(
        policy["Roles"],
        json!([{"Ref": "ApiFargateTaskDefTaskRole"}])
    );
    assert_eq!(
        policy["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn grant_permissions_on_imported_task_role_fails() {
    let props = ServiceProps {
        task_role_arn: Some("arn:aws:iam::1:role/task".to_owned()),
        ..props()
    };
    let (mut stack, mut service, _ctx) = compose(&props);
    let err = service
        .grant_permissions(
            &mut stack,
            [PolicyStatement::allow(["s3:GetObject"], vec![json!("*")])],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::ImportedTaskRole { arn }) if arn == "arn:aws:iam::1:role/task"
    ));
}

#[test]
fn execute_command_grants_session_channels() {
    let props = ServiceProps {
        enable_execute_command: true,
        ..props()
    };
    let (stack, service, _ctx) = compose(&props);

    assert!(service.task_policy().is_some());
    assert_eq!(only(&stack, types::SERVICE)["EnableExecuteCommand"], true);
    let template = stack.template().unwrap();
    let statements = &template["Resources"]["ApiFargateTaskDefTaskRoleDefaultPolicy"]
        ["Properties"]["PolicyDocument"]["Statement"];
    assert!(
        statements[0]["Action"]
            .as_array()
            .unwrap()
            .contains(&json!("ssmmessages:CreateControlChannel"))
    );
}
