//! Task-count auto scaling: CPU and memory target tracking, queue-depth step scaling.

use fargate_nodejs_stack::resource::autoscaling::{
    Alarm, MetricDimension, PredefinedMetricSpecification, ScalableTarget, ScalingPolicy,
    StepAdjustment, StepScalingConfiguration, TargetTrackingConfiguration,
};
use fargate_nodejs_stack::{LogicalId, Scope, StackError, intrinsic};
use serde_json::Value;

use crate::permissions;
use crate::resolve::{QueueScaling, ResolvedAutoScaling};

const SCALABLE_DIMENSION: &str = "ecs:service:DesiredCount";
const SERVICE_NAMESPACE: &str = "ecs";
const QUEUE_METRIC: &str = "ApproximateNumberOfMessagesVisible";
const QUEUE_METRIC_PERIOD_SECS: u64 = 60;

pub(crate) fn configure(
    scope: &mut Scope<'_>,
    config: &ResolvedAutoScaling,
    cluster: Value,
    service: &LogicalId,
) -> Result<LogicalId, StackError> {
    let target = scope.add(
        "FargateServiceTaskCountTarget",
        ScalableTarget {
            max_capacity: config.max_capacity,
            min_capacity: config.min_capacity,
            resource_id: intrinsic::join(
                "/",
                vec![
                    intrinsic::literal("service"),
                    cluster,
                    service.get_att("Name"),
                ],
            ),
            role_arn: permissions::ecs_autoscaling_role_arn(),
            scalable_dimension: SCALABLE_DIMENSION.to_owned(),
            service_namespace: SERVICE_NAMESPACE.to_owned(),
        },
    )?;
    scope.stack().add_dependency(&target, service)?;

    if let Some(cpu) = config.target_cpu_utilization {
        target_tracking(
            scope,
            "FargateCpuScaling",
            "ECSServiceAverageCPUUtilization",
            cpu,
            config,
            &target,
        )?;
    }
    if let Some(memory) = config.target_memory_utilization {
        target_tracking(
            scope,
            "FargateMemoryScaling",
            "ECSServiceAverageMemoryUtilization",
            memory,
            config,
            &target,
        )?;
    }
    if let Some(queue) = &config.queue {
        queue_depth(scope, queue, config, &target)?;
    }

    tracing::debug!(
        min = config.min_capacity,
        max = config.max_capacity,
        "configured auto scaling"
    );
    Ok(target)
}

fn target_tracking(
    scope: &mut Scope<'_>,
    id: &str,
    metric: &str,
    target_value: f64,
    config: &ResolvedAutoScaling,
    target: &LogicalId,
) -> Result<LogicalId, StackError> {
    let policy_name = scope.logical_id(id)?;
    scope.add(
        id,
        ScalingPolicy {
            policy_name,
            policy_type: "TargetTrackingScaling".to_owned(),
            scaling_target_id: target.reference(),
            target_tracking_scaling_policy_configuration: Some(TargetTrackingConfiguration {
                target_value,
                predefined_metric_specification: PredefinedMetricSpecification {
                    predefined_metric_type: metric.to_owned(),
                },
                scale_in_cooldown: config.scale_in_cooldown_secs,
                scale_out_cooldown: config.scale_out_cooldown_secs,
            }),
            step_scaling_policy_configuration: None,
        },
    )
}

/// Scale in by one task when the queue is empty; scale out by 1, 2 or 3
/// tasks at 1x, 2x and 4x `messages_per_task` visible messages.
fn queue_depth(
    scope: &mut Scope<'_>,
    queue: &QueueScaling,
    config: &ResolvedAutoScaling,
    target: &LogicalId,
) -> Result<(), StackError> {
    let per_task = f64::from(queue.messages_per_task);

    // Step bounds are relative to the alarm threshold.
    step_policy(
        scope,
        "FargateSqsScalingLower",
        queue,
        target,
        config.scale_in_cooldown_secs,
        StepAlarm {
            comparison: "LessThanOrEqualToThreshold",
            threshold: 0.0,
            description: "Lower threshold scaling alarm",
        },
        vec![StepAdjustment {
            metric_interval_lower_bound: None,
            metric_interval_upper_bound: Some(0.0),
            scaling_adjustment: -1,
        }],
    )?;
    step_policy(
        scope,
        "FargateSqsScalingUpper",
        queue,
        target,
        config.scale_out_cooldown_secs,
        StepAlarm {
            comparison: "GreaterThanOrEqualToThreshold",
            threshold: per_task,
            description: "Upper threshold scaling alarm",
        },
        vec![
            StepAdjustment {
                metric_interval_lower_bound: Some(0.0),
                metric_interval_upper_bound: Some(per_task),
                scaling_adjustment: 1,
            },
            StepAdjustment {
                metric_interval_lower_bound: Some(per_task),
                metric_interval_upper_bound: Some(per_task * 3.0),
                scaling_adjustment: 2,
            },
            StepAdjustment {
                metric_interval_lower_bound: Some(per_task * 3.0),
                metric_interval_upper_bound: None,
                scaling_adjustment: 3,
            },
        ],
    )
}

struct StepAlarm {
    comparison: &'static str,
    threshold: f64,
    description: &'static str,
}

fn step_policy(
    scope: &mut Scope<'_>,
    id: &str,
    queue: &QueueScaling,
    target: &LogicalId,
    cooldown: u64,
    alarm: StepAlarm,
    steps: Vec<StepAdjustment>,
) -> Result<(), StackError> {
    let policy_id = format!("{id}Policy");
    let policy_name = scope.logical_id(&policy_id)?;
    let policy = scope.add(
        &policy_id,
        ScalingPolicy {
            policy_name,
            policy_type: "StepScaling".to_owned(),
            scaling_target_id: target.reference(),
            target_tracking_scaling_policy_configuration: None,
            step_scaling_policy_configuration: Some(StepScalingConfiguration {
                adjustment_type: "ChangeInCapacity".to_owned(),
                cooldown: Some(cooldown),
                metric_aggregation_type: "Average".to_owned(),
                step_adjustments: steps,
            }),
        },
    )?;
    scope.add(
        &format!("{id}Alarm"),
        Alarm {
            alarm_description: alarm.description.to_owned(),
            comparison_operator: alarm.comparison.to_owned(),
            evaluation_periods: 1,
            metric_name: QUEUE_METRIC.to_owned(),
            namespace: "AWS/SQS".to_owned(),
            dimensions: vec![MetricDimension {
                name: "QueueName".to_owned(),
                value: queue.queue_name.clone(),
            }],
            period: QUEUE_METRIC_PERIOD_SECS,
            statistic: "Average".to_owned(),
            threshold: alarm.threshold,
            alarm_actions: vec![policy.reference()],
        },
    )?;
    Ok(())
}
