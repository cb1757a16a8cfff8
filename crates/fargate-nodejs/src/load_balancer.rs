use fargate_nodejs_stack::resource::Resource;
use fargate_nodejs_stack::resource::ecs::ServiceLoadBalancer;
use fargate_nodejs_stack::resource::elbv2::{
    Listener, ListenerAction, ListenerRule, RuleCondition, TargetGroup, TargetGroupAttribute,
};
use fargate_nodejs_stack::{LogicalId, Scope, StackError, intrinsic};
use serde_json::Value;

use crate::resolve::ResolvedLoadBalancer;

/// Grace period before ELB health checks count against new tasks.
const HEALTH_CHECK_GRACE_PERIOD_SECS: u32 = 60;

/// Attach `service` to an application load balancer.
///
/// Declares the listener (unless an existing one is given), a target group
/// of IP targets on `port`, and a listener rule forwarding to it. The
/// service's `LoadBalancers` entry is added in place.
pub(crate) fn attach(
    scope: &mut Scope<'_>,
    config: &ResolvedLoadBalancer,
    service: &LogicalId,
    container_name: &str,
    port: u16,
    vpc_id: Value,
) -> Result<LogicalId, StackError> {
    let listener_arn = match &config.listener_arn {
        Some(arn) => intrinsic::literal(arn),
        None => scope
            .add(
                "FargateLoadBalancerHttpListener",
                Listener {
                    load_balancer_arn: intrinsic::literal(&config.load_balancer_arn),
                    port: 80,
                    protocol: "HTTP".to_owned(),
                    default_actions: vec![ListenerAction::fixed_response(404)],
                },
            )?
            .reference(),
    };

    let target_group = scope.add(
        "FargateTargetGroup",
        TargetGroup {
            port,
            protocol: "HTTP".to_owned(),
            target_type: "ip".to_owned(),
            vpc_id,
            health_check_path: config.health_check_path.clone(),
            health_check_interval_seconds: config.health_check_interval_secs,
            target_group_attributes: vec![TargetGroupAttribute {
                key: "deregistration_delay.timeout_seconds".to_owned(),
                value: config.deregistration_delay_secs.to_string(),
            }],
        },
    )?;

    match scope.stack().get_mut(service) {
        Some(Resource::Service(svc)) => {
            svc.load_balancers.push(ServiceLoadBalancer {
                container_name: container_name.to_owned(),
                container_port: port,
                target_group_arn: target_group.reference(),
            });
            svc.health_check_grace_period_seconds = Some(HEALTH_CHECK_GRACE_PERIOD_SECS);
        }
        Some(other) => {
            return Err(StackError::UnexpectedType {
                logical_id: service.to_string(),
                expected: "AWS::ECS::Service",
                actual: other.type_name(),
            });
        }
        None => return Err(StackError::UnknownResource(service.to_string())),
    }

    let mut conditions = Vec::new();
    if !config.path_patterns.is_empty() {
        conditions.push(RuleCondition::path_patterns(config.path_patterns.clone()));
    }
    if !config.host_headers.is_empty() {
        conditions.push(RuleCondition::host_headers(config.host_headers.clone()));
    }
    let rule = scope.add(
        "FargateListenerRule",
        ListenerRule {
            listener_arn,
            priority: config.priority,
            conditions,
            actions: vec![ListenerAction::forward(target_group.reference())],
        },
    )?;

    // Targets can only register once the rule ties the group to a listener.
    scope.stack().add_dependency(service, &rule)?;

    tracing::debug!(
        target_group = %target_group,
        priority = config.priority,
        port,
        "attached service to load balancer"
    );
    Ok(target_group)
}
