//! IAM statements and secret references the composer attaches to roles and containers.

use fargate_nodejs_core::SecretSource;
use fargate_nodejs_stack::asset::CONTAINER_ASSETS_REPOSITORY;
use fargate_nodejs_stack::intrinsic;
use fargate_nodejs_stack::resource::iam::PolicyStatement;
use serde_json::Value;

pub const ECS_TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Service-linked role Application Auto Scaling uses for ECS services.
pub fn ecs_autoscaling_role_arn() -> Value {
    intrinsic::sub(
        "arn:${AWS::Partition}:iam::${AWS::AccountId}:role/aws-service-role/\
         ecs.application-autoscaling.amazonaws.com/AWSServiceRoleForApplicationAutoScaling_ECSService",
    )
}

/// ARN of a log group declared elsewhere, by name.
pub fn log_group_arn(name: &str) -> Value {
    intrinsic::sub(format!(
        "arn:${{AWS::Partition}}:logs:${{AWS::Region}}:${{AWS::AccountId}}:log-group:{name}:*"
    ))
}

/// Statements the execution role needs to pull the image and ship logs.
pub fn execution_statements(log_group_arn: Value) -> Vec<PolicyStatement> {
    vec![
        PolicyStatement::allow(
            [
                "ecr:BatchCheckLayerAvailability",
                "ecr:GetDownloadUrlForLayer",
                "ecr:BatchGetImage",
            ],
            vec![intrinsic::sub(format!(
                "arn:${{AWS::Partition}}:ecr:${{AWS::Region}}:${{AWS::AccountId}}:repository/{CONTAINER_ASSETS_REPOSITORY}"
            ))],
        ),
        PolicyStatement::allow(["ecr:GetAuthorizationToken"], vec![intrinsic::literal("*")]),
        PolicyStatement::allow(
            ["logs:CreateLogStream", "logs:PutLogEvents"],
            vec![log_group_arn],
        ),
    ]
}

/// Session Manager channels `ecs execute-command` opens from inside the task.
pub fn execute_command_statements() -> Vec<PolicyStatement> {
    vec![PolicyStatement::allow(
        [
            "ssmmessages:CreateControlChannel",
            "ssmmessages:CreateDataChannel",
            "ssmmessages:OpenControlChannel",
            "ssmmessages:OpenDataChannel",
        ],
        vec![intrinsic::literal("*")],
    )]
}

/// `ValueFrom` of a container secret.
pub fn secret_value_from(secret: &SecretSource) -> Value {
    match secret {
        SecretSource::SecretsManager {
            secret_arn,
            field: Some(field),
        } => intrinsic::literal(format!("{secret_arn}:{field}::")),
        SecretSource::SecretsManager { secret_arn, .. } => intrinsic::literal(secret_arn),
        SecretSource::SsmParameter { .. } => ssm_parameter_arn(secret),
    }
}

/// Read access to a secret, for the execution role.
pub fn secret_read_statement(secret: &SecretSource) -> PolicyStatement {
    match secret {
        SecretSource::SecretsManager { secret_arn, .. } => PolicyStatement::allow(
            [
                "secretsmanager:GetSecretValue",
                "secretsmanager:DescribeSecret",
            ],
            vec![intrinsic::literal(secret_arn)],
        ),
        SecretSource::SsmParameter { .. } => PolicyStatement::allow(
            [
                "ssm:DescribeParameters",
                "ssm:GetParameters",
                "ssm:GetParameter",
                "ssm:GetParameterHistory",
            ],
            vec![ssm_parameter_arn(secret)],
        ),
    }
}

fn ssm_parameter_arn(secret: &SecretSource) -> Value {
    match secret {
        SecretSource::SsmParameter { parameter_name } if parameter_name.starts_with("arn:") => {
            intrinsic::literal(parameter_name)
        }
        SecretSource::SsmParameter { parameter_name } => intrinsic::sub(format!(
            "arn:${{AWS::Partition}}:ssm:${{AWS::Region}}:${{AWS::AccountId}}:parameter/{}",
            parameter_name.trim_start_matches('/')
        )),
        SecretSource::SecretsManager { secret_arn, .. } => intrinsic::literal(secret_arn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn secrets_manager_field_reference() {
        let secret = SecretSource::SecretsManager {
            secret_arn: "arn:aws:secretsmanager:us-east-1:1:secret:db".to_owned(),
            field: Some("password".to_owned()),
        };
        assert_eq!(
            secret_value_from(&secret),
            json!("arn:aws:secretsmanager:us-east-1:1:secret:db:password::")
        );
        assert_eq!(
            secret_read_statement(&secret).resource,
            vec![json!("arn:aws:secretsmanager:us-east-1:1:secret:db")]
        );
    }

    #[test]
    fn ssm_parameter_names_become_arns() {
        let secret = SecretSource::SsmParameter {
            parameter_name: "/app/token".to_owned(),
        };
        assert_eq!(
            secret_value_from(&secret),
            json!({"Fn::Sub": "arn:${AWS::Partition}:ssm:${AWS::Region}:${AWS::AccountId}:parameter/app/token"})
        );

        let by_arn = SecretSource::SsmParameter {
            parameter_name: "arn:aws:ssm:us-east-1:1:parameter/x".to_owned(),
        };
        assert_eq!(
            secret_value_from(&by_arn),
            json!("arn:aws:ssm:us-east-1:1:parameter/x")
        );
    }
}
