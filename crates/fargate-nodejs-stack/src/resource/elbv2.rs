use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Listener {
    pub load_balancer_arn: Value,
    pub port: u16,
    pub protocol: String,
    pub default_actions: Vec<ListenerAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenerAction {
    #[serde(rename = "Type")]
    pub action_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_group_arn: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_response_config: Option<FixedResponseConfig>,
}

impl ListenerAction {
    pub fn forward(target_group_arn: Value) -> Self {
        Self {
            action_type: "forward".to_owned(),
            target_group_arn: Some(target_group_arn),
            fixed_response_config: None,
        }
    }

    pub fn fixed_response(status_code: u16) -> Self {
        Self {
            action_type: "fixed-response".to_owned(),
            target_group_arn: None,
            fixed_response_config: Some(FixedResponseConfig {
                status_code: status_code.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FixedResponseConfig {
    pub status_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetGroup {
    pub port: u16,
    pub protocol: String,
    pub target_type: String,
    pub vpc_id: Value,
    pub health_check_path: String,
    pub health_check_interval_seconds: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_group_attributes: Vec<TargetGroupAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetGroupAttribute {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenerRule {
    pub listener_arn: Value,
    pub priority: u32,
    pub conditions: Vec<RuleCondition>,
    pub actions: Vec<ListenerAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleCondition {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_pattern_config: Option<ConditionValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_header_config: Option<ConditionValues>,
}

impl RuleCondition {
    pub fn path_patterns(values: Vec<String>) -> Self {
        Self {
            field: "path-pattern".to_owned(),
            path_pattern_config: Some(ConditionValues { values }),
            host_header_config: None,
        }
    }

    pub fn host_headers(values: Vec<String>) -> Self {
        Self {
            field: "host-header".to_owned(),
            path_pattern_config: None,
            host_header_config: Some(ConditionValues { values }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConditionValues {
    pub values: Vec<String>,
}
