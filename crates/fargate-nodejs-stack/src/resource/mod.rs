//! Typed CloudFormation resources.
//!
//! Each struct serializes to the resource's `Properties` block; the
//! [`Resource`] enum carries the `Type` name.

pub mod autoscaling;
pub mod ec2;
pub mod ecs;
pub mod elbv2;
pub mod iam;
pub mod logs;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    /// The `Name` tag the console displays.
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            key: "Name".to_owned(),
            value: value.into(),
        }
    }
}

macro_rules! resources {
    ($($variant:ident($ty:ty) => $type_name:literal),* $(,)?) => {
        /// Any resource the stack can hold.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Resource {
            $($variant($ty)),*
        }

        impl Resource {
            /// CloudFormation resource type, e.g. `AWS::ECS::Service`.
            pub fn type_name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $type_name),*
                }
            }

            /// The resource's `Properties` block.
            pub fn properties(&self) -> Result<Value, serde_json::Error> {
                match self {
                    $(Self::$variant(r) => serde_json::to_value(r)),*
                }
            }
        }

        $(
            impl From<$ty> for Resource {
                fn from(r: $ty) -> Self {
                    Self::$variant(r)
                }
            }
        )*
    };
}

resources! {
    Vpc(ec2::Vpc) => "AWS::EC2::VPC",
    Subnet(ec2::Subnet) => "AWS::EC2::Subnet",
    RouteTable(ec2::RouteTable) => "AWS::EC2::RouteTable",
    SubnetRouteTableAssociation(ec2::SubnetRouteTableAssociation) => "AWS::EC2::SubnetRouteTableAssociation",
    Route(ec2::Route) => "AWS::EC2::Route",
    InternetGateway(ec2::InternetGateway) => "AWS::EC2::InternetGateway",
    VpcGatewayAttachment(ec2::VpcGatewayAttachment) => "AWS::EC2::VPCGatewayAttachment",
    Eip(ec2::Eip) => "AWS::EC2::EIP",
    NatGateway(ec2::NatGateway) => "AWS::EC2::NatGateway",
    SecurityGroup(ec2::SecurityGroup) => "AWS::EC2::SecurityGroup",
    Cluster(ecs::Cluster) => "AWS::ECS::Cluster",
    TaskDefinition(ecs::TaskDefinition) => "AWS::ECS::TaskDefinition",
    Service(ecs::Service) => "AWS::ECS::Service",
    Role(iam::Role) => "AWS::IAM::Role",
    Policy(iam::Policy) => "AWS::IAM::Policy",
    LogGroup(logs::LogGroup) => "AWS::Logs::LogGroup",
    Listener(elbv2::Listener) => "AWS::ElasticLoadBalancingV2::Listener",
    TargetGroup(elbv2::TargetGroup) => "AWS::ElasticLoadBalancingV2::TargetGroup",
    ListenerRule(elbv2::ListenerRule) => "AWS::ElasticLoadBalancingV2::ListenerRule",
    ScalableTarget(autoscaling::ScalableTarget) => "AWS::ApplicationAutoScaling::ScalableTarget",
    ScalingPolicy(autoscaling::ScalingPolicy) => "AWS::ApplicationAutoScaling::ScalingPolicy",
    Alarm(autoscaling::Alarm) => "AWS::CloudWatch::Alarm",
}

/// Resource type names, for queries against a [`Stack`](crate::Stack).
pub mod types {
    pub const VPC: &str = "AWS::EC2::VPC";
    pub const SUBNET: &str = "AWS::EC2::Subnet";
    pub const NAT_GATEWAY: &str = "AWS::EC2::NatGateway";
    pub const SECURITY_GROUP: &str = "AWS::EC2::SecurityGroup";
    pub const CLUSTER: &str = "AWS::ECS::Cluster";
    pub const TASK_DEFINITION: &str = "AWS::ECS::TaskDefinition";
    pub const SERVICE: &str = "AWS::ECS::Service";
    pub const ROLE: &str = "AWS::IAM::Role";
    pub const POLICY: &str = "AWS::IAM::Policy";
    pub const LOG_GROUP: &str = "AWS::Logs::LogGroup";
    pub const LISTENER: &str = "AWS::ElasticLoadBalancingV2::Listener";
    pub const TARGET_GROUP: &str = "AWS::ElasticLoadBalancingV2::TargetGroup";
    pub const LISTENER_RULE: &str = "AWS::ElasticLoadBalancingV2::ListenerRule";
    pub const SCALABLE_TARGET: &str = "AWS::ApplicationAutoScaling::ScalableTarget";
    pub const SCALING_POLICY: &str = "AWS::ApplicationAutoScaling::ScalingPolicy";
    pub const ALARM: &str = "AWS::CloudWatch::Alarm";
}
