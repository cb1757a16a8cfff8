//! The VPC the service runs in: imported, or a new two-AZ network.

use fargate_nodejs_core::{ExistingVpc, SubnetSelection, SubnetType};
use fargate_nodejs_stack::resource::Tag;
use fargate_nodejs_stack::resource::ec2::{
    Eip, InternetGateway, NatGateway, Route, RouteTable, Subnet, SubnetRouteTableAssociation, Vpc,
    VpcGatewayAttachment,
};
use fargate_nodejs_stack::{LogicalId, Scope, StackError, intrinsic};
use serde_json::Value;

use crate::error::{ConfigError, Error};

pub const VPC_CIDR: &str = "10.0.0.0/16";
const PUBLIC_SUBNET_CIDRS: [&str; 2] = ["10.0.0.0/18", "10.0.64.0/18"];
const PRIVATE_SUBNET_CIDRS: [&str; 2] = ["10.0.128.0/18", "10.0.192.0/18"];

/// Ids of the VPC and its subnets, as template values.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    /// Logical id when the VPC was created in this stack
    pub vpc: Option<LogicalId>,
    pub vpc_id: Value,
    pub public_subnets: Vec<Value>,
    pub private_subnets: Vec<Value>,
}

impl Network {
    pub fn imported(vpc: &ExistingVpc) -> Self {
        Self {
            vpc: None,
            vpc_id: intrinsic::literal(&vpc.vpc_id),
            public_subnets: vpc.public_subnet_ids.iter().map(intrinsic::literal).collect(),
            private_subnets: vpc.private_subnet_ids.iter().map(intrinsic::literal).collect(),
        }
    }

    /// Declare a VPC spanning two availability zones, each with one public and
    /// one private subnet.
    ///
    /// Private subnets route through a NAT gateway in the first public subnet
    /// when `nat_gateways > 0`; with none they have no outbound route.
    pub fn create(scope: &mut Scope<'_>, nat_gateways: u32) -> Result<Self, StackError> {
        let prefix = scope.prefix().to_owned();
        let name = |suffix: &str| Tag::name(format!("{prefix}/{suffix}"));

        let vpc = scope.add(
            "FargateVpc",
            Vpc {
                cidr_block: VPC_CIDR.to_owned(),
                enable_dns_hostnames: true,
                enable_dns_support: true,
                instance_tenancy: "default".to_owned(),
                tags: vec![name("FargateVpc")],
            },
        )?;
        let igw = scope.add(
            "FargateVpcIGW",
            InternetGateway {
                tags: vec![name("FargateVpc")],
            },
        )?;
        let attachment = scope.add(
            "FargateVpcVPCGW",
            VpcGatewayAttachment {
                vpc_id: vpc.reference(),
                internet_gateway_id: igw.reference(),
            },
        )?;

        let mut public_subnets = Vec::new();
        for (az, cidr) in PUBLIC_SUBNET_CIDRS.iter().enumerate() {
            let id = format!("FargateVpcPublicSubnet{}", az + 1);
            let subnet = declare_subnet(scope, &id, &vpc, az, cidr, true, name(&id))?;
            let route = scope.add(
                &format!("{id}DefaultRoute"),
                Route {
                    route_table_id: subnet.route_table.reference(),
                    destination_cidr_block: "0.0.0.0/0".to_owned(),
                    gateway_id: Some(igw.reference()),
                    nat_gateway_id: None,
                },
            )?;
            scope.stack().add_dependency(&route, &attachment)?;
            public_subnets.push(subnet.subnet);
        }

        let nat = match (nat_gateways, public_subnets.first()) {
            (0, _) | (_, None) => None,
            (_, Some(first_public)) => {
                let eip = scope.add(
                    "FargateVpcPublicSubnet1EIP",
                    Eip {
                        domain: "vpc".to_owned(),
                        tags: vec![name("FargateVpcPublicSubnet1")],
                    },
                )?;
                let nat = scope.add(
                    "FargateVpcPublicSubnet1NATGateway",
                    NatGateway {
                        subnet_id: first_public.reference(),
                        allocation_id: eip.get_att("AllocationId"),
                        tags: vec![name("FargateVpcPublicSubnet1")],
                    },
                )?;
                Some(nat)
            }
        };

        let mut private_subnets = Vec::new();
        for (az, cidr) in PRIVATE_SUBNET_CIDRS.iter().enumerate() {
            let id = format!("FargateVpcPrivateSubnet{}", az + 1);
            let subnet = declare_subnet(scope, &id, &vpc, az, cidr, false, name(&id))?;
            if let Some(nat) = &nat {
                scope.add(
                    &format!("{id}DefaultRoute"),
                    Route {
                        route_table_id: subnet.route_table.reference(),
                        destination_cidr_block: "0.0.0.0/0".to_owned(),
                        gateway_id: None,
                        nat_gateway_id: Some(nat.reference()),
                    },
                )?;
            }
            private_subnets.push(subnet.subnet);
        }

        tracing::debug!(
            vpc = %vpc,
            nat = nat.is_some(),
            "declared VPC"
        );
        Ok(Self {
            vpc_id: vpc.reference(),
            vpc: Some(vpc),
            public_subnets: public_subnets.iter().map(LogicalId::reference).collect(),
            private_subnets: private_subnets.iter().map(LogicalId::reference).collect(),
        })
    }

    /// Subnets the service's tasks are placed in.
    ///
    /// An explicit selection wins; otherwise public subnets when tasks get a
    /// public IP, private ones when they don't.
    pub fn select_subnets(
        &self,
        selection: Option<&SubnetSelection>,
        assign_public_ip: bool,
    ) -> Result<Vec<Value>, Error> {
        let (subnets, kind) = match selection {
            Some(SubnetSelection::SubnetIds(ids)) => (
                ids.iter().map(intrinsic::literal).collect::<Vec<_>>(),
                "selected",
            ),
            Some(SubnetSelection::SubnetType(SubnetType::Public)) => {
                (self.public_subnets.clone(), "public")
            }
            Some(SubnetSelection::SubnetType(SubnetType::PrivateWithEgress)) => {
                (self.private_subnets.clone(), "private")
            }
            None if assign_public_ip => (self.public_subnets.clone(), "public"),
            None => (self.private_subnets.clone(), "private"),
        };
        if subnets.is_empty() {
            return Err(ConfigError::NoSubnets { selection: kind }.into());
        }
        Ok(subnets)
    }
}

struct DeclaredSubnet {
    subnet: LogicalId,
    route_table: LogicalId,
}

fn declare_subnet(
    scope: &mut Scope<'_>,
    id: &str,
    vpc: &LogicalId,
    az: usize,
    cidr: &str,
    public: bool,
    tag: Tag,
) -> Result<DeclaredSubnet, StackError> {
    let subnet = scope.add(
        &format!("{id}Subnet"),
        Subnet {
            vpc_id: vpc.reference(),
            availability_zone: intrinsic::select(az, intrinsic::get_azs()),
            cidr_block: cidr.to_owned(),
            map_public_ip_on_launch: public,
            tags: vec![tag.clone()],
        },
    )?;
    let route_table = scope.add(
        &format!("{id}RouteTable"),
        RouteTable {
            vpc_id: vpc.reference(),
            tags: vec![tag],
        },
    )?;
    scope.add(
        &format!("{id}RouteTableAssociation"),
        SubnetRouteTableAssociation {
            route_table_id: route_table.reference(),
            subnet_id: subnet.reference(),
        },
    )?;
    Ok(DeclaredSubnet {
        subnet,
        route_table,
    })
}
