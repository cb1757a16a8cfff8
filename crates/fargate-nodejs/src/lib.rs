//! Run Node.js/TypeScript services on AWS ECS Fargate.
//!
//! [`FargateNodejsService`] bundles an entry point with esbuild and
//! declares everything the service needs (VPC, cluster, task definition,
//! service, and optionally a load balancer rule and auto scaling) into a
//! CloudFormation [`Stack`](stack::Stack).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use fargate_nodejs::{FargateNodejsService, ServiceProps};
//! use fargate_nodejs::build::EsbuildBundler;
//! use fargate_nodejs::stack::Stack;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let props = ServiceProps::load(Path::new("."))?;
//! let mut stack = Stack::new("MyApp");
//! let service = FargateNodejsService::new(&mut stack, "Api", &props, &EsbuildBundler::new())?;
//! service.add_environment(&mut stack, "LOG_LEVEL", "debug")?;
//! let template = stack.template()?;
//! # Ok(())
//! # }
//! ```

// Core types flattened into root namespace for convenience.
pub use fargate_nodejs_core::*;

/// esbuild bundling, Dockerfile generation, and eject.
pub mod build {
    pub use fargate_nodejs_build::*;
}

/// CloudFormation resources and the stack they are declared into.
pub mod stack {
    pub use fargate_nodejs_stack::*;
}

pub mod error;
mod load_balancer;
pub mod network;
pub mod permissions;
pub mod resolve;
mod scaling;
pub mod service;

pub use error::{ConfigError, Error, Result};
pub use network::Network;
pub use resolve::ResolvedConfig;
pub use service::{FargateNodejsService, RoleRef};
