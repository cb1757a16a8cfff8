//! CloudFormation resource graph for fargate-nodejs.
//!
//! [`Stack`] is the backend the service composer declares resources into.
//! It owns typed [`Resource`]s keyed by [`LogicalId`], checks the
//! constraints CloudFormation would reject at deploy time, and renders the
//! template and docker image asset manifest.

pub mod asset;
pub mod constraints;
pub mod error;
pub mod intrinsic;
pub mod resource;
pub mod stack;

pub use asset::DockerImageAsset;
pub use error::StackError;
pub use resource::Resource;
pub use stack::{LogicalId, RemovalPolicy, ResourceEntry, Scope, Stack};
