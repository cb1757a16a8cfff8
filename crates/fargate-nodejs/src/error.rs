use fargate_nodejs_build::BundleError;
use fargate_nodejs_stack::StackError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Project(#[from] fargate_nodejs_core::Error),

    #[error("bundling failed")]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Property combinations the composer refuses before declaring resources.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("entry is required")]
    EntryRequired,

    #[error("container_port must be specified when load_balancer is configured")]
    LoadBalancerWithoutPort,

    #[error("task role {arn} is imported; attach policies to it outside this stack")]
    ImportedTaskRole { arn: String },

    #[error("no {selection} subnets to place the service in")]
    NoSubnets { selection: &'static str },

    #[error("messages_per_task must be at least 1")]
    ZeroMessagesPerTask,
}
