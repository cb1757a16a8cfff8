mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fargate-nodejs",
    about = "Bundle Node.js services and synthesize their ECS Fargate stacks"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a fargate.toml skeleton
    Init {
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Bundle the entry point into a docker build context
    Bundle {
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Bundle and write the CloudFormation template and asset manifest
    Synth {
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Output directory for template.json and assets.json, relative to --dir
        #[arg(long, default_value = "cdk.out")]
        out: PathBuf,
        /// Stack name
        #[arg(long, default_value = "FargateNodejsStack")]
        stack_name: String,
        /// Construct id, prefixed to every logical id
        #[arg(long, default_value = "Service")]
        id: String,
    },
    /// Eject the Dockerfile for manual customization
    Eject {
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Check that node, esbuild and docker are available
    Doctor {
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                // arch-lint: allow(no-silent-result-drop) reason="an unset or unparsable RUST_LOG falls back to the info filter"
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { dir } => commands::init_project(&dir)?,
        Commands::Bundle { dir } => commands::bundle(&dir)?,
        Commands::Synth {
            dir,
            out,
            stack_name,
            id,
        } => commands::synth(&dir, &out, &stack_name, &id)?,
        Commands::Eject { dir } => commands::eject(&dir)?,
        Commands::Doctor { dir } => commands::doctor(&dir)?,
    }

    Ok(())
}
