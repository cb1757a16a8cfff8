use std::path::Path;

use fargate_nodejs::CONFIG_FILE;

const FARGATE_TOML: &str = r#"# Entry point, relative to this file
entry = "src/index.ts"

# runtime = "20"            # 16, 18, 20 or 22
# architecture = "arm64"    # x86_64 or arm64
# cpu = 256
# memory_limit_mib = 512
# container_port = 3000
# desired_count = 1
# assign_public_ip = false

[bundling]
# minify = true
# source_map = true
# external_modules = ["@aws-sdk/*"]
# node_modules = ["sharp"]

[environment]
# NODE_ENV = "production"

# [load_balancer]
# load_balancer_arn = "arn:aws:elasticloadbalancing:..."
# path_patterns = ["/api/*"]

# [auto_scaling]
# min_capacity = 1
# max_capacity = 10
# target_cpu_utilization = 70.0
"#;

/// Write a fargate.toml skeleton into `dir`.
pub fn init_project(dir: &Path) -> anyhow::Result<()> {
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() {
        eprintln!("{CONFIG_FILE} already exists, skipping");
        return Ok(());
    }

    std::fs::write(&config_path, FARGATE_TOML)?;
    println!("Created {CONFIG_FILE}");
    println!();
    println!("Next steps:");
    println!();
    println!("  1. Point `entry` at your handler file");
    println!("  2. Install esbuild:");
    println!("     npm install --save-dev esbuild");
    println!("  3. Synthesize the stack:");
    println!("     fargate-nodejs synth");

    Ok(())
}
