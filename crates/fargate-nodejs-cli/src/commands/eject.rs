use std::path::Path;

use fargate_nodejs::build::DockerfileGenerator;
use fargate_nodejs::{ResolvedConfig, ServiceProps};

pub fn eject(dir: &Path) -> anyhow::Result<()> {
    let props = ServiceProps::load(dir)?;
    let config = ResolvedConfig::resolve(&props)?;

    let dockerfile = DockerfileGenerator::new(&config.bundling).render();
    let path = fargate_nodejs::build::eject::eject(&config.project_root, &dockerfile)?;

    println!("Ejected Dockerfile to {}", path.display());
    println!("You can now edit it directly. Bundling will copy this file into the build context.");
    Ok(())
}
