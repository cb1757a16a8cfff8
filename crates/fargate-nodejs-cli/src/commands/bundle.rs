use std::path::Path;

use fargate_nodejs::build::{Bundler, EsbuildBundler};
use fargate_nodejs::{ResolvedConfig, ServiceProps};

/// Bundle the configured entry point and print the build context directory.
pub fn bundle(dir: &Path) -> anyhow::Result<()> {
    let props = ServiceProps::load(dir)?;
    let config = ResolvedConfig::resolve(&props)?;

    let artifact = EsbuildBundler::new().bundle(&config.bundling)?;

    println!("{}", artifact.directory.display());
    Ok(())
}
