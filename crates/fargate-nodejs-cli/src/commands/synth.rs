use std::path::Path;

use fargate_nodejs::build::EsbuildBundler;
use fargate_nodejs::stack::Stack;
use fargate_nodejs::{FargateNodejsService, ServiceProps};

const TEMPLATE_FILE: &str = "template.json";
const ASSET_MANIFEST_FILE: &str = "assets.json";

/// Bundle the service and write its template and asset manifest to `out`.
///
/// A relative `out` is resolved against `dir`.
pub fn synth(dir: &Path, out: &Path, stack_name: &str, id: &str) -> anyhow::Result<()> {
    let props = ServiceProps::load(dir)?;
    let out = dir.join(out);

    let mut stack = Stack::new(stack_name);
    stack.set_description(format!("{stack_name}: Node.js service on ECS Fargate"));
    let service = FargateNodejsService::new(&mut stack, id, &props, &EsbuildBundler::new())?;

    stack.add_output(
        "ServiceName",
        service.service.get_att("Name"),
        Some("ECS service name"),
    )?;
    stack.add_output(
        "ClusterName",
        service.cluster.clone(),
        Some("ECS cluster name"),
    )?;
    stack.add_output("ImageUri", service.image.clone(), Some("Container image URI"))?;

    let template = stack.template()?;
    let manifest = stack.asset_manifest();

    tracing::debug!(out = %out.display(), "writing template and asset manifest");
    std::fs::create_dir_all(&out)?;
    let template_path = out.join(TEMPLATE_FILE);
    let manifest_path = out.join(ASSET_MANIFEST_FILE);
    std::fs::write(&template_path, serde_json::to_string_pretty(&template)?)?;
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    println!(
        "Synthesized {stack_name} ({} resources)",
        stack.len()
    );
    println!("  Template: {}", template_path.display());
    println!("  Assets:   {}", manifest_path.display());
    println!("  Build context: {}", service.bundle.directory.display());

    Ok(())
}
