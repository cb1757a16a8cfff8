use std::fmt;
use std::path::{Path, PathBuf};

use fargate_nodejs::{CONFIG_FILE, ResolvedConfig, ServiceProps};

#[derive(Debug, Clone)]
struct CheckResult {
    passed: bool,
    detail: String,
}

impl CheckResult {
    fn ok(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }

    fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

#[derive(Debug)]
struct DoctorReport {
    checks: Vec<(&'static str, CheckResult)>,
}

impl DoctorReport {
    fn all_passed(&self) -> bool {
        self.checks.iter().all(|(_, result)| result.passed)
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, result) in &self.checks {
            writeln!(f, "  [{}] {:<12} {}", result.icon(), name, result.detail)?;
        }
        Ok(())
    }
}

pub fn doctor(dir: &Path) -> anyhow::Result<()> {
    let (config, project_root) = check_config(dir);
    let report = DoctorReport {
        checks: vec![
            ("node", check_on_path("node")),
            ("esbuild", check_esbuild(&project_root)),
            ("docker", check_on_path("docker")),
            (CONFIG_FILE, config),
        ],
    };

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed; see above for details");
    }

    Ok(())
}

fn check_on_path(program: &str) -> CheckResult {
    match which::which(program) {
        Ok(path) => CheckResult::ok(path.display().to_string()),
        Err(_) => CheckResult::fail("not found on PATH"),
    }
}

/// Look where the bundler looks: `<project root>/node_modules/.bin`, then `PATH`.
fn check_esbuild(project_root: &Path) -> CheckResult {
    let local = project_root.join("node_modules").join(".bin").join("esbuild");
    if local.is_file() {
        return CheckResult::ok(local.display().to_string());
    }
    match which::which("esbuild") {
        Ok(path) => CheckResult::ok(path.display().to_string()),
        Err(_) => CheckResult::fail("not found; run `npm install --save-dev esbuild`"),
    }
}

/// Validate the config and return the project root it resolves to, or `dir`
/// when it cannot be resolved.
fn check_config(dir: &Path) -> (CheckResult, PathBuf) {
    if !dir.join(CONFIG_FILE).exists() {
        return (
            CheckResult::fail("not found; run `fargate-nodejs init`"),
            dir.to_path_buf(),
        );
    }
    let props = match ServiceProps::load(dir) {
        Ok(props) => props,
        Err(e) => return (CheckResult::fail(format!("invalid: {e}")), dir.to_path_buf()),
    };
    match ResolvedConfig::resolve(&props) {
        Ok(config) => (CheckResult::ok("valid"), config.project_root),
        Err(e) => (CheckResult::fail(format!("invalid: {e}")), dir.to_path_buf()),
    }
}
