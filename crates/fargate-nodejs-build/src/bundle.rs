use std::path::{Path, PathBuf};
use std::process::Command;

use fargate_nodejs_core::{
    Charset, CommandHooks, LockFile, LogLevel, NodeRuntime, OutputFormat, PackageJson,
};
use indexmap::IndexMap;

use crate::dockerfile::DockerfileGenerator;
use crate::eject;

/// Prefix of the temporary build-context directories.
const BUNDLE_DIR_PREFIX: &str = "fargate-nodejs-";

/// Everything needed to produce one build context.
///
/// Built once by the service composer and consumed by a single
/// [`Bundler::bundle`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlingRequest {
    /// Absolute path to the entry file
    pub entry_path: PathBuf,
    pub project_root: PathBuf,
    pub runtime: NodeRuntime,
    /// esbuild target override; `node<runtime>` when `None`
    pub target: Option<String>,
    pub minify: bool,
    pub source_map: bool,
    pub external_modules: Vec<String>,
    /// Modules installed in the image by npm instead of bundled
    pub node_modules: Vec<String>,
    pub bundle_all: bool,
    pub format: OutputFormat,
    pub charset: Charset,
    pub keep_names: bool,
    pub log_level: LogLevel,
    pub esbuild_args: IndexMap<String, String>,
    pub command_hooks: CommandHooks,
    /// Base image override for the generated Dockerfile
    pub docker_image: Option<String>,
    pub working_directory: String,
    pub handler: String,
    pub lock_file: Option<PathBuf>,
}

impl BundlingRequest {
    /// A request with default bundling options.
    pub fn new(entry_path: PathBuf, project_root: PathBuf, runtime: NodeRuntime) -> Self {
        Self {
            entry_path,
            project_root,
            runtime,
            target: None,
            minify: false,
            source_map: false,
            external_modules: Vec::new(),
            node_modules: Vec::new(),
            bundle_all: true,
            format: OutputFormat::default(),
            charset: Charset::default(),
            keep_names: false,
            log_level: LogLevel::default(),
            esbuild_args: IndexMap::new(),
            command_hooks: CommandHooks::default(),
            docker_image: None,
            working_directory: "/app".to_owned(),
            handler: "handler".to_owned(),
            lock_file: None,
        }
    }

    pub fn outfile_name(&self) -> &'static str {
        self.format.outfile_name()
    }

    /// esbuild command-line arguments writing the bundle to `outfile`.
    pub fn esbuild_args(&self, outfile: &Path) -> Vec<String> {
        let target = match &self.target {
            Some(target) => target.clone(),
            None => self.runtime.esbuild_target(),
        };

        let mut args = vec![
            self.entry_path.display().to_string(),
            "--bundle".to_owned(),
            "--platform=node".to_owned(),
            format!("--target={target}"),
            format!("--outfile={}", outfile.display()),
            format!("--format={}", self.format.as_str()),
            format!("--log-level={}", self.log_level.as_str()),
        ];

        if self.minify {
            args.push("--minify".to_owned());
        }
        if self.source_map {
            args.push("--sourcemap".to_owned());
        }
        if self.keep_names {
            args.push("--keep-names".to_owned());
        }
        if self.charset == Charset::Utf8 {
            args.push("--charset=utf8".to_owned());
        }
        if !self.bundle_all {
            args.push("--packages=external".to_owned());
        }
        for module in self.external_modules.iter().chain(&self.node_modules) {
            args.push(format!("--external:{module}"));
        }
        for (name, value) in &self.esbuild_args {
            let name = name.trim_start_matches('-');
            if value.is_empty() {
                args.push(format!("--{name}"));
            } else {
                args.push(format!("--{name}={value}"));
            }
        }

        args
    }
}

/// A finished build context: bundled output plus Dockerfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleArtifact {
    /// Directory handed to the image build
    pub directory: PathBuf,
    /// Bundled output file inside `directory`
    pub outfile: PathBuf,
}

/// Produces build contexts from a [`BundlingRequest`].
///
/// Production code uses [`EsbuildBundler`], tests use mockall-generated mocks.
pub trait Bundler: Send + Sync {
    fn bundle(&self, request: &BundlingRequest) -> Result<BundleArtifact, BundleError>;
}

/// Bundler backed by the esbuild CLI, invoked synchronously.
#[derive(Debug, Clone, Default)]
pub struct EsbuildBundler {
    esbuild_path: Option<PathBuf>,
}

impl EsbuildBundler {
    /// Locate esbuild per request: the project's `node_modules/.bin/esbuild`,
    /// then `esbuild` on `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always use the given esbuild executable.
    pub fn with_esbuild_path(esbuild_path: PathBuf) -> Self {
        Self {
            esbuild_path: Some(esbuild_path),
        }
    }

    fn resolve_esbuild(&self, project_root: &Path) -> Result<PathBuf, BundleError> {
        if let Some(path) = &self.esbuild_path {
            return Ok(path.clone());
        }
        let local = project_root.join("node_modules").join(".bin").join("esbuild");
        if local.is_file() {
            return Ok(local);
        }
        which::which("esbuild").map_err(|_| BundleError::EsbuildNotFound {
            project_root: project_root.to_path_buf(),
        })
    }
}

impl Bundler for EsbuildBundler {
    fn bundle(&self, request: &BundlingRequest) -> Result<BundleArtifact, BundleError> {
        if !request.entry_path.is_file() {
            return Err(BundleError::EntryNotFound(request.entry_path.clone()));
        }

        let directory = tempfile::Builder::new()
            .prefix(BUNDLE_DIR_PREFIX)
            .tempdir()
            .map_err(|e| BundleError::CreateDir { source: e })?
            .keep();
        let outfile = directory.join(request.outfile_name());

        tracing::info!(
            entry = %request.entry_path.display(),
            runtime = %request.runtime,
            dir = %directory.display(),
            "bundling"
        );

        run_hooks(
            "before_bundling",
            &request.command_hooks.before_bundling,
            &request.project_root,
            &directory,
        )?;

        let esbuild = self.resolve_esbuild(&request.project_root)?;
        run_esbuild(&esbuild, &request.esbuild_args(&outfile), &request.project_root)?;

        run_hooks(
            "before_install",
            &request.command_hooks.before_install,
            &request.project_root,
            &directory,
        )?;
        write_install_manifest(request, &directory)?;

        write_dockerfile(request, &directory)?;

        run_hooks(
            "after_bundling",
            &request.command_hooks.after_bundling,
            &request.project_root,
            &directory,
        )?;

        tracing::debug!(outfile = %outfile.display(), "bundle complete");
        Ok(BundleArtifact { directory, outfile })
    }
}

fn run_esbuild(esbuild: &Path, args: &[String], project_root: &Path) -> Result<(), BundleError> {
    tracing::debug!(esbuild = %esbuild.display(), ?args, "running esbuild");

    let output = Command::new(esbuild)
        .args(args)
        .current_dir(project_root)
        .output()
        .map_err(|e| BundleError::EsbuildSpawn {
            path: esbuild.to_path_buf(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BundleError::EsbuildFailed {
            detail: format!("esbuild exited with {}: {}", output.status, stderr.trim()),
        });
    }

    Ok(())
}

/// Run hook commands through `sh -c` in the project root.
fn run_hooks(
    stage: &'static str,
    commands: &[String],
    input_dir: &Path,
    output_dir: &Path,
) -> Result<(), BundleError> {
    for command in commands {
        let command = command
            .replace("{input_dir}", &input_dir.display().to_string())
            .replace("{output_dir}", &output_dir.display().to_string());
        tracing::info!(stage, %command, "running command hook");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(input_dir)
            .output()
            .map_err(|e| BundleError::HookSpawn {
                stage,
                command: command.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BundleError::HookFailed {
                stage,
                command,
                detail: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }
    }
    Ok(())
}

/// Write a package.json listing the modules npm installs inside the image.
///
/// Nothing is written when every dependency is bundled.
fn write_install_manifest(request: &BundlingRequest, directory: &Path) -> Result<(), BundleError> {
    if request.node_modules.is_empty() && request.bundle_all {
        return Ok(());
    }

    let package = PackageJson::read(&request.project_root)?;

    let mut dependencies = serde_json::Map::new();
    if !request.bundle_all {
        for (name, version) in &package.dependencies {
            dependencies.insert(name.clone(), serde_json::Value::String(version.clone()));
        }
    }
    for module in &request.node_modules {
        let version =
            package
                .version_of(module)
                .ok_or_else(|| BundleError::ModuleVersionNotFound {
                    module: module.clone(),
                })?;
        dependencies.insert(module.clone(), serde_json::Value::String(version.to_owned()));
    }

    let manifest = serde_json::json!({
        "name": "fargate-nodejs-bundle",
        "private": true,
        "dependencies": dependencies,
    });
    let path = directory.join("package.json");
    let content = serde_json::to_string_pretty(&manifest)
        .map_err(|e| BundleError::EncodePackageJson { source: e })?;
    std::fs::write(&path, content).map_err(|e| BundleError::WritePackageJson {
        path: path.clone(),
        source: e,
    })?;

    // npm can reuse its own lock file; other lock formats are not understood by `npm install`.
    if let Some(lock) = &request.lock_file
        && LockFile::from_path(lock) == Some(LockFile::Npm)
    {
        let dst = directory.join(LockFile::Npm.file_name());
        std::fs::copy(lock, &dst).map_err(|e| BundleError::CopyFile {
            path: lock.clone(),
            source: e,
        })?;
    }

    Ok(())
}

/// Copy the ejected Dockerfile into the build context, or write the generated one.
fn write_dockerfile(request: &BundlingRequest, directory: &Path) -> Result<(), BundleError> {
    let dst = directory.join("Dockerfile");

    if eject::is_ejected(&request.project_root) {
        let src = eject::ejected_dockerfile_path(&request.project_root);
        tracing::info!(path = %src.display(), "using ejected Dockerfile");
        std::fs::copy(&src, &dst).map_err(|e| BundleError::CopyFile {
            path: src,
            source: e,
        })?;
        return Ok(());
    }

    let content = DockerfileGenerator::new(request).render();
    std::fs::write(&dst, content).map_err(|e| BundleError::WriteDockerfile {
        path: dst,
        source: e,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("entry file not found: {0}")]
    EntryNotFound(PathBuf),
    #[error("failed to create bundle directory")]
    CreateDir { source: std::io::Error },
    #[error(
        "esbuild not found in {project_root}/node_modules/.bin or on PATH; install it with `npm install --save-dev esbuild`"
    )]
    EsbuildNotFound { project_root: PathBuf },
    #[error("failed to execute esbuild at {path}")]
    EsbuildSpawn {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("esbuild failed: {detail}")]
    EsbuildFailed { detail: String },
    #[error("failed to execute {stage} hook `{command}`")]
    HookSpawn {
        stage: &'static str,
        command: String,
        source: std::io::Error,
    },
    #[error("{stage} hook `{command}` failed: {detail}")]
    HookFailed {
        stage: &'static str,
        command: String,
        detail: String,
    },
    #[error(transparent)]
    Project(#[from] fargate_nodejs_core::Error),
    #[error("module '{module}' is not declared in package.json; cannot install it in the image")]
    ModuleVersionNotFound { module: String },
    #[error("failed to encode package.json")]
    EncodePackageJson { source: serde_json::Error },
    #[error("failed to write package.json at {path}")]
    WritePackageJson {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy file {path}")]
    CopyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write Dockerfile at {path}")]
    WriteDockerfile {
        path: PathBuf,
        source: std::io::Error,
    },
}
