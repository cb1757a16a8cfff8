//! esbuild bundling, Dockerfile generation, and eject for fargate-nodejs.
//!
//! # Bundle pipeline
//!
//! ```text
//! Bundler::bundle(request)
//!   1. Temp dir      ── $TMPDIR/fargate-nodejs-XXXXXX (kept for the image build)
//!   2. Hooks         ── before_bundling
//!   3. esbuild       ── <entry> --bundle --platform=node --target=node<runtime>
//!   4. Hooks         ── before_install, then package.json for image-installed modules
//!   5. Dockerfile    ── .fargate/Dockerfile if ejected, else DockerfileGenerator::render()
//!   6. Hooks         ── after_bundling
//! ```
//!
//! The resulting directory is the docker build context for the service image.

pub mod bundle;
pub mod dockerfile;
pub mod eject;

pub use bundle::{BundleArtifact, BundleError, Bundler, BundlingRequest, EsbuildBundler};
pub use dockerfile::DockerfileGenerator;
