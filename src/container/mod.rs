use crate::command::{Invocation, Runner};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

pub mod definition;

pub use definition::{ContainerDefinition, Identity};

/// Container runtimes in order of preference.
pub const RUNTIME_PREFERENCE: [&str; 2] = ["podman", "docker"];

/// Used when no preferred runtime is installed. Invoking it then fails
/// visibly instead of being checked up front.
pub const FALLBACK_RUNTIME: &str = "docker";

/// Returns the first runtime in `preference` for which `is_available` holds.
pub fn detect_runtime<F>(preference: &[&str], is_available: F) -> String
where
    F: Fn(&str) -> bool,
{
    preference
        .iter()
        .find(|exe| is_available(exe))
        .unwrap_or(&FALLBACK_RUNTIME)
        .to_string()
}

/// Probes `PATH` for the preferred runtimes.
pub fn find_runtime() -> String {
    detect_runtime(&RUNTIME_PREFERENCE, |exe| which::which(exe).is_ok())
}

/// A host directory made visible at a fixed path inside the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
}

impl Mount {
    pub fn new(host: &Path, container: &str) -> Self {
        Self {
            host: host.to_path_buf(),
            container: container.to_string(),
        }
    }

    /// `-v` argument, relabelled for SELinux hosts.
    pub fn volume_arg(&self) -> String {
        format!("{}:{}:Z", self.host.display(), self.container)
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    fn name(&self) -> &str;

    async fn build_image(&self, context: &Path, tag: &str) -> Result<()>;

    async fn run_container(&self, tag: &str, mounts: &[Mount]) -> Result<()>;
}

/// A docker-compatible command line runtime (`podman` or `docker`).
pub struct CliRuntime<R> {
    executable: String,
    runner: R,
}

impl<R: Runner> CliRuntime<R> {
    pub fn new(executable: impl Into<String>, runner: R) -> Self {
        Self {
            executable: executable.into(),
            runner,
        }
    }
}

#[async_trait]
impl<R: Runner> ContainerRuntime for CliRuntime<R> {
    fn name(&self) -> &str {
        &self.executable
    }

    async fn build_image(&self, context: &Path, tag: &str) -> Result<()> {
        info!("building {} image: {}", self.executable, tag);

        let invocation = Invocation::new(&self.executable)
            .args(["build", "--rm=true"])
            .arg(format!("--tag={tag}"))
            .arg(".")
            .current_dir(context);

        self.runner
            .run(&invocation)
            .await
            .with_context(|| format!("{} build", self.executable))
    }

    async fn run_container(&self, tag: &str, mounts: &[Mount]) -> Result<()> {
        let mut invocation = Invocation::new(&self.executable).args(["run", "--rm"]);

        for mount in mounts {
            invocation = invocation.arg("-v").arg(mount.volume_arg());
        }

        let invocation = invocation.arg(tag);

        self.runner
            .run(&invocation)
            .await
            .with_context(|| format!("{} run", self.executable))
    }
}
