use crate::command::{Invocation, Runner};
use crate::container::{ContainerDefinition, ContainerRuntime, Identity, Mount};
use crate::pipeline::{stage, Stage};
use crate::store::{artifacts, paths};
use crate::target::RebuildTarget;
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{canonicalize, write};
use tracing::{debug, info, warn};

/// Runs a build program inside a throwaway container image and copies its
/// outputs back to `output_dir`.
pub struct Rebuild<'a, R, C> {
    pub runner: &'a R,
    pub runtime: &'a C,
    pub target: &'a RebuildTarget,
    pub project_dir: PathBuf,
    pub triple: String,
    pub context_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub identity: Identity,
    pub keep_context: bool,
}

impl<R: Runner, C: ContainerRuntime> Rebuild<'_, R, C> {
    /// The build context is removed when this returns, whether or not the
    /// run succeeded, unless `keep_context` is set.
    pub async fn run(&self) -> Result<Vec<PathBuf>> {
        let context = tempfile::Builder::new()
            .prefix(&format!("{}-", self.target.tag))
            .tempdir()
            .context("failed to create build context")?;

        let result = self.run_in(context.path()).await;

        if self.keep_context {
            let path = context.keep();
            info!("kept build context: {}", path.display());
        } else if let Err(err) = context.close() {
            warn!("failed to remove build context: {err}");
        }

        result
    }

    async fn run_in(&self, context: &Path) -> Result<Vec<PathBuf>> {
        info!(
            "rebuilding {} with {} in {}",
            self.target.description,
            self.runtime.name(),
            context.display()
        );

        stage(Stage::BuildOrchestrator, self.build_orchestrator(context)).await?;

        stage(Stage::PrepareContext, self.prepare_context(context)).await?;

        stage(
            Stage::BuildImage,
            self.runtime.build_image(context, self.target.tag),
        )
        .await?;

        let mounts = [Mount::new(context, paths::RESULT_DIR)];

        stage(
            Stage::RunContainer,
            self.runtime.run_container(self.target.tag, &mounts),
        )
        .await?;

        stage(
            Stage::CollectArtifacts,
            artifacts::collect(context, &self.output_dir, self.target.outputs),
        )
        .await
    }

    async fn build_orchestrator(&self, context: &Path) -> Result<()> {
        // cargo resolves a relative --target-dir against its own working dir
        let project_dir = canonicalize(&self.project_dir).await.with_context(|| {
            format!("project directory not found: {}", self.project_dir.display())
        })?;

        let target_dir = project_dir.join("target");

        let invocation = Invocation::new("cargo")
            .args(["build", "--release", "--bin", self.target.bin])
            .arg("--target")
            .arg(&self.triple)
            .arg("--target-dir")
            .arg(target_dir.display().to_string())
            .current_dir(&project_dir);

        self.runner
            .run(&invocation)
            .await
            .with_context(|| format!("cargo build {}", self.target.bin))?;

        let binary = target_dir
            .join(&self.triple)
            .join("release")
            .join(self.target.bin);

        if !binary.is_file() {
            bail!("{} binary not found: {}", self.target.bin, binary.display())
        }

        artifacts::copy_file(&context.join(self.target.bin), &binary).await
    }

    async fn prepare_context(&self, context: &Path) -> Result<()> {
        let mut files = vec![];

        for path in &self.context_files {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("invalid context file: {}", path.display()))?;

            artifacts::copy_file(&context.join(name), path).await?;

            files.push(name.to_string());
        }

        let definition =
            ContainerDefinition::new(self.target.base_image, self.target.bin, self.identity)
                .with_packages(self.target.packages.iter().copied())
                .with_files(files)
                .render()?;

        debug!("container definition:\n{}", definition);

        let definition_path = context.join("Dockerfile");

        write(&definition_path, definition)
            .await
            .with_context(|| format!("failed to write {}", definition_path.display()))
    }
}
