use crate::command::Runner;
use crate::compile::Build;
use crate::overlay;
use crate::pipeline::{stage, Stage};
use crate::source::HttpSource;
use crate::store::artifacts;
use crate::target::KernelTarget;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs::remove_dir_all;
use tracing::info;

/// Downloads, configures and cross-compiles the kernel, then stages its image
/// and device tree into the result directory.
pub struct KernelBuild<'a, R> {
    pub runner: &'a R,
    pub target: &'a KernelTarget,
    pub workdir: PathBuf,
    pub result_dir: PathBuf,
    pub jobs: usize,
    pub cleanup: bool,
}

impl<R: Runner> KernelBuild<'_, R> {
    pub async fn run(&self) -> Result<Vec<PathBuf>> {
        let tree = stage(Stage::AcquireSource, async {
            HttpSource::new(self.target.url)?
                .fetch(&self.workdir)
                .await
        })
        .await?;

        stage(
            Stage::ConfigureOverlay,
            overlay::configure_and_verify(
                self.runner,
                &tree,
                &self.target.toolchain,
                self.target.defconfig,
                &self.target.overlay,
            ),
        )
        .await?;

        let build = Build::new(self.jobs)
            .with_targets(self.target.make_targets.iter().copied())
            .with_envs(self.target.toolchain.envs())
            .with_envs(self.target.build_envs.iter().copied());

        stage(Stage::Compile, build.run(self.runner, &tree)).await?;

        let staged = stage(
            Stage::CollectArtifacts,
            artifacts::collect(&tree, &self.result_dir, self.target.artifacts),
        )
        .await?;

        if self.cleanup {
            info!("removing source tree: {}", tree.display());

            remove_dir_all(&tree)
                .await
                .with_context(|| format!("failed to remove {}", tree.display()))?;
        }

        Ok(staged)
    }
}
