use anyhow::{Context, Result};
use std::fmt;
use std::future::Future;
use tracing::info;

pub mod kernel;
pub mod rebuild;
pub mod uboot;

pub use kernel::KernelBuild;
pub use rebuild::Rebuild;
pub use uboot::UbootBuild;

/// Steps of a build program. Each one must succeed before the next starts;
/// any failure ends the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    AcquireSource,
    ConfigureOverlay,
    Compile,
    PostProcess,
    CollectArtifacts,
    BuildOrchestrator,
    PrepareContext,
    BuildImage,
    RunContainer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AcquireSource => "acquire-source",
            Stage::ConfigureOverlay => "configure-overlay",
            Stage::Compile => "compile",
            Stage::PostProcess => "post-process",
            Stage::CollectArtifacts => "collect-artifacts",
            Stage::BuildOrchestrator => "build-orchestrator",
            Stage::PrepareContext => "prepare-context",
            Stage::BuildImage => "build-image",
            Stage::RunContainer => "run-container",
        };

        write!(f, "{name}")
    }
}

/// Runs one stage, attaching its name to any error.
pub async fn stage<T, F>(stage: Stage, step: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    info!("stage: {}", stage);

    step.await.with_context(|| format!("{stage} failed"))
}
