use crate::command::{Invocation, Runner};
use anyhow::{Context, Result};
use std::path::Path;
use std::thread::available_parallelism;
use tracing::info;

/// Host logical CPU count, used as the build's `-j` value.
pub fn get_default_jobs() -> usize {
    available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// A cross-compilation run over a fully configured source tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Build {
    pub targets: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub jobs: usize,
}

impl Build {
    pub fn new(jobs: usize) -> Self {
        Self {
            jobs: jobs.max(1),
            ..Default::default()
        }
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets.extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn with_envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn invocation(&self, tree: &Path) -> Invocation {
        Invocation::new("make")
            .args(self.targets.iter().cloned())
            .arg(format!("-j{}", self.jobs))
            .envs(self.envs.iter().cloned())
            .current_dir(tree)
    }

    pub async fn run<R: Runner>(&self, runner: &R, tree: &Path) -> Result<()> {
        info!("compiling with {} jobs: {}", self.jobs, tree.display());

        runner.run(&self.invocation(tree)).await.context("make")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::RecordingRunner;
    use crate::target::AARCH64;

    #[test]
    fn default_jobs_is_positive() {
        assert!(get_default_jobs() >= 1);
    }

    #[test]
    fn zero_jobs_clamps_to_one() {
        assert_eq!(Build::new(0).jobs, 1);
    }

    #[tokio::test]
    async fn make_targets_with_parallelism_and_envs() {
        let tree = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();

        Build::new(8)
            .with_targets(["Image", "dtbs"])
            .with_envs(AARCH64.envs())
            .with_envs([("KBUILD_BUILD_USER", "gokrazy")])
            .run(&runner, tree.path())
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to_string(), "make Image dtbs -j8");
        assert_eq!(calls[0].dir.as_deref(), Some(tree.path()));
        assert_eq!(calls[0].get_env("ARCH"), Some("arm64"));
        assert_eq!(calls[0].get_env("CROSS_COMPILE"), Some("aarch64-linux-gnu-"));
        assert_eq!(calls[0].get_env("KBUILD_BUILD_USER"), Some("gokrazy"));
    }

    #[tokio::test]
    async fn build_failure_is_fatal() {
        let tree = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().failing_on("make");

        let err = Build::new(2).run(&runner, tree.path()).await.unwrap_err();

        assert_eq!(err.to_string(), "make");
        assert_eq!(format!("{err:#}"), "make: make exited with exit status: 2");
    }
}
