use crate::command::{Invocation, Runner};
use crate::target::GitRepo;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Materializes one pinned revision of a repository without its history:
/// an empty repository, a single remote, a depth-1 fetch of exactly the
/// pinned revision and a detached checkout of it.
#[derive(Clone, Copy, Debug)]
pub struct GitSource<'a> {
    pub repo: &'a GitRepo,
}

impl<'a> GitSource<'a> {
    pub fn new(repo: &'a GitRepo) -> Self {
        Self { repo }
    }

    pub fn invocations(&self, dir: &Path) -> Vec<Invocation> {
        [
            vec!["init"],
            vec!["remote", "add", "origin", self.repo.url],
            vec!["fetch", "--depth=1", "origin", self.repo.rev],
            vec!["checkout", "FETCH_HEAD"],
        ]
        .into_iter()
        .map(|args| Invocation::new("git").args(args).current_dir(dir))
        .collect()
    }

    pub async fn fetch<R: Runner>(&self, runner: &R, dir: &Path) -> Result<()> {
        info!(
            "fetching {} at {} into {}",
            self.repo.url,
            self.repo.rev,
            dir.display()
        );

        for invocation in self.invocations(dir) {
            let step = format!("git {}", invocation.args[0]);

            runner.run(&invocation).await.context(step)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::RecordingRunner;

    const REPO: GitRepo = GitRepo {
        url: "https://github.com/rockchip-linux/rkbin",
        rev: "74213af1e952c4683d2e35952507133b61394862",
    };

    #[tokio::test]
    async fn shallow_fetch_of_pinned_revision() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();

        GitSource::new(&REPO)
            .fetch(&runner, dir.path())
            .await
            .unwrap();

        assert_eq!(
            runner.commands(),
            [
                "git init",
                "git remote add origin https://github.com/rockchip-linux/rkbin",
                "git fetch --depth=1 origin 74213af1e952c4683d2e35952507133b61394862",
                "git checkout FETCH_HEAD",
            ]
        );
        assert!(runner
            .calls()
            .iter()
            .all(|call| call.dir.as_deref() == Some(dir.path())));
    }

    #[tokio::test]
    async fn failed_fetch_skips_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().failing_on("git fetch");

        let err = GitSource::new(&REPO)
            .fetch(&runner, dir.path())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "git fetch");
        assert_eq!(runner.calls().len(), 3);
    }
}
