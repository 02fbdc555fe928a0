use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{copy, create_dir_all};
use tracing::info;

/// A build output: where the toolchain leaves it and the fixed name it is
/// staged under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub source: &'static str,
    pub name: &'static str,
    pub hint: Option<&'static str>,
}

impl Artifact {
    pub const fn new(source: &'static str, name: &'static str) -> Self {
        Self {
            source,
            name,
            hint: None,
        }
    }

    pub const fn with_hint(self, hint: &'static str) -> Self {
        Self {
            hint: Some(hint),
            ..self
        }
    }
}

pub async fn copy_file(dest: &Path, src: &Path) -> Result<()> {
    copy(src, dest)
        .await
        .with_context(|| format!("failed to copy {} to {}", src.display(), dest.display()))?;

    Ok(())
}

/// Checks that every artifact exists under `source_dir` before copying any of
/// them into `dest_dir`. Returns the staged paths.
pub async fn collect(
    source_dir: &Path,
    dest_dir: &Path,
    artifacts: &[Artifact],
) -> Result<Vec<PathBuf>> {
    for artifact in artifacts {
        let path = source_dir.join(artifact.source);

        if !path.is_file() {
            match artifact.hint {
                Some(hint) => bail!("{} not found: {} - {}", artifact.name, path.display(), hint),
                None => bail!("{} not found: {}", artifact.name, path.display()),
            }
        }
    }

    create_dir_all(dest_dir)
        .await
        .with_context(|| format!("failed to create {}", dest_dir.display()))?;

    let mut staged = vec![];

    for artifact in artifacts {
        let dest = dest_dir.join(artifact.name);

        copy_file(&dest, &source_dir.join(artifact.source)).await?;

        info!("wrote {}", dest.display());

        staged.push(dest);
    }

    Ok(staged)
}
