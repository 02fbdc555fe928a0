use crate::store::{archives, paths};
use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tokio::fs::{remove_dir_all, remove_file, rename, File};
use tokio::io::AsyncWriteExt;
use tracing::info;
use url::Url;

/// A source archive downloaded over HTTP and extracted next to it.
#[derive(Clone, Debug)]
pub struct HttpSource {
    url: Url,
    archive_name: String,
}

impl HttpSource {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid source url: {url}"))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("invalid HTTP source url: {}", url)
        }

        let archive_name = paths::get_archive_name(&url)?;

        Ok(Self { url, archive_name })
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    pub fn tree_name(&self) -> String {
        paths::get_source_tree_name(&self.archive_name)
    }

    /// Downloads the archive into `dir` unless a file of that name is already
    /// there. The existing file is used as is.
    pub async fn download(&self, dir: &Path) -> Result<PathBuf> {
        let archive_path = dir.join(&self.archive_name);

        if archive_path.exists() {
            info!("source archive already exists, skipping download");
            return Ok(archive_path);
        }

        info!("downloading {}", self.url);

        let partial_path = paths::get_partial_path(&archive_path);

        if let Err(err) = self.download_to(&partial_path).await {
            let _ = remove_file(&partial_path).await;
            return Err(err);
        }

        rename(&partial_path, &archive_path)
            .await
            .with_context(|| format!("failed to rename {}", partial_path.display()))?;

        Ok(archive_path)
    }

    async fn download_to(&self, path: &Path) -> Result<()> {
        let mut response = reqwest::get(self.url.as_str())
            .await
            .with_context(|| format!("failed to GET {}", self.url))?;

        if response.status() != StatusCode::OK {
            bail!("HTTP {} for {}", response.status().as_u16(), self.url)
        }

        let mut file = File::create(path)
            .await
            .with_context(|| format!("failed to create {}", path.display()))?;

        let mut size = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("failed to read body of {}", self.url))?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;

            size += chunk.len();
        }

        file.flush().await?;

        info!("downloaded {} bytes", size);

        Ok(())
    }

    /// Downloads (or reuses) the archive in `dir` and extracts a fresh source
    /// tree from it. Returns the tree's path.
    pub async fn fetch(&self, dir: &Path) -> Result<PathBuf> {
        let archive_path = self.download(dir).await?;

        let tree_path = dir.join(self.tree_name());

        if tree_path.exists() {
            info!("removing previous source tree: {}", tree_path.display());

            remove_dir_all(&tree_path)
                .await
                .with_context(|| format!("failed to remove {}", tree_path.display()))?;
        }

        info!("unpacking {}", archive_path.display());

        archives::unpack_tar_xz(dir, &archive_path).await?;

        if !tree_path.is_dir() {
            bail!(
                "{} did not contain {}",
                archive_path.display(),
                tree_path.display()
            )
        }

        Ok(tree_path)
    }
}
