use crate::store::paths;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

pub async fn create_dir(prefix: &str) -> Result<PathBuf> {
    let temp_dir = paths::get_temp_path(prefix);

    fs::create_dir(&temp_dir)
        .await
        .with_context(|| format!("failed to create temp dir: {}", temp_dir.display()))?;

    Ok(temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_empty_dir() {
        let dir = create_dir("rkbin").await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

        std::fs::remove_dir(&dir).unwrap();
    }
}
