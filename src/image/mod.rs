use crate::command::{Invocation, Runner};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Wraps a plain-text boot command script into a U-Boot script image using the
/// `mkimage` built alongside U-Boot. The image is written into `uboot_dir`.
pub async fn wrap_script<R: Runner>(
    runner: &R,
    uboot_dir: &Path,
    script: &Path,
    arch: &str,
    output: &str,
    envs: &[(String, String)],
) -> Result<PathBuf> {
    let mkimage = uboot_dir.join("tools/mkimage");

    let invocation = Invocation::new(mkimage.display().to_string())
        .args(["-A", arch, "-T", "script", "-C", "none", "-d"])
        .arg(script.display().to_string())
        .arg(output)
        .envs(envs.iter().cloned())
        .current_dir(uboot_dir);

    runner.run(&invocation).await.context("mkimage")?;

    Ok(uboot_dir.join(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::RecordingRunner;

    #[tokio::test]
    async fn runs_mkimage_from_uboot_tree() {
        let uboot = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let envs = vec![("SOURCE_DATE_EPOCH".to_string(), "0".to_string())];

        let image = wrap_script(
            &runner,
            uboot.path(),
            Path::new("/work/boot.cmd"),
            "arm64",
            "boot.scr",
            &envs,
        )
        .await
        .unwrap();

        assert_eq!(image, uboot.path().join("boot.scr"));

        let calls = runner.calls();
        let mkimage = uboot.path().join("tools/mkimage").display().to_string();
        assert_eq!(
            calls[0].to_string(),
            format!("{mkimage} -A arm64 -T script -C none -d /work/boot.cmd boot.scr")
        );
        assert_eq!(calls[0].dir.as_deref(), Some(uboot.path()));
        assert_eq!(calls[0].get_env("SOURCE_DATE_EPOCH"), Some("0"));
    }

    #[tokio::test]
    async fn mkimage_failure_is_fatal() {
        let uboot = tempfile::tempdir().unwrap();
        let mkimage = uboot.path().join("tools/mkimage").display().to_string();
        let runner = RecordingRunner::new().failing_on(&mkimage);

        let err = wrap_script(
            &runner,
            uboot.path(),
            Path::new("boot.cmd"),
            "arm64",
            "boot.scr",
            &[],
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "mkimage");
    }
}
